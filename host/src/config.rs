use std::env;

use motoplay_core::Rules;

pub const DEFAULT_MAX_NONCE_ATTEMPTS: u32 = 10_000;
pub const DEFAULT_START_NONCE: u32 = 0;

/// Host defaults read from the environment. CLI flags override them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    pub max_nonce_attempts: u32,
    pub start_nonce: u32,
    pub test_mode: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_nonce_attempts: DEFAULT_MAX_NONCE_ATTEMPTS,
            start_nonce: DEFAULT_START_NONCE,
            test_mode: false,
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self {
            max_nonce_attempts: read_env_u32("MOTO_MAX_NONCE_ATTEMPTS", DEFAULT_MAX_NONCE_ATTEMPTS),
            start_nonce: read_env_u32_allow_zero("MOTO_START_NONCE", DEFAULT_START_NONCE),
            test_mode: read_env_bool("MOTO_TEST_MODE", false),
        }
    }

    pub fn rules(&self) -> Rules {
        if self.test_mode {
            Rules::TEST
        } else {
            Rules::STANDARD
        }
    }
}

pub(crate) fn read_env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn read_env_u32_allow_zero(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

pub(crate) fn read_env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parsing() {
        env::set_var("MOTOPLAY_TEST_U32", "25");
        assert_eq!(read_env_u32("MOTOPLAY_TEST_U32", 7), 25);
        env::set_var("MOTOPLAY_TEST_U32", "0");
        assert_eq!(read_env_u32("MOTOPLAY_TEST_U32", 7), 7);
        assert_eq!(read_env_u32_allow_zero("MOTOPLAY_TEST_U32", 7), 0);
        env::set_var("MOTOPLAY_TEST_U32", "lots");
        assert_eq!(read_env_u32_allow_zero("MOTOPLAY_TEST_U32", 7), 7);
        env::remove_var("MOTOPLAY_TEST_U32");
        assert_eq!(read_env_u32("MOTOPLAY_TEST_U32", 7), 7);
    }

    #[test]
    fn test_env_bool() {
        env::set_var("MOTOPLAY_TEST_BOOL", " Yes ");
        assert!(read_env_bool("MOTOPLAY_TEST_BOOL", false));
        env::set_var("MOTOPLAY_TEST_BOOL", "nope");
        assert!(!read_env_bool("MOTOPLAY_TEST_BOOL", true));
        env::remove_var("MOTOPLAY_TEST_BOOL");
        assert!(read_env_bool("MOTOPLAY_TEST_BOOL", true));
    }

    #[test]
    fn test_rules_follow_test_mode() {
        let mut config = HostConfig::default();
        assert_eq!(config.rules(), Rules::STANDARD);
        config.test_mode = true;
        assert_eq!(config.rules(), Rules::TEST);
    }
}
