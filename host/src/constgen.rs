//! Re-derives the integer physics constants from their physical parameters.
//!
//! The stepper only ever sees the integers in `motoplay_core::constants`;
//! this is the offline recipe they came from. Terms marked f32 round after
//! every operation, the rest are computed in f64.

use std::f64::consts::TAU;

use motoplay_core::constants as c;
use serde::Serialize;

const WHEEL_R: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedConstant {
    pub name: &'static str,
    pub derived: i64,
    pub contract: i64,
}

impl DerivedConstant {
    pub fn matches(&self) -> bool {
        self.derived == self.contract
    }
}

pub fn derive_constants() -> Vec<DerivedConstant> {
    // World units per position unit and radians per angle unit.
    let pos_k: f32 = 80.0 / 4_294_967_296.0;
    let ang_pos_k = (TAU / 4_294_967_296.0) as f32;
    let dt: f32 = 1.0 / 500.0;

    let wheel_mass: f32 = 10.0;
    let wheel_ang_mass: f32 = 0.32;
    let bike_mass: f32 = 200.0;
    let bike_ang_mass: f32 = 60.5;
    let head_mass: f32 = 5.0;
    let rot_fast: f32 = 12.0;
    let rot_slow: f32 = 9.0;

    let friction = (20_000.0f32 * dt) as i64;
    let wheel_k = (10_000.0f32 * dt) as i64;
    let contact_div = (1.0
        / (((1.0f32 / wheel_mass) as f64 + WHEEL_R * WHEEL_R / wheel_ang_mass as f64) * dt as f64))
        as i64
        & 0xffff;

    let rows = [
        ("INV_ANG_POS_K", (1.0f32 / ang_pos_k) as i64, c::INV_ANG_POS_K as i64),
        ("WHEEL_K", wheel_k, c::WHEEL_K),
        ("MAX_SPEED", (110.0f32 * dt / ang_pos_k) as i64, c::MAX_SPEED as i64),
        ("ACCELERATION", (600.0f32 * dt / ang_pos_k) as i64, c::ACCELERATION),
        ("ROTATION_PERIOD", (0.4f32 / dt) as i64, c::ROTATION_PERIOD as i64),
        ("WHEEL_DIST", (1.7f32 / pos_k) as i64, c::WHEEL_DIST as i64),
        ("BIKE_POS0", (0.85f32 / pos_k) as i64, c::BIKE_POS0 as i64),
        ("BIKE_POS1", (0.6f32 / pos_k) as i64, c::BIKE_POS1 as i64),
        ("HEAD_POS", (1.0f32 / pos_k) as i64, c::HEAD_POS as i64),
        (
            "WHEEL_ANGULAR_MASS_DIV_DT",
            (wheel_ang_mass / dt) as i64,
            c::WHEEL_ANGULAR_MASS_DIV_DT,
        ),
        ("WHEEL_MASS_DIV_DT", (wheel_mass / dt) as i64, c::WHEEL_MASS_DIV_DT),
        (
            "BIKE_ANGULAR_MASS_DIV_DT",
            (bike_ang_mass / dt) as i64,
            c::BIKE_ANGULAR_MASS_DIV_DT,
        ),
        ("BIKE_MASS_DIV_DT", (bike_mass / dt) as i64, c::BIKE_MASS_DIV_DT),
        ("HEAD_MASS_DIV_DT", (head_mass / dt) as i64, c::HEAD_MASS_DIV_DT),
        (
            "ROTATION_IMPULSE_FAST",
            (rot_fast * bike_ang_mass / ang_pos_k) as i64,
            c::ROTATION_IMPULSE_FAST,
        ),
        (
            "ROTATION_IMPULSE_SLOW",
            (rot_slow * bike_ang_mass) as i64,
            c::ROTATION_IMPULSE_SLOW,
        ),
        (
            "GRAVITY_WHEEL",
            (-9.8f32 * wheel_mass * dt / pos_k) as i64,
            c::GRAVITY_WHEEL,
        ),
        ("GRAVITY_BIKE", (-9.8f32 * bike_mass * dt / pos_k) as i64, c::GRAVITY_BIKE),
        ("GRAVITY_HEAD", (-9.8f32 * head_mass * dt / pos_k) as i64, c::GRAVITY_HEAD),
        ("FRICTION", friction, c::FRICTION),
        ("CONTACT_FORCE_DIV", contact_div, c::CONTACT_FORCE_DIV),
        (
            "INV_MAX_BRAKING_DELTA_V",
            (1.0f32 / friction as f32 * wheel_ang_mass / dt) as i64,
            c::INV_MAX_BRAKING_DELTA_V,
        ),
        (
            "MIN_CLOSING_SPEED",
            (0.01 * dt as f64 / pos_k as f64) as i64,
            c::MIN_CLOSING_SPEED as i64,
        ),
        (
            "WHEEL_SPIN_DIV",
            ((1.0f32 / ang_pos_k) as f64 / WHEEL_R * pos_k as f64) as i64 & 0xffff,
            c::WHEEL_SPIN_DIV as i64,
        ),
        (
            "WHEEL_R_TORQUE_ARM",
            (WHEEL_R * pos_k as f64 / ang_pos_k as f64 * contact_div as f64) as i64 & 0xffff,
            c::WHEEL_R_TORQUE_ARM,
        ),
        ("WHEEL_R_65536", (WHEEL_R * 65_536.0) as i64, c::WHEEL_R_65536 as i64),
        (
            "INV_65536_POS_K",
            (1.0 / (65_536.0f32 * pos_k) as f64) as i64,
            c::INV_65536_POS_K as i64,
        ),
        (
            "WHEEL_R_DIV_POS_K",
            (WHEEL_R * 0.997f32 as f64 / pos_k as f64) as i64,
            c::WHEEL_R_DIV_POS_K as i64,
        ),
        (
            "INV_MAX_DELTA_ROT_V",
            (1.0f32 / (rot_slow * dt)) as i64,
            c::INV_MAX_DELTA_ROT_V,
        ),
        (
            "HEAD_POS_THRESHOLD",
            (0.6f32 * 0.6f32 / (pos_k * pos_k)) as i64,
            c::HEAD_POS_THRESHOLD,
        ),
        (
            "INV_K",
            (ang_pos_k / (wheel_k as f32 * pos_k * pos_k)) as i64,
            c::INV_K,
        ),
        (
            "INV_K0",
            (ang_pos_k / (c::WHEEL_K0 as f32 * pos_k * pos_k)) as i64,
            c::INV_K0,
        ),
        (
            "WHEEL_CAPTURE_R",
            (2.0 * WHEEL_R / pos_k as f64) as i64,
            c::WHEEL_CAPTURE_R as i64,
        ),
        (
            "HEAD_CAPTURE_R",
            ((0.238f32 as f64 + WHEEL_R) / pos_k as f64) as i64,
            c::HEAD_CAPTURE_R as i64,
        ),
    ];

    rows.into_iter()
        .map(|(name, derived, contract)| DerivedConstant {
            name,
            derived,
            contract,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_reproduces_contract() {
        let rows = derive_constants();
        let mismatched: Vec<_> = rows.iter().filter(|row| !row.matches()).collect();
        assert!(mismatched.is_empty(), "mismatched constants: {mismatched:?}");
    }

    #[test]
    fn test_every_name_is_unique() {
        let rows = derive_constants();
        let mut names: Vec<_> = rows.iter().map(|row| row.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), rows.len());
    }
}
