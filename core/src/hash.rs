//! Wide hash used for the difficulty gate and field derivation.

use sha2::{Digest, Sha512};

pub const DIGEST_LEN: usize = 64;

/// A deterministic 512-bit hash. World generation depends on nothing else
/// being platform independent.
pub trait WorkHasher {
    fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN];
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512Hasher;

impl WorkHasher for Sha512Hasher {
    fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        let mut hasher = Sha512::new();
        hasher.update(data);
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}

impl<H: WorkHasher + ?Sized> WorkHasher for &H {
    fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        (**self).digest(data)
    }
}
