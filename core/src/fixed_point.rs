//! Fixed-point math for bit-exact simulation.
//!
//! Formats:
//! - i16 angles: 65536 steps per full turn (the top half of an i32 angle)
//! - Q1.31 trig values: sin/cos scaled by 2147483647
//! - Q0.16 smoothstep weights
//!
//! Every table is built with integer arithmetic only, so two builds on any
//! platform produce identical contents.

use alloc::vec::Vec;

use crate::constants::{INV_SQRT_TABLE_LEN, SIN_TABLE_LEN, SMOOTH_TABLE_LEN};

/// tau * 2^62, rounded down.
const TAU_Q62: u128 = 0x1_921F_B544_42D1_8469;
const Q62: u32 = 62;
const SIN_AMPLITUDE: i128 = 2_147_483_647;
const INV_SQRT_NUMERATOR: u64 = 17_592_186_036_224;
const INV_SQRT_BUCKET: u64 = 1 << 36;

/// Lookup tables shared by field sampling and the stepper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MathTables {
    sin: Vec<i32>,
    smooth: Vec<u16>,
    smooth_slope: Vec<u16>,
    inv_sqrt: Vec<i32>,
}

impl MathTables {
    pub fn build() -> Self {
        let sin = (0..SIN_TABLE_LEN as u32).map(quarter_sin).collect();

        let mut smooth = Vec::with_capacity(SMOOTH_TABLE_LEN);
        let mut smooth_slope = Vec::with_capacity(SMOOTH_TABLE_LEN);
        for i in 0..SMOOTH_TABLE_LEN as u64 {
            smooth.push(((i * i * (3 * 65536 - 2 * i)) >> 32) as u16);
            smooth_slope.push(((3 * i * (65536 - i)) >> 16) as u16);
        }

        let inv_sqrt = (0..INV_SQRT_TABLE_LEN as u64)
            .map(|i| (INV_SQRT_NUMERATOR / isqrt((i + 1) * INV_SQRT_BUCKET)) as i32)
            .collect();

        Self {
            sin,
            smooth,
            smooth_slope,
            inv_sqrt,
        }
    }

    /// Process-wide tables, built on first use.
    #[cfg(feature = "std")]
    pub fn shared() -> &'static MathTables {
        static TABLES: std::sync::OnceLock<MathTables> = std::sync::OnceLock::new();
        TABLES.get_or_init(MathTables::build)
    }

    /// Sine of an i16 angle in Q1.31.
    #[inline]
    pub fn sin16(&self, a: i16) -> i32 {
        let a = a as i32;
        if a <= -16384 {
            -self.sin[(32768 + a) as usize]
        } else if a < 0 {
            -self.sin[(-a) as usize]
        } else if a < 16384 {
            self.sin[a as usize]
        } else {
            self.sin[(32768 - a) as usize]
        }
    }

    /// Cosine of an i16 angle in Q1.31.
    #[inline]
    pub fn cos16(&self, a: i16) -> i32 {
        let a = a as i32;
        if a <= -16384 {
            -self.sin[(-16384 - a) as usize]
        } else if a < 0 {
            self.sin[(16384 + a) as usize]
        } else if a < 16384 {
            self.sin[(16384 - a) as usize]
        } else {
            -self.sin[(a - 16384) as usize]
        }
    }

    /// Smoothstep weight for a Q0.16 fraction.
    #[inline]
    pub fn smooth(&self, frac: u16) -> u16 {
        self.smooth[frac as usize]
    }

    /// Half the smoothstep derivative for a Q0.16 fraction.
    #[inline]
    pub fn smooth_slope(&self, frac: u16) -> u16 {
        self.smooth_slope[frac as usize]
    }

    /// Inverse length for a squared gradient magnitude, bucketed by 256.
    #[inline]
    pub fn inv_length(&self, magnitude_sq: i64) -> i64 {
        let bucket = (magnitude_sq >> 8).clamp(0, INV_SQRT_TABLE_LEN as i64 - 1);
        self.inv_sqrt[bucket as usize] as i64
    }

    pub fn sin_table(&self) -> &[i32] {
        &self.sin
    }
}

/// trunc(2147483647 * sin(i * tau / 65536)) for the first quadrant, using a
/// Q62 Taylor series.
fn quarter_sin(i: u32) -> i32 {
    let theta = (i as u128 * TAU_Q62) >> 16;
    let mut term = theta;
    let mut acc = theta as i128;
    let mut n: u128 = 1;
    let mut negative = true;
    loop {
        term = (((term * theta) >> Q62) * theta) >> Q62;
        term /= (n + 1) * (n + 2);
        n += 2;
        if term == 0 {
            break;
        }
        if negative {
            acc -= term as i128;
        } else {
            acc += term as i128;
        }
        negative = !negative;
    }
    ((SIN_AMPLITUDE * acc) >> Q62) as i32
}

/// Floor square root.
pub fn isqrt(value: u64) -> u64 {
    let mut rem = value;
    let mut root = 0u64;
    let mut bit = 1u64 << 62;
    while bit > rem {
        bit >>= 2;
    }
    while bit != 0 {
        if rem >= root + bit {
            rem -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }
    root
}

#[inline]
pub fn mul_uu(a: u16, b: u16) -> u16 {
    ((a as u32 * b as u32) >> 16) as u16
}

#[inline]
pub fn mul_su(a: i16, b: u16) -> i16 {
    ((a as i32 * b as i32) >> 16) as i16
}

#[inline]
pub fn mul_su32(a: i32, b: u32) -> i32 {
    ((a as i64 * b as i64) >> 31) as i32
}

#[inline]
pub fn mul_ss32(a: i32, b: i32) -> i32 {
    ((a as i64 * b as i64) >> 31) as i32
}

#[inline]
pub fn sign(v: i64) -> i64 {
    v.signum()
}
