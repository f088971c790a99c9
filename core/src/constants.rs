//! Integer constants consumed by the stepper and generator.
//!
//! Physical values are derived offline from SI units at a 500 Hz model rate
//! and a 1/250 s nominal tick (see `motoplay constants`). The integers below
//! are the contract; the stepper never derives them at runtime.
//!
//! Units:
//! - positions: wrapping i32, the full 2^32 range spans the map once
//! - angles: wrapping i32, the full 2^32 range is one turn
//! - heights: field units, ground level at `LEVEL`

// World layout
pub const MAP_SIZE: usize = 16;
pub const WORK_SIZE: usize = 76;
pub const FIELD_BYTES: usize = MAP_SIZE * MAP_SIZE * 2;
pub const LEVEL: i32 = 650;
pub const SCALE: i64 = 5;
pub const START: [i32; 2] = [0, -300_000_000];
pub const FINISH: [i32; 2] = [2_140_000_000, 400_000_000];
pub const TEST_FINISH: [i32; 2] = [0, -4_000_000_000i64 as i32];

// Proof limits
pub const MAX_INPUTS: usize = 60;
pub const MAX_FRAMES: i32 = 15_000;
pub const DEFAULT_TIME_TARGET: i16 = 250 * 60;
/// Largest frame delta a filler record carries (65535 / 12 - 1).
pub const MAX_RECORD_DELTA: u16 = 5460;
pub const RECORD_UNIT: u16 = 12;
pub const INITIAL_LAST_ROTATE: i32 = -10_000;

// Difficulty gate and path filter
pub const TARGET_MASK: u32 = 0x3FFF;
pub const FIELD_CHUNKS: usize = FIELD_BYTES / 64;
pub const PATH_DISCRIMINATOR_THRESHOLD: u8 = 2;
pub const PATH_COST_BOUND: u32 = 7300;
pub const WALK_GRID_CELLS: usize = 512;
pub const PATH_START: (usize, usize) = (256, 1);
pub const PATH_GOALS: [(usize, usize); 2] = [(508, 464), (4, 464)];

// Lookup tables
pub const SIN_TABLE_LEN: usize = 16385;
pub const SMOOTH_TABLE_LEN: usize = 65536;
pub const INV_SQRT_TABLE_LEN: usize = 150_000;

// Body layout
pub const WHEEL_DIST: i32 = 91_268_056;
pub const BIKE_POS0: i32 = 45_634_028;
pub const BIKE_POS1: i32 = 32_212_256;
pub const HEAD_POS: i32 = 53_687_092;

// Spring-damper coupling
pub const INV_ANG_POS_K: i32 = 683_565_248;
pub const WHEEL_K: i64 = 20;
pub const WHEEL_K0: i64 = 1000;
pub const INV_K: i64 = 210_828;
pub const INV_K0: i64 = 4216;
pub const HEAD_POS_THRESHOLD: i64 = 1_037_629_403_430_912;

// Drive and rotation
pub const MAX_SPEED: i32 = 150_384_368;
pub const ACCELERATION: i64 = 820_278_336;
pub const ROTATION_PERIOD: i32 = 200;
pub const ROTATION_IMPULSE_FAST: i64 = 496_268_378_112;
pub const ROTATION_IMPULSE_SLOW: i64 = 544;
pub const INV_MAX_DELTA_ROT_V: i64 = 55;
pub const FRICTION: i64 = 40;
pub const INV_MAX_BRAKING_DELTA_V: i64 = 4;

// Mass divisors (mass / dt)
pub const WHEEL_ANGULAR_MASS_DIV_DT: i64 = 159;
pub const WHEEL_MASS_DIV_DT: i64 = 5000;
pub const BIKE_ANGULAR_MASS_DIV_DT: i64 = 30_249;
pub const BIKE_MASS_DIV_DT: i64 = 99_999;
pub const HEAD_MASS_DIV_DT: i64 = 2500;

// Gravity (force per tick)
pub const GRAVITY_WHEEL: i64 = -10_522_670;
pub const GRAVITY_BIKE: i64 = -210_453_408;
pub const GRAVITY_HEAD: i64 = -5_261_335;

// Ground contact
pub const CONTACT_FORCE_DIV: i64 = 833;
pub const MIN_CLOSING_SPEED: i32 = 1073;
pub const WHEEL_SPIN_DIV: i32 = 31;
pub const WHEEL_R_TORQUE_ARM: i64 = 4242;
pub const WHEEL_R_65536: i32 = 26_214;
pub const HEAD_R_65536: i32 = 13_000;
pub const INV_65536_POS_K: i32 = 819;
pub const WHEEL_R_DIV_POS_K: i32 = 21_410_411;

// Finish capture
pub const WHEEL_CAPTURE_R: i32 = 42_949_672;
pub const HEAD_CAPTURE_R: i32 = 34_252_364;
