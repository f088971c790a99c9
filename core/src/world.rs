//! Deterministic course generation from (work bytes, nonce).

use alloc::vec::Vec;

use crate::constants::{
    BIKE_POS0, BIKE_POS1, FIELD_BYTES, FIELD_CHUNKS, FINISH, HEAD_POS, PATH_COST_BOUND,
    PATH_DISCRIMINATOR_THRESHOLD, PATH_GOALS, PATH_START, START, TARGET_MASK, TEST_FINISH,
    WHEEL_DIST, WHEEL_R_65536, WORK_SIZE,
};
use crate::error::WorldRejection;
use crate::field::Field;
use crate::fixed_point::MathTables;
use crate::hash::{Sha512Hasher, WorkHasher, DIGEST_LEN};
use crate::pathfind::{GridAStar, PathOracle, WalkGrid};
use crate::physics::Simulator;
use crate::types::{Accel, Body, MotoState, Rotation, StepResult};

/// Packed difficulty bits: a significant-digit count in the top byte and
/// three mantissa bytes below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactTarget(pub u32);

impl CompactTarget {
    /// Bits stored little-endian in the last four work bytes, low 14 bits
    /// masked off.
    pub fn from_work(block: &[u8; WORK_SIZE]) -> Self {
        let bits = u32::from_le_bytes([
            block[WORK_SIZE - 4],
            block[WORK_SIZE - 3],
            block[WORK_SIZE - 2],
            block[WORK_SIZE - 1],
        ]);
        Self(bits & !TARGET_MASK)
    }

    /// A zero target disables the gate.
    pub fn is_open(self) -> bool {
        self.0 == 0
    }

    /// Big-endian 256-bit target.
    pub fn expand(self) -> [u8; 32] {
        let digits = ((self.0 >> 24) as usize).min(32);
        let mantissa = [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8];
        let mut target = [0u8; 32];
        match digits {
            0 => {}
            1 => target[31] = mantissa[0],
            2 => {
                target[30] = mantissa[0];
                target[31] = mantissa[1];
            }
            d => target[32 - d..35 - d].copy_from_slice(&mantissa),
        }
        target
    }

    /// Compares the first 32 digest bytes as a big-endian integer.
    pub fn is_met_by(self, digest: &[u8; DIGEST_LEN]) -> bool {
        self.is_open() || digest[..32] <= self.expand()[..]
    }
}

/// Generation switches. `TEST` is a relaxed mode with a flat course and a
/// finish straight below the start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rules {
    pub difficulty_gate: bool,
    pub path_filter: bool,
    pub flat_field: bool,
    pub finish: [i32; 2],
}

impl Rules {
    pub const STANDARD: Rules = Rules {
        difficulty_gate: true,
        path_filter: true,
        flat_field: false,
        finish: FINISH,
    };

    pub const TEST: Rules = Rules {
        difficulty_gate: false,
        path_filter: false,
        flat_field: true,
        finish: TEST_FINISH,
    };
}

impl Default for Rules {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// A generated course.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    pub field: Field,
    pub finish: [i32; 2],
}

/// Bodies at rest at the start, frame zero.
pub fn initial_state() -> MotoState {
    let w0 = START;
    let bike = [w0[0].wrapping_add(BIKE_POS0), w0[1].wrapping_add(BIKE_POS1)];
    MotoState {
        wheels: [
            Body::at(w0),
            Body::at([w0[0].wrapping_add(WHEEL_DIST), w0[1]]),
        ],
        bike: Body::at(bike),
        head_pos: [bike[0], bike[1].wrapping_add(HEAD_POS)],
        ..MotoState::default()
    }
}

pub struct WorldGenerator<'t, H = Sha512Hasher, P = GridAStar> {
    tables: &'t MathTables,
    hasher: H,
    oracle: P,
    rules: Rules,
}

impl<'t> WorldGenerator<'t> {
    pub fn new(tables: &'t MathTables) -> Self {
        Self::with_capabilities(tables, Sha512Hasher, GridAStar)
    }
}

impl<'t, H: WorkHasher, P: PathOracle> WorldGenerator<'t, H, P> {
    pub fn with_capabilities(tables: &'t MathTables, hasher: H, oracle: P) -> Self {
        Self {
            tables,
            hasher,
            oracle,
            rules: Rules::STANDARD,
        }
    }

    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    pub fn tables(&self) -> &'t MathTables {
        self.tables
    }

    /// Build the course for `nonce` and the state to play it from.
    pub fn generate(
        &self,
        block: &[u8; WORK_SIZE],
        nonce: u32,
    ) -> Result<(World, MotoState), WorldRejection> {
        // [chunk index][nonce LE][work]
        let mut preimage = Vec::with_capacity(1 + 4 + WORK_SIZE);
        preimage.push(0u8);
        preimage.extend_from_slice(&nonce.to_le_bytes());
        preimage.extend_from_slice(block);

        let gate_digest = self.hasher.digest(&preimage[1..]);
        if self.rules.difficulty_gate && !CompactTarget::from_work(block).is_met_by(&gate_digest) {
            return Err(WorldRejection::TargetMissed);
        }

        let mut raw = [0u8; FIELD_BYTES];
        if !self.rules.flat_field {
            for (i, chunk) in raw.chunks_exact_mut(FIELD_BYTES / FIELD_CHUNKS).enumerate() {
                preimage[0] = i as u8;
                chunk.copy_from_slice(&self.hasher.digest(&preimage));
            }
        }
        let mut field = Field::from_bytes(&raw);
        field.flatten_first_row();

        if self.rules.path_filter && gate_digest[DIGEST_LEN - 1] > PATH_DISCRIMINATOR_THRESHOLD {
            let grid = WalkGrid::from_field(&field, self.tables);
            let best_cost = PATH_GOALS
                .iter()
                .filter_map(|&goal| self.oracle.path_cost(&grid, PATH_START, goal))
                .min();
            match best_cost {
                Some(cost) if cost <= PATH_COST_BOUND => {}
                _ => return Err(WorldRejection::PathFilter { best_cost }),
            }
        }

        let world = World {
            field,
            finish: self.rules.finish,
        };
        let state = initial_state();

        let distance = world.field.ground_distance(self.tables, world.finish);
        if distance <= WHEEL_R_65536 {
            return Err(WorldRejection::FinishInGround { distance });
        }
        let mut probe = state;
        match Simulator::new(self.tables, &world).step(&mut probe, Accel::Idle, Rotation::None) {
            StepResult::Continue => {}
            StepResult::Failure(reason) => {
                return Err(WorldRejection::SanityTick {
                    reason: Some(reason),
                })
            }
            StepResult::Success => return Err(WorldRejection::SanityTick { reason: None }),
        }

        Ok((world, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAP_SIZE;
    use crate::field::FLAT_GRADIENT;

    fn block_with_bits(bits: u32) -> [u8; WORK_SIZE] {
        let mut block = [0u8; WORK_SIZE];
        block[WORK_SIZE - 4..].copy_from_slice(&bits.to_le_bytes());
        block
    }

    #[test]
    fn test_target_expansion() {
        assert_eq!(CompactTarget(0x0012_3456).expand(), [0u8; 32]);

        let one = CompactTarget(0x0112_3456).expand();
        assert_eq!(one[31], 0x12);
        assert!(one[..31].iter().all(|&b| b == 0));

        let two = CompactTarget(0x0212_3456).expand();
        assert_eq!(&two[30..], &[0x12, 0x34]);

        let three = CompactTarget(0x0312_3456).expand();
        assert_eq!(&three[29..], &[0x12, 0x34, 0x56]);

        let wide = CompactTarget(0x2012_3456).expand();
        assert_eq!(&wide[..3], &[0x12, 0x34, 0x56]);
        assert_eq!(CompactTarget(0xFF12_3456).expand(), wide);
    }

    #[test]
    fn test_target_from_work_masks_low_bits() {
        let block = block_with_bits(0x1D00_FFFF);
        assert_eq!(CompactTarget::from_work(&block), CompactTarget(0x1D00_C000));
        assert!(CompactTarget::from_work(&block_with_bits(0x3FFF)).is_open());
    }

    #[test]
    fn test_target_comparison_is_inclusive() {
        let target = CompactTarget(0x2012_3456);
        let mut digest = [0u8; DIGEST_LEN];
        digest[..3].copy_from_slice(&[0x12, 0x34, 0x56]);
        assert!(target.is_met_by(&digest));
        digest[31] = 1;
        assert!(!target.is_met_by(&digest));
        digest[0] = 0x11;
        assert!(target.is_met_by(&digest));
    }

    #[test]
    fn test_impossible_target_rejects() {
        let t = MathTables::shared();
        // One significant digit of value 0: only an all-zero digest passes.
        let block = block_with_bits(0x0100_4000);
        let gen = WorldGenerator::new(t);
        assert_eq!(gen.generate(&block, 0), Err(WorldRejection::TargetMissed));
    }

    #[test]
    fn test_test_rules_flat_first_row() {
        let t = MathTables::shared();
        let gen = WorldGenerator::new(t).with_rules(Rules::TEST);
        let (world, state) = gen.generate(&block_with_bits(0x0100_4000), 17).unwrap();
        for col in 0..MAP_SIZE {
            assert_eq!(world.field.cell(col, 0), FLAT_GRADIENT);
        }
        assert_eq!(world.finish, TEST_FINISH);
        assert_eq!(state, initial_state());
    }

    #[test]
    fn test_standard_rules_flatten_first_row() {
        let t = MathTables::shared();
        let gen = WorldGenerator::new(t);
        let (world, _) = gen.generate(&[0u8; WORK_SIZE], 0).unwrap();
        for col in 0..MAP_SIZE {
            assert_eq!(world.field.cell(col, 0), FLAT_GRADIENT);
        }
        assert_ne!(world.field.cell(0, 1), [0, 0]);
    }

    #[test]
    fn test_initial_layout() {
        let s = initial_state();
        assert_eq!(s.wheels[0].pos, START);
        assert_eq!(s.wheels[1].pos, [WHEEL_DIST, START[1]]);
        assert_eq!(s.bike.pos, [BIKE_POS0, START[1] + BIKE_POS1]);
        assert_eq!(s.head_pos, [BIKE_POS0, START[1] + BIKE_POS1 + HEAD_POS]);
        assert_eq!(s.last_rotate, -10_000);
    }
}
