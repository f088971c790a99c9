//! Proof replay and verification: regenerate the course, re-run the logged
//! controls and check the run ends on the finish at the claimed frame.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_FRAMES, MAX_INPUTS, WORK_SIZE};
use crate::error::{ReplayError, VerifyError};
use crate::fixed_point::MathTables;
use crate::hash::{Sha512Hasher, WorkHasher};
use crate::pathfind::{GridAStar, PathOracle};
use crate::physics::Simulator;
use crate::pow::ProofOfPlay;
use crate::protocol::WorkUnit;
use crate::types::{Accel, MotoState, Rotation, StepResult};
use crate::world::{Rules, WorldGenerator};

/// Replay limit for full verification; past the frame cap on purpose so the
/// cap itself is what ends an overlong run.
pub const CHECK_FRAME_LIMIT: i32 = MAX_FRAMES + 10;

/// Drive `state` through the records of `proof`.
///
/// Between records the control in effect before the record applies. A
/// record's rotation applies for one tick. `Ok` means the run reached the
/// finish on exactly the last frame, after every record. Replay also stops
/// once the state reaches `to_frame`, which the rewind path relies on.
pub fn replay(
    sim: &Simulator<'_>,
    state: &mut MotoState,
    proof: &ProofOfPlay,
    to_frame: i32,
) -> Result<(), ReplayError> {
    let num_frames = proof.num_frames as i32;
    let mut accel = Accel::Idle;
    let mut rotation = Rotation::None;
    let mut records = proof.records().enumerate();
    let mut prev_position = None;

    loop {
        let next = records.next();
        let target = match next {
            None => num_frames,
            Some((index, record)) => {
                if record.position >= num_frames {
                    return Err(ReplayError::RecordPastEnd {
                        index,
                        position: record.position,
                    });
                }
                if prev_position.is_some_and(|prev| record.position <= prev) {
                    return Err(ReplayError::RecordOutOfOrder {
                        index,
                        position: record.position,
                    });
                }
                if !record.is_filler() && record.accel == accel && record.rotation == Rotation::None
                {
                    return Err(ReplayError::RedundantRecord { index });
                }
                prev_position = Some(record.position);
                record.position
            }
        };

        while state.frame < target {
            match sim.step(state, accel, rotation) {
                StepResult::Continue => {}
                StepResult::Success => {
                    return if state.frame == num_frames && next.is_none() {
                        Ok(())
                    } else {
                        Err(ReplayError::UnexpectedSuccess { frame: state.frame })
                    };
                }
                StepResult::Failure(reason) => {
                    return Err(ReplayError::Failed {
                        frame: state.frame,
                        reason,
                    })
                }
            }
            rotation = Rotation::None;
            if state.frame >= to_frame {
                return Err(ReplayError::Stopped { frame: state.frame });
            }
        }

        match next {
            Some((_, record)) => {
                accel = record.accel;
                rotation = record.rotation;
            }
            None => return Err(ReplayError::NoSuccess { frame: state.frame }),
        }
    }
}

/// What a verified proof commits to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationJournal {
    pub nonce: u32,
    pub frames: u16,
    pub updates: usize,
    pub height: i32,
    pub time_target: i16,
    pub final_state: MotoState,
}

pub struct Verifier<'t, H = Sha512Hasher, P = GridAStar> {
    generator: WorldGenerator<'t, H, P>,
}

impl<'t> Verifier<'t> {
    pub fn new(tables: &'t MathTables) -> Self {
        Self {
            generator: WorldGenerator::new(tables),
        }
    }
}

impl<'t, H: WorkHasher, P: PathOracle> Verifier<'t, H, P> {
    pub fn from_generator(generator: WorldGenerator<'t, H, P>) -> Self {
        Self { generator }
    }

    pub fn with_rules(self, rules: Rules) -> Self {
        Self {
            generator: self.generator.with_rules(rules),
        }
    }

    /// Regenerate the world for `proof.nonce` and replay the whole proof.
    /// Returns the final state.
    pub fn check(
        &self,
        block: &[u8; WORK_SIZE],
        proof: &ProofOfPlay,
    ) -> Result<MotoState, VerifyError> {
        if proof.num_updates() > MAX_INPUTS {
            return Err(VerifyError::TooManyUpdates {
                count: proof.num_updates(),
                max: MAX_INPUTS,
            });
        }
        let (world, mut state) = self.generator.generate(block, proof.nonce)?;
        let sim = Simulator::new(self.generator.tables(), &world);
        replay(&sim, &mut state, proof, CHECK_FRAME_LIMIT)?;
        Ok(state)
    }

    /// Full acceptance: `check` plus the work unit's time target.
    pub fn verify(
        &self,
        work: &WorkUnit,
        proof: &ProofOfPlay,
    ) -> Result<VerificationJournal, VerifyError> {
        if proof.num_frames as i32 >= work.time_target as i32 {
            return Err(VerifyError::TimeTargetExceeded {
                frames: proof.num_frames,
                target: work.time_target,
            });
        }
        let final_state = self.check(&work.block, proof)?;
        Ok(VerificationJournal {
            nonce: proof.nonce,
            frames: proof.num_frames,
            updates: proof.num_updates(),
            height: work.height,
            time_target: work.time_target,
            final_state,
        })
    }
}
