//! Live play: drives a state forward while logging the proof, and rewinds by
//! replaying the truncated log.

use crate::constants::ROTATION_PERIOD;
use crate::error::{ReplayError, WorldRejection};
use crate::fixed_point::MathTables;
use crate::hash::WorkHasher;
use crate::pathfind::PathOracle;
use crate::physics::Simulator;
use crate::pow::ProofOfPlay;
use crate::protocol::WorkUnit;
use crate::types::{Accel, Failure, MotoState, Rotation, StepResult};
use crate::verify::replay;
use crate::world::{World, WorldGenerator};

pub struct Session<'t> {
    tables: &'t MathTables,
    world: World,
    initial: MotoState,
    state: MotoState,
    proof: ProofOfPlay,
    time_target: i16,
    finished: bool,
}

impl<'t> Session<'t> {
    /// Generate the world for `nonce` and start at frame zero.
    pub fn start<H: WorkHasher, P: PathOracle>(
        generator: &WorldGenerator<'t, H, P>,
        work: &WorkUnit,
        nonce: u32,
    ) -> Result<Self, WorldRejection> {
        let (world, initial) = generator.generate(&work.block, nonce)?;
        Ok(Self::from_world(
            generator.tables(),
            world,
            initial,
            nonce,
            work.time_target,
        ))
    }

    pub fn from_world(
        tables: &'t MathTables,
        world: World,
        initial: MotoState,
        nonce: u32,
        time_target: i16,
    ) -> Self {
        Self {
            tables,
            world,
            initial,
            state: initial,
            proof: ProofOfPlay::new(nonce),
            time_target,
            finished: false,
        }
    }

    pub fn state(&self) -> &MotoState {
        &self.state
    }

    pub fn proof(&self) -> &ProofOfPlay {
        &self.proof
    }

    pub fn into_proof(self) -> ProofOfPlay {
        self.proof
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn time_target(&self) -> i16 {
        self.time_target
    }

    /// True once the run has reached the finish.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Play up to `frames` ticks under one control, stopping early on a
    /// terminal result or at the time target.
    ///
    /// A rotation inside the cool-down is dropped instead of failing. Once
    /// the log is full the last logged accel stays in force. A finished run
    /// is frozen: further calls return `Success` without stepping or logging.
    pub fn advance(&mut self, accel: Accel, rotation: Rotation, frames: u32) -> StepResult {
        if self.finished {
            return StepResult::Success;
        }
        if self.state.dead {
            return StepResult::Failure(Failure::AlreadyDead);
        }
        let remaining = (self.time_target as i32 - self.state.frame).max(0) as u32;
        let sim = Simulator::new(self.tables, &self.world);
        let mut accel = accel;
        let mut result = StepResult::Continue;

        for _ in 0..frames.min(remaining) {
            let mut rotation = if self.state.can_rotate(ROTATION_PERIOD) {
                rotation
            } else {
                Rotation::None
            };
            if !self.proof.record(self.state.frame, accel, rotation) {
                rotation = Rotation::None;
                accel = self.proof.last_accel();
            }
            result = sim.step(&mut self.state, accel, rotation);
            self.proof.num_frames = self.state.frame as u16;
            if result == StepResult::Success {
                self.finished = true;
            }
            if result.is_terminal() {
                break;
            }
        }

        if result != StepResult::Success && self.state.frame >= self.time_target as i32 {
            self.state.dead = true;
            if result == StepResult::Continue {
                result = StepResult::Failure(Failure::TimeTargetReached);
            }
        }
        result
    }

    /// Go back to `frame` (clamped to the frames played): reset, cut the log
    /// there and replay it.
    pub fn rewind(&mut self, frame: i32) -> Result<(), ReplayError> {
        let frame = frame.clamp(0, self.proof.num_frames as i32);
        self.state = self.initial;
        self.proof.truncate(frame as u16);
        let sim = Simulator::new(self.tables, &self.world);
        let replayed = replay(&sim, &mut self.state, &self.proof, frame);
        // Replaying up to the finish frame lands on the finish again.
        self.finished = replayed.is_ok();
        match replayed {
            Ok(()) | Err(ReplayError::Stopped { .. }) | Err(ReplayError::NoSuccess { .. }) => {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
