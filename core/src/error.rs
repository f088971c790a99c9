use core::fmt;

use crate::types::Failure;

/// Why a (work, nonce) pair does not produce a playable world. The caller
/// moves on to the next nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldRejection {
    TargetMissed,
    PathFilter { best_cost: Option<u32> },
    FinishInGround { distance: i32 },
    /// `reason` is `None` when the first tick already reached the finish.
    SanityTick { reason: Option<Failure> },
}

impl fmt::Display for WorldRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetMissed => write!(f, "work digest above difficulty target"),
            Self::PathFilter {
                best_cost: Some(cost),
            } => write!(f, "course too long: best path cost {cost}"),
            Self::PathFilter { best_cost: None } => write!(f, "course has no path to a finish"),
            Self::FinishInGround { distance } => {
                write!(f, "finish is inside the ground (distance {distance})")
            }
            Self::SanityTick {
                reason: Some(reason),
            } => write!(f, "first idle tick failed: {reason}"),
            Self::SanityTick { reason: None } => write!(f, "first idle tick reached the finish"),
        }
    }
}

/// Why a record list does not replay to an accepted run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayError {
    RecordPastEnd { index: usize, position: i32 },
    RecordOutOfOrder { index: usize, position: i32 },
    RedundantRecord { index: usize },
    UnexpectedSuccess { frame: i32 },
    Failed { frame: i32, reason: Failure },
    Stopped { frame: i32 },
    NoSuccess { frame: i32 },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordPastEnd { index, position } => {
                write!(f, "record {index} at frame {position} is past the end")
            }
            Self::RecordOutOfOrder { index, position } => {
                write!(f, "record {index} at frame {position} does not advance")
            }
            Self::RedundantRecord { index } => write!(f, "record {index} changes nothing"),
            Self::UnexpectedSuccess { frame } => {
                write!(f, "success at frame {frame} does not match the record list")
            }
            Self::Failed { frame, reason } => write!(f, "run failed at frame {frame}: {reason}"),
            Self::Stopped { frame } => write!(f, "replay stopped at frame {frame}"),
            Self::NoSuccess { frame } => write!(f, "no success by frame {frame}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyError {
    TooManyUpdates { count: usize, max: usize },
    World(WorldRejection),
    Replay(ReplayError),
    TimeTargetExceeded { frames: u16, target: i16 },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyUpdates { count, max } => {
                write!(f, "too many input records: {count} (max {max})")
            }
            Self::World(err) => write!(f, "world regeneration failed: {err}"),
            Self::Replay(err) => write!(f, "replay rejected: {err}"),
            Self::TimeTargetExceeded { frames, target } => {
                write!(f, "run took {frames} frames, target is below {target}")
            }
        }
    }
}

impl From<WorldRejection> for VerifyError {
    fn from(err: WorldRejection) -> Self {
        Self::World(err)
    }
}

impl From<ReplayError> for VerifyError {
    fn from(err: ReplayError) -> Self {
        Self::Replay(err)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    UnknownTag,
    Truncated { expected: usize, got: usize },
    InvalidHex,
    TooManyUpdates { count: u16 },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTag => write!(f, "unknown message tag"),
            Self::Truncated { expected, got } => {
                write!(f, "message truncated: expected {expected} hex chars, got {got}")
            }
            Self::InvalidHex => write!(f, "message payload is not valid hex"),
            Self::TooManyUpdates { count } => write!(f, "proof declares {count} records"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WorldRejection {}

#[cfg(feature = "std")]
impl std::error::Error for ReplayError {}

#[cfg(feature = "std")]
impl std::error::Error for VerifyError {}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}
