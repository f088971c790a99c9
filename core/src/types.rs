//! Simulation state and control types.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::INITIAL_LAST_ROTATE;

/// Throttle/brake control. The discriminant is the packed record value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accel {
    #[default]
    Idle = 0,
    GasLeft = 1,
    GasRight = 2,
    Brake = 3,
}

impl Accel {
    /// Decode the low two bits of a record.
    pub fn from_code(code: u16) -> Self {
        match code % 4 {
            1 => Self::GasLeft,
            2 => Self::GasRight,
            3 => Self::Brake,
            _ => Self::Idle,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Frame rotation request. The discriminant is the packed record value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None = 0,
    Cw = 1,
    Ccw = 2,
}

impl Rotation {
    pub fn from_code(code: u16) -> Self {
        match code % 3 {
            1 => Self::Cw,
            2 => Self::Ccw,
            _ => Self::None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// A rigid body on the torus. Positions and angles wrap at 2^32.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Body {
    pub pos: [i32; 2],
    pub vel: [i32; 2],
    pub ang: i32,
    pub ang_vel: i32,
}

impl Body {
    pub fn at(pos: [i32; 2]) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }
}

/// Complete simulation state. The head is a point mass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotoState {
    pub frame: i32,
    pub last_rotate: i32,
    pub accel: Accel,
    pub rotation: Rotation,
    pub wheels: [Body; 2],
    pub bike: Body,
    pub head_pos: [i32; 2],
    pub head_vel: [i32; 2],
    pub dead: bool,
}

impl Default for MotoState {
    fn default() -> Self {
        Self {
            frame: 0,
            last_rotate: INITIAL_LAST_ROTATE,
            accel: Accel::Idle,
            rotation: Rotation::None,
            wheels: [Body::default(); 2],
            bike: Body::default(),
            head_pos: [0; 2],
            head_vel: [0; 2],
            dead: false,
        }
    }
}

impl MotoState {
    /// True once a rotation request at the current frame would be honored.
    pub fn can_rotate(&self, period: i32) -> bool {
        self.frame - self.last_rotate >= period
    }
}

/// Why a tick ended the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    AlreadyDead,
    FrameCap,
    RotationCooldown,
    WheelInGround,
    HeadCrash,
    TimeTargetReached,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyDead => write!(f, "state is already dead"),
            Self::FrameCap => write!(f, "frame cap reached"),
            Self::RotationCooldown => write!(f, "rotation requested during cool-down"),
            Self::WheelInGround => write!(f, "wheel penetrated the ground"),
            Self::HeadCrash => write!(f, "head hit the ground"),
            Self::TimeTargetReached => write!(f, "time target reached"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    Continue,
    Success,
    Failure(Failure),
}

impl StepResult {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Continue)
    }
}
