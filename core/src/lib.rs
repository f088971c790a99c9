//! Motoplay core - deterministic proof-of-play engine.
//!
//! Course generation, the integer bike physics, the proof log and its replay
//! verifier. Integer-only and `no_std` capable; the `std` feature adds the
//! shared lookup tables and `std::error::Error` impls.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod error;
pub mod field;
pub mod fixed_point;
pub mod hash;
pub mod pathfind;
pub mod physics;
pub mod pow;
pub mod protocol;
pub mod session;
pub mod types;
pub mod verify;
pub mod world;

// Re-export key items
pub use error::{ProtocolError, ReplayError, VerifyError, WorldRejection};
pub use fixed_point::MathTables;
pub use physics::Simulator;
pub use pow::{ProofOfPlay, Record};
pub use protocol::{decode_line, encode_line, Message, WorkUnit};
pub use session::Session;
pub use types::{Accel, Failure, MotoState, Rotation, StepResult};
pub use verify::{replay, VerificationJournal, Verifier};
pub use world::{initial_state, CompactTarget, Rules, World, WorldGenerator};
