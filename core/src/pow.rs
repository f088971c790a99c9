//! Proof of play: the nonce plus a bounded log of control changes.
//!
//! Each record packs `frame_delta * 12 + rotation * 4 + accel` into a u16.
//! Deltas count from the previous record's frame. Only changes are
//! stored: a record that keeps the accel and requests no rotation is
//! redundant, except for fillers that carry the largest delta.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_INPUTS, MAX_RECORD_DELTA, RECORD_UNIT};
use crate::types::{Accel, Rotation};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfPlay {
    pub nonce: u32,
    pub num_frames: u16,
    updates: Vec<u16>,
}

/// A decoded record with its absolute frame position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub position: i32,
    pub delta: u16,
    pub accel: Accel,
    pub rotation: Rotation,
}

impl Record {
    pub fn is_filler(&self) -> bool {
        self.delta == MAX_RECORD_DELTA
    }
}

pub fn pack_record(delta: u16, accel: Accel, rotation: Rotation) -> u16 {
    delta * RECORD_UNIT + rotation.code() * 4 + accel.code()
}

impl ProofOfPlay {
    pub fn new(nonce: u32) -> Self {
        Self {
            nonce,
            num_frames: 0,
            updates: Vec::with_capacity(MAX_INPUTS),
        }
    }

    /// Raw constructor for decoded proofs. The record count is not checked
    /// here; verification rejects oversized logs.
    pub fn from_parts(nonce: u32, num_frames: u16, updates: Vec<u16>) -> Self {
        Self {
            nonce,
            num_frames,
            updates,
        }
    }

    pub fn updates(&self) -> &[u16] {
        &self.updates
    }

    pub fn num_updates(&self) -> usize {
        self.updates.len()
    }

    pub fn is_full(&self) -> bool {
        self.updates.len() >= MAX_INPUTS
    }

    /// Accel of the last record, `Idle` for an empty log.
    pub fn last_accel(&self) -> Accel {
        self.updates
            .last()
            .map_or(Accel::Idle, |&u| Accel::from_code(u))
    }

    /// Frame position of the last record.
    pub fn last_position(&self) -> i32 {
        self.updates
            .iter()
            .map(|&u| (u / RECORD_UNIT) as i32)
            .sum()
    }

    pub fn records(&self) -> Records<'_> {
        Records {
            updates: self.updates.iter(),
            position: 0,
        }
    }

    /// Log a control change taking effect at `frame`. Returns false once the
    /// log is full or when `frame` precedes the last logged change; redundant
    /// changes are accepted without storing anything.
    pub fn record(&mut self, frame: i32, accel: Accel, rotation: Rotation) -> bool {
        let prev_accel = self.last_accel();
        if accel == prev_accel && rotation == Rotation::None {
            return true;
        }

        let mut delta = frame - self.last_position();
        if delta < 0 {
            return false;
        }
        while delta > MAX_RECORD_DELTA as i32 {
            if !self.push(pack_record(MAX_RECORD_DELTA, prev_accel, Rotation::None)) {
                return false;
            }
            delta -= MAX_RECORD_DELTA as i32;
        }
        self.push(pack_record(delta as u16, accel, rotation))
    }

    fn push(&mut self, update: u16) -> bool {
        if self.is_full() {
            return false;
        }
        self.updates.push(update);
        true
    }

    /// Rewind support: end the proof at `frame` and drop every record
    /// positioned at or after it.
    pub fn truncate(&mut self, frame: u16) {
        self.num_frames = frame;
        let keep = self
            .records()
            .take_while(|r| r.position < frame as i32)
            .count();
        self.updates.truncate(keep);
    }
}

pub struct Records<'a> {
    updates: core::slice::Iter<'a, u16>,
    position: i32,
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let &update = self.updates.next()?;
        let delta = update / RECORD_UNIT;
        self.position += delta as i32;
        Some(Record {
            position: self.position,
            delta,
            accel: Accel::from_code(update),
            rotation: Rotation::from_code((update % RECORD_UNIT) / 4),
        })
    }
}
