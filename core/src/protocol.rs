//! Binary layouts and the text lines that carry them.
//!
//! Layout (little-endian):
//!   WORK UNIT (212 bytes): is_new(u16) time_target(i16) height(i32)
//!                          message(128) block(76)
//!   PROOF (128 bytes): nonce(u32) num_frames(u16) num_updates(u16)
//!                      updates(60 x u16, unused slots zero)
//!
//! Lines are a literal tag followed by lower-case hex of the record bytes in
//! order. Characters after the expected payload are ignored.

use alloc::string::String;
use alloc::vec::Vec;

use crate::constants::{DEFAULT_TIME_TARGET, MAX_INPUTS, WORK_SIZE};
use crate::error::ProtocolError;
use crate::pow::ProofOfPlay;

pub const WORK_UNIT_BYTES: usize = 212;
pub const PROOF_BYTES: usize = 8 + 2 * MAX_INPUTS;
pub const MESSAGE_BYTES: usize = 128;
pub const HEADER_BYTES: usize = 80;

pub const TAG_WORK: &str = "***Work:";
pub const TAG_WORK_AND_PROOF: &str = "***WPoW:";
pub const TAG_GET_WORK: &str = "***GetWork:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkUnit {
    /// Set when all earlier work is stale.
    pub is_new: u16,
    pub time_target: i16,
    pub height: i32,
    pub message: [u8; MESSAGE_BYTES],
    pub block: [u8; WORK_SIZE],
}

impl Default for WorkUnit {
    fn default() -> Self {
        Self {
            is_new: 0,
            time_target: DEFAULT_TIME_TARGET,
            height: 0,
            message: [0; MESSAGE_BYTES],
            block: [0; WORK_SIZE],
        }
    }
}

impl WorkUnit {
    pub fn with_block(block: [u8; WORK_SIZE]) -> Self {
        Self {
            block,
            ..Self::default()
        }
    }

    /// Message text up to the first NUL, lossy on invalid UTF-8.
    pub fn message_text(&self) -> String {
        let end = self
            .message
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MESSAGE_BYTES);
        String::from_utf8_lossy(&self.message[..end]).into_owned()
    }

    /// Store `text`, truncated to leave room for a terminating NUL.
    pub fn set_message(&mut self, text: &str) {
        self.message = [0; MESSAGE_BYTES];
        let len = text.len().min(MESSAGE_BYTES - 1);
        self.message[..len].copy_from_slice(&text.as_bytes()[..len]);
    }

    pub fn to_bytes(&self) -> [u8; WORK_UNIT_BYTES] {
        let mut out = [0u8; WORK_UNIT_BYTES];
        out[0..2].copy_from_slice(&self.is_new.to_le_bytes());
        out[2..4].copy_from_slice(&self.time_target.to_le_bytes());
        out[4..8].copy_from_slice(&self.height.to_le_bytes());
        out[8..8 + MESSAGE_BYTES].copy_from_slice(&self.message);
        out[8 + MESSAGE_BYTES..].copy_from_slice(&self.block);
        out
    }

    pub fn from_bytes(bytes: &[u8; WORK_UNIT_BYTES]) -> Self {
        let mut message = [0u8; MESSAGE_BYTES];
        message.copy_from_slice(&bytes[8..8 + MESSAGE_BYTES]);
        let mut block = [0u8; WORK_SIZE];
        block.copy_from_slice(&bytes[8 + MESSAGE_BYTES..]);
        Self {
            is_new: u16::from_le_bytes([bytes[0], bytes[1]]),
            time_target: i16::from_le_bytes([bytes[2], bytes[3]]),
            height: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            message,
            block,
        }
    }

    /// Work from an 80-byte block header whose 32-bit words arrive
    /// byte-reversed. Only the first 76 bytes are kept.
    pub fn from_header(header: &[u8; HEADER_BYTES]) -> Self {
        let mut swapped = [0u8; HEADER_BYTES];
        for (dst, src) in swapped.chunks_exact_mut(4).zip(header.chunks_exact(4)) {
            dst.copy_from_slice(&[src[3], src[2], src[1], src[0]]);
        }
        let mut block = [0u8; WORK_SIZE];
        block.copy_from_slice(&swapped[..WORK_SIZE]);
        Self::with_block(block)
    }

    /// Inverse of `from_header`; the trailing nonce word is zero.
    pub fn to_header(&self) -> [u8; HEADER_BYTES] {
        let mut plain = [0u8; HEADER_BYTES];
        plain[..WORK_SIZE].copy_from_slice(&self.block);
        let mut header = [0u8; HEADER_BYTES];
        for (dst, src) in header.chunks_exact_mut(4).zip(plain.chunks_exact(4)) {
            dst.copy_from_slice(&[src[3], src[2], src[1], src[0]]);
        }
        header
    }
}

impl ProofOfPlay {
    pub fn to_bytes(&self) -> [u8; PROOF_BYTES] {
        let mut out = [0u8; PROOF_BYTES];
        out[0..4].copy_from_slice(&self.nonce.to_le_bytes());
        out[4..6].copy_from_slice(&self.num_frames.to_le_bytes());
        let count = self.num_updates().min(MAX_INPUTS);
        out[6..8].copy_from_slice(&(count as u16).to_le_bytes());
        for (slot, update) in out[8..].chunks_exact_mut(2).zip(self.updates()) {
            slot.copy_from_slice(&update.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; PROOF_BYTES]) -> Result<Self, ProtocolError> {
        let count = u16::from_le_bytes([bytes[6], bytes[7]]);
        if count as usize > MAX_INPUTS {
            return Err(ProtocolError::TooManyUpdates { count });
        }
        let updates: Vec<u16> = bytes[8..]
            .chunks_exact(2)
            .take(count as usize)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        Ok(ProofOfPlay::from_parts(
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u16::from_le_bytes([bytes[4], bytes[5]]),
            updates,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Work(WorkUnit),
    WorkAndProof(WorkUnit, ProofOfPlay),
    GetWork(WorkUnit),
}

pub fn encode_line(message: &Message) -> String {
    let mut line = String::new();
    match message {
        Message::Work(work) => {
            line.push_str(TAG_WORK);
            line.push_str(&hex::encode(work.to_bytes()));
        }
        Message::WorkAndProof(work, proof) => {
            line.push_str(TAG_WORK_AND_PROOF);
            line.push_str(&hex::encode(work.to_bytes()));
            line.push_str(&hex::encode(proof.to_bytes()));
        }
        Message::GetWork(work) => {
            line.push_str(TAG_GET_WORK);
            line.push_str(&hex::encode(work.to_header()));
        }
    }
    line
}

/// Parse one line. Surrounding whitespace is ignored.
pub fn decode_line(line: &str) -> Result<Message, ProtocolError> {
    let line = line.trim();
    if let Some(payload) = line.strip_prefix(TAG_WORK_AND_PROOF) {
        let mut reader = HexReader::new(payload.as_bytes());
        let work = WorkUnit::from_bytes(&reader.read::<WORK_UNIT_BYTES>()?);
        let proof = ProofOfPlay::from_bytes(&reader.read::<PROOF_BYTES>()?)?;
        Ok(Message::WorkAndProof(work, proof))
    } else if let Some(payload) = line.strip_prefix(TAG_WORK) {
        let mut reader = HexReader::new(payload.as_bytes());
        Ok(Message::Work(WorkUnit::from_bytes(&reader.read::<WORK_UNIT_BYTES>()?)))
    } else if let Some(payload) = line.strip_prefix(TAG_GET_WORK) {
        let mut reader = HexReader::new(payload.as_bytes());
        Ok(Message::GetWork(WorkUnit::from_header(&reader.read::<HEADER_BYTES>()?)))
    } else {
        Err(ProtocolError::UnknownTag)
    }
}

struct HexReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> HexReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let end = self.offset + 2 * N;
        if self.data.len() < end {
            return Err(ProtocolError::Truncated {
                expected: end,
                got: self.data.len(),
            });
        }
        let mut out = [0u8; N];
        hex::decode_to_slice(&self.data[self.offset..end], &mut out)
            .map_err(|_| ProtocolError::InvalidHex)?;
        self.offset = end;
        Ok(out)
    }
}
