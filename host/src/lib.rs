//! Motoplay host: nonce search, proof-line verification and scripted demo
//! runs on top of `motoplay-core`.

pub mod config;
pub mod constgen;

use anyhow::{anyhow, bail, Context, Result};
use motoplay_core::constants::MAX_FRAMES;
use motoplay_core::{
    decode_line, encode_line, Accel, MathTables, Message, MotoState, ProofOfPlay, Rotation, Rules,
    Session, StepResult, VerificationJournal, Verifier, WorkUnit, World, WorldGenerator,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct MineOptions {
    pub start_nonce: u32,
    pub max_attempts: u32,
    pub rules: Rules,
}

impl Default for MineOptions {
    fn default() -> Self {
        Self {
            start_nonce: config::DEFAULT_START_NONCE,
            max_attempts: config::DEFAULT_MAX_NONCE_ATTEMPTS,
            rules: Rules::STANDARD,
        }
    }
}

impl From<&config::HostConfig> for MineOptions {
    fn from(config: &config::HostConfig) -> Self {
        Self {
            start_nonce: config.start_nonce,
            max_attempts: config.max_nonce_attempts,
            rules: config.rules(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MinedWorld {
    pub nonce: u32,
    pub attempts: u32,
    pub world: World,
    pub state: MotoState,
}

/// Try nonces from `opts.start_nonce` until one yields a playable world.
///
/// `cancel` is polled before every attempt. Returns `Ok(None)` when the
/// search is cancelled or runs out of attempts.
pub fn mine(
    tables: &MathTables,
    work: &WorkUnit,
    opts: &MineOptions,
    mut cancel: impl FnMut() -> bool,
) -> Result<Option<MinedWorld>> {
    if opts.max_attempts == 0 {
        bail!("nonce search needs at least one attempt");
    }
    let generator = WorldGenerator::new(tables).with_rules(opts.rules);

    for attempt in 0..opts.max_attempts {
        if cancel() {
            tracing::info!(attempts = attempt, "nonce search cancelled");
            return Ok(None);
        }
        let nonce = opts.start_nonce.wrapping_add(attempt);
        match generator.generate(&work.block, nonce) {
            Ok((world, state)) => {
                tracing::info!(nonce, attempts = attempt + 1, "found playable world");
                return Ok(Some(MinedWorld {
                    nonce,
                    attempts: attempt + 1,
                    world,
                    state,
                }));
            }
            Err(rejection) => tracing::debug!(nonce, %rejection, "world rejected"),
        }
    }

    tracing::warn!(
        start_nonce = opts.start_nonce,
        attempts = opts.max_attempts,
        "nonce search exhausted"
    );
    Ok(None)
}

/// Decode a `***WPoW:` line and verify the proof it carries.
pub fn verify_line(tables: &MathTables, line: &str, rules: Rules) -> Result<VerificationJournal> {
    let message = decode_line(line).context("failed to decode proof line")?;
    let Message::WorkAndProof(work, proof) = message else {
        bail!("expected a work-and-proof line");
    };
    let verifier = Verifier::new(tables).with_rules(rules);
    match verifier.verify(&work, &proof) {
        Ok(journal) => {
            tracing::info!(
                nonce = journal.nonce,
                frames = journal.frames,
                updates = journal.updates,
                "proof accepted"
            );
            Ok(journal)
        }
        Err(err) => {
            tracing::warn!(nonce = proof.nonce, frames = proof.num_frames, %err, "proof rejected");
            Err(anyhow!(err).context("proof rejected"))
        }
    }
}

/// One scripted control in a demo run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoStep {
    Advance {
        accel: Accel,
        #[serde(default)]
        rotation: Rotation,
        frames: u32,
    },
    Rewind {
        frame: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoScript {
    /// Mined when absent.
    #[serde(default)]
    pub nonce: Option<u32>,
    pub steps: Vec<DemoStep>,
}

impl DemoScript {
    /// Hold Idle until something happens.
    pub fn idle() -> Self {
        Self {
            nonce: None,
            steps: vec![DemoStep::Advance {
                accel: Accel::Idle,
                rotation: Rotation::None,
                frames: MAX_FRAMES as u32,
            }],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid demo script json")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoOutcome {
    pub nonce: u32,
    pub result: StepResult,
    pub frame: i32,
    pub proof: ProofOfPlay,
    /// The submission line, present only for a verified finish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
}

pub fn run_demo(
    tables: &MathTables,
    work: &WorkUnit,
    script: &DemoScript,
    opts: &MineOptions,
) -> Result<DemoOutcome> {
    let nonce = match script.nonce {
        Some(nonce) => nonce,
        None => {
            mine(tables, work, opts, || false)?
                .ok_or_else(|| anyhow!("no playable world within {} nonces", opts.max_attempts))?
                .nonce
        }
    };
    let generator = WorldGenerator::new(tables).with_rules(opts.rules);
    let mut session = Session::start(&generator, work, nonce)
        .map_err(|rejection| anyhow!("nonce {nonce} has no playable world: {rejection}"))?;

    let mut result = StepResult::Continue;
    for (index, step) in script.steps.iter().enumerate() {
        match *step {
            DemoStep::Advance {
                accel,
                rotation,
                frames,
            } => {
                result = session.advance(accel, rotation, frames);
                tracing::debug!(index, frame = session.state().frame, ?result, "advanced");
            }
            DemoStep::Rewind { frame } => {
                session
                    .rewind(frame)
                    .map_err(|err| anyhow!(err))
                    .with_context(|| format!("rewind to frame {frame} failed"))?;
                result = StepResult::Continue;
                tracing::debug!(index, frame = session.state().frame, "rewound");
            }
        }
        if result == StepResult::Success {
            break;
        }
    }

    let frame = session.state().frame;
    let proof = session.into_proof();
    tracing::info!(nonce, frame, ?result, updates = proof.num_updates(), "demo finished");

    let line = if result == StepResult::Success {
        let message = Message::WorkAndProof(work.clone(), proof.clone());
        let line = encode_line(&message);
        verify_line(tables, &line, opts.rules).context("demo proof failed self-check")?;
        Some(line)
    } else {
        None
    };

    Ok(DemoOutcome {
        nonce,
        result,
        frame,
        proof,
        line,
    })
}
