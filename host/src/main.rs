use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use motoplay_core::{decode_line, MathTables, Message, WorkUnit};
use motoplay_host::config::HostConfig;
use motoplay_host::constgen::derive_constants;
use motoplay_host::{mine, run_demo, verify_line, DemoScript, MineOptions};

#[derive(Parser, Debug)]
#[command(name = "motoplay")]
#[command(about = "Generate, play and verify Motocoin proof-of-play courses")]
struct Cli {
    /// Use the flat test course instead of the standard rules
    #[arg(long, global = true)]
    test_mode: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify `***WPoW:` lines (from --line, or one per line on stdin)
    Verify {
        #[arg(long)]
        line: Option<String>,
    },
    /// Search for a nonce that yields a playable course
    Mine {
        /// `***Work:` or `***GetWork:` line; zero work when absent
        #[arg(long)]
        work: Option<String>,
        #[arg(long)]
        start_nonce: Option<u32>,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Play a scripted run (idle when no script is given) and print the result
    Demo {
        #[arg(long)]
        work: Option<String>,
        /// JSON demo script
        #[arg(long)]
        script: Option<PathBuf>,
        #[arg(long)]
        start_nonce: Option<u32>,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Re-derive the physics constants and compare them with the built-in ones
    Constants,
}

fn parse_work(line: Option<&str>) -> Result<WorkUnit> {
    let Some(line) = line else {
        return Ok(WorkUnit::default());
    };
    match decode_line(line).context("failed to decode work line")? {
        Message::Work(work) | Message::GetWork(work) => Ok(work),
        Message::WorkAndProof(work, _) => Ok(work),
    }
}

fn mine_options(
    config: &HostConfig,
    start_nonce: Option<u32>,
    max_attempts: Option<u32>,
) -> MineOptions {
    let mut opts = MineOptions::from(config);
    if let Some(start_nonce) = start_nonce {
        opts.start_nonce = start_nonce;
    }
    if let Some(max_attempts) = max_attempts {
        opts.max_attempts = max_attempts;
    }
    opts
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = HostConfig::from_env();
    config.test_mode |= cli.test_mode;
    let tables = MathTables::shared();

    match cli.command {
        Commands::Verify { line } => {
            let lines = match line {
                Some(line) => vec![line],
                None => io::stdin()
                    .lock()
                    .lines()
                    .collect::<io::Result<Vec<_>>>()
                    .context("failed to read stdin")?
                    .into_iter()
                    .filter(|line| line.trim_start().starts_with("***WPoW:"))
                    .collect(),
            };
            if lines.is_empty() {
                bail!("no proof lines to verify");
            }

            let mut rejected = 0usize;
            for line in &lines {
                match verify_line(tables, line, config.rules()) {
                    Ok(journal) => println!(
                        "{}",
                        serde_json::to_string(&journal).context("failed to serialize journal")?
                    ),
                    Err(err) => {
                        rejected += 1;
                        eprintln!("REJECTED: {err:#}");
                    }
                }
            }
            if rejected > 0 {
                bail!("{rejected} of {} proofs rejected", lines.len());
            }
        }
        Commands::Mine {
            work,
            start_nonce,
            max_attempts,
        } => {
            let work = parse_work(work.as_deref())?;
            let opts = mine_options(&config, start_nonce, max_attempts);
            match mine(tables, &work, &opts, || false)? {
                Some(mined) => {
                    println!("Playable course found.");
                    println!("  Nonce:     {}", mined.nonce);
                    println!("  Attempts:  {}", mined.attempts);
                    println!("  Finish:    {:?}", mined.world.finish);
                }
                None => bail!(
                    "no playable course in {} nonces from {}",
                    opts.max_attempts,
                    opts.start_nonce
                ),
            }
        }
        Commands::Demo {
            work,
            script,
            start_nonce,
            max_attempts,
        } => {
            let work = parse_work(work.as_deref())?;
            let script = match script {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read script: {}", path.display()))?;
                    DemoScript::from_json(&json)?
                }
                None => DemoScript::idle(),
            };
            let opts = mine_options(&config, start_nonce, max_attempts);
            let outcome = run_demo(tables, &work, &script, &opts)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("failed to serialize outcome")?
            );
            if let Some(line) = outcome.line {
                println!();
                println!("{line}");
            }
        }
        Commands::Constants => {
            let rows = derive_constants();
            for row in &rows {
                let mark = if row.matches() { "ok" } else { "MISMATCH" };
                println!(
                    "  {:<28} {:>20} {:>20}  {mark}",
                    row.name, row.derived, row.contract
                );
            }
            let mismatched = rows.iter().filter(|row| !row.matches()).count();
            if mismatched > 0 {
                bail!("{mismatched} derived constants differ from the built-in values");
            }
        }
    }

    Ok(())
}
