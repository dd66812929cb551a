// crates/porep-bench/src/cli.rs

//! Command-line surface.
//!
//! Three positionals select a run: working directory, proof-type label and
//! phase. A missing positional or an unknown phase prints usage and exits
//! successfully; `--help`, `--version` and malformed flags go through clap.

use crate::config::BenchConfig;
use crate::phase::{resolve_proof_type, Phase};
use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use porep_core::ProofType;
use std::ffi::OsString;
use std::path::PathBuf;

/// Parsed arguments.
#[derive(Parser, Debug)]
#[command(
    name = "porep-bench",
    about = "PoRep commit/challenge/verify benchmark",
    long_about = "PoRep commit/challenge/verify benchmark.\n\n\
                  Run `step1` to seal and commit a sector of synthetic data, then `step2` in a later \
                  process to challenge, prove and verify it. State is carried between the two in the \
                  store directory.\n\n\
                  WARNING: step1 deletes and recreates WORK_DIR.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Working directory for sector files and reports (wiped by step1)
    pub work_dir: PathBuf,

    /// Proof type label: 2K, 8M, 512M or 32G
    pub proof_type: String,

    /// Phase to run: step1 or step2
    pub phase: String,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides config and POREP_BENCH_STORE)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Seed for phase 1's random source
    #[arg(long)]
    pub seed: Option<u64>,

    /// Wipe WORK_DIR even if a previous run did not create it
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

impl Cli {
    /// Layer the config file, then the environment, then these flags.
    pub fn load_config(&self) -> Result<BenchConfig> {
        let mut cfg = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };
        cfg.apply_env();
        if let Some(store) = &self.store {
            cfg.store_path.clone_from(store);
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        cfg.force |= self.force;
        Ok(cfg)
    }
}

/// What the process does with its arguments.
#[derive(Debug)]
pub enum Command {
    /// Run one phase.
    Run {
        /// Parsed arguments.
        args: Cli,
        /// Selected phase.
        phase: Phase,
        /// Resolved proof type.
        proof_type: ProofType,
    },
    /// Print this text and exit successfully.
    Usage(String),
}

/// One-line usage string.
#[must_use]
pub fn usage() -> String {
    Cli::command().render_usage().to_string()
}

/// Interpret `argv` (program name first).
///
/// Returns `Err` only for what clap should report itself: help, version and
/// malformed flag values.
pub fn interpret<I, T>(argv: I) -> Result<Command, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Cli::try_parse_from(argv) {
        Ok(args) => args,
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::MissingRequiredArgument | ErrorKind::UnknownArgument
            ) =>
        {
            return Ok(Command::Usage(e.to_string()));
        }
        Err(e) => return Err(e),
    };
    let Some(phase) = Phase::from_arg(&args.phase) else {
        return Ok(Command::Usage(format!(
            "unknown phase {:?}\n{}",
            args.phase,
            usage()
        )));
    };
    let proof_type = resolve_proof_type(&args.proof_type);
    Ok(Command::Run {
        args,
        phase,
        proof_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(argv: &[&str]) -> (Cli, Phase, ProofType) {
        match interpret(argv.iter().copied()).unwrap() {
            Command::Run {
                args,
                phase,
                proof_type,
            } => (args, phase, proof_type),
            Command::Usage(text) => panic!("expected a run, got usage:\n{text}"),
        }
    }

    fn usage_text(argv: &[&str]) -> String {
        match interpret(argv.iter().copied()).unwrap() {
            Command::Usage(text) => text,
            other => panic!("expected usage, got {other:?}"),
        }
    }

    #[test]
    fn positionals_and_flags_parse() {
        let (args, phase, proof_type) = run(&[
            "porep-bench",
            "/tmp/w",
            "512M",
            "step2",
            "--store",
            "/tmp/db",
            "--seed",
            "7",
            "--force",
        ]);
        assert_eq!(phase, Phase::Prove);
        assert_eq!(proof_type, ProofType::StackedDrg512MiBV1);
        assert_eq!(args.work_dir, PathBuf::from("/tmp/w"));
        assert_eq!(args.store, Some(PathBuf::from("/tmp/db")));
        assert_eq!(args.seed, Some(7));
        assert!(args.force);
        assert!(args.config.is_none());
    }

    #[test]
    fn unknown_proof_label_runs_the_smallest() {
        let (_, phase, proof_type) = run(&["porep-bench", "/tmp/w", "64G", "step1"]);
        assert_eq!(phase, Phase::Commit);
        assert_eq!(proof_type, ProofType::StackedDrg2KiBV1);
    }

    #[test]
    fn unknown_phase_prints_usage() {
        let text = usage_text(&["porep-bench", "/tmp/w", "2K", "step9"]);
        assert!(text.starts_with("unknown phase \"step9\""));
        assert!(text.contains("Usage:"));
        usage_text(&["porep-bench", "/tmp/w", "2K", "STEP1"]);
    }

    #[test]
    fn missing_or_extra_positionals_print_usage() {
        usage_text(&["porep-bench"]);
        usage_text(&["porep-bench", "/tmp/w", "2K"]);
        usage_text(&["porep-bench", "/tmp/w", "2K", "step1", "extra"]);
    }

    #[test]
    fn help_and_bad_flag_values_stay_with_clap() {
        let help = interpret(["porep-bench", "--help"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);

        let bad = interpret(["porep-bench", "/tmp/w", "2K", "step1", "--seed", "x"]).unwrap_err();
        assert_eq!(bad.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn flags_override_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg_path = tmp.path().join("bench.toml");
        std::fs::write(&cfg_path, "store_path = \"/from/file\"\nseed = 1\n").unwrap();
        let cfg_arg = cfg_path.to_str().unwrap();

        let (args, _, _) = run(&[
            "porep-bench",
            "/tmp/w",
            "2K",
            "step1",
            "--config",
            cfg_arg,
            "--seed",
            "9",
        ]);
        let cfg = args.load_config().unwrap();
        assert_eq!(cfg.seed, Some(9));
    }
}
