// crates/porep-bench/src/lib.rs

//! porep-bench: two-phase driver for the commit/challenge/verify benchmark.
//!
//! - [`cli`]: argument parsing and usage handling.
//! - [`measure`]: per-step wall-clock timing and the JSON report each phase writes.
//! - [`config`]: run configuration layered from TOML, environment and flags.
//! - [`phase`]: [`commit_phase`] (`step1`) and [`prove_phase`] (`step2`),
//!   bridged by a [`porep_store::KvStore`] snapshot, plus exit-code mapping.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod measure;
pub mod phase;

pub use cli::{interpret, Cli, Command};
pub use config::BenchConfig;
pub use measure::{Report, StepCost, StepMeasure};
pub use phase::{
    commit_phase, exit_code, failure_exit, prove_phase, resolve_proof_type, CommitOutcome, Phase,
    ProofRejected, ProveOutcome,
};
