// crates/porep-bench/src/phase.rs

//! The two benchmark phases and their failure classes.
//!
//! Phase 1 (`step1`) seals a sector of synthetic data, commits to it and
//! snapshots both parties into the store. Phase 2 (`step2`) runs in a later
//! process: it restores the snapshot, challenges, proves and verifies. Phase 2
//! only reads the store.
//!
//! ⚠️ Phase 1 deletes and recreates the working directory.

use crate::config::BenchConfig;
use crate::measure::Report;
use anyhow::{bail, ensure, Context, Result};
use porep_core::{ActorId, ProofType, ProtocolError, StatementId, Validator};
use porep_seal::synthetic::create_fake_data_file;
use porep_seal::{Miner, MockSeal};
use porep_store::{snapshot, KvStore, StoreError};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info, warn};

/// Written into a working directory phase 1 created; its presence allows the next wipe.
pub const MARKER_FILE: &str = ".porep-bench";
/// Synthetic input piece inside the working directory.
pub const PIECE_FILE: &str = "fakepiece.dat";

/// Exit status of any failure without a more specific class.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status when the verifier rejects the proof.
pub const EXIT_REJECTED: u8 = 65;
/// Exit status of a protocol precondition violation (a driver bug).
pub const EXIT_PRECONDITION: u8 = 70;
/// Exit status when the store cannot be read or written.
pub const EXIT_STORE: u8 = 74;

/// One of the two process lifetimes of a benchmark run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// `step1`: seal and commit.
    Commit,
    /// `step2`: challenge, prove, verify.
    Prove,
}

impl Phase {
    /// Command-line selector.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Commit => "step1",
            Self::Prove => "step2",
        }
    }

    /// Parse a selector; matching is exact.
    #[must_use]
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "step1" => Some(Self::Commit),
            "step2" => Some(Self::Prove),
            _ => None,
        }
    }
}

/// Proof type for a command-line label, falling back to the smallest with a warning.
#[must_use]
pub fn resolve_proof_type(label: &str) -> ProofType {
    ProofType::from_label(label).unwrap_or_else(|| {
        let fallback = ProofType::StackedDrg2KiBV1;
        warn!(label, fallback = fallback.label(), "unknown proof type, using the smallest");
        fallback
    })
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The verifier returned `false`. The run is invalid and no report is written.
#[derive(Debug, Error)]
#[error("proof for statement {statement} was rejected by the verifier")]
pub struct ProofRejected {
    /// Statement the rejected proof was for.
    pub statement: StatementId,
}

/// Map a failure to the process exit status.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ProtocolError>() {
            if e.is_precondition() {
                return EXIT_PRECONDITION;
            }
        } else if cause.is::<StoreError>() {
            return EXIT_STORE;
        } else if cause.is::<ProofRejected>() {
            return EXIT_REJECTED;
        }
    }
    EXIT_FAILURE
}

/// Report `err` once, with its cause chain, and turn it into the process status.
#[must_use]
pub fn failure_exit(err: &anyhow::Error) -> ExitCode {
    let code = exit_code(err);
    error!(code, "{err:#}");
    ExitCode::from(code)
}

/// Label reports carry: the working directory's last component.
#[must_use]
pub fn run_label(work_dir: &Path) -> String {
    work_dir
        .file_name()
        .map_or_else(|| "run".to_owned(), |n| n.to_string_lossy().into_owned())
}

/// Delete and recreate `dir`, then mark it as a benchmark directory.
///
/// An existing non-empty directory without [`MARKER_FILE`] is only wiped when
/// `force` is set.
pub fn prepare_work_dir(dir: &Path, force: bool) -> Result<()> {
    if dir.exists() {
        ensure!(dir.is_dir(), "{} exists and is not a directory", dir.display());
        let marked = dir.join(MARKER_FILE).exists();
        let empty = fs::read_dir(dir)
            .with_context(|| format!("listing {}", dir.display()))?
            .next()
            .is_none();
        if !marked && !empty && !force {
            bail!(
                "refusing to wipe {}: it was not created by a previous run (no {MARKER_FILE}); use --force",
                dir.display()
            );
        }
        warn!(dir = %dir.display(), marked, "wiping working directory");
        fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    fs::write(dir.join(MARKER_FILE), b"").with_context(|| format!("marking {}", dir.display()))?;
    Ok(())
}

/// Refuse a store directory inside the working directory phase 1 is about to wipe.
pub fn ensure_store_outside(work_dir: &Path, store_dir: &Path) -> Result<()> {
    let (Ok(work), Ok(store)) = (fs::canonicalize(work_dir), fs::canonicalize(store_dir)) else {
        return Ok(());
    };
    ensure!(
        !store.starts_with(&work),
        "store {} lies inside working directory {}, which phase 1 wipes",
        store_dir.display(),
        work_dir.display()
    );
    Ok(())
}

/// Result of phase 1.
#[derive(Debug)]
pub struct CommitOutcome {
    /// Id of the committed statement.
    pub statement_id: StatementId,
    /// Miner that sealed the sector.
    pub miner_id: ActorId,
    /// Timings of `Assemble` and `Setup`.
    pub report: Report,
    /// Where the report was written.
    pub report_path: PathBuf,
}

/// Result of a phase 2 whose proof verified.
#[derive(Debug)]
pub struct ProveOutcome {
    /// Statement that was challenged.
    pub statement_id: StatementId,
    /// Verifier verdict; always `true` on success.
    pub valid: bool,
    /// Proof size in bytes.
    pub proof_len: usize,
    /// Timings of `Prove` and `Verify`.
    pub report: Report,
    /// Where the report was written.
    pub report_path: PathBuf,
}

/// Phase 1: seal one sector in `work_dir`, commit to it and snapshot both parties.
///
/// Everything is written to `store` and committed with one flush at the end;
/// on error nothing is flushed and the store's previous image stays in place.
pub fn commit_phase<S: KvStore + ?Sized>(
    store: &mut S,
    work_dir: &Path,
    proof_type: ProofType,
    cfg: &BenchConfig,
) -> Result<CommitOutcome> {
    info!(phase = %Phase::Commit, work_dir = %work_dir.display(), %proof_type, "phase starting");
    snapshot::clear(store).context("clearing previous run from the store")?;
    prepare_work_dir(work_dir, cfg.force)?;

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::try_from_os_rng().context("seeding random source")?,
    };

    let piece = work_dir.join(PIECE_FILE);
    create_fake_data_file(&piece, proof_type.unpadded_space(), &mut rng)?;

    let mut report = Report::new(run_label(work_dir), proof_type, Phase::Commit.name());
    let miner_id = cfg
        .miner_id
        .unwrap_or_else(|| rng.random_range(1000..1_000_000));
    let mut validator = Validator::new();
    let mut miner = Miner::new(miner_id, proof_type);
    miner.pledge(&mut validator);

    let pieces = report.time("Assemble", || -> Result<_> {
        let paths = miner.init_sector_dir(work_dir)?;
        miner.assemble_pieces(&paths, std::slice::from_ref(&piece))
    })?;

    let mut id = [0u8; 32];
    rng.fill_bytes(&mut id);
    let statement_id = StatementId::new(id);
    let nonce = rng.next_u64();
    let statement = report.time("Setup", || {
        miner.commit_statement(statement_id, nonce, work_dir, pieces)
    })?;

    validator.handle_statement(statement)?;
    let report_path = report.dump(&cfg.report_dir_for(work_dir))?;

    snapshot::save(store, &miner, &validator).context("saving snapshot")?;
    store.flush().context("committing snapshot")?;

    info!(phase = %Phase::Commit, statement = %statement_id, miner = miner_id, "phase complete");
    Ok(CommitOutcome {
        statement_id,
        miner_id,
        report,
        report_path,
    })
}

/// Phase 2: restore the snapshot, then challenge, prove and verify.
///
/// A proof the verifier rejects fails with [`ProofRejected`] before any report is written.
pub fn prove_phase<S: KvStore + ?Sized>(
    store: &S,
    work_dir: &Path,
    proof_type: ProofType,
    cfg: &BenchConfig,
) -> Result<ProveOutcome> {
    info!(phase = %Phase::Prove, work_dir = %work_dir.display(), %proof_type, "phase starting");
    let (miner, mut validator) = snapshot::restore(store).context("restoring phase 1 snapshot")?;
    let statement_id = validator
        .statement()
        .map(|s| s.id)
        .ok_or(ProtocolError::MissingStatement { op: "prove_phase" })?;
    info!(statement = %statement_id, miner = miner.id(), "snapshot restored");
    if miner.proof_type() != proof_type {
        warn!(
            committed = %miner.proof_type(),
            requested = %proof_type,
            "proof type differs from the one phase 1 committed to"
        );
    }

    let mut report = Report::new(run_label(work_dir), proof_type, Phase::Prove.name());
    let challenge = *validator.generate_challenge()?;
    let proof = report.time("Prove", || miner.answer_challenge(&challenge))?;
    let valid = report.time("Verify", || validator.verify_proof::<MockSeal>(&proof))?;
    if !valid {
        return Err(ProofRejected {
            statement: statement_id,
        }
        .into());
    }

    let report_path = report.dump(&cfg.report_dir_for(work_dir))?;
    info!(phase = %Phase::Prove, statement = %statement_id, valid, "phase complete");
    Ok(ProveOutcome {
        statement_id,
        valid,
        proof_len: proof.len(),
        report,
        report_path,
    })
}
