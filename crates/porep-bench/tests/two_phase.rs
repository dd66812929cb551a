//! Phase 1 then phase 2 through a durable store, as two separate store handles.

#![deny(rust_2018_idioms)]

use porep_bench::phase::{EXIT_PRECONDITION, EXIT_STORE, MARKER_FILE, PIECE_FILE};
use porep_bench::{commit_phase, exit_code, prove_phase, BenchConfig};
use porep_core::ProofType;
use porep_store::{snapshot, FileStore, KvStore, StoreError, STORE_FILE};
use std::fs;
use std::path::{Path, PathBuf};

struct Bench {
    _tmp: tempfile::TempDir,
    work: PathBuf,
    cfg: BenchConfig,
}

fn bench() -> Bench {
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("run-a");
    let cfg = BenchConfig {
        store_path: tmp.path().join("db"),
        seed: Some(7),
        miner_id: Some(1000),
        ..BenchConfig::default()
    };
    Bench {
        _tmp: tmp,
        work,
        cfg,
    }
}

fn phase1(b: &Bench) -> porep_bench::CommitOutcome {
    let mut store = FileStore::open(&b.cfg.store_path).unwrap();
    let out = commit_phase(&mut store, &b.work, ProofType::StackedDrg2KiBV1, &b.cfg).unwrap();
    store.close().unwrap();
    out
}

fn report_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn scenario_a_commit_populates_store() {
    let b = bench();
    let out = phase1(&b);

    assert!(b.work.join(MARKER_FILE).exists());
    assert_eq!(
        fs::metadata(b.work.join(PIECE_FILE)).unwrap().len(),
        ProofType::StackedDrg2KiBV1.unpadded_space()
    );

    let store = FileStore::open(&b.cfg.store_path).unwrap();
    let inv = snapshot::inventory(&store).unwrap();
    assert_eq!(inv.validators, 1);
    assert_eq!(inv.miners, 1);
    assert!(inv.files >= 1);
    assert_eq!(inv.statements, 1);

    assert_eq!(out.report.step_names(), ["Assemble", "Setup"]);
    assert_eq!(out.report_path, b.work.join("report-run-a-2KiB-step1.json"));
    let json = report_json(&out.report_path);
    assert_eq!(json["detail"], "run-a");
    assert_eq!(json["sector_size"], "2KiB");
    assert_eq!(json["steps"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["steps"][1]["name"], "Setup");
}

#[test]
fn scenario_b_prove_restores_the_committed_statement() {
    let b = bench();
    let committed = phase1(&b);
    let image = fs::read(b.cfg.store_path.join(STORE_FILE)).unwrap();

    let store = FileStore::open(&b.cfg.store_path).unwrap();
    let out = prove_phase(&store, &b.work, ProofType::StackedDrg2KiBV1, &b.cfg).unwrap();
    assert!(!store.is_dirty());
    store.close().unwrap();

    assert_eq!(out.statement_id, committed.statement_id);
    assert_eq!(out.statement_id.as_bytes(), committed.statement_id.as_bytes());
    assert!(out.valid);
    assert_eq!(out.proof_len, porep_seal::PROOF_LEN);
    assert_eq!(out.report.step_names(), ["Prove", "Verify"]);
    assert!(out.report_path.ends_with("report-run-a-2KiB-step2.json"));
    assert_eq!(report_json(&out.report_path)["steps"][0]["name"], "Prove");

    // phase 2 only consumes the snapshot
    assert_eq!(fs::read(b.cfg.store_path.join(STORE_FILE)).unwrap(), image);
}

#[test]
fn prove_against_unpopulated_store_fails_fast() {
    let b = bench();
    fs::create_dir_all(&b.work).unwrap();
    let store = FileStore::open(&b.cfg.store_path).unwrap();

    let err = prove_phase(&store, &b.work, ProofType::StackedDrg2KiBV1, &b.cfg).unwrap_err();
    assert!(matches!(
        err.chain().find_map(|c| c.downcast_ref::<StoreError>()),
        Some(StoreError::MissingRecord("validator"))
    ));
    assert!(format!("{err:#}").contains("restoring phase 1 snapshot"));
    assert_eq!(exit_code(&err), EXIT_STORE);
    assert!(!b.work.join("report-run-a-2KiB-step2.json").exists());
}

#[test]
fn rerunning_commit_replaces_the_previous_run() {
    let b = bench();
    let first = phase1(&b);
    let mut cfg = b.cfg.clone();
    cfg.seed = Some(8);
    let b2 = Bench {
        _tmp: tempfile::tempdir().unwrap(),
        work: b.work.clone(),
        cfg,
    };
    let second = phase1(&b2);
    assert_ne!(first.statement_id, second.statement_id);

    let store = FileStore::open(&b.cfg.store_path).unwrap();
    assert_eq!(snapshot::inventory(&store).unwrap().statements, 1);
    let (_, validator) = snapshot::restore(&store).unwrap();
    assert_eq!(validator.statement().map(|s| s.id), Some(second.statement_id));
}

#[test]
fn same_seed_gives_same_statement() {
    let a = bench();
    let b = bench();
    assert_eq!(phase1(&a).statement_id, phase1(&b).statement_id);
}

#[test]
fn failed_commit_leaves_previous_snapshot_intact() {
    let b = bench();
    let first = phase1(&b);

    let elsewhere = tempfile::tempdir().unwrap();
    let blocked = elsewhere.path().join("keep");
    fs::create_dir_all(&blocked).unwrap();
    fs::write(blocked.join("notes.txt"), b"mine").unwrap();

    let mut store = FileStore::open(&b.cfg.store_path).unwrap();
    assert!(commit_phase(&mut store, &blocked, ProofType::StackedDrg2KiBV1, &b.cfg).is_err());
    assert!(store.is_dirty());
    drop(store);

    assert!(blocked.join("notes.txt").exists());
    let store = FileStore::open(&b.cfg.store_path).unwrap();
    let (_, validator) = snapshot::restore(&store).unwrap();
    assert_eq!(validator.statement().map(|s| s.id), Some(first.statement_id));
}

#[test]
fn second_prove_after_verified_run_still_verifies() {
    let b = bench();
    phase1(&b);
    let store = FileStore::open(&b.cfg.store_path).unwrap();
    for _ in 0..2 {
        let out = prove_phase(&store, &b.work, ProofType::StackedDrg2KiBV1, &b.cfg).unwrap();
        assert!(out.valid);
    }
}

#[test]
fn snapshot_without_statement_is_a_precondition_failure() {
    let b = bench();
    fs::create_dir_all(&b.work).unwrap();
    let mut store = FileStore::open(&b.cfg.store_path).unwrap();
    let miner = porep_seal::Miner::new(1, ProofType::StackedDrg2KiBV1);
    snapshot::save(&mut store, &miner, &porep_core::Validator::new()).unwrap();
    store.flush().unwrap();

    let err = prove_phase(&store, &b.work, ProofType::StackedDrg2KiBV1, &b.cfg).unwrap_err();
    assert_eq!(exit_code(&err), EXIT_PRECONDITION);
}
