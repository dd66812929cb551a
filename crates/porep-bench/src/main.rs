// crates/porep-bench/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use porep_bench::phase::ensure_store_outside;
use porep_bench::{commit_phase, failure_exit, interpret, prove_phase, Cli, Command, Phase};
use porep_core::ProofType;
use porep_store::FileStore;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    init_tracing();

    let (cli, phase, proof_type) = match interpret(std::env::args_os()) {
        Ok(Command::Run {
            args,
            phase,
            proof_type,
        }) => (args, phase, proof_type),
        Ok(Command::Usage(text)) => {
            println!("{text}");
            return ExitCode::SUCCESS;
        }
        Err(e) => e.exit(),
    };

    match run(&cli, phase, proof_type) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => failure_exit(&e),
    }
}

/// Initialize tracing with an env-driven filter (default INFO), on stderr.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn run(cli: &Cli, phase: Phase, proof_type: ProofType) -> Result<()> {
    let cfg = cli.load_config()?;
    info!(store = %cfg.store_path.display(), seed = ?cfg.seed, %phase, "configuration loaded");

    let mut store = FileStore::open(&cfg.store_path)
        .with_context(|| format!("opening store {}", cfg.store_path.display()))?;

    match phase {
        Phase::Commit => {
            ensure_store_outside(&cli.work_dir, store.dir())?;
            let out = commit_phase(&mut store, &cli.work_dir, proof_type, &cfg)?;
            store.close().context("closing store")?;
            println!("statement id: {}", out.statement_id);
            println!("miner id: {}", out.miner_id);
            for step in out.report.steps() {
                println!("{:>10}: {}", step.name, step.cost);
            }
            println!("Wrote report → {}", out.report_path.display());
        }
        Phase::Prove => {
            let out = prove_phase(&store, &cli.work_dir, proof_type, &cfg)?;
            store.close().context("closing store")?;
            println!("statement id: {}", out.statement_id);
            println!("proof verified: {} ({} bytes)", out.valid, out.proof_len);
            for step in out.report.steps() {
                println!("{:>10}: {}", step.name, step.cost);
            }
            println!("Wrote report → {}", out.report_path.display());
        }
    }
    Ok(())
}
