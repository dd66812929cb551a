// crates/porep-bench/src/measure.rs

//! Wall-clock step timing and the per-phase JSON report.

use anyhow::{bail, Context, Result};
use porep_core::ProofType;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Render a duration the way reports show it (`1.52ms`, `3.004s`).
#[must_use]
pub fn format_cost(d: Duration) -> String {
    format!("{d:?}")
}

/// Timer for one named step.
#[derive(Debug, Clone)]
pub struct StepMeasure {
    name: String,
    start: Instant,
    elapsed: Option<Duration>,
}

impl StepMeasure {
    /// Start timing `name` now.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            elapsed: None,
        }
    }

    /// Stop the clock. Calling it again re-measures from the original start.
    pub fn done(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.elapsed = Some(elapsed);
        elapsed
    }

    /// Step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frozen duration, once [`Self::done`] was called.
    #[must_use]
    pub const fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Frozen duration rendered for humans.
    #[must_use]
    pub fn cost(&self) -> Option<String> {
        self.elapsed.map(format_cost)
    }
}

/// A completed step as it appears in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCost {
    /// Step name.
    pub name: String,
    /// Duration rendered by [`format_cost`].
    pub cost: String,
    /// Exact duration, left out of the report file.
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Ordered step timings of one phase.
#[derive(Debug, Clone)]
pub struct Report {
    detail: String,
    proof_type: ProofType,
    phase: String,
    steps: Vec<StepCost>,
    total: Duration,
}

#[derive(Serialize)]
struct ReportFile<'a> {
    detail: &'a str,
    sector_size: &'a str,
    phase: &'a str,
    steps: &'a [StepCost],
    total_cost: String,
    total_nanos: u128,
}

impl Report {
    /// Empty report for run `detail` at `proof_type` in `phase`.
    #[must_use]
    pub fn new(detail: impl Into<String>, proof_type: ProofType, phase: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            proof_type,
            phase: phase.into(),
            steps: Vec::new(),
            total: Duration::ZERO,
        }
    }

    /// Run label.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Recorded steps, in completion order.
    #[must_use]
    pub fn steps(&self) -> &[StepCost] {
        &self.steps
    }

    /// Step names in completion order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Running sum of every added step.
    #[must_use]
    pub const fn total(&self) -> Duration {
        self.total
    }

    /// Append a finished step.
    pub fn add_step(&mut self, step: &StepMeasure) -> Result<()> {
        let Some(elapsed) = step.elapsed() else {
            bail!("step {} was added before it finished", step.name());
        };
        self.total += elapsed;
        debug!(step = step.name(), cost = %format_cost(elapsed), "step recorded");
        self.steps.push(StepCost {
            name: step.name().to_owned(),
            cost: format_cost(elapsed),
            elapsed,
        });
        Ok(())
    }

    /// Run `f` as step `name`. A failing step is not recorded.
    pub fn time<T, E>(&mut self, name: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T>
    where
        E: Into<anyhow::Error>,
    {
        let mut step = StepMeasure::start(name);
        let out = f()
            .map_err(Into::<anyhow::Error>::into)
            .with_context(|| format!("step {name}"))?;
        step.done();
        self.add_step(&step)?;
        Ok(out)
    }

    /// `report-<detail>-<sector size>-<phase>.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "report-{}-{}-{}.json",
            self.detail,
            self.proof_type.sector_size_label(),
            self.phase
        )
    }

    /// Write the report into `dir` and return its path.
    pub fn dump(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(self.file_name());
        let body = ReportFile {
            detail: &self.detail,
            sector_size: self.proof_type.sector_size_label(),
            phase: &self.phase,
            steps: &self.steps,
            total_cost: format_cost(self.total),
            total_nanos: self.total.as_nanos(),
        };
        let json = serde_json::to_vec_pretty(&body).context("serialize report")?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), steps = self.steps.len(), total = %format_cost(self.total), "report written");
        Ok(path)
    }
}
