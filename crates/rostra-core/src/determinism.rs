/// Determinism self-test: repeat the full pipeline and compare output
/// hashes. Any divergence means the reproducibility contract is broken.
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SolverConfig;
use crate::domain::errors::{Result, SolveError};
use crate::domain::models::Tour;
use crate::solver::pipeline::solve_forecast;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismReport {
    pub passed: bool,
    pub runs_completed: usize,
    pub unique_hashes: usize,
    pub hashes: Vec<String>,
    pub headcounts: Vec<usize>,
    pub seed: u32,
}

/// Run the pipeline `runs` times with one seed and compare hashes.
pub fn prove_determinism(
    tours: &[Tour],
    cfg: &SolverConfig,
    seed: u32,
    runs: usize,
) -> Result<DeterminismReport> {
    let mut hashes = Vec::with_capacity(runs);
    let mut headcounts = Vec::with_capacity(runs);

    for run in 0..runs {
        let outcome = solve_forecast(tours, cfg, seed)?;
        info!(
            run = run + 1,
            output_hash = %&outcome.output_hash[..12],
            "determinism run"
        );
        hashes.push(outcome.output_hash);
        headcounts.push(outcome.headcount);
    }

    let mut unique = hashes.clone();
    unique.sort();
    unique.dedup();

    Ok(DeterminismReport {
        passed: unique.len() == 1,
        runs_completed: runs,
        unique_hashes: unique.len(),
        hashes,
        headcounts,
        seed,
    })
}

/// Escalate a failed report into the typed error.
pub fn ensure_deterministic(report: &DeterminismReport) -> Result<()> {
    if report.passed {
        Ok(())
    } else {
        Err(SolveError::DeterminismBroken {
            unique_hashes: report.unique_hashes,
            runs: report.runs_completed,
        })
    }
}
