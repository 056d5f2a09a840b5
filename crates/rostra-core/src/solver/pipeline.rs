/// Determinism driver: one full solve from typed tours to audited,
/// hash-bound assignments.
///
/// Single-threaded by design. The hash chain
/// `f(input_hash, solver_config_hash, seed) -> output_hash` is the
/// reproducibility contract; every ordering that feeds a hash is fixed
/// before hashing.
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{run_audits, AuditReport};
use crate::config::SolverConfig;
use crate::domain::column::{BlockInfo, RosterColumn};
use crate::domain::errors::Result;
use crate::domain::models::{
    sort_assignments, Assignment, Block, DriverRoster, RosterType, Tour,
};
use crate::forecast;
use crate::hash;
use crate::solver::colgen::ColumnGenerator;
use crate::solver::greedy::GreedySolver;
use crate::solver::master::{solve_lexico, MasterOutcome};
use crate::solver::partition::partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Ok,
    OkGreedyFallback,
    Failed,
}

impl SolveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Ok => "OK",
            SolveStatus::OkGreedyFallback => "OK_GREEDY_FALLBACK",
            SolveStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveKpis {
    pub drivers_total: usize,
    pub drivers_fte: usize,
    pub drivers_pt: usize,
    pub fte_hours_min: f64,
    pub fte_hours_max: f64,
    pub fte_hours_avg: f64,
    pub under_target_ftes: usize,
    pub block_mix: BTreeMap<String, usize>,
    pub tours_covered: usize,
    pub total_work_hours: f64,
    pub solver_arch: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub solver_arch: String,
    pub seed: u32,
    pub input_hash: String,
    pub solver_config_hash: String,
    pub output_hash: String,
    pub blocks: Vec<Block>,
    pub rosters: Vec<DriverRoster>,
    pub assignments: Vec<Assignment>,
    pub headcount: usize,
    pub kpis: SolveKpis,
    pub audit: AuditReport,
}

/// Solve one forecast week. Deterministic for fixed (tours, config, seed).
pub fn solve_forecast(tours: &[Tour], cfg: &SolverConfig, seed: u32) -> Result<SolveOutcome> {
    let started = Instant::now();

    let input_hash = forecast::input_hash(tours);
    let solver_config_hash = cfg.config_hash();
    info!(
        tours = tours.len(),
        seed,
        input_hash = %&input_hash[..12],
        "solve start"
    );

    // Phase 1: partition tours into legal daily blocks.
    let blocks = partition(tours, u64::from(seed), cfg)?;
    let block_infos: Vec<BlockInfo> = blocks.iter().map(BlockInfo::from).collect();
    let block_by_id: BTreeMap<String, Block> =
        blocks.iter().map(|b| (b.id.clone(), b.clone())).collect();

    // Phase 2: greedy seed solution (always feasible).
    let (greedy_rosters, _greedy_stats) =
        GreedySolver::new(blocks.clone(), u64::from(seed), cfg).solve();

    // Phase 3: column pool.
    let mut generator = ColumnGenerator::new(block_infos, u64::from(seed), cfg);
    generator.generate_initial_pool(cfg.initial_pool_target);
    // Optional rounds run only while the wall-clock budget allows; the
    // search budgets themselves are node counts, not time.
    if started.elapsed().as_secs_f64() < cfg.time_limit_secs {
        generator.generate_columns(cfg.colgen_rounds, cfg.columns_per_round);
    } else {
        warn!("skipping extra generation rounds: time budget spent");
    }
    generator.generate_pt_pool(cfg.pt_pool_target);
    generator.generate_singleton_columns();

    let hint_start = generator.pool_len();
    generator.seed_from_greedy(&greedy_rosters);
    let hint: Vec<usize> = (hint_start..generator.pool_len()).collect();

    // Phase 4: lexicographic master over all blocks.
    let targets: BTreeSet<String> = blocks.iter().map(|b| b.id.clone()).collect();
    let outcome = solve_lexico(generator.columns(), &targets, Some(&hint), cfg);

    let (status, solver_arch, rosters) = match outcome {
        MasterOutcome::Solved(sol) => {
            let selected: Vec<&RosterColumn> =
                sol.selected.iter().map(|&i| &generator.columns()[i]).collect();
            let rosters = columns_to_rosters(&selected, &block_by_id);
            (SolveStatus::Ok, "set-partitioning".to_string(), rosters)
        }
        MasterOutcome::Infeasible {
            zero_support_target_ids,
            ..
        } => {
            warn!(
                zero_support = zero_support_target_ids.len(),
                "master infeasible, using greedy fallback"
            );
            (
                SolveStatus::OkGreedyFallback,
                "set-partitioning+greedy_fallback".to_string(),
                greedy_rosters,
            )
        }
    };

    // Phase 5: flatten to assignments, hash, audit.
    let mut assignments = rosters_to_assignments(&rosters);
    sort_assignments(&mut assignments);
    let output_hash = hash::output_hash(&assignments, &solver_config_hash);

    let audit = run_audits(&assignments, tours, cfg);
    let kpis = compute_kpis(&rosters, &blocks, tours, cfg, &solver_arch, status);

    info!(
        headcount = rosters.len(),
        status = status.as_str(),
        output_hash = %&output_hash[..12],
        elapsed_ms = started.elapsed().as_millis() as u64,
        "solve done"
    );

    Ok(SolveOutcome {
        status,
        solver_arch,
        seed,
        input_hash,
        solver_config_hash,
        output_hash,
        headcount: rosters.len(),
        blocks,
        rosters,
        assignments,
        kpis,
        audit,
    })
}

/// Selected master columns become drivers. Ids are handed out after a
/// deterministic ordering: FTE before PT, fuller weeks first, ties by the
/// column's lowest block id.
fn columns_to_rosters(
    selected: &[&RosterColumn],
    block_by_id: &BTreeMap<String, Block>,
) -> Vec<DriverRoster> {
    let mut order: Vec<&&RosterColumn> = selected.iter().collect();
    order.sort_by_key(|c| {
        (
            c.roster_type,
            std::cmp::Reverse(c.total_min),
            c.block_ids.iter().next().cloned().unwrap_or_default(),
        )
    });

    let mut rosters = Vec::new();
    let mut fte_counter = 0usize;
    let mut pt_counter = 0usize;

    for col in order {
        let driver_id = match col.roster_type {
            RosterType::Fte => {
                fte_counter += 1;
                format!("FTE{fte_counter:03}")
            }
            RosterType::Pt => {
                pt_counter += 1;
                format!("PT{pt_counter:03}")
            }
        };

        let mut col_blocks: Vec<Block> = col
            .block_ids
            .iter()
            .filter_map(|id| block_by_id.get(id).cloned())
            .collect();
        col_blocks.sort_by_key(|b| (b.day.index(), b.first_start, b.id.clone()));

        let days_worked = col.day_stats.len() as u8;
        rosters.push(DriverRoster {
            driver_id,
            roster_type: col.roster_type,
            total_min: col.total_min,
            days_worked,
            blocks: col_blocks,
        });
    }

    rosters
}

pub fn rosters_to_assignments(rosters: &[DriverRoster]) -> Vec<Assignment> {
    let mut assignments = Vec::new();
    for roster in rosters {
        for block in &roster.blocks {
            for tour in &block.tours {
                assignments.push(Assignment {
                    plan_version_id: 0,
                    driver_id: roster.driver_id.clone(),
                    tour_instance_id: tour.id.clone(),
                    day: tour.day,
                    block_id: block.id.clone(),
                    block_type: block.block_type,
                    start_min: tour.start_min,
                    end_min: tour.end_min,
                    crosses_midnight: tour.crosses_midnight,
                });
            }
        }
    }
    assignments
}

fn compute_kpis(
    rosters: &[DriverRoster],
    blocks: &[Block],
    tours: &[Tour],
    cfg: &SolverConfig,
    solver_arch: &str,
    status: SolveStatus,
) -> SolveKpis {
    let fte_hours: Vec<f64> = rosters
        .iter()
        .filter(|r| r.roster_type == RosterType::Fte)
        .map(DriverRoster::total_hours)
        .collect();

    let mut block_mix: BTreeMap<String, usize> = BTreeMap::new();
    for b in blocks {
        *block_mix.entry(b.block_type.as_str().to_string()).or_default() += 1;
    }

    let total_work_min: i32 = rosters.iter().map(|r| r.total_min).sum();

    SolveKpis {
        drivers_total: rosters.len(),
        drivers_fte: fte_hours.len(),
        drivers_pt: rosters.len() - fte_hours.len(),
        fte_hours_min: if fte_hours.is_empty() {
            0.0
        } else {
            fte_hours.iter().copied().fold(f64::INFINITY, f64::min)
        },
        fte_hours_max: fte_hours.iter().copied().fold(0.0, f64::max),
        fte_hours_avg: if fte_hours.is_empty() {
            0.0
        } else {
            fte_hours.iter().sum::<f64>() / fte_hours.len() as f64
        },
        under_target_ftes: rosters
            .iter()
            .filter(|r| {
                r.roster_type == RosterType::Fte && r.total_min < cfg.fte_soft_target_min
            })
            .count(),
        block_mix,
        tours_covered: tours.len(),
        total_work_hours: f64::from(total_work_min) / 60.0,
        solver_arch: solver_arch.to_string(),
        status: status.as_str().to_string(),
    }
}
