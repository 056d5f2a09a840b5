/// Repair orchestrator: top-K delta-first proposals for driver absences.
///
/// Works off a published baseline snapshot, never the live plan. Changes
/// as little as possible: only tours of absent drivers move, and nothing
/// inside the freeze window moves at all.
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::domain::errors::{Result, SolveError};
use crate::domain::models::{sort_assignments, Assignment, Tour, DAY_MINUTES};
use crate::hash;
use crate::repair::candidate::{driver_can_absorb, find_candidates};
use crate::repair::simulator::{simulate_violations, SimulatedViolations, ValidationMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalKind {
    /// Option A: one substitute absorbs every impacted tour.
    NoSplit,
    /// Option B: impacted tours distributed across several drivers.
    Split,
    /// Option C: depth-2 reassignment chain.
    ChainSwap,
}

impl ProposalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalKind::NoSplit => "A_NO_SPLIT",
            ProposalKind::Split => "B_SPLIT",
            ProposalKind::ChainSwap => "C_CHAIN_SWAP",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reassignment {
    pub tour_instance_id: String,
    pub from_driver: String,
    pub to_driver: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairProposal {
    pub proposal_id: String,
    pub kind: ProposalKind,
    /// The complete post-repair assignment set.
    pub assignments: Vec<Assignment>,
    pub reassignments: Vec<Reassignment>,
    pub impacted_tours_count: usize,
    pub impacted_assigned_count: usize,
    pub coverage_percent: f64,
    pub violations: SimulatedViolations,
    pub churn_tours_reassigned: usize,
    pub cost_score: f64,
}

impl RepairProposal {
    pub fn hard_violations(&self) -> usize {
        self.violations.block_violations.unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct RepairRequest {
    pub absent_driver_ids: Vec<String>,
    /// Now, as minutes since the plan week's Monday 00:00.
    pub now_week_min: i32,
    pub validation: ValidationMode,
    /// 0 falls back to the configured top-K.
    pub top_k: usize,
}

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub proposals: Vec<RepairProposal>,
    pub impacted_tour_ids: Vec<String>,
    pub frozen_tour_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnMetrics {
    pub total_tours: usize,
    pub changed_tours: usize,
    pub churn_percent: f64,
}

/// Absolute week-minute of an assignment's start.
fn week_start_min(a: &Assignment) -> i32 {
    i32::from(a.day.index()) * DAY_MINUTES + a.start_min
}

/// Freeze check, inclusive at the horizon boundary. Tours already in the
/// past are frozen too.
pub fn is_frozen(a: &Assignment, now_week_min: i32, freeze_horizon_min: i32) -> bool {
    week_start_min(a) - now_week_min <= freeze_horizon_min
}

pub fn propose_repairs(
    baseline: &[Assignment],
    forecast_tours: &[Tour],
    req: &RepairRequest,
    cfg: &SolverConfig,
) -> Result<RepairOutcome> {
    let absent: HashSet<String> = req.absent_driver_ids.iter().cloned().collect();
    let top_k = if req.top_k == 0 { cfg.repair_top_k } else { req.top_k };

    // 1. Impacted tours: everything the absent drivers were holding.
    let mut impacted: Vec<Assignment> = baseline
        .iter()
        .filter(|a| absent.contains(&a.driver_id))
        .cloned()
        .collect();
    impacted.sort_by_key(|a| (a.day.index(), a.start_min, a.tour_instance_id.clone()));

    let frozen_tour_ids: Vec<String> = baseline
        .iter()
        .filter(|a| is_frozen(a, req.now_week_min, cfg.freeze_horizon_min))
        .map(|a| a.tour_instance_id.clone())
        .collect();

    // 2. A frozen impacted tour cannot legally move: refuse the repair.
    let frozen_impacted: Vec<&Assignment> = impacted
        .iter()
        .filter(|a| is_frozen(a, req.now_week_min, cfg.freeze_horizon_min))
        .collect();
    if !frozen_impacted.is_empty() {
        return Err(SolveError::FreezeViolation(format!(
            "absent driver holds frozen tours: {}",
            frozen_impacted
                .iter()
                .map(|a| a.tour_instance_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let impacted_ids: HashSet<String> = impacted
        .iter()
        .map(|a| a.tour_instance_id.clone())
        .collect();
    let remaining: Vec<Assignment> = baseline
        .iter()
        .filter(|a| !absent.contains(&a.driver_id))
        .cloned()
        .collect();

    info!(
        impacted = impacted.len(),
        frozen = frozen_tour_ids.len(),
        drivers_absent = absent.len(),
        "repair proposal generation"
    );

    // 3. Proposal families.
    let mut drafts: Vec<(ProposalKind, Vec<Assignment>, Vec<Reassignment>)> = Vec::new();
    if let Some(d) = option_a_no_split(&remaining, &impacted, &absent, cfg) {
        drafts.push(d);
    }
    if let Some(d) = option_b_split(&remaining, &impacted, &absent, cfg) {
        drafts.push(d);
    }
    if drafts.len() < top_k {
        if let Some(d) = option_c_chain_swap(&remaining, &impacted, &absent, cfg) {
            drafts.push(d);
        }
    }

    // 4. Validate, score, rank.
    let mut proposals: Vec<RepairProposal> = drafts
        .into_iter()
        .map(|(kind, assignments, reassignments)| {
            // Chain swaps also move non-impacted tours; the coverage
            // numerator counts impacted tours only.
            let assigned = reassignments
                .iter()
                .filter(|r| impacted_ids.contains(&r.tour_instance_id))
                .count();
            let violations = simulate_violations(
                &assignments,
                forecast_tours,
                &impacted_ids,
                req.validation,
                cfg,
            );
            let new_day_moves = reassignments
                .iter()
                .filter(|r| {
                    let moved = impacted
                        .iter()
                        .find(|a| a.tour_instance_id == r.tour_instance_id);
                    let to_driver_days: HashSet<u8> = remaining
                        .iter()
                        .filter(|a| a.driver_id == r.to_driver)
                        .map(|a| a.day.index())
                        .collect();
                    moved.map_or(false, |m| !to_driver_days.contains(&m.day.index()))
                })
                .count();
            let drivers_touched: HashSet<&str> =
                reassignments.iter().map(|r| r.to_driver.as_str()).collect();
            let cost_score = drivers_touched.len() as f64 + new_day_moves as f64 * 0.5;

            RepairProposal {
                proposal_id: String::new(), // assigned after ranking
                kind,
                assignments,
                impacted_tours_count: impacted.len(),
                impacted_assigned_count: assigned,
                coverage_percent: if impacted.is_empty() {
                    100.0
                } else {
                    assigned as f64 / impacted.len() as f64 * 100.0
                },
                violations,
                churn_tours_reassigned: reassignments.len(),
                cost_score,
                reassignments,
            }
        })
        .collect();

    proposals.sort_by(|a, b| {
        a.hard_violations()
            .cmp(&b.hard_violations())
            .then(a.churn_tours_reassigned.cmp(&b.churn_tours_reassigned))
            .then(
                a.cost_score
                    .partial_cmp(&b.cost_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    proposals.truncate(top_k);
    for (i, p) in proposals.iter_mut().enumerate() {
        p.proposal_id = format!("P{:02}-{}", i + 1, p.kind.as_str());
    }

    debug!(count = proposals.len(), "proposals ready");
    Ok(RepairOutcome {
        proposals,
        impacted_tour_ids: {
            let mut ids: Vec<String> = impacted_ids.into_iter().collect();
            ids.sort();
            ids
        },
        frozen_tour_ids,
    })
}

/// Option A: find one substitute who can take every impacted tour.
fn option_a_no_split(
    remaining: &[Assignment],
    impacted: &[Assignment],
    absent: &HashSet<String>,
    cfg: &SolverConfig,
) -> Option<(ProposalKind, Vec<Assignment>, Vec<Reassignment>)> {
    if impacted.is_empty() {
        return None;
    }

    let mut drivers: Vec<&str> = remaining
        .iter()
        .map(|a| a.driver_id.as_str())
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|d| !absent.contains(*d))
        .collect();
    drivers.sort_unstable();

    for driver in drivers {
        let mut week: Vec<Assignment> = remaining
            .iter()
            .filter(|a| a.driver_id == driver)
            .cloned()
            .collect();

        let mut ok = true;
        for tour in impacted {
            let refs: Vec<&Assignment> = week.iter().collect();
            if driver_can_absorb(&refs, tour, cfg).is_err() {
                ok = false;
                break;
            }
            let mut moved = tour.clone();
            moved.driver_id = driver.to_string();
            week.push(moved);
        }
        if !ok {
            continue;
        }

        let mut assignments = remaining.to_vec();
        let mut reassignments = Vec::new();
        for tour in impacted {
            let mut moved = tour.clone();
            moved.driver_id = driver.to_string();
            assignments.push(moved);
            reassignments.push(Reassignment {
                tour_instance_id: tour.tour_instance_id.clone(),
                from_driver: tour.driver_id.clone(),
                to_driver: driver.to_string(),
            });
        }
        sort_assignments(&mut assignments);
        return Some((ProposalKind::NoSplit, assignments, reassignments));
    }
    None
}

/// Option B: each impacted tour goes to its least disruptive candidate.
fn option_b_split(
    remaining: &[Assignment],
    impacted: &[Assignment],
    absent: &HashSet<String>,
    cfg: &SolverConfig,
) -> Option<(ProposalKind, Vec<Assignment>, Vec<Reassignment>)> {
    if impacted.is_empty() {
        return None;
    }

    let mut working = remaining.to_vec();
    let mut reassignments = Vec::new();

    for tour in impacted {
        let result = find_candidates(&working, tour, absent, cfg);
        let best = result.candidates.first()?;

        let mut moved = tour.clone();
        moved.driver_id = best.driver_id.clone();
        reassignments.push(Reassignment {
            tour_instance_id: tour.tour_instance_id.clone(),
            from_driver: tour.driver_id.clone(),
            to_driver: best.driver_id.clone(),
        });
        working.push(moved);
    }

    sort_assignments(&mut working);
    Some((ProposalKind::Split, working, reassignments))
}

/// Option C: depth-2 chain. Move a blocking tour from driver X to driver
/// Y, then X absorbs the impacted tour.
fn option_c_chain_swap(
    remaining: &[Assignment],
    impacted: &[Assignment],
    absent: &HashSet<String>,
    cfg: &SolverConfig,
) -> Option<(ProposalKind, Vec<Assignment>, Vec<Reassignment>)> {
    if impacted.is_empty() {
        return None;
    }

    let mut working = remaining.to_vec();
    let mut reassignments = Vec::new();

    for tour in impacted {
        // Direct placement first; the chain is only for stuck tours.
        let direct = find_candidates(&working, tour, absent, cfg);
        if let Some(best) = direct.candidates.first() {
            let mut moved = tour.clone();
            moved.driver_id = best.driver_id.clone();
            reassignments.push(Reassignment {
                tour_instance_id: tour.tour_instance_id.clone(),
                from_driver: tour.driver_id.clone(),
                to_driver: best.driver_id.clone(),
            });
            working.push(moved);
            continue;
        }

        let chain = find_chain(&working, tour, absent, cfg)?;
        for r in chain.1 {
            reassignments.push(r);
        }
        working = chain.0;
    }

    sort_assignments(&mut working);
    Some((ProposalKind::ChainSwap, working, reassignments))
}

/// One depth-2 chain for a stuck tour, or None.
fn find_chain(
    working: &[Assignment],
    tour: &Assignment,
    absent: &HashSet<String>,
    cfg: &SolverConfig,
) -> Option<(Vec<Assignment>, Vec<Reassignment>)> {
    let mut by_driver: BTreeMap<&str, Vec<&Assignment>> = BTreeMap::new();
    for a in working {
        by_driver.entry(a.driver_id.as_str()).or_default().push(a);
    }

    for (x, x_week) in &by_driver {
        if absent.contains(*x) {
            continue;
        }
        // Try evicting each of X's same-day tours.
        for evicted in x_week.iter().filter(|a| a.day == tour.day) {
            let x_without: Vec<&Assignment> = x_week
                .iter()
                .filter(|a| a.tour_instance_id != evicted.tour_instance_id)
                .copied()
                .collect();
            if driver_can_absorb(&x_without, tour, cfg).is_err() {
                continue;
            }

            // Rehome the evicted tour with some driver Y.
            for (y, y_week) in &by_driver {
                if y == x || absent.contains(*y) || *y == evicted.driver_id {
                    continue;
                }
                if driver_can_absorb(y_week, evicted, cfg).is_ok() {
                    let mut new_plan: Vec<Assignment> = working
                        .iter()
                        .filter(|a| a.tour_instance_id != evicted.tour_instance_id)
                        .cloned()
                        .collect();
                    let mut moved_evicted = (*evicted).clone();
                    moved_evicted.driver_id = (*y).to_string();
                    let mut moved_tour = tour.clone();
                    moved_tour.driver_id = (*x).to_string();
                    new_plan.push(moved_evicted);
                    new_plan.push(moved_tour);

                    let reassignments = vec![
                        Reassignment {
                            tour_instance_id: evicted.tour_instance_id.clone(),
                            from_driver: (*x).to_string(),
                            to_driver: (*y).to_string(),
                        },
                        Reassignment {
                            tour_instance_id: tour.tour_instance_id.clone(),
                            from_driver: tour.driver_id.clone(),
                            to_driver: (*x).to_string(),
                        },
                    ];
                    return Some((new_plan, reassignments));
                }
            }
        }
    }
    None
}

/// Fraction of tours whose driver changed between two plans.
pub fn churn_metrics(baseline: &[Assignment], proposed: &[Assignment]) -> ChurnMetrics {
    let before: BTreeMap<&str, &str> = baseline
        .iter()
        .map(|a| (a.tour_instance_id.as_str(), a.driver_id.as_str()))
        .collect();

    let mut changed = 0usize;
    for a in proposed {
        if let Some(&old) = before.get(a.tour_instance_id.as_str()) {
            if old != a.driver_id {
                changed += 1;
            }
        }
    }

    let total = before.len().max(1);
    ChurnMetrics {
        total_tours: before.len(),
        changed_tours: changed,
        churn_percent: changed as f64 / total as f64 * 100.0,
    }
}

/// Canonical payload hash used for idempotent repair commits: same key +
/// same hash replays, same key + different hash conflicts.
pub fn commit_payload_hash(assignments: &[Assignment]) -> String {
    let mut sorted = assignments.to_vec();
    sort_assignments(&mut sorted);
    let records: Vec<serde_json::Value> = sorted
        .iter()
        .map(|a| {
            serde_json::json!({
                "driver_id": a.driver_id,
                "tour_instance_id": a.tour_instance_id,
                "day": a.day.index(),
                "block_id": a.block_id,
            })
        })
        .collect();
    hash::sha256_hex(serde_json::json!(records).to_string().as_bytes())
}
