/// Candidate finder: read-only eligibility scan for repair assignments.
///
/// For one impacted tour, ranks the drivers that could legally absorb it.
/// Never mutates anything; the orchestrator decides what to do with the
/// ranking.
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::domain::models::{Assignment, DAY_MINUTES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDriver {
    pub driver_id: String,
    /// Higher = less disruptive.
    pub score: f64,
    pub existing_tours: usize,
    pub existing_min: i32,
    pub works_same_day: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub tour_instance_id: String,
    pub candidates: Vec<CandidateDriver>,
    pub total_available: usize,
    pub filtered_count: usize,
}

/// Would `driver`'s week stay legal with `tour` added?
/// Checks overlap, daily tour count, rest against both neighbouring days,
/// and the weekly cap.
pub fn driver_can_absorb(
    driver_assignments: &[&Assignment],
    tour: &Assignment,
    cfg: &SolverConfig,
) -> Result<(), String> {
    let day = tour.day.index() as i32;

    // Overlap + same-day count
    let mut day_tours = 0usize;
    for a in driver_assignments.iter().filter(|a| a.day == tour.day) {
        day_tours += 1;
        if a.end_min > tour.start_min && a.start_min < tour.end_min {
            return Err(format!("overlap with {}", a.tour_instance_id));
        }
    }
    if day_tours + 1 > usize::from(cfg.max_tours_per_day) {
        return Err(format!("day already carries {day_tours} tours"));
    }

    // Rest to both neighbours, with the tour merged into the day profile
    let mut day_first: BTreeMap<i32, i32> = BTreeMap::new();
    let mut day_last: BTreeMap<i32, i32> = BTreeMap::new();
    for a in driver_assignments {
        let d = i32::from(a.day.index());
        let end = if a.crosses_midnight {
            a.end_min + DAY_MINUTES
        } else {
            a.end_min
        };
        day_first
            .entry(d)
            .and_modify(|v| *v = (*v).min(a.start_min))
            .or_insert(a.start_min);
        day_last
            .entry(d)
            .and_modify(|v| *v = (*v).max(end))
            .or_insert(end);
    }
    let new_first = day_first
        .get(&day)
        .map_or(tour.start_min, |v| (*v).min(tour.start_min));
    let new_last = day_last.get(&day).map_or(tour.end_min, |v| (*v).max(tour.end_min));

    if let Some(prev_last) = day_last.get(&(day - 1)) {
        let rest = new_first + DAY_MINUTES - prev_last;
        if rest < cfg.min_rest_min {
            return Err(format!("rest from previous day {rest} min"));
        }
    }
    if let Some(next_first) = day_first.get(&(day + 1)) {
        let rest = next_first + DAY_MINUTES - new_last;
        if rest < cfg.min_rest_min {
            return Err(format!("rest to next day {rest} min"));
        }
    }

    // Weekly cap
    let total: i32 = driver_assignments
        .iter()
        .map(|a| a.end_min - a.start_min)
        .sum();
    if total + (tour.end_min - tour.start_min) > cfg.fte_max_week_min {
        return Err("weekly cap".to_string());
    }

    Ok(())
}

/// Rank eligible substitutes for one impacted tour.
pub fn find_candidates(
    baseline: &[Assignment],
    impacted: &Assignment,
    absent: &HashSet<String>,
    cfg: &SolverConfig,
) -> CandidateResult {
    let mut by_driver: BTreeMap<&str, Vec<&Assignment>> = BTreeMap::new();
    for a in baseline {
        by_driver.entry(a.driver_id.as_str()).or_default().push(a);
    }

    let total_available = by_driver.len();
    let mut candidates = Vec::new();
    let mut filtered = 0usize;

    for (driver_id, assignments) in &by_driver {
        if absent.contains(*driver_id) || *driver_id == impacted.driver_id {
            filtered += 1;
            continue;
        }

        match driver_can_absorb(assignments, impacted, cfg) {
            Err(_) => filtered += 1,
            Ok(()) => {
                let works_same_day = assignments.iter().any(|a| a.day == impacted.day);
                let existing_min: i32 = assignments.iter().map(|a| a.end_min - a.start_min).sum();
                // Disruption score: same working day beats a new day,
                // lighter weeks beat heavier ones.
                let score = if works_same_day { 1000.0 } else { 0.0 }
                    - f64::from(existing_min) / 60.0;

                candidates.push(CandidateDriver {
                    driver_id: (*driver_id).to_string(),
                    score,
                    existing_tours: assignments.len(),
                    existing_min,
                    works_same_day,
                    reason: if works_same_day {
                        "already working that day".to_string()
                    } else {
                        "opens a new working day".to_string()
                    },
                });
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.driver_id.cmp(&b.driver_id))
    });

    CandidateResult {
        tour_instance_id: impacted.tour_instance_id.clone(),
        candidates,
        total_available,
        filtered_count: filtered,
    }
}
