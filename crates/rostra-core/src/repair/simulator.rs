/// Violation simulator: pure preview validation for repair proposals.
///
/// Parity rule: `Full` mode runs the same audit engine a commit runs, so a
/// previewed proposal and its committed form report identical counts.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::audit::run_audits;
use crate::config::SolverConfig;
use crate::domain::models::{Assignment, Tour, DAY_MINUTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    None,
    Fast,
    Full,
}

impl ValidationMode {
    pub fn parse(s: &str) -> Option<ValidationMode> {
        match s {
            "none" => Some(ValidationMode::None),
            "fast" => Some(ValidationMode::Fast),
            "full" => Some(ValidationMode::Full),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValidationMode::None => "none",
            ValidationMode::Fast => "fast",
            ValidationMode::Full => "full",
        }
    }
}

/// Counts are `None` until a validating mode has actually run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedViolations {
    pub violations_validated: bool,
    pub validation_mode: ValidationMode,
    pub block_violations: Option<usize>,
    pub warn_violations: Option<usize>,
    pub examples: Vec<String>,
    pub note: String,
}

pub fn simulate_violations(
    proposed: &[Assignment],
    forecast_tours: &[Tour],
    impacted_tour_ids: &HashSet<String>,
    mode: ValidationMode,
    cfg: &SolverConfig,
) -> SimulatedViolations {
    match mode {
        ValidationMode::None => SimulatedViolations {
            violations_validated: false,
            validation_mode: mode,
            block_violations: None,
            warn_violations: None,
            examples: Vec::new(),
            note: "coverage-only advisory; violations not checked".to_string(),
        },
        ValidationMode::Fast => fast_check(proposed, impacted_tour_ids, cfg),
        ValidationMode::Full => {
            let report = run_audits(proposed, forecast_tours, cfg);
            let block_violations: usize =
                report.checks.iter().map(|c| c.violation_count).sum();
            let examples: Vec<String> = report
                .checks
                .iter()
                .flat_map(|c| c.violations.iter().take(2).cloned())
                .take(5)
                .collect();
            SimulatedViolations {
                violations_validated: true,
                validation_mode: mode,
                block_violations: Some(block_violations),
                warn_violations: Some(report.near_violations.len()),
                examples,
                note: "full seven-check audit over the proposed plan".to_string(),
            }
        }
    }
}

/// Fast mode: overlap, daily count and rest checked only for the drivers
/// receiving impacted tours.
fn fast_check(
    proposed: &[Assignment],
    impacted_tour_ids: &HashSet<String>,
    cfg: &SolverConfig,
) -> SimulatedViolations {
    let touched_drivers: HashSet<&str> = proposed
        .iter()
        .filter(|a| impacted_tour_ids.contains(&a.tour_instance_id))
        .map(|a| a.driver_id.as_str())
        .collect();

    let mut examples = Vec::new();
    let mut block_count = 0usize;

    for driver in &touched_drivers {
        let mut week: Vec<&Assignment> = proposed
            .iter()
            .filter(|a| a.driver_id == *driver)
            .collect();
        week.sort_by_key(|a| (a.day.index(), a.start_min));

        // Overlaps and per-day counts
        for day in 0..7u8 {
            let day_tours: Vec<&&Assignment> =
                week.iter().filter(|a| a.day.index() == day).collect();
            if day_tours.len() > usize::from(cfg.max_tours_per_day) {
                block_count += 1;
                examples.push(format!("driver {driver} day {day}: too many tours"));
            }
            for pair in day_tours.windows(2) {
                if pair[0].end_min > pair[1].start_min {
                    block_count += 1;
                    examples.push(format!(
                        "driver {driver} day {day}: {} overlaps {}",
                        pair[0].tour_instance_id, pair[1].tour_instance_id
                    ));
                }
            }
        }

        // Rest between consecutive working days
        for day in 0..6u8 {
            let cur_last = week
                .iter()
                .filter(|a| a.day.index() == day)
                .map(|a| a.end_min)
                .max();
            let next_first = week
                .iter()
                .filter(|a| a.day.index() == day + 1)
                .map(|a| a.start_min)
                .min();
            if let (Some(last), Some(first)) = (cur_last, next_first) {
                let rest = first + DAY_MINUTES - last;
                if rest < cfg.min_rest_min {
                    block_count += 1;
                    examples.push(format!(
                        "driver {driver} rest {rest} min between day {day} and {}",
                        day + 1
                    ));
                }
            }
        }
    }

    examples.truncate(5);
    SimulatedViolations {
        violations_validated: true,
        validation_mode: ValidationMode::Fast,
        block_violations: Some(block_count),
        warn_violations: Some(0),
        examples,
        note: "impacted drivers only; full audit runs at commit".to_string(),
    }
}
