/// Audit engine: seven hard-gate checks over an assignment set.
///
/// Checks are data, not control flow: a FAIL never raises. `can_release`
/// gates publish on all seven passing.
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::domain::models::{Assignment, BlockType, Tour, Weekday, DAY_MINUTES};

#[cfg(test)]
mod audit_tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCheckKind {
    Coverage,
    Overlap,
    Rest,
    SpanRegular,
    SpanSplit,
    Fatigue,
    WeeklyHours,
}

impl AuditCheckKind {
    pub const ALL: [AuditCheckKind; 7] = [
        AuditCheckKind::Coverage,
        AuditCheckKind::Overlap,
        AuditCheckKind::Rest,
        AuditCheckKind::SpanRegular,
        AuditCheckKind::SpanSplit,
        AuditCheckKind::Fatigue,
        AuditCheckKind::WeeklyHours,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AuditCheckKind::Coverage => "COVERAGE",
            AuditCheckKind::Overlap => "OVERLAP",
            AuditCheckKind::Rest => "REST",
            AuditCheckKind::SpanRegular => "SPAN_REGULAR",
            AuditCheckKind::SpanSplit => "SPAN_SPLIT",
            AuditCheckKind::Fatigue => "FATIGUE",
            AuditCheckKind::WeeklyHours => "WEEKLY_HOURS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub kind: AuditCheckKind,
    pub status: AuditStatus,
    pub violation_count: usize,
    pub violations: Vec<String>,
}

impl AuditResult {
    fn from_violations(kind: AuditCheckKind, violations: Vec<String>) -> AuditResult {
        AuditResult {
            kind,
            status: if violations.is_empty() {
                AuditStatus::Pass
            } else {
                AuditStatus::Fail
            },
            violation_count: violations.len(),
            violations,
        }
    }
}

/// Non-blocking yellow-zone warning emitted next to the hard checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearViolation {
    pub driver_id: String,
    pub day: Weekday,
    pub kind: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub checks: Vec<AuditResult>,
    pub near_violations: Vec<NearViolation>,
}

impl AuditReport {
    pub fn all_pass(&self) -> bool {
        self.checks.iter().all(|c| c.status == AuditStatus::Pass)
    }

    pub fn check(&self, kind: AuditCheckKind) -> &AuditResult {
        self.checks
            .iter()
            .find(|c| c.kind == kind)
            .expect("all seven checks always present")
    }

    pub fn failed_checks(&self) -> Vec<AuditCheckKind> {
        self.checks
            .iter()
            .filter(|c| c.status == AuditStatus::Fail)
            .map(|c| c.kind)
            .collect()
    }
}

/// Release gate: publish only when every hard check passes.
pub fn can_release(report: &AuditReport) -> bool {
    report.all_pass()
}

#[derive(Debug, Clone, Copy, Default)]
struct DayLoad {
    tours: u8,
    first_start: i32,
    last_end: i32,
    has_split: bool,
    has_heavy: bool,
    present: bool,
}

/// Per-driver week profile derived from assignments.
fn driver_days(assignments: &[Assignment]) -> BTreeMap<String, [DayLoad; 7]> {
    let mut by_driver: BTreeMap<String, [DayLoad; 7]> = BTreeMap::new();
    for a in assignments {
        let days = by_driver.entry(a.driver_id.clone()).or_insert([DayLoad::default(); 7]);
        let d = &mut days[a.day.index() as usize];
        let end = if a.crosses_midnight {
            a.end_min + DAY_MINUTES
        } else {
            a.end_min
        };
        if d.present {
            d.tours += 1;
            d.first_start = d.first_start.min(a.start_min);
            d.last_end = d.last_end.max(end);
        } else {
            *d = DayLoad {
                tours: 1,
                first_start: a.start_min,
                last_end: end,
                has_split: false,
                has_heavy: false,
                present: true,
            };
        }
        d.has_split |= a.block_type == BlockType::TwoSplit;
        d.has_heavy |= a.block_type == BlockType::Three;
    }
    by_driver
}

/// Run all seven checks.
pub fn run_audits(assignments: &[Assignment], forecast_tours: &[Tour], cfg: &SolverConfig) -> AuditReport {
    let by_driver = driver_days(assignments);

    let checks = vec![
        check_coverage(assignments, forecast_tours),
        check_overlap(assignments),
        check_rest(&by_driver, cfg),
        check_span_regular(&by_driver, cfg),
        check_span_split(&by_driver, cfg),
        check_fatigue(&by_driver, cfg),
        check_weekly_hours(assignments, cfg),
    ];

    let near_violations = collect_near_violations(&by_driver, cfg);

    AuditReport {
        checks,
        near_violations,
    }
}

/// 1. COVERAGE: every forecast tour has exactly one assignment.
fn check_coverage(assignments: &[Assignment], forecast_tours: &[Tour]) -> AuditResult {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for a in assignments {
        *counts.entry(a.tour_instance_id.as_str()).or_default() += 1;
    }

    let mut violations = Vec::new();
    for t in forecast_tours {
        match counts.get(t.id.as_str()) {
            None => violations.push(format!("Tour {} has no assignment", t.id)),
            Some(1) => {}
            Some(n) => violations.push(format!("Tour {} assigned {} times", t.id, n)),
        }
    }
    let known: HashMap<&str, ()> = forecast_tours.iter().map(|t| (t.id.as_str(), ())).collect();
    for a in assignments {
        if !known.contains_key(a.tour_instance_id.as_str()) {
            violations.push(format!(
                "Assignment references unknown tour {}",
                a.tour_instance_id
            ));
        }
    }
    violations.sort();
    violations.dedup();
    AuditResult::from_violations(AuditCheckKind::Coverage, violations)
}

/// 2. OVERLAP: within (driver, day), assigned spans never intersect.
fn check_overlap(assignments: &[Assignment]) -> AuditResult {
    let mut by_key: BTreeMap<(String, u8), Vec<&Assignment>> = BTreeMap::new();
    for a in assignments {
        by_key
            .entry((a.driver_id.clone(), a.day.index()))
            .or_default()
            .push(a);
    }

    let mut violations = Vec::new();
    for ((driver, day), mut spans) in by_key {
        spans.sort_by_key(|a| a.start_min);
        for pair in spans.windows(2) {
            if pair[0].end_min > pair[1].start_min {
                violations.push(format!(
                    "Driver {} day {}: {} overlaps {}",
                    driver, day, pair[0].tour_instance_id, pair[1].tour_instance_id
                ));
            }
        }
    }
    AuditResult::from_violations(AuditCheckKind::Overlap, violations)
}

/// 3. REST: rest between consecutive working days meets the floor (heavy
/// floor after a 3-tour day).
fn check_rest(by_driver: &BTreeMap<String, [DayLoad; 7]>, cfg: &SolverConfig) -> AuditResult {
    let mut violations = Vec::new();
    for (driver, days) in by_driver {
        for d in 0..6usize {
            let (cur, next) = (&days[d], &days[d + 1]);
            if !cur.present || !next.present {
                continue;
            }
            let rest = next.first_start + DAY_MINUTES - cur.last_end;
            let required = if cur.tours >= 3 {
                cfg.heavy_rest_min.max(cfg.min_rest_min)
            } else {
                cfg.min_rest_min
            };
            if rest < required {
                violations.push(format!(
                    "Driver {} rest day {}->{}: {} min < {} min",
                    driver,
                    d,
                    d + 1,
                    rest,
                    required
                ));
            }
        }
    }
    AuditResult::from_violations(AuditCheckKind::Rest, violations)
}

/// 4. SPAN_REGULAR: days without split or 3er blocks stay within 14h.
fn check_span_regular(by_driver: &BTreeMap<String, [DayLoad; 7]>, cfg: &SolverConfig) -> AuditResult {
    let mut violations = Vec::new();
    for (driver, days) in by_driver {
        for (d, load) in days.iter().enumerate() {
            if !load.present || load.has_split || load.has_heavy {
                continue;
            }
            let span = load.last_end - load.first_start;
            if span > cfg.block_rules.span_regular_max {
                violations.push(format!(
                    "Driver {} day {}: span {} min > {} min",
                    driver, d, span, cfg.block_rules.span_regular_max
                ));
            }
        }
    }
    AuditResult::from_violations(AuditCheckKind::SpanRegular, violations)
}

/// 5. SPAN_SPLIT: split and 3er days stay within 16h.
fn check_span_split(by_driver: &BTreeMap<String, [DayLoad; 7]>, cfg: &SolverConfig) -> AuditResult {
    let mut violations = Vec::new();
    for (driver, days) in by_driver {
        for (d, load) in days.iter().enumerate() {
            if !load.present || !(load.has_split || load.has_heavy) {
                continue;
            }
            let span = load.last_end - load.first_start;
            if span > cfg.block_rules.span_split_max {
                violations.push(format!(
                    "Driver {} day {}: split-day span {} min > {} min",
                    driver, d, span, cfg.block_rules.span_split_max
                ));
            }
        }
    }
    AuditResult::from_violations(AuditCheckKind::SpanSplit, violations)
}

/// 6. FATIGUE: no consecutive heavy days; the day after a heavy day
/// carries at most two tours.
fn check_fatigue(by_driver: &BTreeMap<String, [DayLoad; 7]>, cfg: &SolverConfig) -> AuditResult {
    let mut violations = Vec::new();
    for (driver, days) in by_driver {
        for d in 0..6usize {
            let (cur, next) = (&days[d], &days[d + 1]);
            if !cur.present || !next.present || cur.tours < 3 {
                continue;
            }
            if next.tours >= 3 {
                violations.push(format!(
                    "Driver {} heavy days {} and {} back to back",
                    driver,
                    d,
                    d + 1
                ));
            } else if next.tours > cfg.max_tours_after_heavy {
                violations.push(format!(
                    "Driver {} day {} after heavy day has {} tours > {}",
                    driver,
                    d + 1,
                    next.tours,
                    cfg.max_tours_after_heavy
                ));
            }
        }
    }
    AuditResult::from_violations(AuditCheckKind::Fatigue, violations)
}

/// 7. WEEKLY_HOURS: total work per driver stays under the weekly cap.
fn check_weekly_hours(assignments: &[Assignment], cfg: &SolverConfig) -> AuditResult {
    let mut totals: BTreeMap<&str, i32> = BTreeMap::new();
    for a in assignments {
        let dur = if a.crosses_midnight {
            a.end_min + DAY_MINUTES - a.start_min
        } else {
            a.end_min - a.start_min
        };
        *totals.entry(a.driver_id.as_str()).or_default() += dur;
    }

    let mut violations = Vec::new();
    for (driver, total) in totals {
        if total > cfg.fte_max_week_min {
            violations.push(format!(
                "Driver {} works {} min > {} min cap",
                driver, total, cfg.fte_max_week_min
            ));
        }
    }
    AuditResult::from_violations(AuditCheckKind::WeeklyHours, violations)
}

/// Yellow-zone side channel: the same rules with tightened thresholds.
/// Rest inside [floor, floor+60) and regular spans inside (12h, 14h] warn.
fn collect_near_violations(
    by_driver: &BTreeMap<String, [DayLoad; 7]>,
    cfg: &SolverConfig,
) -> Vec<NearViolation> {
    let mut warnings = Vec::new();
    for (driver, days) in by_driver {
        for d in 0..6usize {
            let (cur, next) = (&days[d], &days[d + 1]);
            if cur.present && next.present {
                let rest = next.first_start + DAY_MINUTES - cur.last_end;
                if rest >= cfg.min_rest_min && rest < cfg.min_rest_min + 60 {
                    warnings.push(NearViolation {
                        driver_id: driver.clone(),
                        day: Weekday::from_index(d as u8).expect("d < 6"),
                        kind: "TIGHT_REST".to_string(),
                        detail: format!("rest {} min within 60 min of floor", rest),
                    });
                }
            }
        }
        for (d, load) in days.iter().enumerate() {
            if !load.present || load.has_split || load.has_heavy {
                continue;
            }
            let span = load.last_end - load.first_start;
            if span > 12 * 60 && span <= cfg.block_rules.span_regular_max {
                warnings.push(NearViolation {
                    driver_id: driver.clone(),
                    day: Weekday::from_index(d as u8).expect("d < 7"),
                    kind: "LONG_SPAN".to_string(),
                    detail: format!("span {} min inside the 12-14h warning band", span),
                });
            }
        }
    }
    warnings
}
