/// Roster columns: candidate weekly schedules for one driver.
///
/// A column is validated against all hard constraints before it may enter
/// the generator pool; the master problem only ever sees valid columns.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::models::{Block, BlockType, RosterType, Weekday, DAY_MINUTES};

/// Hard-constraint parameters for column validation.
#[derive(Debug, Clone)]
pub struct RosterRules {
    pub min_rest_min: i32,
    pub heavy_rest_min: i32,
    pub max_tours_per_day: u8,
    pub max_tours_after_heavy: u8,
    pub fte_max_week_min: i32,
    pub pt_max_week_min: i32,
}

impl RosterRules {
    pub fn week_cap(&self, roster_type: RosterType) -> i32 {
        match roster_type {
            RosterType::Fte => self.fte_max_week_min,
            RosterType::Pt => self.pt_max_week_min,
        }
    }

    fn rest_floor(&self, prev_day_tours: u8) -> i32 {
        if prev_day_tours >= 3 {
            self.heavy_rest_min.max(self.min_rest_min)
        } else {
            self.min_rest_min
        }
    }
}

/// Flattened block metadata for fast validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub block_id: String,
    pub day: Weekday,
    pub start_min: i32,
    pub end_min: i32,
    pub work_min: i32,
    pub tours: u8,
    pub tour_ids: Vec<String>,
    pub block_type: BlockType,
}

impl From<&Block> for BlockInfo {
    fn from(b: &Block) -> Self {
        BlockInfo {
            block_id: b.id.clone(),
            day: b.day,
            start_min: b.first_start,
            end_min: b.last_end,
            work_min: b.total_work_min,
            tours: b.tour_count() as u8,
            tour_ids: b.tours.iter().map(|t| t.id.clone()).collect(),
            block_type: b.block_type,
        }
    }
}

impl BlockInfo {
    pub fn overlaps(&self, other: &BlockInfo) -> bool {
        self.day == other.day && self.end_min > other.start_min && self.start_min < other.end_min
    }
}

/// Per-day aggregate of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStat {
    pub day: Weekday,
    pub tours: u8,
    pub first_start: i32,
    pub last_end: i32,
}

#[derive(Debug, Clone, Copy, Default)]
struct DayAgg {
    tours: u8,
    first_start: i32,
    last_end: i32,
    present: bool,
}

fn day_aggregates(blocks: &[BlockInfo]) -> [DayAgg; 7] {
    let mut days = [DayAgg::default(); 7];
    for b in blocks {
        let d = &mut days[b.day.index() as usize];
        if d.present {
            d.tours += b.tours;
            d.first_start = d.first_start.min(b.start_min);
            d.last_end = d.last_end.max(b.end_min);
        } else {
            *d = DayAgg {
                tours: b.tours,
                first_start: b.start_min,
                last_end: b.end_min,
                present: true,
            };
        }
    }
    days
}

/// Canonical dedup key: identical signatures are the same column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnSignature {
    pub block_ids: Vec<String>,
    pub total_min: i32,
    pub day_tours: Vec<(u8, u8)>,
    pub roster_type: RosterType,
}

/// A candidate weekly schedule for one driver. Never mutated after
/// insertion into the pool.
#[derive(Debug, Clone)]
pub struct RosterColumn {
    pub roster_id: String,
    pub block_ids: BTreeSet<String>,
    pub covered_tour_ids: BTreeSet<String>,
    pub total_min: i32,
    pub day_stats: Vec<DayStat>,
    pub roster_type: RosterType,
    pub is_valid: bool,
    pub violations: Vec<String>,
    pub signature: ColumnSignature,
}

impl RosterColumn {
    pub fn total_hours(&self) -> f64 {
        f64::from(self.total_min) / 60.0
    }

    pub fn num_blocks(&self) -> usize {
        self.block_ids.len()
    }

    /// A singleton column covers exactly one block (emergency coverage).
    pub fn is_singleton(&self) -> bool {
        self.block_ids.len() == 1
    }

    pub fn contains_block(&self, block_id: &str) -> bool {
        self.block_ids.contains(block_id)
    }

    pub fn working_days(&self) -> usize {
        self.day_stats.len()
    }
}

/// Build and validate a column from block infos.
pub fn build_column(
    roster_id: impl Into<String>,
    blocks: &[BlockInfo],
    roster_type: RosterType,
    rules: &RosterRules,
) -> RosterColumn {
    let roster_id = roster_id.into();

    if blocks.is_empty() {
        return RosterColumn {
            roster_id,
            block_ids: BTreeSet::new(),
            covered_tour_ids: BTreeSet::new(),
            total_min: 0,
            day_stats: Vec::new(),
            roster_type,
            is_valid: false,
            violations: vec!["Empty roster".to_string()],
            signature: ColumnSignature {
                block_ids: Vec::new(),
                total_min: 0,
                day_tours: Vec::new(),
                roster_type,
            },
        };
    }

    let block_ids: BTreeSet<String> = blocks.iter().map(|b| b.block_id.clone()).collect();
    let covered_tour_ids: BTreeSet<String> = blocks
        .iter()
        .flat_map(|b| b.tour_ids.iter().cloned())
        .collect();
    let total_min: i32 = blocks.iter().map(|b| b.work_min).sum();

    let days = day_aggregates(blocks);
    let day_stats: Vec<DayStat> = days
        .iter()
        .enumerate()
        .filter(|(_, d)| d.present)
        .map(|(i, d)| DayStat {
            day: Weekday::from_index(i as u8).expect("index < 7"),
            tours: d.tours,
            first_start: d.first_start,
            last_end: d.last_end,
        })
        .collect();

    let violations = validate_roster_constraints(blocks, total_min, roster_type, rules);
    let is_valid = violations.is_empty();

    let signature = ColumnSignature {
        block_ids: block_ids.iter().cloned().collect(),
        total_min,
        day_tours: day_stats.iter().map(|s| (s.day.index(), s.tours)).collect(),
        roster_type,
    };

    RosterColumn {
        roster_id,
        block_ids,
        covered_tour_ids,
        total_min,
        day_stats,
        roster_type,
        is_valid,
        violations,
        signature,
    }
}

/// Validate all hard constraints. Empty result = valid.
///
/// 1. No overlap within a day.
/// 2. At most `max_tours_per_day` tours per day.
/// 3. Rest floor between consecutive working days (heavy floor after a
///    3-tour day).
/// 4. After a heavy day, the next day carries at most 2 tours.
/// 5. Week cap: FTE hard max, PT hard ceiling. FTE minimum hours stay a
///    soft objective and are never checked here.
pub fn validate_roster_constraints(
    blocks: &[BlockInfo],
    total_min: i32,
    roster_type: RosterType,
    rules: &RosterRules,
) -> Vec<String> {
    let mut violations = Vec::new();
    let days = day_aggregates(blocks);

    // 1. Overlap within a day
    for day_idx in 0..7u8 {
        let mut day_blocks: Vec<&BlockInfo> = blocks
            .iter()
            .filter(|b| b.day.index() == day_idx)
            .collect();
        if day_blocks.len() < 2 {
            continue;
        }
        day_blocks.sort_by_key(|b| b.start_min);
        for pair in day_blocks.windows(2) {
            if pair[0].end_min > pair[1].start_min {
                violations.push(format!(
                    "Overlap on day {}: {} ends at {} but {} starts at {}",
                    day_idx, pair[0].block_id, pair[0].end_min, pair[1].block_id, pair[1].start_min
                ));
            }
        }
    }

    // 2. Tours per day
    for (idx, d) in days.iter().enumerate() {
        if d.present && d.tours > rules.max_tours_per_day {
            violations.push(format!(
                "Day {} has {} tours > max {}",
                idx, d.tours, rules.max_tours_per_day
            ));
        }
    }

    // 3+4. Rest and fatigue between consecutive working days
    for d in 0..6usize {
        let (cur, next) = (&days[d], &days[d + 1]);
        if !cur.present || !next.present {
            continue;
        }

        let rest = next.first_start + DAY_MINUTES - cur.last_end;
        let required = rules.rest_floor(cur.tours);
        if rest < required {
            violations.push(format!(
                "Rest between day {} and {}: {} min < {} min",
                d,
                d + 1,
                rest,
                required
            ));
        }

        if cur.tours >= 3 && next.tours > rules.max_tours_after_heavy {
            violations.push(format!(
                "Heavy day {}: next day has {} tours > max {}",
                d,
                next.tours,
                rules.max_tours_after_heavy
            ));
        }
    }

    // 5. Week cap
    let cap = rules.week_cap(roster_type);
    if total_min > cap {
        violations.push(format!(
            "Week minutes {} > {} cap {}",
            total_min,
            roster_type.as_str(),
            cap
        ));
    }

    violations
}

/// Constant-time incremental feasibility check used while building columns.
///
/// Checks in order: same-day overlap, day tour count, week cap, rest to the
/// previous day, rest to the next day, and the heavy-day successor limit in
/// both directions.
pub fn can_add_block(
    existing: &[BlockInfo],
    new_block: &BlockInfo,
    current_min: i32,
    roster_type: RosterType,
    rules: &RosterRules,
) -> Result<(), String> {
    let new_day = new_block.day.index() as usize;

    // 1. Overlap on the same day
    for b in existing.iter().filter(|b| b.day == new_block.day) {
        if new_block.overlaps(b) {
            return Err(format!("Overlap with {} on day {}", b.block_id, new_day));
        }
    }

    let days = day_aggregates(existing);

    // 2. Tours on the new day
    let day_tours = days[new_day].tours + new_block.tours;
    if day_tours > rules.max_tours_per_day {
        return Err(format!(
            "Day {} would have {} tours > {}",
            new_day, day_tours, rules.max_tours_per_day
        ));
    }

    // 3. Week cap
    let cap = rules.week_cap(roster_type);
    if current_min + new_block.work_min > cap {
        return Err(format!("Would exceed {} min week cap", cap));
    }

    // Aggregates for the new day including the candidate
    let cur_tours = day_tours;
    let cur_first = if days[new_day].present {
        days[new_day].first_start.min(new_block.start_min)
    } else {
        new_block.start_min
    };
    let cur_last = if days[new_day].present {
        days[new_day].last_end.max(new_block.end_min)
    } else {
        new_block.end_min
    };

    // 4. Rest to previous day
    if new_day > 0 {
        let prev = &days[new_day - 1];
        if prev.present {
            let rest = cur_first + DAY_MINUTES - prev.last_end;
            let required = rules.rest_floor(prev.tours);
            if rest < required {
                return Err(format!(
                    "Rest from day {}: {} min < {} min",
                    new_day - 1,
                    rest,
                    required
                ));
            }
            if prev.tours >= 3 && cur_tours > rules.max_tours_after_heavy {
                return Err(format!(
                    "After heavy day {}: {} tours > {}",
                    new_day - 1,
                    cur_tours,
                    rules.max_tours_after_heavy
                ));
            }
        }
    }

    // 5. Rest to next day
    if new_day < 6 {
        let next = &days[new_day + 1];
        if next.present {
            let rest = next.first_start + DAY_MINUTES - cur_last;
            let required = rules.rest_floor(cur_tours);
            if rest < required {
                return Err(format!(
                    "Rest to day {}: {} min < {} min",
                    new_day + 1,
                    rest,
                    required
                ));
            }
            if cur_tours >= 3 && next.tours > rules.max_tours_after_heavy {
                return Err(format!(
                    "Heavy day {}: next day has {} tours > {}",
                    new_day,
                    next.tours,
                    rules.max_tours_after_heavy
                ));
            }
        }
    }

    Ok(())
}
