use serde::{Deserialize, Serialize};

use crate::domain::errors::{Result, SolveError};
use crate::hash;

/// Minutes in a day. All times are minutes-of-day integers (0..1440).
pub const DAY_MINUTES: i32 = 1440;

/// Hard ceiling on a single tour's duration (16 h).
pub const MAX_TOUR_DURATION_MIN: i32 = 16 * 60;

// ============================================================================
// WEEKDAY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// 0 = Monday .. 6 = Sunday.
    pub fn index(self) -> u8 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
            Weekday::Sunday => 6,
        }
    }

    pub fn from_index(idx: u8) -> Option<Weekday> {
        Weekday::ALL.get(idx as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
            Weekday::Sunday => "Sun",
        }
    }

    /// German column header used in matrix.csv (Mo..So).
    pub fn matrix_abbr(self) -> &'static str {
        match self {
            Weekday::Monday => "Mo",
            Weekday::Tuesday => "Di",
            Weekday::Wednesday => "Mi",
            Weekday::Thursday => "Do",
            Weekday::Friday => "Fr",
            Weekday::Saturday => "Sa",
            Weekday::Sunday => "So",
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TOUR
// ============================================================================

/// An atomic delivery window. Immutable once referenced by any plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tour {
    pub id: String,
    pub day: Weekday,
    pub start_min: i32,
    pub end_min: i32,
    pub crosses_midnight: bool,
    pub depot: Option<String>,
    pub required_skill: Option<String>,
}

impl Tour {
    /// Build a tour, rejecting zero-length and over-long windows.
    pub fn new(
        id: impl Into<String>,
        day: Weekday,
        start_min: i32,
        end_min: i32,
        crosses_midnight: bool,
        depot: Option<String>,
        required_skill: Option<String>,
    ) -> Result<Tour> {
        let tour = Tour {
            id: id.into(),
            day,
            start_min,
            end_min,
            crosses_midnight,
            depot,
            required_skill,
        };

        if !(0..DAY_MINUTES).contains(&start_min) || !(0..=DAY_MINUTES).contains(&end_min) {
            return Err(SolveError::Validation(format!(
                "Tour {}: times must be minutes-of-day (got {}..{})",
                tour.id, start_min, end_min
            )));
        }

        let duration = tour.duration_min();
        if duration <= 0 {
            return Err(SolveError::Validation(format!(
                "Tour {}: duration must be positive (start {}, end {})",
                tour.id, start_min, end_min
            )));
        }
        if duration > MAX_TOUR_DURATION_MIN {
            return Err(SolveError::Validation(format!(
                "Tour {}: duration {} min exceeds 16h",
                tour.id, duration
            )));
        }

        Ok(tour)
    }

    pub fn duration_min(&self) -> i32 {
        if self.crosses_midnight {
            self.end_min + DAY_MINUTES - self.start_min
        } else {
            self.end_min - self.start_min
        }
    }

    /// Stable hash over day + window + depot, used to match tours across
    /// forecast versions.
    pub fn fingerprint(&self) -> String {
        let depot = self.depot.as_deref().unwrap_or("-");
        let text = format!(
            "{}|{}|{}|{}",
            self.day.index(),
            self.start_min,
            self.end_min,
            depot
        );
        hash::sha256_hex(text.as_bytes())[..16].to_string()
    }
}

// ============================================================================
// BLOCK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Single,
    TwoRegular,
    TwoSplit,
    Three,
}

impl BlockType {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Single => "1er",
            BlockType::TwoRegular => "2er-regular",
            BlockType::TwoSplit => "2er-split",
            BlockType::Three => "3er",
        }
    }

    pub fn parse(s: &str) -> Option<BlockType> {
        match s {
            "1er" => Some(BlockType::Single),
            "2er-regular" => Some(BlockType::TwoRegular),
            "2er-split" => Some(BlockType::TwoSplit),
            "3er" => Some(BlockType::Three),
            _ => None,
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PauseZone {
    Regular,
    Split,
}

/// Pause windows and span caps governing block formation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRules {
    pub gap_regular_min: i32,
    pub gap_regular_max: i32,
    pub gap_split_min: i32,
    pub gap_split_max: i32,
    pub span_regular_max: i32,
    pub span_split_max: i32,
}

impl Default for BlockRules {
    fn default() -> Self {
        BlockRules {
            gap_regular_min: 30,
            gap_regular_max: 60,
            gap_split_min: 240,
            gap_split_max: 360,
            span_regular_max: 14 * 60,
            span_split_max: 16 * 60,
        }
    }
}

impl BlockRules {
    pub fn is_regular_gap(&self, gap: i32) -> bool {
        (self.gap_regular_min..=self.gap_regular_max).contains(&gap)
    }

    pub fn is_split_gap(&self, gap: i32) -> bool {
        (self.gap_split_min..=self.gap_split_max).contains(&gap)
    }
}

/// A legal daily work unit of 1-3 consecutive tours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub day: Weekday,
    pub tours: Vec<Tour>,
    pub block_type: BlockType,
    pub pause_zone: PauseZone,
    pub first_start: i32,
    pub last_end: i32,
    pub total_work_min: i32,
    pub span_min: i32,
}

impl Block {
    /// Assemble a block from tours, deriving its type from the inter-tour
    /// gaps and rejecting anything outside the legal windows.
    pub fn from_tours(id: impl Into<String>, tours: Vec<Tour>, rules: &BlockRules) -> Result<Block> {
        let id = id.into();

        if tours.is_empty() || tours.len() > 3 {
            return Err(SolveError::Validation(format!(
                "Block {}: must hold 1-3 tours, got {}",
                id,
                tours.len()
            )));
        }

        let day = tours[0].day;
        if tours.iter().any(|t| t.day != day) {
            return Err(SolveError::Validation(format!(
                "Block {}: tours span multiple days",
                id
            )));
        }
        if tours.len() > 1 && tours.iter().any(|t| t.crosses_midnight) {
            return Err(SolveError::Validation(format!(
                "Block {}: cross-midnight tours never chain",
                id
            )));
        }

        let mut tours = tours;
        tours.sort_by(|a, b| a.start_min.cmp(&b.start_min).then(a.id.cmp(&b.id)));

        // Classify gaps
        let mut gaps = Vec::new();
        for pair in tours.windows(2) {
            let gap = pair[1].start_min - pair[0].end_min;
            if gap < 0 {
                return Err(SolveError::Validation(format!(
                    "Block {}: tours {} and {} overlap",
                    id, pair[0].id, pair[1].id
                )));
            }
            gaps.push(gap);
        }

        let (block_type, pause_zone) = match gaps.as_slice() {
            [] => (BlockType::Single, PauseZone::Regular),
            [g] if rules.is_regular_gap(*g) => (BlockType::TwoRegular, PauseZone::Regular),
            [g] if rules.is_split_gap(*g) => (BlockType::TwoSplit, PauseZone::Split),
            [g1, g2] if rules.is_regular_gap(*g1) && rules.is_regular_gap(*g2) => {
                (BlockType::Three, PauseZone::Regular)
            }
            _ => {
                return Err(SolveError::Validation(format!(
                    "Block {}: gaps {:?} match no legal pause window",
                    id, gaps
                )))
            }
        };

        let first_start = tours[0].start_min;
        let last = tours.last().expect("non-empty");
        let last_end = if last.crosses_midnight {
            last.end_min + DAY_MINUTES
        } else {
            last.end_min
        };
        let span_min = last_end - first_start;
        let total_work_min: i32 = tours.iter().map(Tour::duration_min).sum();

        // Span caps: 14h for 2er-regular, 16h for split and 3er. Single
        // blocks inherit the tour duration (the audit flags outliers).
        let span_cap = match block_type {
            BlockType::Single => MAX_TOUR_DURATION_MIN,
            BlockType::TwoRegular => rules.span_regular_max,
            BlockType::TwoSplit | BlockType::Three => rules.span_split_max,
        };
        if span_min > span_cap {
            return Err(SolveError::Validation(format!(
                "Block {}: span {} min exceeds cap {} for {}",
                id, span_min, span_cap, block_type
            )));
        }

        Ok(Block {
            id,
            day,
            tours,
            block_type,
            pause_zone,
            first_start,
            last_end,
            total_work_min,
            span_min,
        })
    }

    pub fn tour_count(&self) -> usize {
        self.tours.len()
    }

    /// A heavy block carries three tours.
    pub fn is_heavy(&self) -> bool {
        self.block_type == BlockType::Three
    }
}

// ============================================================================
// ROSTER TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RosterType {
    Fte,
    Pt,
}

impl RosterType {
    pub fn as_str(self) -> &'static str {
        match self {
            RosterType::Fte => "FTE",
            RosterType::Pt => "PT",
        }
    }

    pub fn parse(s: &str) -> Option<RosterType> {
        match s {
            "FTE" => Some(RosterType::Fte),
            "PT" => Some(RosterType::Pt),
            _ => None,
        }
    }
}

impl std::fmt::Display for RosterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ASSIGNMENT & DRIVER ROSTER
// ============================================================================

/// Binds one tour instance to a driver within a plan.
///
/// `plan_version_id` is 0 until the assignment is persisted; the output
/// hash never includes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub plan_version_id: i64,
    pub driver_id: String,
    pub tour_instance_id: String,
    pub day: Weekday,
    pub block_id: String,
    pub block_type: BlockType,
    pub start_min: i32,
    pub end_min: i32,
    pub crosses_midnight: bool,
}

/// One driver's solved week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverRoster {
    pub driver_id: String,
    pub roster_type: RosterType,
    pub blocks: Vec<Block>,
    pub total_min: i32,
    pub days_worked: u8,
}

impl DriverRoster {
    pub fn total_hours(&self) -> f64 {
        f64::from(self.total_min) / 60.0
    }
}

// ============================================================================
// PLAN LIFECYCLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Draft,
    Solving,
    Solved,
    Locked,
    Published,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Draft => "DRAFT",
            PlanStatus::Solving => "SOLVING",
            PlanStatus::Solved => "SOLVED",
            PlanStatus::Locked => "LOCKED",
            PlanStatus::Published => "PUBLISHED",
        }
    }

    pub fn parse(s: &str) -> Option<PlanStatus> {
        match s {
            "DRAFT" => Some(PlanStatus::Draft),
            "SOLVING" => Some(PlanStatus::Solving),
            "SOLVED" => Some(PlanStatus::Solved),
            "LOCKED" => Some(PlanStatus::Locked),
            "PUBLISHED" => Some(PlanStatus::Published),
            _ => None,
        }
    }

    /// The only legal moves. PUBLISHED is terminal, nothing walks backward.
    pub fn can_transition(self, to: PlanStatus) -> bool {
        matches!(
            (self, to),
            (PlanStatus::Draft, PlanStatus::Solving)
                | (PlanStatus::Solving, PlanStatus::Solved)
                | (PlanStatus::Solved, PlanStatus::Locked)
                | (PlanStatus::Locked, PlanStatus::Published)
        )
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary audited artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanVersion {
    pub id: i64,
    pub forecast_version_id: i64,
    pub tenant_id: String,
    pub site_id: String,
    pub seed: u32,
    pub solver_config_hash: String,
    pub input_hash: String,
    pub output_hash: Option<String>,
    pub status: PlanStatus,
    pub is_repair: bool,
    pub parent_plan_id: Option<i64>,
    pub absent_driver_ids: Vec<String>,
    pub locked_by: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Immutable point-in-time capture of a plan's assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub snapshot_id: i64,
    pub plan_version_id: i64,
    pub version_number: i32,
    pub assignments: Vec<Assignment>,
    pub content_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// DAILY SLOT STATE MACHINE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotState {
    Planned,
    Assigned,
    Hold,
    Released,
    Executed,
    Aborted,
}

impl SlotState {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotState::Planned => "PLANNED",
            SlotState::Assigned => "ASSIGNED",
            SlotState::Hold => "HOLD",
            SlotState::Released => "RELEASED",
            SlotState::Executed => "EXECUTED",
            SlotState::Aborted => "ABORTED",
        }
    }

    pub fn parse(s: &str) -> Option<SlotState> {
        match s {
            "PLANNED" => Some(SlotState::Planned),
            "ASSIGNED" => Some(SlotState::Assigned),
            "HOLD" => Some(SlotState::Hold),
            "RELEASED" => Some(SlotState::Released),
            "EXECUTED" => Some(SlotState::Executed),
            "ABORTED" => Some(SlotState::Aborted),
            _ => None,
        }
    }

    /// Slot transition table. ASSIGNED -> HOLD is forbidden: the slot must
    /// travel through unassign (RELEASED) first.
    pub fn can_transition(self, to: SlotState) -> bool {
        matches!(
            (self, to),
            (SlotState::Planned, SlotState::Assigned)
                | (SlotState::Planned, SlotState::Hold)
                | (SlotState::Planned, SlotState::Aborted)
                | (SlotState::Assigned, SlotState::Executed)
                | (SlotState::Assigned, SlotState::Aborted)
                | (SlotState::Assigned, SlotState::Released)
                | (SlotState::Hold, SlotState::Released)
                | (SlotState::Released, SlotState::Hold)
                | (SlotState::Released, SlotState::Assigned)
                | (SlotState::Released, SlotState::Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SlotState::Executed | SlotState::Aborted)
    }
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mandatory reason code on ABORTED slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortReason {
    LowDemand,
    Weather,
    Vehicle,
    OpsDecision,
    Other,
}

impl AbortReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AbortReason::LowDemand => "LOW_DEMAND",
            AbortReason::Weather => "WEATHER",
            AbortReason::Vehicle => "VEHICLE",
            AbortReason::OpsDecision => "OPS_DECISION",
            AbortReason::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<AbortReason> {
        match s {
            "LOW_DEMAND" => Some(AbortReason::LowDemand),
            "WEATHER" => Some(AbortReason::Weather),
            "VEHICLE" => Some(AbortReason::Vehicle),
            "OPS_DECISION" => Some(AbortReason::OpsDecision),
            "OTHER" => Some(AbortReason::Other),
            _ => None,
        }
    }
}

/// Sort key used everywhere an assignment list is hashed or exported.
pub fn sort_assignments(assignments: &mut [Assignment]) {
    assignments.sort_by(|a, b| {
        a.driver_id
            .cmp(&b.driver_id)
            .then(a.day.index().cmp(&b.day.index()))
            .then(a.tour_instance_id.cmp(&b.tour_instance_id))
    });
}
