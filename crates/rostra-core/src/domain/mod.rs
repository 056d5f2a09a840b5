pub mod column;
pub mod errors;
pub mod models;

#[cfg(test)]
mod column_tests;

pub use column::{
    build_column, can_add_block, validate_roster_constraints, BlockInfo, ColumnSignature, DayStat,
    RosterColumn, RosterRules,
};
pub use errors::{Result, SolveError};
pub use models::{
    sort_assignments, AbortReason, Assignment, Block, BlockRules, BlockType, DriverRoster,
    PauseZone, PlanSnapshot, PlanStatus, PlanVersion, RosterType, SlotState, Tour, Weekday,
    DAY_MINUTES, MAX_TOUR_DURATION_MIN,
};
