pub mod colgen;
pub mod greedy;
pub mod master;
pub mod partition;
pub mod pipeline;

#[cfg(test)]
mod colgen_tests;
#[cfg(test)]
mod greedy_tests;
#[cfg(test)]
mod master_tests;
#[cfg(test)]
mod partition_tests;

pub use colgen::{ColumnGenerator, PoolStats};
pub use greedy::{GreedySolver, GreedyStats};
pub use master::{
    filter_valid_hint_columns, solve_lexico, MasterOutcome, MasterSolution, MasterStatus,
    RelaxedDiagnostic,
};
pub use partition::partition;
pub use pipeline::{rosters_to_assignments, solve_forecast, SolveKpis, SolveOutcome, SolveStatus};
