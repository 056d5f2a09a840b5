use serde::{Deserialize, Serialize};

use crate::domain::column::RosterRules;
use crate::domain::models::BlockRules;
use crate::hash;

/// Complete solver configuration.
///
/// Everything that influences the output is a field here so that
/// `config_hash()` pins the whole parameter set. Budgets that must stay
/// deterministic (LNS iterations, branch-and-bound nodes) are counts, not
/// wall-clock; `time_limit_secs` only gates optional phases between stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub block_rules: BlockRules,

    // Rest & fatigue
    pub min_rest_min: i32,
    /// Rest floor after a heavy (3-tour) day. Tenant policy may raise this
    /// to 14h; the default follows the 11h tuning.
    pub heavy_rest_min: i32,
    pub max_tours_per_day: u8,
    pub max_tours_after_heavy: u8,

    // Week-hour bounds
    pub fte_max_week_min: i32,
    /// Soft FTE fill target; shortfall is penalized in stage 2.
    pub fte_soft_target_min: i32,
    pub pt_max_week_min: i32,
    /// Soft PT floor; time below it is penalized in stage 2.
    pub pt_min_week_min: i32,
    /// Lower edge of the randomized packing target drawn per built column.
    pub pack_target_min: i32,

    // Column generation
    pub pool_cap: usize,
    pub initial_pool_target: usize,
    pub colgen_rounds: usize,
    pub columns_per_round: usize,
    pub pt_pool_target: usize,

    // Greedy assigner
    /// 0 = derive from total workload / soft target.
    pub target_ftes: usize,
    pub fte_overflow_cap: usize,
    pub lns_iterations: usize,

    // Set-partitioning master
    pub master_node_cap: u64,
    pub stage2_node_cap: u64,
    pub w_singleton: i64,
    pub w_underfill_per_min: i64,
    pub w_pt_day: i64,
    pub w_pt_below_min: i64,

    // Repair & lifecycle
    pub freeze_horizon_min: i32,
    pub churn_warn_percent: f64,
    pub repair_top_k: usize,

    // Cooperative cancellation between pipeline phases
    pub time_limit_secs: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            block_rules: BlockRules::default(),
            min_rest_min: 660,
            heavy_rest_min: 660,
            max_tours_per_day: 3,
            max_tours_after_heavy: 2,
            fte_max_week_min: 55 * 60,
            fte_soft_target_min: 40 * 60,
            pt_max_week_min: 40 * 60,
            pt_min_week_min: 8 * 60,
            pack_target_min: 48 * 60,
            pool_cap: 20_000,
            initial_pool_target: 5_000,
            colgen_rounds: 10,
            columns_per_round: 100,
            pt_pool_target: 500,
            target_ftes: 0,
            fte_overflow_cap: 10,
            lns_iterations: 200,
            master_node_cap: 200_000,
            stage2_node_cap: 100_000,
            w_singleton: 1_000,
            w_underfill_per_min: 1,
            w_pt_day: 50,
            w_pt_below_min: 500,
            freeze_horizon_min: 720,
            churn_warn_percent: 10.0,
            repair_top_k: 3,
            time_limit_secs: 60.0,
        }
    }
}

impl SolverConfig {
    /// SHA-256 over the key-sorted JSON rendering of the full config.
    pub fn config_hash(&self) -> String {
        hash::sha256_hex(hash::canonical_json(self).as_bytes())
    }

    /// The subset of rules the column validator needs.
    pub fn roster_rules(&self) -> RosterRules {
        RosterRules {
            min_rest_min: self.min_rest_min,
            heavy_rest_min: self.heavy_rest_min,
            max_tours_per_day: self.max_tours_per_day,
            max_tours_after_heavy: self.max_tours_after_heavy,
            fte_max_week_min: self.fte_max_week_min,
            pt_max_week_min: self.pt_max_week_min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_hash_is_stable_and_sensitive() {
        let a = SolverConfig::default();
        let b = SolverConfig::default();
        assert_eq!(a.config_hash(), b.config_hash());

        let mut c = SolverConfig::default();
        c.heavy_rest_min = 840;
        assert_ne!(a.config_hash(), c.config_hash());
    }
}
