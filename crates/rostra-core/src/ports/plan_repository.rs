use async_trait::async_trait;

use crate::domain::models::{Assignment, PlanSnapshot, PlanStatus, PlanVersion};
use crate::repair::ChurnMetrics;

/// Fields for a fresh plan row; the store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewPlanVersion {
    pub forecast_version_id: i64,
    pub tenant_id: String,
    pub site_id: String,
    pub seed: u32,
    pub solver_config_hash: String,
    pub input_hash: String,
    pub is_repair: bool,
    pub parent_plan_id: Option<i64>,
    pub absent_driver_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RepairCommitRequest {
    pub parent_plan_id: i64,
    pub idempotency_key: String,
    pub payload_hash: String,
    pub absent_driver_ids: Vec<String>,
    pub assignments: Vec<Assignment>,
    pub churn: ChurnMetrics,
}

#[derive(Debug, Clone)]
pub struct RepairCommitResult {
    pub plan_version_id: i64,
    /// True when an identical commit was replayed instead of re-executed.
    pub replayed: bool,
}

/// Storage port for the plan lifecycle. Implementations enforce the state
/// machine and the snapshot immutability contract at the storage layer.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Register a forecast version; `input_hash` is unique per tenant.
    async fn create_forecast_version(
        &self,
        tenant_id: &str,
        site_id: &str,
        source: &str,
        input_hash: &str,
    ) -> anyhow::Result<i64>;

    async fn create_plan_version(&self, new: &NewPlanVersion) -> anyhow::Result<i64>;

    async fn get_plan_version(&self, plan_version_id: i64) -> anyhow::Result<Option<PlanVersion>>;

    /// Insert assignments; unique on (plan_version_id, tour_instance_id).
    async fn save_assignments(
        &self,
        plan_version_id: i64,
        assignments: &[Assignment],
    ) -> anyhow::Result<()>;

    async fn get_assignments(&self, plan_version_id: i64) -> anyhow::Result<Vec<Assignment>>;

    /// Guarded transition; rejects anything outside the transition table.
    async fn transition_status(&self, plan_version_id: i64, to: PlanStatus) -> anyhow::Result<()>;

    /// SOLVED -> LOCKED with the locking actor recorded.
    async fn lock_plan(&self, plan_version_id: i64, actor: &str) -> anyhow::Result<()>;

    /// Set the plan's output hash once solved.
    async fn set_output_hash(&self, plan_version_id: i64, output_hash: &str)
        -> anyhow::Result<()>;

    /// LOCKED -> PUBLISHED and snapshot creation in one transaction.
    async fn publish_plan(&self, plan_version_id: i64) -> anyhow::Result<PlanSnapshot>;

    async fn latest_snapshot(
        &self,
        plan_version_id: i64,
    ) -> anyhow::Result<Option<PlanSnapshot>>;

    /// Transactional repair commit with idempotency-key semantics.
    async fn commit_repair(
        &self,
        request: &RepairCommitRequest,
    ) -> anyhow::Result<RepairCommitResult>;
}
