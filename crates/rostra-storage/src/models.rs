use chrono::{DateTime, Utc};
use rostra_core::{Assignment, BlockType, PlanStatus, PlanVersion, Weekday};
use sqlx::FromRow;

use crate::error::{Result, StorageError};

#[derive(Debug, Clone, FromRow)]
pub struct PlanVersionRow {
    pub id: i64,
    pub forecast_version_id: i64,
    pub tenant_id: String,
    pub site_id: String,
    pub seed: i64,
    pub solver_config_hash: String,
    pub input_hash: String,
    pub output_hash: Option<String>,
    pub status: String,
    pub is_repair: i64,
    pub parent_plan_id: Option<i64>,
    pub absent_driver_ids: String,
    pub locked_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PlanVersionRow {
    pub fn into_domain(self) -> Result<PlanVersion> {
        let status = PlanStatus::parse(&self.status)
            .ok_or_else(|| StorageError::Other(format!("bad plan status: {}", self.status)))?;
        let absent_driver_ids: Vec<String> = serde_json::from_str(&self.absent_driver_ids)
            .map_err(|e| StorageError::Other(format!("absent_driver_ids: {e}")))?;

        Ok(PlanVersion {
            id: self.id,
            forecast_version_id: self.forecast_version_id,
            tenant_id: self.tenant_id,
            site_id: self.site_id,
            seed: self.seed as u32,
            solver_config_hash: self.solver_config_hash,
            input_hash: self.input_hash,
            output_hash: self.output_hash,
            status,
            is_repair: self.is_repair != 0,
            parent_plan_id: self.parent_plan_id,
            absent_driver_ids,
            locked_by: self.locked_by,
            created_at: millis_to_utc(self.created_at),
            updated_at: millis_to_utc(self.updated_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub plan_version_id: i64,
    pub driver_id: String,
    pub tour_instance_id: String,
    pub day: i64,
    pub block_id: String,
    pub block_type: String,
    pub start_min: i64,
    pub end_min: i64,
    pub crosses_midnight: i64,
}

impl AssignmentRow {
    pub fn into_domain(self) -> Result<Assignment> {
        let day = Weekday::from_index(self.day as u8)
            .ok_or_else(|| StorageError::Other(format!("bad day index: {}", self.day)))?;
        let block_type = BlockType::parse(&self.block_type)
            .ok_or_else(|| StorageError::Other(format!("bad block type: {}", self.block_type)))?;

        Ok(Assignment {
            plan_version_id: self.plan_version_id,
            driver_id: self.driver_id,
            tour_instance_id: self.tour_instance_id,
            day,
            block_id: self.block_id,
            block_type,
            start_min: self.start_min as i32,
            end_min: self.end_min as i32,
            crosses_midnight: self.crosses_midnight != 0,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    pub snapshot_id: i64,
    pub plan_version_id: i64,
    pub version_number: i64,
    pub assignments_snapshot: String,
    pub content_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SlotRow {
    pub slot_id: i64,
    pub plan_version_id: i64,
    pub block_id: String,
    pub slot_date: String,
    pub state: String,
    pub assigned_driver_id: Option<String>,
    pub release_at: Option<i64>,
    pub frozen: i64,
    pub abort_reason: Option<String>,
    pub abort_actor: Option<String>,
}

pub fn millis_to_utc(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
