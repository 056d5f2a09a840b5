/// Daily slot repository: the operational slot state machine, enforced at
/// the storage layer.
///
/// CHECK constraints carry the structural invariants (HOLD is unassigned,
/// ASSIGNED/RELEASED carry release_at, ABORTED carries reason + actor);
/// the frozen-day trigger rejects mutations; this repository adds the
/// transition-table validation on top. Transitions are single-row
/// transactions, so they linearize per slot.
use chrono::{DateTime, Utc};
use rostra_core::{AbortReason, SlotState};
use sqlx::{query, query_as, SqlitePool};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::models::{millis_to_utc, now_millis, SlotRow};

#[derive(Debug, Clone)]
pub struct DailySlot {
    pub slot_id: i64,
    pub plan_version_id: i64,
    pub block_id: String,
    pub slot_date: String,
    pub state: SlotState,
    pub assigned_driver_id: Option<String>,
    pub release_at: Option<DateTime<Utc>>,
    pub frozen: bool,
    pub abort_reason: Option<AbortReason>,
    pub abort_actor: Option<String>,
}

impl SlotRow {
    fn into_domain(self) -> Result<DailySlot> {
        let state = SlotState::parse(&self.state)
            .ok_or_else(|| StorageError::Other(format!("bad slot state: {}", self.state)))?;
        let abort_reason = match &self.abort_reason {
            None => None,
            Some(r) => Some(
                AbortReason::parse(r)
                    .ok_or_else(|| StorageError::Other(format!("bad abort reason: {r}")))?,
            ),
        };
        Ok(DailySlot {
            slot_id: self.slot_id,
            plan_version_id: self.plan_version_id,
            block_id: self.block_id,
            slot_date: self.slot_date,
            state,
            assigned_driver_id: self.assigned_driver_id,
            release_at: self.release_at.map(millis_to_utc),
            frozen: self.frozen != 0,
            abort_reason,
            abort_actor: self.abort_actor,
        })
    }
}

pub struct SqliteSlotRepository {
    pool: SqlitePool,
}

impl SqliteSlotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_slot(
        &self,
        plan_version_id: i64,
        block_id: &str,
        slot_date: &str,
    ) -> Result<i64> {
        let result = query(
            "INSERT INTO daily_slots (plan_version_id, block_id, slot_date, state, updated_at)
             VALUES (?, ?, ?, 'PLANNED', ?)",
        )
        .bind(plan_version_id)
        .bind(block_id)
        .bind(slot_date)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_slot(&self, slot_id: i64) -> Result<Option<DailySlot>> {
        let row = query_as::<_, SlotRow>(
            "SELECT slot_id, plan_version_id, block_id, slot_date, state, assigned_driver_id,
                    release_at, frozen, abort_reason, abort_actor
             FROM daily_slots WHERE slot_id = ?",
        )
        .bind(slot_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SlotRow::into_domain).transpose()
    }

    async fn require_slot(&self, slot_id: i64) -> Result<DailySlot> {
        self.get_slot(slot_id)
            .await?
            .ok_or_else(|| StorageError::Other(format!("slot {slot_id} not found")))
    }

    fn guard(from: SlotState, to: SlotState) -> Result<()> {
        if !from.can_transition(to) {
            return Err(StorageError::IllegalSlotTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// PLANNED/RELEASED -> ASSIGNED with driver and release deadline.
    pub async fn assign(
        &self,
        slot_id: i64,
        driver_id: &str,
        release_at: DateTime<Utc>,
    ) -> Result<()> {
        let slot = self.require_slot(slot_id).await?;
        Self::guard(slot.state, SlotState::Assigned)?;

        query(
            "UPDATE daily_slots
             SET state = 'ASSIGNED', assigned_driver_id = ?, release_at = ?, updated_at = ?
             WHERE slot_id = ?",
        )
        .bind(driver_id)
        .bind(release_at.timestamp_millis())
        .bind(now_millis())
        .bind(slot_id)
        .execute(&self.pool)
        .await?;
        debug!(slot_id, driver_id, "slot assigned");
        Ok(())
    }

    /// ASSIGNED -> RELEASED. The only road from ASSIGNED toward HOLD.
    pub async fn unassign(&self, slot_id: i64) -> Result<()> {
        let slot = self.require_slot(slot_id).await?;
        Self::guard(slot.state, SlotState::Released)?;

        query(
            "UPDATE daily_slots
             SET state = 'RELEASED', assigned_driver_id = NULL, updated_at = ?
             WHERE slot_id = ?",
        )
        .bind(now_millis())
        .bind(slot_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn hold(&self, slot_id: i64) -> Result<()> {
        let slot = self.require_slot(slot_id).await?;
        Self::guard(slot.state, SlotState::Hold)?;

        query(
            "UPDATE daily_slots
             SET state = 'HOLD', assigned_driver_id = NULL, updated_at = ?
             WHERE slot_id = ?",
        )
        .bind(now_millis())
        .bind(slot_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn release(&self, slot_id: i64, release_at: DateTime<Utc>) -> Result<()> {
        let slot = self.require_slot(slot_id).await?;
        Self::guard(slot.state, SlotState::Released)?;

        query(
            "UPDATE daily_slots
             SET state = 'RELEASED', release_at = ?, updated_at = ?
             WHERE slot_id = ?",
        )
        .bind(release_at.timestamp_millis())
        .bind(now_millis())
        .bind(slot_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn execute_slot(&self, slot_id: i64) -> Result<()> {
        let slot = self.require_slot(slot_id).await?;
        Self::guard(slot.state, SlotState::Executed)?;

        query("UPDATE daily_slots SET state = 'EXECUTED', updated_at = ? WHERE slot_id = ?")
            .bind(now_millis())
            .bind(slot_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Terminal abort; reason and actor are mandatory.
    pub async fn abort(&self, slot_id: i64, reason: AbortReason, actor: &str) -> Result<()> {
        let slot = self.require_slot(slot_id).await?;
        Self::guard(slot.state, SlotState::Aborted)?;

        query(
            "UPDATE daily_slots
             SET state = 'ABORTED', abort_reason = ?, abort_actor = ?, updated_at = ?
             WHERE slot_id = ?",
        )
        .bind(reason.as_str())
        .bind(actor)
        .bind(now_millis())
        .bind(slot_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Freeze every slot of one calendar day in a plan.
    pub async fn freeze_day(&self, plan_version_id: i64, slot_date: &str) -> Result<u64> {
        let result = query(
            "UPDATE daily_slots SET frozen = 1, updated_at = ?
             WHERE plan_version_id = ? AND slot_date = ? AND frozen = 0",
        )
        .bind(now_millis())
        .bind(plan_version_id)
        .bind(slot_date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Administrative unfreeze; the trigger only lets the flag flip alone.
    pub async fn unfreeze_day(&self, plan_version_id: i64, slot_date: &str) -> Result<u64> {
        let result = query(
            "UPDATE daily_slots SET frozen = 0, updated_at = ?
             WHERE plan_version_id = ? AND slot_date = ? AND frozen = 1",
        )
        .bind(now_millis())
        .bind(plan_version_id)
        .bind(slot_date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
