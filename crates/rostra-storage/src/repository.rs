use async_trait::async_trait;
use rostra_core::hash::{output_document, output_hash, sha256_hex};
use rostra_core::{
    Assignment, BlockType, NewPlanVersion, PlanRepository, PlanSnapshot, PlanStatus, PlanVersion,
    RepairCommitRequest, RepairCommitResult, Weekday,
};
use sqlx::{query, query_as, query_scalar, Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::{millis_to_utc, now_millis, AssignmentRow, PlanVersionRow, SnapshotRow};

pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool for transaction creation
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_plan_row(&self, plan_version_id: i64) -> Result<PlanVersionRow> {
        let row = query_as::<_, PlanVersionRow>(
            "SELECT id, forecast_version_id, tenant_id, site_id, seed, solver_config_hash,
                    input_hash, output_hash, status, is_repair, parent_plan_id,
                    absent_driver_ids, locked_by, created_at, updated_at
             FROM plan_versions WHERE id = ?",
        )
        .bind(plan_version_id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StorageError::PlanNotFound(plan_version_id))
    }

    async fn assignments_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        plan_version_id: i64,
    ) -> Result<Vec<Assignment>> {
        let rows = query_as::<_, AssignmentRow>(
            "SELECT plan_version_id, driver_id, tour_instance_id, day, block_id, block_type,
                    start_min, end_min, crosses_midnight
             FROM assignments
             WHERE plan_version_id = ?
             ORDER BY driver_id, day, tour_instance_id",
        )
        .bind(plan_version_id)
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(AssignmentRow::into_domain).collect()
    }

    async fn insert_assignments_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        plan_version_id: i64,
        assignments: &[Assignment],
    ) -> Result<()> {
        for a in assignments {
            query(
                "INSERT INTO assignments
                 (plan_version_id, driver_id, tour_instance_id, day, block_id, block_type,
                  start_min, end_min, crosses_midnight)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(plan_version_id)
            .bind(&a.driver_id)
            .bind(&a.tour_instance_id)
            .bind(i64::from(a.day.index()))
            .bind(&a.block_id)
            .bind(a.block_type.as_str())
            .bind(i64::from(a.start_min))
            .bind(i64::from(a.end_min))
            .bind(i64::from(a.crosses_midnight))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Snapshot the plan's current assignments inside an open transaction.
    /// Allocates the next version number under the uniqueness constraint.
    async fn snapshot_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        plan_version_id: i64,
        solver_config_hash: &str,
    ) -> Result<PlanSnapshot> {
        let assignments = Self::assignments_in_tx(tx, plan_version_id).await?;
        let payload = output_document(&assignments, solver_config_hash);
        let content_hash = sha256_hex(payload.as_bytes());

        let version_number: i64 = query_scalar(
            "SELECT COALESCE(MAX(version_number), 0) + 1
             FROM plan_snapshots WHERE plan_version_id = ?",
        )
        .bind(plan_version_id)
        .fetch_one(&mut **tx)
        .await?;

        let created_at = now_millis();
        let result = query(
            "INSERT INTO plan_snapshots
             (plan_version_id, version_number, assignments_snapshot, content_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(plan_version_id)
        .bind(version_number)
        .bind(&payload)
        .bind(&content_hash)
        .bind(created_at)
        .execute(&mut **tx)
        .await?;

        Ok(PlanSnapshot {
            snapshot_id: result.last_insert_rowid(),
            plan_version_id,
            version_number: version_number as i32,
            assignments,
            content_hash,
            created_at: millis_to_utc(created_at),
        })
    }

    fn snapshot_row_to_domain(row: SnapshotRow) -> Result<PlanSnapshot> {
        let assignments = parse_snapshot_payload(&row.assignments_snapshot, row.plan_version_id)?;
        Ok(PlanSnapshot {
            snapshot_id: row.snapshot_id,
            plan_version_id: row.plan_version_id,
            version_number: row.version_number as i32,
            assignments,
            content_hash: row.content_hash,
            created_at: millis_to_utc(row.created_at),
        })
    }
}

/// Rehydrate assignments from the canonical snapshot payload.
fn parse_snapshot_payload(payload: &str, plan_version_id: i64) -> Result<Vec<Assignment>> {
    let doc: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| StorageError::Integrity(format!("snapshot payload: {e}")))?;
    let records = doc
        .get("assignments")
        .and_then(|a| a.as_array())
        .ok_or_else(|| StorageError::Integrity("snapshot payload missing assignments".into()))?;

    let mut assignments = Vec::with_capacity(records.len());
    for r in records {
        let day = r
            .get("day")
            .and_then(|d| d.as_u64())
            .and_then(|d| Weekday::from_index(d as u8))
            .ok_or_else(|| StorageError::Integrity("snapshot record day".into()))?;
        let block_type = r
            .get("block_type")
            .and_then(|b| b.as_str())
            .and_then(BlockType::parse)
            .ok_or_else(|| StorageError::Integrity("snapshot record block_type".into()))?;

        let field = |name: &str| -> Result<String> {
            r.get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| StorageError::Integrity(format!("snapshot record {name}")))
        };
        let int_field = |name: &str| -> Result<i32> {
            r.get(name)
                .and_then(|v| v.as_i64())
                .map(|v| v as i32)
                .ok_or_else(|| StorageError::Integrity(format!("snapshot record {name}")))
        };

        assignments.push(Assignment {
            plan_version_id,
            driver_id: field("driver_id")?,
            tour_instance_id: field("tour_instance_id")?,
            day,
            block_id: field("block_id")?,
            block_type,
            start_min: int_field("start_min")?,
            end_min: int_field("end_min")?,
            crosses_midnight: r
                .get("crosses_midnight")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        });
    }
    Ok(assignments)
}

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn create_forecast_version(
        &self,
        tenant_id: &str,
        site_id: &str,
        source: &str,
        input_hash: &str,
    ) -> anyhow::Result<i64> {
        // input_hash is unique per tenant; re-registering the same forecast
        // returns the existing version.
        query(
            "INSERT INTO forecast_versions (tenant_id, site_id, source, input_hash, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (tenant_id, input_hash) DO NOTHING",
        )
        .bind(tenant_id)
        .bind(site_id)
        .bind(source)
        .bind(input_hash)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        let id: i64 = query_scalar(
            "SELECT id FROM forecast_versions WHERE tenant_id = ? AND input_hash = ?",
        )
        .bind(tenant_id)
        .bind(input_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_plan_version(&self, new: &NewPlanVersion) -> anyhow::Result<i64> {
        let now = now_millis();
        let absent = serde_json::to_string(&new.absent_driver_ids)?;
        let result = query(
            "INSERT INTO plan_versions
             (forecast_version_id, tenant_id, site_id, seed, solver_config_hash, input_hash,
              status, is_repair, parent_plan_id, absent_driver_ids, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 'DRAFT', ?, ?, ?, ?, ?)",
        )
        .bind(new.forecast_version_id)
        .bind(&new.tenant_id)
        .bind(&new.site_id)
        .bind(i64::from(new.seed))
        .bind(&new.solver_config_hash)
        .bind(&new.input_hash)
        .bind(i64::from(new.is_repair))
        .bind(new.parent_plan_id)
        .bind(&absent)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_plan_version(&self, plan_version_id: i64) -> anyhow::Result<Option<PlanVersion>> {
        match self.fetch_plan_row(plan_version_id).await {
            Ok(row) => Ok(Some(row.into_domain()?)),
            Err(StorageError::PlanNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_assignments(
        &self,
        plan_version_id: i64,
        assignments: &[Assignment],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_assignments_in_tx(&mut tx, plan_version_id, assignments).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_assignments(&self, plan_version_id: i64) -> anyhow::Result<Vec<Assignment>> {
        let mut tx = self.pool.begin().await?;
        let assignments = Self::assignments_in_tx(&mut tx, plan_version_id).await?;
        tx.commit().await?;
        Ok(assignments)
    }

    async fn transition_status(
        &self,
        plan_version_id: i64,
        to: PlanStatus,
    ) -> anyhow::Result<()> {
        let row = self.fetch_plan_row(plan_version_id).await?;
        let from = PlanStatus::parse(&row.status)
            .ok_or_else(|| StorageError::Other(format!("bad status {}", row.status)))?;
        if !from.can_transition(to) {
            return Err(StorageError::IllegalTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            }
            .into());
        }

        query("UPDATE plan_versions SET status = ?, updated_at = ? WHERE id = ?")
            .bind(to.as_str())
            .bind(now_millis())
            .bind(plan_version_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn lock_plan(&self, plan_version_id: i64, actor: &str) -> anyhow::Result<()> {
        self.transition_status(plan_version_id, PlanStatus::Locked)
            .await?;
        query("UPDATE plan_versions SET locked_by = ? WHERE id = ?")
            .bind(actor)
            .bind(plan_version_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_output_hash(
        &self,
        plan_version_id: i64,
        output_hash: &str,
    ) -> anyhow::Result<()> {
        query("UPDATE plan_versions SET output_hash = ?, updated_at = ? WHERE id = ?")
            .bind(output_hash)
            .bind(now_millis())
            .bind(plan_version_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Publish is atomic: snapshot insert and the LOCKED -> PUBLISHED state
    /// change commit together or not at all.
    async fn publish_plan(&self, plan_version_id: i64) -> anyhow::Result<PlanSnapshot> {
        let row = self.fetch_plan_row(plan_version_id).await?;
        let from = PlanStatus::parse(&row.status)
            .ok_or_else(|| StorageError::Other(format!("bad status {}", row.status)))?;
        if !from.can_transition(PlanStatus::Published) {
            return Err(StorageError::IllegalTransition {
                from: from.as_str().to_string(),
                to: PlanStatus::Published.as_str().to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let snapshot =
            Self::snapshot_in_tx(&mut tx, plan_version_id, &row.solver_config_hash).await?;
        query("UPDATE plan_versions SET status = 'PUBLISHED', updated_at = ? WHERE id = ?")
            .bind(now_millis())
            .bind(plan_version_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            plan_version_id,
            version_number = snapshot.version_number,
            content_hash = %&snapshot.content_hash[..12],
            "plan published"
        );
        Ok(snapshot)
    }

    async fn latest_snapshot(
        &self,
        plan_version_id: i64,
    ) -> anyhow::Result<Option<PlanSnapshot>> {
        let row = query_as::<_, SnapshotRow>(
            "SELECT snapshot_id, plan_version_id, version_number, assignments_snapshot,
                    content_hash, created_at
             FROM plan_snapshots
             WHERE plan_version_id = ?
             ORDER BY version_number DESC
             LIMIT 1",
        )
        .bind(plan_version_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(Self::snapshot_row_to_domain(row)?)),
        }
    }

    /// One transaction: idempotency check, new repair plan, assignments,
    /// parent snapshot when missing, repair_log row.
    async fn commit_repair(
        &self,
        request: &RepairCommitRequest,
    ) -> anyhow::Result<RepairCommitResult> {
        let parent = self.fetch_plan_row(request.parent_plan_id).await?;

        let mut tx = self.pool.begin().await?;

        // Idempotency: same key + same payload replays, otherwise conflict.
        let existing: Option<(i64, String)> = query_as(
            "SELECT new_plan_version_id, payload_hash FROM repair_log WHERE idempotency_key = ?",
        )
        .bind(&request.idempotency_key)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some((existing_plan, existing_hash)) = existing {
            return if existing_hash == request.payload_hash {
                Ok(RepairCommitResult {
                    plan_version_id: existing_plan,
                    replayed: true,
                })
            } else {
                Err(StorageError::IdempotencyConflict {
                    key: request.idempotency_key.clone(),
                }
                .into())
            };
        }

        // Snapshot the parent first if it has never been snapshotted.
        let has_snapshot: i64 =
            query_scalar("SELECT COUNT(*) FROM plan_snapshots WHERE plan_version_id = ?")
                .bind(request.parent_plan_id)
                .fetch_one(&mut *tx)
                .await?;
        if has_snapshot == 0 {
            Self::snapshot_in_tx(&mut tx, request.parent_plan_id, &parent.solver_config_hash)
                .await?;
        }

        // New repair plan version, solved by construction.
        let now = now_millis();
        let absent = serde_json::to_string(&request.absent_driver_ids)?;
        let new_output_hash = output_hash(&request.assignments, &parent.solver_config_hash);
        let result = query(
            "INSERT INTO plan_versions
             (forecast_version_id, tenant_id, site_id, seed, solver_config_hash, input_hash,
              output_hash, status, is_repair, parent_plan_id, absent_driver_ids,
              created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 'SOLVED', 1, ?, ?, ?, ?)",
        )
        .bind(parent.forecast_version_id)
        .bind(&parent.tenant_id)
        .bind(&parent.site_id)
        .bind(parent.seed)
        .bind(&parent.solver_config_hash)
        .bind(&parent.input_hash)
        .bind(&new_output_hash)
        .bind(request.parent_plan_id)
        .bind(&absent)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let new_plan_id = result.last_insert_rowid();

        Self::insert_assignments_in_tx(&mut tx, new_plan_id, &request.assignments).await?;

        query(
            "INSERT INTO repair_log
             (plan_version_id, new_plan_version_id, idempotency_key, payload_hash,
              churn_json, status, created_at)
             VALUES (?, ?, ?, ?, ?, 'SUCCESS', ?)",
        )
        .bind(request.parent_plan_id)
        .bind(new_plan_id)
        .bind(&request.idempotency_key)
        .bind(&request.payload_hash)
        .bind(serde_json::to_string(&request.churn)?)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            parent = request.parent_plan_id,
            new_plan_id,
            churn = request.churn.changed_tours,
            "repair committed"
        );
        Ok(RepairCommitResult {
            plan_version_id: new_plan_id,
            replayed: false,
        })
    }
}
