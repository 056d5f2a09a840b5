/// Storage-layer integrity verification: one row per check, PASS/WARN/FAIL.
///
/// These re-verify what constraints and triggers should have made
/// impossible; any FAIL here is an `IntegrityFault` requiring operator
/// intervention, not a retry.
use serde::{Deserialize, Serialize};
use sqlx::{query_as, query_scalar, SqlitePool};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityCheck {
    pub name: String,
    pub status: IntegrityStatus,
    pub detail: String,
}

fn check(name: &str, failures: usize, detail: String) -> IntegrityCheck {
    IntegrityCheck {
        name: name.to_string(),
        status: if failures == 0 {
            IntegrityStatus::Pass
        } else {
            IntegrityStatus::Fail
        },
        detail,
    }
}

pub async fn verify_state_machine_integrity(pool: &SqlitePool) -> Result<Vec<IntegrityCheck>> {
    let mut checks = Vec::new();

    // 1. Every PUBLISHED plan has a snapshot whose content hash equals the
    //    plan's output hash.
    let rows: Vec<(i64, Option<String>, Option<String>)> = query_as(
        "SELECT p.id, p.output_hash,
                (SELECT s.content_hash FROM plan_snapshots s
                 WHERE s.plan_version_id = p.id
                 ORDER BY s.version_number DESC LIMIT 1)
         FROM plan_versions p
         WHERE p.status = 'PUBLISHED'",
    )
    .fetch_all(pool)
    .await?;
    let bad: Vec<i64> = rows
        .iter()
        .filter(|(_, output, snapshot)| output.is_none() || output != snapshot)
        .map(|(id, _, _)| *id)
        .collect();
    checks.push(check(
        "PUBLISHED_SNAPSHOT_MATCH",
        bad.len(),
        if bad.is_empty() {
            format!("{} published plan(s) verified", rows.len())
        } else {
            format!("plans without matching snapshot: {bad:?}")
        },
    ));

    // 2. Assignment uniqueness per (plan, tour).
    let dup_count: i64 = query_scalar(
        "SELECT COUNT(*) FROM (
             SELECT plan_version_id, tour_instance_id
             FROM assignments
             GROUP BY plan_version_id, tour_instance_id
             HAVING COUNT(*) > 1
         )",
    )
    .fetch_one(pool)
    .await?;
    checks.push(check(
        "ASSIGNMENT_UNIQUENESS",
        dup_count as usize,
        format!("{dup_count} duplicate (plan, tour) pair(s)"),
    ));

    // 3. Slot invariants (INV-1..3 plus abort metadata).
    let slot_bad: i64 = query_scalar(
        "SELECT COUNT(*) FROM daily_slots
         WHERE (state = 'HOLD' AND assigned_driver_id IS NOT NULL)
            OR (state = 'ASSIGNED' AND release_at IS NULL)
            OR (state = 'RELEASED' AND release_at IS NULL)
            OR (state = 'ABORTED' AND (abort_reason IS NULL OR abort_actor IS NULL))",
    )
    .fetch_one(pool)
    .await?;
    checks.push(check(
        "SLOT_INVARIANTS",
        slot_bad as usize,
        format!("{slot_bad} slot(s) violating INV-1/2/3 or abort metadata"),
    ));

    // 4. Repair plans always reference a parent.
    let orphan_repairs: i64 = query_scalar(
        "SELECT COUNT(*) FROM plan_versions WHERE is_repair = 1 AND parent_plan_id IS NULL",
    )
    .fetch_one(pool)
    .await?;
    checks.push(check(
        "REPAIR_PARENT_LINK",
        orphan_repairs as usize,
        format!("{orphan_repairs} repair plan(s) without parent"),
    ));

    // 5. Snapshot version numbers are unique per plan (trigger-protected,
    //    re-verified here).
    let version_dups: i64 = query_scalar(
        "SELECT COUNT(*) FROM (
             SELECT plan_version_id, version_number
             FROM plan_snapshots
             GROUP BY plan_version_id, version_number
             HAVING COUNT(*) > 1
         )",
    )
    .fetch_one(pool)
    .await?;
    checks.push(check(
        "SNAPSHOT_VERSION_UNIQUENESS",
        version_dups as usize,
        format!("{version_dups} duplicated snapshot version(s)"),
    ));

    Ok(checks)
}
