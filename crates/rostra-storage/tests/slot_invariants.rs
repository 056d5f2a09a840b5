use chrono::{Duration, Utc};
use rostra_core::{AbortReason, NewPlanVersion, PlanRepository, SlotState};
use rostra_storage::{init_db, SqlitePlanRepository, SqliteSlotRepository};

async fn setup() -> (sqlx::SqlitePool, i64) {
    let pool = init_db(":memory:").await.unwrap();
    let repo = SqlitePlanRepository::new(pool.clone());
    let forecast_id = repo
        .create_forecast_version("wien", "hub-1", "f.json", "hash-1")
        .await
        .unwrap();
    let plan_id = repo
        .create_plan_version(&NewPlanVersion {
            forecast_version_id: forecast_id,
            tenant_id: "wien".to_string(),
            site_id: "hub-1".to_string(),
            seed: 94,
            solver_config_hash: "cfg".to_string(),
            input_hash: "hash-1".to_string(),
            is_repair: false,
            parent_plan_id: None,
            absent_driver_ids: vec![],
        })
        .await
        .unwrap();
    (pool, plan_id)
}

#[tokio::test]
async fn assign_execute_happy_path() {
    let (pool, plan_id) = setup().await;
    let slots = SqliteSlotRepository::new(pool);

    let slot_id = slots.create_slot(plan_id, "B3-T1", "2026-01-05").await.unwrap();
    slots
        .assign(slot_id, "D001", Utc::now() + Duration::hours(4))
        .await
        .unwrap();

    let slot = slots.get_slot(slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Assigned);
    assert_eq!(slot.assigned_driver_id.as_deref(), Some("D001"));
    assert!(slot.release_at.is_some(), "INV-2: ASSIGNED carries release_at");

    slots.execute_slot(slot_id).await.unwrap();
    let slot = slots.get_slot(slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Executed);

    // Terminal: no further moves.
    assert!(slots.abort(slot_id, AbortReason::Weather, "ops").await.is_err());
}

#[tokio::test]
async fn assigned_to_hold_must_go_via_released() {
    let (pool, plan_id) = setup().await;
    let slots = SqliteSlotRepository::new(pool);

    let slot_id = slots.create_slot(plan_id, "B1-T1", "2026-01-05").await.unwrap();
    slots
        .assign(slot_id, "D001", Utc::now() + Duration::hours(4))
        .await
        .unwrap();

    // INV-5: ASSIGNED -> HOLD is forbidden.
    let err = slots.hold(slot_id).await.unwrap_err();
    assert!(err.to_string().contains("ASSIGNED -> HOLD"));

    // Legal detour: unassign to RELEASED, then HOLD.
    slots.unassign(slot_id).await.unwrap();
    slots.hold(slot_id).await.unwrap();

    let slot = slots.get_slot(slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Hold);
    assert!(
        slot.assigned_driver_id.is_none(),
        "INV-1: HOLD implies unassigned"
    );
}

#[tokio::test]
async fn frozen_day_rejects_mutations_blocking_not_warning() {
    let (pool, plan_id) = setup().await;
    let slots = SqliteSlotRepository::new(pool);

    let slot_id = slots.create_slot(plan_id, "B1-T1", "2026-01-05").await.unwrap();
    let frozen = slots.freeze_day(plan_id, "2026-01-05").await.unwrap();
    assert_eq!(frozen, 1);

    // INV-4: any state mutation on a frozen slot aborts.
    let err = slots
        .assign(slot_id, "D001", Utc::now() + Duration::hours(4))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("FROZEN_DAY"));

    // Unfreezing alone is allowed, after which the mutation passes.
    slots.unfreeze_day(plan_id, "2026-01-05").await.unwrap();
    slots
        .assign(slot_id, "D001", Utc::now() + Duration::hours(4))
        .await
        .unwrap();
}

#[tokio::test]
async fn abort_requires_reason_and_actor() {
    let (pool, plan_id) = setup().await;
    let slots = SqliteSlotRepository::new(pool.clone());

    let slot_id = slots.create_slot(plan_id, "B1-T1", "2026-01-05").await.unwrap();
    slots.abort(slot_id, AbortReason::LowDemand, "ops").await.unwrap();

    let slot = slots.get_slot(slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Aborted);
    assert_eq!(slot.abort_reason, Some(AbortReason::LowDemand));
    assert_eq!(slot.abort_actor.as_deref(), Some("ops"));

    // A raw ABORT without reason violates the CHECK constraint.
    let other = slots.create_slot(plan_id, "B1-T2", "2026-01-06").await.unwrap();
    let raw = sqlx::query("UPDATE daily_slots SET state = 'ABORTED' WHERE slot_id = ?")
        .bind(other)
        .execute(&pool)
        .await;
    assert!(raw.is_err());
}

#[tokio::test]
async fn check_constraints_enforce_structural_invariants() {
    let (pool, plan_id) = setup().await;
    let slots = SqliteSlotRepository::new(pool.clone());
    let slot_id = slots.create_slot(plan_id, "B1-T1", "2026-01-05").await.unwrap();

    // INV-1 via raw SQL: HOLD with a driver attached must be rejected.
    let raw = sqlx::query(
        "UPDATE daily_slots SET state = 'HOLD', assigned_driver_id = 'D001' WHERE slot_id = ?",
    )
    .bind(slot_id)
    .execute(&pool)
    .await;
    assert!(raw.is_err());

    // INV-2 via raw SQL: ASSIGNED without release_at must be rejected.
    let raw = sqlx::query(
        "UPDATE daily_slots
         SET state = 'ASSIGNED', assigned_driver_id = 'D001', release_at = NULL
         WHERE slot_id = ?",
    )
    .bind(slot_id)
    .execute(&pool)
    .await;
    assert!(raw.is_err());
}
