use rostra_core::hash::output_hash;
use rostra_core::repair::{churn_metrics, commit_payload_hash};
use rostra_core::{
    Assignment, BlockType, NewPlanVersion, PlanRepository, PlanStatus, RepairCommitRequest,
    Weekday,
};
use rostra_storage::{init_db, verify_state_machine_integrity, IntegrityStatus, SqlitePlanRepository};

fn assignment(driver: &str, tour: &str, day: Weekday) -> Assignment {
    Assignment {
        plan_version_id: 0,
        driver_id: driver.to_string(),
        tour_instance_id: tour.to_string(),
        day,
        block_id: format!("B1-{tour}"),
        block_type: BlockType::Single,
        start_min: 480,
        end_min: 720,
        crosses_midnight: false,
    }
}

async fn published_baseline(repo: &SqlitePlanRepository) -> (i64, Vec<Assignment>) {
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

    let baseline = vec![
        assignment("D001", "T1", Weekday::Wednesday),
        assignment("D002", "T2", Weekday::Thursday),
        assignment("D003", "T3", Weekday::Friday),
    ];
    repo.save_assignments(plan_id, &baseline).await.unwrap();
    repo.set_output_hash(plan_id, &output_hash(&baseline, "cfg"))
        .await
        .unwrap();
    repo.transition_status(plan_id, PlanStatus::Solving)
        .await
        .unwrap();
    repo.transition_status(plan_id, PlanStatus::Solved)
        .await
        .unwrap();
    repo.lock_plan(plan_id, "ops").await.unwrap();
    repo.publish_plan(plan_id).await.unwrap();

    (plan_id, baseline)
}

fn repaired_assignments(baseline: &[Assignment]) -> Vec<Assignment> {
    // D001 absent: T1 moves to D002.
    baseline
        .iter()
        .map(|a| {
            let mut a = a.clone();
            if a.tour_instance_id == "T1" {
                a.driver_id = "D002".to_string();
            }
            a
        })
        .collect()
}

fn commit_request(plan_id: i64, baseline: &[Assignment], key: &str) -> RepairCommitRequest {
    let proposed = repaired_assignments(baseline);
    RepairCommitRequest {
        parent_plan_id: plan_id,
        idempotency_key: key.to_string(),
        payload_hash: commit_payload_hash(&proposed),
        absent_driver_ids: vec!["D001".to_string()],
        churn: churn_metrics(baseline, &proposed),
        assignments: proposed,
    }
}

#[tokio::test]
async fn commit_creates_repair_plan_with_lineage() {
    let pool = init_db(":memory:").await.unwrap();
    let repo = SqlitePlanRepository::new(pool.clone());
    let (plan_id, baseline) = published_baseline(&repo).await;

    let request = commit_request(plan_id, &baseline, "11111111-1111-1111-1111-111111111111");
    let result = repo.commit_repair(&request).await.unwrap();
    assert!(!result.replayed);

    let repair = repo
        .get_plan_version(result.plan_version_id)
        .await
        .unwrap()
        .unwrap();
    assert!(repair.is_repair);
    assert_eq!(repair.parent_plan_id, Some(plan_id));
    assert_eq!(repair.absent_driver_ids, vec!["D001".to_string()]);
    assert_eq!(repair.status, PlanStatus::Solved);

    let stored = repo.get_assignments(result.plan_version_id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored
        .iter()
        .any(|a| a.tour_instance_id == "T1" && a.driver_id == "D002"));

    // The integrity sweep stays green afterwards.
    let checks = verify_state_machine_integrity(&pool).await.unwrap();
    for c in &checks {
        assert_eq!(c.status, IntegrityStatus::Pass, "{}: {}", c.name, c.detail);
    }
}

#[tokio::test]
async fn replay_with_same_payload_returns_same_plan() {
    let pool = init_db(":memory:").await.unwrap();
    let repo = SqlitePlanRepository::new(pool);
    let (plan_id, baseline) = published_baseline(&repo).await;

    let request = commit_request(plan_id, &baseline, "22222222-2222-2222-2222-222222222222");
    let first = repo.commit_repair(&request).await.unwrap();
    let second = repo.commit_repair(&request).await.unwrap();

    assert_eq!(first.plan_version_id, second.plan_version_id);
    assert!(!first.replayed);
    assert!(second.replayed);
}

#[tokio::test]
async fn same_key_different_payload_conflicts() {
    let pool = init_db(":memory:").await.unwrap();
    let repo = SqlitePlanRepository::new(pool);
    let (plan_id, baseline) = published_baseline(&repo).await;

    let key = "33333333-3333-3333-3333-333333333333";
    repo.commit_repair(&commit_request(plan_id, &baseline, key))
        .await
        .unwrap();

    // Same key, different payload: reject.
    let mut conflicting = commit_request(plan_id, &baseline, key);
    conflicting.assignments[0].driver_id = "D003".to_string();
    conflicting.payload_hash = commit_payload_hash(&conflicting.assignments);

    let err = repo.commit_repair(&conflicting).await.unwrap_err();
    assert!(err.to_string().contains("Idempotency"));
}

#[tokio::test]
async fn parent_without_snapshot_gets_one_during_commit() {
    let pool = init_db(":memory:").await.unwrap();
    let repo = SqlitePlanRepository::new(pool);

    // Baseline left at SOLVED (never published, so no snapshot yet).
    let forecast_id = repo
        .create_forecast_version("wien", "hub-1", "f.json", "hash-2")
        .await
        .unwrap();
    let plan_id = repo
        .create_plan_version(&NewPlanVersion {
            forecast_version_id: forecast_id,
            tenant_id: "wien".to_string(),
            site_id: "hub-1".to_string(),
            seed: 94,
            solver_config_hash: "cfg".to_string(),
            input_hash: "hash-2".to_string(),
            is_repair: false,
            parent_plan_id: None,
            absent_driver_ids: vec![],
        })
        .await
        .unwrap();
    let baseline = vec![
        assignment("D001", "T1", Weekday::Wednesday),
        assignment("D002", "T2", Weekday::Thursday),
    ];
    repo.save_assignments(plan_id, &baseline).await.unwrap();

    assert!(repo.latest_snapshot(plan_id).await.unwrap().is_none());

    let request = commit_request(plan_id, &baseline, "44444444-4444-4444-4444-444444444444");
    repo.commit_repair(&request).await.unwrap();

    let snapshot = repo.latest_snapshot(plan_id).await.unwrap();
    assert!(
        snapshot.is_some(),
        "commit must snapshot the parent when missing"
    );
}
