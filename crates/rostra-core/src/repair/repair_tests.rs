#[cfg(test)]
mod tests {
    use crate::config::SolverConfig;
    use crate::domain::errors::SolveError;
    use crate::domain::models::{Assignment, BlockType, Tour, Weekday};
    use crate::repair::orchestrator::{
        churn_metrics, commit_payload_hash, is_frozen, propose_repairs, RepairRequest,
    };
    use crate::repair::simulator::ValidationMode;

    fn tour(id: &str, day: Weekday, start: i32, end: i32) -> Tour {
        Tour::new(id, day, start, end, false, None, None).unwrap()
    }

    fn assignment(driver: &str, tour_id: &str, day: Weekday, start: i32, end: i32) -> Assignment {
        Assignment {
            plan_version_id: 1,
            driver_id: driver.to_string(),
            tour_instance_id: tour_id.to_string(),
            day,
            block_id: format!("B1-{tour_id}"),
            block_type: BlockType::Single,
            start_min: start,
            end_min: end,
            crosses_midnight: false,
        }
    }

    /// Baseline: three drivers, one tour each on separate days, far in the
    /// future relative to `now = 0`.
    fn baseline() -> (Vec<Tour>, Vec<Assignment>) {
        let tours = vec![
            tour("T1", Weekday::Wednesday, 480, 720),
            tour("T2", Weekday::Thursday, 480, 720),
            tour("T3", Weekday::Friday, 480, 720),
        ];
        let assignments = vec![
            assignment("D001", "T1", Weekday::Wednesday, 480, 720),
            assignment("D002", "T2", Weekday::Thursday, 480, 720),
            assignment("D003", "T3", Weekday::Friday, 480, 720),
        ];
        (tours, assignments)
    }

    #[test]
    fn freeze_boundary_is_inclusive() {
        let cfg = SolverConfig::default();
        // Monday 12:00 start, now = Monday 00:00, horizon 720.
        let at_horizon = assignment("D1", "T1", Weekday::Monday, 720, 900);
        assert!(is_frozen(&at_horizon, 0, cfg.freeze_horizon_min));

        let one_past = assignment("D1", "T2", Weekday::Monday, 721, 900);
        assert!(!is_frozen(&one_past, 0, cfg.freeze_horizon_min));

        // Tours already started stay frozen.
        let in_past = assignment("D1", "T3", Weekday::Monday, 60, 300);
        assert!(is_frozen(&in_past, 300, cfg.freeze_horizon_min));
    }

    #[test]
    fn absence_produces_full_coverage_proposals() {
        let (tours, assignments) = baseline();
        let req = RepairRequest {
            absent_driver_ids: vec!["D001".to_string()],
            now_week_min: 0,
            validation: ValidationMode::Full,
            top_k: 3,
        };

        let outcome = propose_repairs(&assignments, &tours, &req, &SolverConfig::default()).unwrap();
        assert_eq!(outcome.impacted_tour_ids, vec!["T1".to_string()]);
        assert!(!outcome.proposals.is_empty());

        let best = &outcome.proposals[0];
        assert_eq!(best.impacted_tours_count, 1);
        assert_eq!(best.impacted_assigned_count, 1);
        assert!((best.coverage_percent - 100.0).abs() < f64::EPSILON);
        assert!(best.violations.violations_validated);
        assert_eq!(best.hard_violations(), 0);

        // Nobody assigns anything to the absent driver.
        assert!(best.assignments.iter().all(|a| a.driver_id != "D001"));
        // Untouched tours keep their drivers.
        assert!(best
            .assignments
            .iter()
            .any(|a| a.tour_instance_id == "T2" && a.driver_id == "D002"));
    }

    #[test]
    fn frozen_impacted_tour_rejects_repair() {
        let (tours, assignments) = baseline();
        let cfg = SolverConfig::default();
        // Now is Wednesday 06:00; D001's Wednesday 08:00 tour starts within
        // the 12h horizon.
        let now = 2 * 1440 + 360;
        let req = RepairRequest {
            absent_driver_ids: vec!["D001".to_string()],
            now_week_min: now,
            validation: ValidationMode::None,
            top_k: 3,
        };

        let err = propose_repairs(&assignments, &tours, &req, &cfg).unwrap_err();
        assert!(matches!(err, SolveError::FreezeViolation(_)));
        assert_eq!(err.error_code(), "FREEZE_VIOLATION");
    }

    #[test]
    fn validation_none_leaves_counts_null() {
        let (tours, assignments) = baseline();
        let req = RepairRequest {
            absent_driver_ids: vec!["D002".to_string()],
            now_week_min: 0,
            validation: ValidationMode::None,
            top_k: 3,
        };

        let outcome = propose_repairs(&assignments, &tours, &req, &SolverConfig::default()).unwrap();
        let p = &outcome.proposals[0];
        assert!(!p.violations.violations_validated);
        assert_eq!(p.violations.block_violations, None);
        assert_eq!(p.violations.warn_violations, None);
        // Coverage is always computable regardless of validation mode.
        assert!((p.coverage_percent - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn proposals_rank_by_disruption() {
        let (tours, assignments) = baseline();
        let req = RepairRequest {
            absent_driver_ids: vec!["D003".to_string()],
            now_week_min: 0,
            validation: ValidationMode::Fast,
            top_k: 3,
        };

        let outcome = propose_repairs(&assignments, &tours, &req, &SolverConfig::default()).unwrap();
        for pair in outcome.proposals.windows(2) {
            assert!(
                pair[0].hard_violations() <= pair[1].hard_violations(),
                "proposals must be sorted by hard violations first"
            );
        }
    }

    #[test]
    fn churn_counts_only_changed_drivers() {
        let (_, before) = baseline();
        let mut after = before.clone();
        after[0].driver_id = "D009".to_string();

        let metrics = churn_metrics(&before, &after);
        assert_eq!(metrics.total_tours, 3);
        assert_eq!(metrics.changed_tours, 1);
        assert!((metrics.churn_percent - 33.333).abs() < 0.01);
    }

    #[test]
    fn payload_hash_is_order_insensitive_and_driver_sensitive() {
        let (_, assignments) = baseline();

        let mut shuffled = assignments.clone();
        shuffled.reverse();
        assert_eq!(
            commit_payload_hash(&assignments),
            commit_payload_hash(&shuffled)
        );

        let mut changed = assignments.clone();
        changed[1].driver_id = "D042".to_string();
        assert_ne!(
            commit_payload_hash(&assignments),
            commit_payload_hash(&changed)
        );
    }
}
