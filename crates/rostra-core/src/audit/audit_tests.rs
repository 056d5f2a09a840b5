#[cfg(test)]
mod tests {
    use crate::audit::{can_release, run_audits, AuditCheckKind, AuditStatus};
    use crate::config::SolverConfig;
    use crate::domain::models::{Assignment, BlockType, Tour, Weekday};

    fn tour(id: &str, day: Weekday, start: i32, end: i32) -> Tour {
        Tour::new(id, day, start, end, false, None, None).unwrap()
    }

    fn assignment(
        driver: &str,
        tour_id: &str,
        day: Weekday,
        start: i32,
        end: i32,
        block_type: BlockType,
    ) -> Assignment {
        Assignment {
            plan_version_id: 0,
            driver_id: driver.to_string(),
            tour_instance_id: tour_id.to_string(),
            day,
            block_id: format!("B-{tour_id}"),
            block_type,
            start_min: start,
            end_min: end,
            crosses_midnight: false,
        }
    }

    #[test]
    fn clean_plan_passes_all_seven() {
        let tours = vec![
            tour("T1", Weekday::Monday, 360, 600),
            tour("T2", Weekday::Tuesday, 360, 600),
        ];
        let assignments = vec![
            assignment("D1", "T1", Weekday::Monday, 360, 600, BlockType::Single),
            assignment("D1", "T2", Weekday::Tuesday, 360, 600, BlockType::Single),
        ];

        let report = run_audits(&assignments, &tours, &SolverConfig::default());
        assert!(report.all_pass(), "failed: {:?}", report.failed_checks());
        assert!(can_release(&report));
        assert_eq!(report.checks.len(), 7);
    }

    #[test]
    fn missing_and_duplicate_coverage_fail() {
        let tours = vec![
            tour("T1", Weekday::Monday, 360, 600),
            tour("T2", Weekday::Monday, 660, 900),
        ];
        let assignments = vec![
            assignment("D1", "T1", Weekday::Monday, 360, 600, BlockType::Single),
            assignment("D2", "T1", Weekday::Monday, 360, 600, BlockType::Single),
        ];

        let report = run_audits(&assignments, &tours, &SolverConfig::default());
        let coverage = report.check(AuditCheckKind::Coverage);
        assert_eq!(coverage.status, AuditStatus::Fail);
        assert_eq!(coverage.violation_count, 2); // T1 duplicated, T2 missing
        assert!(!can_release(&report));
    }

    #[test]
    fn overlap_detected_per_driver_day() {
        let tours = vec![
            tour("T1", Weekday::Monday, 360, 600),
            tour("T2", Weekday::Monday, 540, 780),
        ];
        let assignments = vec![
            assignment("D1", "T1", Weekday::Monday, 360, 600, BlockType::Single),
            assignment("D1", "T2", Weekday::Monday, 540, 780, BlockType::Single),
        ];

        let report = run_audits(&assignments, &tours, &SolverConfig::default());
        assert_eq!(
            report.check(AuditCheckKind::Overlap).status,
            AuditStatus::Fail
        );

        // Same windows on different drivers are fine.
        let split = vec![
            assignment("D1", "T1", Weekday::Monday, 360, 600, BlockType::Single),
            assignment("D2", "T2", Weekday::Monday, 540, 780, BlockType::Single),
        ];
        let report = run_audits(&split, &tours, &SolverConfig::default());
        assert_eq!(
            report.check(AuditCheckKind::Overlap).status,
            AuditStatus::Pass
        );
    }

    #[test]
    fn rest_of_659_fails_660_passes() {
        let cfg = SolverConfig::default();
        let tours = vec![
            tour("T1", Weekday::Monday, 840, 1320), // ends 22:00
            tour("T2", Weekday::Tuesday, 539, 800), // starts 08:59
        ];
        let assignments = vec![
            assignment("D1", "T1", Weekday::Monday, 840, 1320, BlockType::Single),
            assignment("D1", "T2", Weekday::Tuesday, 539, 800, BlockType::Single),
        ];
        let report = run_audits(&assignments, &tours, &cfg);
        assert_eq!(report.check(AuditCheckKind::Rest).status, AuditStatus::Fail);

        let tours = vec![
            tour("T1", Weekday::Monday, 840, 1320),
            tour("T2", Weekday::Tuesday, 540, 800), // exactly 11h rest
        ];
        let assignments = vec![
            assignment("D1", "T1", Weekday::Monday, 840, 1320, BlockType::Single),
            assignment("D1", "T2", Weekday::Tuesday, 540, 800, BlockType::Single),
        ];
        let report = run_audits(&assignments, &tours, &cfg);
        assert_eq!(report.check(AuditCheckKind::Rest).status, AuditStatus::Pass);
    }

    #[test]
    fn span_checks_route_by_day_type() {
        let cfg = SolverConfig::default();
        // Split day with 15h span: SPAN_SPLIT passes, SPAN_REGULAR ignores it.
        let tours = vec![
            tour("T1", Weekday::Monday, 360, 600),
            tour("T2", Weekday::Monday, 960, 1260),
        ];
        let assignments = vec![
            assignment("D1", "T1", Weekday::Monday, 360, 600, BlockType::TwoSplit),
            assignment("D1", "T2", Weekday::Monday, 960, 1260, BlockType::TwoSplit),
        ];
        let report = run_audits(&assignments, &tours, &cfg);
        assert_eq!(
            report.check(AuditCheckKind::SpanSplit).status,
            AuditStatus::Pass
        );
        assert_eq!(
            report.check(AuditCheckKind::SpanRegular).status,
            AuditStatus::Pass
        );

        // The same 15h span on a regular day fails SPAN_REGULAR.
        let assignments = vec![
            assignment("D1", "T1", Weekday::Monday, 360, 600, BlockType::Single),
            assignment("D1", "T2", Weekday::Monday, 960, 1260, BlockType::Single),
        ];
        let report = run_audits(&assignments, &tours, &cfg);
        assert_eq!(
            report.check(AuditCheckKind::SpanRegular).status,
            AuditStatus::Fail
        );
    }

    #[test]
    fn consecutive_heavy_days_fail_fatigue() {
        let cfg = SolverConfig::default();
        let mut tours = Vec::new();
        let mut assignments = Vec::new();
        for (day, prefix) in [(Weekday::Monday, "M"), (Weekday::Tuesday, "T")] {
            for i in 0..3 {
                let start = 360 + i * 240;
                let id = format!("{prefix}{i}");
                tours.push(tour(&id, day, start, start + 180));
                assignments.push(assignment("D1", &id, day, start, start + 180, BlockType::Three));
            }
        }

        let report = run_audits(&assignments, &tours, &cfg);
        assert_eq!(
            report.check(AuditCheckKind::Fatigue).status,
            AuditStatus::Fail
        );
    }

    #[test]
    fn weekly_hours_cap_enforced() {
        let cfg = SolverConfig::default();
        let mut tours = Vec::new();
        let mut assignments = Vec::new();
        // Six 10h days = 60h > 55h cap.
        for d in 0..6u8 {
            let day = Weekday::from_index(d).unwrap();
            let id = format!("T{d}");
            tours.push(tour(&id, day, 360, 960));
            assignments.push(assignment("D1", &id, day, 360, 960, BlockType::Single));
        }

        let report = run_audits(&assignments, &tours, &cfg);
        assert_eq!(
            report.check(AuditCheckKind::WeeklyHours).status,
            AuditStatus::Fail
        );
    }

    #[test]
    fn near_violations_flag_tight_rest_without_failing() {
        let cfg = SolverConfig::default();
        let tours = vec![
            tour("T1", Weekday::Monday, 840, 1320),
            tour("T2", Weekday::Tuesday, 570, 800), // rest 690: legal but tight
        ];
        let assignments = vec![
            assignment("D1", "T1", Weekday::Monday, 840, 1320, BlockType::Single),
            assignment("D1", "T2", Weekday::Tuesday, 570, 800, BlockType::Single),
        ];

        let report = run_audits(&assignments, &tours, &cfg);
        assert!(report.all_pass());
        assert!(report
            .near_violations
            .iter()
            .any(|w| w.kind == "TIGHT_REST" && w.driver_id == "D1"));
    }
}
