#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::config::SolverConfig;
    use crate::domain::column::{build_column, can_add_block, BlockInfo};
    use crate::domain::models::{BlockType, RosterType, Weekday};

    fn rules() -> crate::domain::column::RosterRules {
        SolverConfig::default().roster_rules()
    }

    fn info(id: &str, day: Weekday, start: i32, end: i32, tours: u8) -> BlockInfo {
        let tour_ids = (0..tours).map(|i| format!("{id}-t{i}")).collect();
        BlockInfo {
            block_id: id.to_string(),
            day,
            start_min: start,
            end_min: end,
            work_min: end - start,
            tours,
            tour_ids,
            block_type: match tours {
                1 => BlockType::Single,
                2 => BlockType::TwoRegular,
                _ => BlockType::Three,
            },
        }
    }

    #[test]
    fn empty_column_is_invalid() {
        let col = build_column("R00000", &[], RosterType::Fte, &rules());
        assert!(!col.is_valid);
        assert_eq!(col.violations, vec!["Empty roster".to_string()]);
    }

    #[test]
    fn overlap_on_same_day_rejected() {
        let blocks = vec![
            info("B1", Weekday::Monday, 360, 600, 1),
            info("B2", Weekday::Monday, 540, 720, 1),
        ];
        let col = build_column("R00001", &blocks, RosterType::Fte, &rules());
        assert!(!col.is_valid);
        assert!(col.violations[0].contains("Overlap"));
    }

    // Mon 14:00-22:00, Tue start varies: 660 min of rest passes, 659 fails.
    #[rstest]
    #[case(540, true)] // Tue 09:00 -> rest 660
    #[case(539, false)] // Tue 08:59 -> rest 659
    fn rest_boundary_is_inclusive(#[case] tue_start: i32, #[case] valid: bool) {
        let blocks = vec![
            info("B1", Weekday::Monday, 840, 1320, 1),
            info("B2", Weekday::Tuesday, tue_start, tue_start + 300, 1),
        ];
        let col = build_column("R00002", &blocks, RosterType::Fte, &rules());
        assert_eq!(col.is_valid, valid, "violations: {:?}", col.violations);
    }

    #[test]
    fn heavy_day_limits_next_day_tours() {
        let blocks = vec![
            info("B3", Weekday::Monday, 360, 960, 3),
            info("B2", Weekday::Tuesday, 600, 1000, 3),
        ];
        let col = build_column("R00003", &blocks, RosterType::Fte, &rules());
        assert!(!col.is_valid);
        assert!(col
            .violations
            .iter()
            .any(|v| v.contains("Heavy day") || v.contains("next day")));
    }

    #[test]
    fn heavy_rest_floor_is_configurable() {
        let mut cfg = SolverConfig::default();
        cfg.heavy_rest_min = 14 * 60;
        let strict = cfg.roster_rules();

        // Heavy Monday ending 20:00, Tuesday starting 07:30: rest 11.5h.
        let blocks = vec![
            info("B3", Weekday::Monday, 480, 1200, 3),
            info("B1", Weekday::Tuesday, 450, 700, 1),
        ];

        let relaxed = build_column("R00004", &blocks, RosterType::Fte, &rules());
        assert!(relaxed.is_valid, "11h floor passes: {:?}", relaxed.violations);

        let tightened = build_column("R00005", &blocks, RosterType::Fte, &strict);
        assert!(!tightened.is_valid, "14h floor must reject 11.5h rest");
    }

    #[test]
    fn pt_ceiling_is_hard() {
        // Five 9h days = 45h, above the 40h PT ceiling but fine for FTE.
        let blocks: Vec<BlockInfo> = (0..5)
            .map(|d| {
                info(
                    &format!("B{d}"),
                    Weekday::from_index(d).unwrap(),
                    360,
                    360 + 540,
                    2,
                )
            })
            .collect();

        let fte = build_column("R00006", &blocks, RosterType::Fte, &rules());
        assert!(fte.is_valid, "{:?}", fte.violations);

        let pt = build_column("R00007", &blocks, RosterType::Pt, &rules());
        assert!(!pt.is_valid);
    }

    #[test]
    fn signature_distinguishes_roster_type() {
        let blocks = vec![info("B1", Weekday::Monday, 360, 600, 1)];
        let fte = build_column("R00008", &blocks, RosterType::Fte, &rules());
        let pt = build_column("R00009", &blocks, RosterType::Pt, &rules());
        assert_ne!(fte.signature, pt.signature);
    }

    #[test]
    fn can_add_block_checks_in_order() {
        let r = rules();
        let existing = vec![info("B1", Weekday::Monday, 360, 600, 1)];

        // Overlap comes first
        let overlapping = info("BX", Weekday::Monday, 500, 700, 1);
        let err = can_add_block(&existing, &overlapping, 240, RosterType::Fte, &r).unwrap_err();
        assert!(err.contains("Overlap"));

        // Day tour count
        let heavy_existing = vec![info("B3", Weekday::Monday, 360, 960, 3)];
        let extra = info("BY", Weekday::Monday, 1000, 1100, 1);
        let err = can_add_block(&heavy_existing, &extra, 600, RosterType::Fte, &r).unwrap_err();
        assert!(err.contains("tours"));

        // Week cap
        let far = info("BZ", Weekday::Friday, 360, 960, 2);
        let err = can_add_block(&existing, &far, 55 * 60 - 100, RosterType::Fte, &r).unwrap_err();
        assert!(err.contains("cap"));
    }

    #[test]
    fn can_add_block_respects_rest_in_both_directions() {
        let r = rules();
        // Tuesday block 06:00-14:00 exists; Monday ending 22:00 leaves only
        // 8h rest to Tuesday's start.
        let existing = vec![info("B2", Weekday::Tuesday, 360, 840, 1)];
        let late_monday = info("B1", Weekday::Monday, 840, 1320, 1);
        let err = can_add_block(&existing, &late_monday, 480, RosterType::Fte, &r).unwrap_err();
        assert!(err.contains("Rest"));
    }
}
