#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::config::SolverConfig;
    use crate::domain::column::{build_column, BlockInfo, RosterColumn};
    use crate::domain::models::{BlockType, RosterType, Weekday};
    use crate::solver::master::{solve_lexico, MasterOutcome, MasterStatus};

    // Columns over abstract single-tour blocks spread across days so every
    // combination is rest-feasible.
    fn info(block_id: &str, day: u8, work_min: i32) -> BlockInfo {
        BlockInfo {
            block_id: block_id.to_string(),
            day: Weekday::from_index(day).unwrap(),
            start_min: 480,
            end_min: 480 + work_min,
            work_min,
            tours: 1,
            tour_ids: vec![format!("{block_id}-t")],
            block_type: BlockType::Single,
        }
    }

    fn column(id: &str, blocks: &[BlockInfo], roster_type: RosterType) -> RosterColumn {
        let rules = SolverConfig::default().roster_rules();
        let col = build_column(id, blocks, roster_type, &rules);
        assert!(col.is_valid, "{:?}", col.violations);
        col
    }

    fn targets(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fewer_drivers_beats_fewer_singletons() {
        let a = info("A", 0, 300);
        let b = info("B", 2, 300);
        let c = info("C", 0, 300);
        let d = info("D", 2, 300);

        let columns = vec![
            column("DENSE_AB", &[a.clone(), b.clone()], RosterType::Fte),
            column("DENSE_CD", &[c.clone(), d.clone()], RosterType::Fte),
            column("SINGLE_A", &[a], RosterType::Pt),
            column("SINGLE_B", &[b], RosterType::Pt),
            column("SINGLE_C", &[c], RosterType::Pt),
            column("SINGLE_D", &[d], RosterType::Pt),
        ];

        let outcome = solve_lexico(
            &columns,
            &targets(&["A", "B", "C", "D"]),
            None,
            &SolverConfig::default(),
        );

        let MasterOutcome::Solved(sol) = outcome else {
            panic!("expected solved");
        };
        assert_eq!(sol.status, MasterStatus::Optimal);
        assert_eq!(sol.d_star, 2, "dense two-driver solution must win");
        let ids: Vec<&str> = sol
            .selected
            .iter()
            .map(|&i| columns[i].roster_id.as_str())
            .collect();
        assert!(ids.contains(&"DENSE_AB") && ids.contains(&"DENSE_CD"));
    }

    #[test]
    fn stage2_keeps_headcount_and_prefers_quality() {
        // Both coverings need two drivers; the 13h pair leaves less FTE
        // underfill than the 8h pair, so stage 2 must pick it.
        let columns = vec![
            column("S1_X", &[info("X", 0, 8 * 60)], RosterType::Fte),
            column("S1_Y", &[info("Y", 2, 8 * 60)], RosterType::Fte),
            column("S2_X", &[info("X", 0, 13 * 60)], RosterType::Fte),
            column("S2_Y", &[info("Y", 2, 13 * 60)], RosterType::Fte),
        ];

        let outcome = solve_lexico(
            &columns,
            &targets(&["X", "Y"]),
            None,
            &SolverConfig::default(),
        );
        let MasterOutcome::Solved(sol) = outcome else {
            panic!("expected solved");
        };
        assert_eq!(sol.d_star, 2);
        assert_eq!(sol.selected.len(), 2);
        let ids: Vec<&str> = sol
            .selected
            .iter()
            .map(|&i| columns[i].roster_id.as_str())
            .collect();
        assert!(
            ids.contains(&"S2_X") && ids.contains(&"S2_Y"),
            "stage 2 must prefer the fuller rosters, got {ids:?}"
        );
    }

    #[test]
    fn infeasible_reports_zero_support_targets() {
        let p = info("P", 0, 300);
        let q = info("Q", 2, 300);
        let columns = vec![column("COL_PQ", &[p, q], RosterType::Fte)];

        let outcome = solve_lexico(
            &columns,
            &targets(&["P", "Q", "R"]),
            None,
            &SolverConfig::default(),
        );
        let MasterOutcome::Infeasible {
            zero_support_target_ids,
            diagnostic,
        } = outcome
        else {
            panic!("expected infeasible");
        };
        assert_eq!(zero_support_target_ids, vec!["R".to_string()]);
        assert!(diagnostic.under_covered.contains(&"R".to_string()));
    }

    #[test]
    fn hint_columns_outside_target_set_are_dropped() {
        let a = info("A", 0, 300);
        let z = info("Z", 2, 300);
        let columns = vec![
            column("GOOD_A", &[a.clone()], RosterType::Fte),
            column("BAD_AZ", &[a, z], RosterType::Fte),
        ];

        let filtered = crate::solver::master::filter_valid_hint_columns(
            &columns,
            &[0, 1],
            &targets(&["A"]),
        );
        assert_eq!(filtered, vec![0]);
    }

    #[test]
    fn empty_target_set_is_trivially_optimal() {
        let outcome = solve_lexico(&[], &BTreeSet::new(), None, &SolverConfig::default());
        let MasterOutcome::Solved(sol) = outcome else {
            panic!()
        };
        assert_eq!(sol.d_star, 0);
        assert!(sol.selected.is_empty());
    }

    #[test]
    fn overlapping_partition_detected_as_infeasible_with_diagnostic() {
        // B is only covered together with A, and C is only covered together
        // with A: tiling {A, B, C} exactly once is impossible even though
        // every target has support.
        let columns = vec![
            column(
                "AB",
                &[info("A", 0, 300), info("B", 2, 300)],
                RosterType::Fte,
            ),
            column("A_ONLY", &[info("A", 0, 300)], RosterType::Fte),
            column(
                "AC",
                &[info("A", 0, 300), info("C", 4, 300)],
                RosterType::Fte,
            ),
        ];

        let outcome = solve_lexico(
            &columns,
            &targets(&["A", "B", "C"]),
            None,
            &SolverConfig::default(),
        );
        match outcome {
            MasterOutcome::Infeasible {
                zero_support_target_ids,
                diagnostic,
            } => {
                assert!(zero_support_target_ids.is_empty());
                assert!(
                    diagnostic.over_covered.contains(&"A".to_string())
                        || !diagnostic.under_covered.is_empty()
                );
            }
            MasterOutcome::Solved(sol) => panic!("unexpected solution {:?}", sol.selected),
        }
    }
}
