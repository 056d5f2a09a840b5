#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::config::SolverConfig;
    use crate::domain::column::{build_column, BlockInfo};
    use crate::domain::models::{Tour, Weekday};
    use crate::solver::greedy::GreedySolver;
    use crate::solver::partition::partition;

    fn weekly_blocks(tours_per_day: usize) -> Vec<crate::domain::models::Block> {
        let mut tours = Vec::new();
        for d in 0..6u8 {
            let day = Weekday::from_index(d).unwrap();
            for i in 0..tours_per_day {
                let start = 300 + (i as i32) * 250;
                tours.push(
                    Tour::new(
                        format!("T{d}-{i}"),
                        day,
                        start,
                        start + 200,
                        false,
                        None,
                        None,
                    )
                    .unwrap(),
                );
            }
        }
        partition(&tours, 94, &SolverConfig::default()).unwrap()
    }

    #[test]
    fn every_block_assigned_exactly_once() {
        let blocks = weekly_blocks(4);
        let all_ids: HashSet<String> = blocks.iter().map(|b| b.id.clone()).collect();

        let (rosters, _) = GreedySolver::new(blocks, 94, &SolverConfig::default()).solve();

        let mut seen = HashSet::new();
        for r in &rosters {
            for b in &r.blocks {
                assert!(seen.insert(b.id.clone()), "block {} assigned twice", b.id);
            }
        }
        assert_eq!(seen, all_ids);
    }

    #[test]
    fn all_rosters_satisfy_hard_constraints() {
        let cfg = SolverConfig::default();
        let blocks = weekly_blocks(4);
        let (rosters, _) = GreedySolver::new(blocks, 94, &cfg).solve();

        let rules = cfg.roster_rules();
        for r in &rosters {
            let infos: Vec<BlockInfo> = r.blocks.iter().map(BlockInfo::from).collect();
            let col = build_column(r.driver_id.clone(), &infos, r.roster_type, &rules);
            assert!(
                col.is_valid,
                "driver {} violates constraints: {:?}",
                r.driver_id, col.violations
            );
        }
    }

    #[test]
    fn same_seed_same_solution() {
        let cfg = SolverConfig::default();
        let a = GreedySolver::new(weekly_blocks(4), 94, &cfg).solve().0;
        let b = GreedySolver::new(weekly_blocks(4), 94, &cfg).solve().0;

        let render = |rosters: &[crate::domain::models::DriverRoster]| -> Vec<String> {
            rosters
                .iter()
                .map(|r| {
                    let ids: Vec<&str> = r.blocks.iter().map(|b| b.id.as_str()).collect();
                    format!("{}:{}", r.driver_id, ids.join(","))
                })
                .collect()
        };
        assert_eq!(render(&a), render(&b));
    }

    #[test]
    fn nobody_works_seven_days() {
        let blocks = weekly_blocks(4);
        let (rosters, _) = GreedySolver::new(blocks, 94, &SolverConfig::default()).solve();
        for r in &rosters {
            assert!(r.days_worked <= 6, "driver {} works 7 days", r.driver_id);
        }
    }

    #[test]
    fn single_day_instance_gets_one_driver() {
        // One 3er chain on Monday fits a single driver.
        let tours = vec![
            Tour::new("T1", Weekday::Monday, 360, 540, false, None, None).unwrap(),
            Tour::new("T2", Weekday::Monday, 570, 750, false, None, None).unwrap(),
            Tour::new("T3", Weekday::Monday, 780, 960, false, None, None).unwrap(),
        ];
        let cfg = SolverConfig::default();
        let blocks = partition(&tours, 94, &cfg).unwrap();
        let (rosters, _) = GreedySolver::new(blocks, 94, &cfg).solve();

        assert_eq!(rosters.len(), 1);
        assert_eq!(rosters[0].blocks.len(), 1);
        assert_eq!(rosters[0].total_min, 540);
    }
}
