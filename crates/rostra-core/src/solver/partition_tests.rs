#[cfg(test)]
mod tests {
    use crate::config::SolverConfig;
    use crate::domain::models::{BlockType, Tour, Weekday};
    use crate::solver::partition::partition;

    fn tour(id: &str, day: Weekday, start: i32, end: i32) -> Tour {
        Tour::new(id, day, start, end, false, None, None).unwrap()
    }

    #[test]
    fn three_chainable_tours_form_one_3er() {
        // Mon 06:00-09:00, 09:30-12:30, 13:00-16:00 -> gaps 30/30, span 10h.
        let tours = vec![
            tour("T1", Weekday::Monday, 360, 540),
            tour("T2", Weekday::Monday, 570, 750),
            tour("T3", Weekday::Monday, 780, 960),
        ];
        let blocks = partition(&tours, 94, &SolverConfig::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type, BlockType::Three);
        assert_eq!(blocks[0].id, "B3-T1");
        assert_eq!(blocks[0].span_min, 600);
    }

    #[test]
    fn split_gap_forms_2er_split() {
        // Mon 06:00-10:00 and 16:00-20:00 -> gap 360, span 14h.
        let tours = vec![
            tour("T1", Weekday::Monday, 360, 600),
            tour("T2", Weekday::Monday, 960, 1200),
        ];
        let blocks = partition(&tours, 94, &SolverConfig::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type, BlockType::TwoSplit);
        assert_eq!(blocks[0].id, "B2S-T1");
    }

    #[test]
    fn dead_gap_falls_back_to_singles() {
        // Gap of 120 min matches neither pause window.
        let tours = vec![
            tour("T1", Weekday::Monday, 360, 600),
            tour("T2", Weekday::Monday, 720, 900),
        ];
        let blocks = partition(&tours, 94, &SolverConfig::default()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.block_type == BlockType::Single));
    }

    #[test]
    fn every_tour_covered_exactly_once() {
        let mut tours = Vec::new();
        // A messy week: chains, split pairs, and loners across days.
        for d in 0..6u8 {
            let day = Weekday::from_index(d).unwrap();
            tours.push(tour(&format!("A{d}"), day, 300, 480));
            tours.push(tour(&format!("B{d}"), day, 520, 700));
            tours.push(tour(&format!("C{d}"), day, 740, 920));
            tours.push(tour(&format!("D{d}"), day, 960, 1100));
            tours.push(tour(&format!("E{d}"), day, 1160, 1320));
        }

        let blocks = partition(&tours, 7, &SolverConfig::default()).unwrap();

        let mut seen = std::collections::HashSet::new();
        for b in &blocks {
            for t in &b.tours {
                assert!(seen.insert(t.id.clone()), "tour {} used twice", t.id);
            }
        }
        assert_eq!(seen.len(), tours.len(), "all tours covered");

        // Work-minute conservation
        let input_min: i32 = tours.iter().map(Tour::duration_min).sum();
        let output_min: i32 = blocks.iter().map(|b| b.total_work_min).sum();
        assert_eq!(input_min, output_min);
    }

    #[test]
    fn same_seed_means_identical_partition() {
        // Four chainable tours (gap 50) on each of three days.
        let mut tours = Vec::new();
        for d in 0..3u8 {
            let day = Weekday::from_index(d).unwrap();
            for i in 0..4i32 {
                tours.push(tour(
                    &format!("T{d}{i}"),
                    day,
                    300 + i * 220,
                    300 + i * 220 + 170,
                ));
            }
        }

        let cfg = SolverConfig::default();
        let a = partition(&tours, 94, &cfg).unwrap();
        let b = partition(&tours, 94, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cross_midnight_tours_stay_single() {
        let late = Tour::new("N1", Weekday::Friday, 1380, 120, true, None, None).unwrap();
        let tours = vec![tour("T1", Weekday::Friday, 1290, 1350), late];
        let blocks = partition(&tours, 94, &SolverConfig::default()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.block_type == BlockType::Single));
    }
}
