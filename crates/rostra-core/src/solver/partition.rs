/// Greedy deterministic block partitioner.
///
/// Each tour lands in exactly one block. Per day, four phases run to
/// exhaustion - 3er, 2er-regular, 2er-split, 1er - preferring larger
/// blocks. The seeded RNG shuffling successor candidates is the only
/// randomness in the whole pipeline; same (sorted tours, seed) means
/// byte-identical output.
use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::SolverConfig;
use crate::domain::errors::Result;
use crate::domain::models::{Block, Tour, Weekday};

pub fn partition(tours: &[Tour], seed: u64, config: &SolverConfig) -> Result<Vec<Block>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rules = &config.block_rules;
    let mut blocks = Vec::new();

    for day in Weekday::ALL {
        let mut day_tours: Vec<&Tour> = tours.iter().filter(|t| t.day == day).collect();
        if day_tours.is_empty() {
            continue;
        }
        day_tours.sort_by(|a, b| a.start_min.cmp(&b.start_min).then(a.id.cmp(&b.id)));

        let mut used: HashSet<&str> = HashSet::new();

        // Phase 1: 3er chains (regular gaps only, 16h span)
        loop {
            let curr = active(&day_tours, &used);
            let mut found = false;

            'scan: for (i, &t1) in curr.iter().enumerate() {
                let mut t2_candidates: Vec<&Tour> = curr[i + 1..]
                    .iter()
                    .copied()
                    .filter(|t2| rules.is_regular_gap(gap(t1, t2)))
                    .collect();
                if t2_candidates.is_empty() {
                    continue;
                }
                t2_candidates.shuffle(&mut rng);

                for t2 in t2_candidates {
                    let t3_candidates: Vec<&Tour> = curr
                        .iter()
                        .copied()
                        .filter(|t3| {
                            t3.start_min > t2.end_min
                                && rules.is_regular_gap(gap(t2, t3))
                                && t3.end_min - t1.start_min <= rules.span_split_max
                        })
                        .collect();
                    if t3_candidates.is_empty() {
                        continue;
                    }
                    let t3 = t3_candidates[rng.gen_range(0..t3_candidates.len())];

                    let block = Block::from_tours(
                        format!("B3-{}", t1.id),
                        vec![t1.clone(), t2.clone(), t3.clone()],
                        rules,
                    )?;
                    blocks.push(block);
                    used.insert(&t1.id);
                    used.insert(&t2.id);
                    used.insert(&t3.id);
                    found = true;
                    break 'scan;
                }
            }

            if !found {
                break;
            }
        }

        // Phase 2: 2er-regular (30-60 min pause, 14h span)
        form_pairs(
            &day_tours,
            &mut used,
            &mut blocks,
            &mut rng,
            |t1, t2| rules.is_regular_gap(gap(t1, t2)) && span(t1, t2) <= rules.span_regular_max,
            "B2R",
            rules,
        )?;

        // Phase 3: 2er-split (4-6h pause, 16h span)
        form_pairs(
            &day_tours,
            &mut used,
            &mut blocks,
            &mut rng,
            |t1, t2| rules.is_split_gap(gap(t1, t2)) && span(t1, t2) <= rules.span_split_max,
            "B2S",
            rules,
        )?;

        // Phase 4: whatever is left drives alone
        for &t in &day_tours {
            if !used.contains(t.id.as_str()) {
                blocks.push(Block::from_tours(
                    format!("B1-{}", t.id),
                    vec![t.clone()],
                    rules,
                )?);
            }
        }

        debug!(
            day = day.as_str(),
            tours = day_tours.len(),
            "day partitioned"
        );
    }

    Ok(blocks)
}

fn active<'a>(day_tours: &[&'a Tour], used: &HashSet<&str>) -> Vec<&'a Tour> {
    day_tours
        .iter()
        .copied()
        .filter(|t| !used.contains(t.id.as_str()) && !t.crosses_midnight)
        .collect()
}

fn gap(t1: &Tour, t2: &Tour) -> i32 {
    t2.start_min - t1.end_min
}

fn span(t1: &Tour, t2: &Tour) -> i32 {
    t2.end_min - t1.start_min
}

fn form_pairs<'a, F>(
    day_tours: &[&'a Tour],
    used: &mut HashSet<&'a str>,
    blocks: &mut Vec<Block>,
    rng: &mut ChaCha8Rng,
    feasible: F,
    id_prefix: &str,
    rules: &crate::domain::models::BlockRules,
) -> Result<()>
where
    F: Fn(&Tour, &Tour) -> bool,
{
    loop {
        let curr = active(day_tours, used);
        let mut found = false;

        for (i, &t1) in curr.iter().enumerate() {
            let candidates: Vec<&Tour> = curr[i + 1..]
                .iter()
                .copied()
                .filter(|t2| feasible(t1, t2))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let t2 = candidates[rng.gen_range(0..candidates.len())];
            let block = Block::from_tours(
                format!("{}-{}", id_prefix, t1.id),
                vec![t1.clone(), t2.clone()],
                rules,
            )?;
            blocks.push(block);
            used.insert(&t1.id);
            used.insert(&t2.id);
            found = true;
            break;
        }

        if !found {
            return Ok(());
        }
    }
}
