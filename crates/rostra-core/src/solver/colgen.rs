/// ALNS-style roster column generator.
///
/// Builds a pool of valid weekly columns for the set-partitioning master.
/// After `generate_singleton_columns` the pool is covering: every block
/// appears in at least one column, so the master (or the greedy fallback)
/// always has a feasible solution to find.
use std::collections::{BTreeSet, HashMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::domain::column::{build_column, can_add_block, BlockInfo, ColumnSignature, RosterColumn, RosterRules};
use crate::domain::models::{DriverRoster, RosterType, Weekday};

#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub size: usize,
    pub hours_min: f64,
    pub hours_max: f64,
    pub hours_avg: f64,
    pub uncovered_blocks: usize,
    pub rare_covered_blocks: usize,
}

pub struct ColumnGenerator {
    block_infos: Vec<BlockInfo>,
    block_index: HashMap<String, usize>,
    /// Other same-day blocks each block overlaps; used as a difficulty
    /// weight when ordering seeds and candidates.
    conflict_scores: HashMap<String, usize>,
    rules: RosterRules,
    cfg: SolverConfig,
    rng: ChaCha8Rng,
    /// Insertion-ordered pool; iteration order is reproducible.
    pool: Vec<RosterColumn>,
    signatures: HashMap<ColumnSignature, usize>,
    block_to_columns: HashMap<String, BTreeSet<usize>>,
    next_roster_id: usize,
}

impl ColumnGenerator {
    pub fn new(block_infos: Vec<BlockInfo>, seed: u64, cfg: &SolverConfig) -> Self {
        let block_index = block_infos
            .iter()
            .enumerate()
            .map(|(i, b)| (b.block_id.clone(), i))
            .collect();

        let conflict_scores = compute_conflict_scores(&block_infos);
        debug!(
            blocks = block_infos.len(),
            conflicted = conflict_scores.len(),
            "conflict scores computed"
        );

        ColumnGenerator {
            block_infos,
            block_index,
            conflict_scores,
            rules: cfg.roster_rules(),
            cfg: cfg.clone(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            pool: Vec::new(),
            signatures: HashMap::new(),
            block_to_columns: HashMap::new(),
            next_roster_id: 0,
        }
    }

    pub fn columns(&self) -> &[RosterColumn] {
        &self.pool
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn block_infos(&self) -> &[BlockInfo] {
        &self.block_infos
    }

    fn next_roster_id(&mut self) -> String {
        let rid = format!("R{:05}", self.next_roster_id);
        self.next_roster_id += 1;
        rid
    }

    /// Admit a column if it is valid, novel, and the pool has room.
    pub fn add_column(&mut self, column: RosterColumn) -> bool {
        if !column.is_valid {
            return false;
        }
        if self.signatures.contains_key(&column.signature) {
            return false;
        }
        if self.pool.len() >= self.cfg.pool_cap {
            return false;
        }

        let idx = self.pool.len();
        self.signatures.insert(column.signature.clone(), idx);
        for block_id in &column.block_ids {
            self.block_to_columns
                .entry(block_id.clone())
                .or_default()
                .insert(idx);
        }
        self.pool.push(column);
        true
    }

    pub fn coverage_frequency(&self) -> HashMap<String, usize> {
        self.block_to_columns
            .iter()
            .map(|(bid, cols)| (bid.clone(), cols.len()))
            .collect()
    }

    pub fn uncovered_blocks(&self) -> Vec<String> {
        self.block_infos
            .iter()
            .filter(|b| {
                self.block_to_columns
                    .get(&b.block_id)
                    .map_or(true, BTreeSet::is_empty)
            })
            .map(|b| b.block_id.clone())
            .collect()
    }

    /// Blocks covered by fewer than `min_coverage` columns, rarest first.
    pub fn rare_blocks(&self, min_coverage: usize) -> Vec<String> {
        let freq = self.coverage_frequency();
        let mut rare: Vec<(String, usize)> = self
            .block_infos
            .iter()
            .map(|b| (b.block_id.clone(), freq.get(&b.block_id).copied().unwrap_or(0)))
            .filter(|(_, f)| *f < min_coverage)
            .collect();
        rare.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        rare.into_iter().map(|(bid, _)| bid).collect()
    }

    pub fn pool_stats(&self) -> PoolStats {
        if self.pool.is_empty() {
            return PoolStats::default();
        }
        let hours: Vec<f64> = self.pool.iter().map(RosterColumn::total_hours).collect();
        PoolStats {
            size: self.pool.len(),
            hours_min: hours.iter().copied().fold(f64::INFINITY, f64::min),
            hours_max: hours.iter().copied().fold(0.0, f64::max),
            hours_avg: hours.iter().sum::<f64>() / hours.len() as f64,
            uncovered_blocks: self.uncovered_blocks().len(),
            rare_covered_blocks: self.rare_blocks(3).len(),
        }
    }

    // =========================================================================
    // MOVE 1: BUILD-FROM-SEED
    // =========================================================================

    /// Greedily grow a column from one seed block until the randomized
    /// packing target is reached or no insertion stays feasible.
    pub fn build_from_seed(
        &mut self,
        seed_block_id: &str,
        prioritize_uncovered: bool,
    ) -> Option<RosterColumn> {
        let seed_idx = *self.block_index.get(seed_block_id)?;
        let seed_block = self.block_infos[seed_idx].clone();

        let mut current = vec![seed_block.clone()];
        let mut current_min = seed_block.work_min;

        let mut candidates: Vec<usize> = (0..self.block_infos.len())
            .filter(|&i| i != seed_idx)
            .collect();
        candidates.sort_by_key(|&i| {
            let b = &self.block_infos[i];
            let uncovered = self
                .block_to_columns
                .get(&b.block_id)
                .map_or(true, BTreeSet::is_empty);
            let conflict = self.conflict_scores.get(&b.block_id).copied().unwrap_or(0);
            (
                u8::from(!(prioritize_uncovered && uncovered)),
                std::cmp::Reverse(conflict),
                std::cmp::Reverse(b.work_min),
                b.block_id.clone(),
            )
        });

        // Dynamic packing target in [pack_target, week cap]
        let target_min = self
            .rng
            .gen_range(self.cfg.pack_target_min..=self.cfg.fte_max_week_min);

        for i in candidates {
            if current_min >= target_min {
                break;
            }
            let cand = &self.block_infos[i];
            if current_min + cand.work_min > self.cfg.fte_max_week_min {
                continue;
            }
            if can_add_block(&current, cand, current_min, RosterType::Fte, &self.rules).is_ok() {
                current_min += cand.work_min;
                current.push(cand.clone());
            }
        }

        let rid = self.next_roster_id();
        let column = build_column(rid, &current, RosterType::Fte, &self.rules);
        column.is_valid.then_some(column)
    }

    // =========================================================================
    // MOVE 2: REPAIR-UNCOVERED
    // =========================================================================

    /// Build columns seeded from blocks nothing in the pool covers yet.
    pub fn repair_uncovered(&mut self, max_attempts: usize) -> usize {
        let mut uncovered = self.uncovered_blocks();
        if uncovered.is_empty() {
            return 0;
        }
        debug!(count = uncovered.len(), "repair-uncovered pass");

        // Hardest (most conflicted) seeds first
        uncovered.sort_by_key(|bid| {
            (
                std::cmp::Reverse(self.conflict_scores.get(bid).copied().unwrap_or(0)),
                bid.clone(),
            )
        });

        let mut added = 0;
        for seed_id in uncovered.into_iter().take(max_attempts) {
            if let Some(column) = self.build_from_seed(&seed_id, true) {
                if self.add_column(column) {
                    added += 1;
                }
            }
        }
        added
    }

    // =========================================================================
    // MOVE 3: SWAP BUILDER
    // =========================================================================

    /// Exchange one block between two random pool members and admit any
    /// still-valid results.
    pub fn swap_builder(&mut self, max_attempts: usize) -> usize {
        if self.pool.len() < 2 {
            return 0;
        }

        let mut added = 0;
        for _ in 0..max_attempts {
            let i = self.rng.gen_range(0..self.pool.len());
            let j = self.rng.gen_range(0..self.pool.len());
            if i == j {
                continue;
            }

            let ids_a: Vec<String> = self.pool[i].block_ids.iter().cloned().collect();
            let ids_b: Vec<String> = self.pool[j].block_ids.iter().cloned().collect();
            if ids_a.is_empty() || ids_b.is_empty() {
                continue;
            }

            let out_a = ids_a[self.rng.gen_range(0..ids_a.len())].clone();
            let out_b = ids_b[self.rng.gen_range(0..ids_b.len())].clone();
            if out_a == out_b {
                continue;
            }

            let new_a: Vec<BlockInfo> = ids_a
                .iter()
                .filter(|id| **id != out_a)
                .chain(std::iter::once(&out_b))
                .filter_map(|id| self.lookup(id).cloned())
                .collect();
            let new_b: Vec<BlockInfo> = ids_b
                .iter()
                .filter(|id| **id != out_b)
                .chain(std::iter::once(&out_a))
                .filter_map(|id| self.lookup(id).cloned())
                .collect();

            for blocks in [new_a, new_b] {
                let rid = self.next_roster_id();
                let column = build_column(rid, &blocks, RosterType::Fte, &self.rules);
                if column.is_valid && self.add_column(column) {
                    added += 1;
                }
            }
        }
        added
    }

    // =========================================================================
    // MOVE 4: TARGETED DIVERSIFICATION
    // =========================================================================

    /// Rebuild around target seeds while staying clear of an avoid-set of
    /// collision-prone blocks, preferring rarely-covered candidates.
    pub fn targeted_repair(
        &mut self,
        target_blocks: &[String],
        avoid: &HashSet<String>,
        max_attempts: usize,
    ) -> usize {
        if target_blocks.is_empty() {
            return 0;
        }
        debug!(
            seeds = target_blocks.len(),
            avoided = avoid.len(),
            "targeted repair"
        );

        let mut added = 0;
        for seed_id in target_blocks.iter().take(max_attempts) {
            if let Some(column) = self.build_from_seed_diversified(seed_id, avoid) {
                if self.add_column(column) {
                    added += 1;
                }
            }
        }
        added
    }

    fn build_from_seed_diversified(
        &mut self,
        seed_block_id: &str,
        avoid: &HashSet<String>,
    ) -> Option<RosterColumn> {
        let seed_idx = *self.block_index.get(seed_block_id)?;
        let seed_block = self.block_infos[seed_idx].clone();

        let mut current = vec![seed_block.clone()];
        let mut current_min = seed_block.work_min;

        let freq = self.coverage_frequency();
        let mut candidates: Vec<usize> = (0..self.block_infos.len())
            .filter(|&i| {
                i != seed_idx && !avoid.contains(&self.block_infos[i].block_id)
            })
            .collect();
        candidates.sort_by_key(|&i| {
            let b = &self.block_infos[i];
            let f = freq.get(&b.block_id).copied().unwrap_or(0);
            let conflict = self.conflict_scores.get(&b.block_id).copied().unwrap_or(0);
            (
                u8::from(f != 0),
                f,
                std::cmp::Reverse(conflict),
                std::cmp::Reverse(b.work_min),
                b.block_id.clone(),
            )
        });

        for i in candidates {
            if current_min >= self.cfg.fte_soft_target_min {
                break;
            }
            let cand = &self.block_infos[i];
            if current_min + cand.work_min > self.cfg.fte_max_week_min {
                continue;
            }
            if can_add_block(&current, cand, current_min, RosterType::Fte, &self.rules).is_ok() {
                current_min += cand.work_min;
                current.push(cand.clone());
            }
        }

        let rid = self.next_roster_id();
        let column = build_column(rid, &current, RosterType::Fte, &self.rules);
        column.is_valid.then_some(column)
    }

    // =========================================================================
    // POOL GENERATION
    // =========================================================================

    /// Seed the pool with one build pass per block, hardest blocks first.
    pub fn generate_initial_pool(&mut self, target_size: usize) -> usize {
        info!("generating initial column pool");

        let mut seeds: Vec<String> = self.block_infos.iter().map(|b| b.block_id.clone()).collect();
        seeds.sort_by_key(|bid| {
            (
                std::cmp::Reverse(self.conflict_scores.get(bid).copied().unwrap_or(0)),
                bid.clone(),
            )
        });

        let mut generated = 0;
        for seed_id in seeds {
            if self.pool.len() >= target_size {
                break;
            }
            if let Some(column) = self.build_from_seed(&seed_id, true) {
                if self.add_column(column) {
                    generated += 1;
                }
            }
        }

        let stats = self.pool_stats();
        info!(
            pool = stats.size,
            uncovered = stats.uncovered_blocks,
            "initial pool built"
        );
        generated
    }

    /// Run repair + swap rounds; stops early once a round adds nothing.
    pub fn generate_columns(&mut self, rounds: usize, per_round: usize) -> usize {
        let mut total_new = 0;
        for round in 0..rounds {
            let mut new_this_round = 0;
            new_this_round += self.repair_uncovered(per_round / 2);
            new_this_round += self.swap_builder(per_round / 2);
            total_new += new_this_round;

            if new_this_round == 0 {
                debug!(round = round + 1, "no new columns, stopping early");
                break;
            }
            debug!(
                round = round + 1,
                added = new_this_round,
                pool = self.pool.len(),
                "generation round"
            );
        }
        total_new
    }

    // =========================================================================
    // PT COLUMNS
    // =========================================================================

    /// Small part-time column (< 40h, at most `max_blocks` blocks).
    fn build_pt_column(&mut self, seed_block_id: &str, max_blocks: usize) -> Option<RosterColumn> {
        let seed_idx = *self.block_index.get(seed_block_id)?;
        let seed_block = self.block_infos[seed_idx].clone();

        let mut current = vec![seed_block.clone()];
        let mut current_min = seed_block.work_min;

        let freq = self.coverage_frequency();
        let mut candidates: Vec<usize> = (0..self.block_infos.len())
            .filter(|&i| i != seed_idx)
            .collect();
        // PT drivers usually work 1-2 days: same-day candidates first.
        candidates.sort_by_key(|&i| {
            let b = &self.block_infos[i];
            let f = freq.get(&b.block_id).copied().unwrap_or(0);
            (
                f,
                u8::from(b.day != seed_block.day),
                std::cmp::Reverse(b.work_min),
                b.block_id.clone(),
            )
        });

        for i in candidates {
            if current.len() >= max_blocks {
                break;
            }
            let cand = &self.block_infos[i];
            if current_min + cand.work_min > self.cfg.pt_max_week_min {
                continue;
            }
            if can_add_block(&current, cand, current_min, RosterType::Pt, &self.rules).is_ok() {
                current_min += cand.work_min;
                current.push(cand.clone());
            }
        }

        if current_min < 60 {
            return None;
        }

        let rid = self.next_roster_id();
        let column = build_column(rid, &current, RosterType::Pt, &self.rules);
        column.is_valid.then_some(column)
    }

    /// PT pool targeting the blocks FTE rosters struggle to absorb:
    /// uncovered Saturday seeds, uncovered late-evening seeds, then all
    /// Saturday blocks.
    pub fn generate_pt_pool(&mut self, target_size: usize) -> usize {
        info!("generating PT column pool");

        let saturday: HashSet<String> = self
            .block_infos
            .iter()
            .filter(|b| b.day == Weekday::Saturday)
            .map(|b| b.block_id.clone())
            .collect();
        let late: HashSet<String> = self
            .block_infos
            .iter()
            .filter(|b| b.end_min > 20 * 60)
            .map(|b| b.block_id.clone())
            .collect();
        let uncovered = self.uncovered_blocks();

        let mut seeds: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for bid in uncovered.iter().filter(|b| saturday.contains(*b)) {
            if seen.insert(bid.clone()) {
                seeds.push(bid.clone());
            }
        }
        for bid in uncovered.iter().filter(|b| late.contains(*b)) {
            if seen.insert(bid.clone()) {
                seeds.push(bid.clone());
            }
        }
        let mut rest: Vec<String> = saturday.into_iter().filter(|b| !seen.contains(b)).collect();
        rest.sort();
        seeds.extend(rest);

        let mut generated = 0;
        for seed_id in seeds {
            if generated >= target_size {
                break;
            }
            if let Some(column) = self.build_pt_column(&seed_id, 3) {
                if self.add_column(column) {
                    generated += 1;
                }
            }
        }
        info!(count = generated, "PT columns generated");
        generated
    }

    // =========================================================================
    // FEASIBILITY FLOOR & HINTS
    // =========================================================================

    /// One single-block PT column per block. Worst case the master uses one
    /// driver per block, so a covering pool always exists.
    pub fn generate_singleton_columns(&mut self) -> usize {
        let mut added = 0;
        for i in 0..self.block_infos.len() {
            let block = self.block_infos[i].clone();
            let roster_type = if block.work_min <= self.cfg.pt_max_week_min {
                RosterType::Pt
            } else {
                RosterType::Fte
            };
            let rid = self.next_roster_id();
            let column = build_column(rid, std::slice::from_ref(&block), roster_type, &self.rules);
            if self.add_column(column) {
                added += 1;
            }
        }
        info!(count = added, "singleton fallback columns added");
        added
    }

    /// Admit columns reproducing a known-feasible greedy solution, so the
    /// master can start from that incumbent and only improve.
    pub fn seed_from_greedy(&mut self, rosters: &[DriverRoster]) -> usize {
        let mut added = 0;
        for roster in rosters {
            let blocks: Vec<BlockInfo> = roster
                .blocks
                .iter()
                .filter_map(|b| self.lookup(&b.id).cloned())
                .collect();
            if blocks.is_empty() {
                continue;
            }
            let rid = self.next_roster_id();
            let column = build_column(rid, &blocks, roster.roster_type, &self.rules);
            if self.add_column(column) {
                added += 1;
            }
        }
        info!(count = added, "columns seeded from greedy solution");
        added
    }

    fn lookup(&self, block_id: &str) -> Option<&BlockInfo> {
        self.block_index.get(block_id).map(|&i| &self.block_infos[i])
    }
}

/// Count, per block, how many other same-day blocks overlap it.
fn compute_conflict_scores(block_infos: &[BlockInfo]) -> HashMap<String, usize> {
    let mut scores: HashMap<String, usize> = HashMap::new();
    for (i, a) in block_infos.iter().enumerate() {
        for b in &block_infos[i + 1..] {
            if a.overlaps(b) {
                *scores.entry(a.block_id.clone()).or_default() += 1;
                *scores.entry(b.block_id.clone()).or_default() += 1;
            }
        }
    }
    scores
}
