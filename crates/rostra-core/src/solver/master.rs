/// Lexicographic set-partitioning master.
///
/// Chooses a subset of pool columns covering each target block exactly
/// once, minimizing headcount first and a quality score second. The search
/// is a single-threaded branch-and-bound with a fixed branching rule
/// (most-constrained target first, columns in insertion order) and a
/// deterministic node budget, so identical inputs explore identical trees.
use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::domain::column::RosterColumn;
use crate::domain::models::RosterType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterStatus {
    /// Search ran to completion within the node budget.
    Optimal,
    /// Node budget exhausted; best incumbent returned.
    Feasible,
}

#[derive(Debug, Clone)]
pub struct MasterSolution {
    pub status: MasterStatus,
    /// Minimum headcount proved (or best found under the budget).
    pub d_star: usize,
    /// Indices into the input column slice.
    pub selected: Vec<usize>,
    pub quality: i64,
    pub stage2_complete: bool,
    pub nodes_explored: u64,
}

/// Relaxed-model diagnostic for infeasible instances. Never a production
/// solution.
#[derive(Debug, Clone)]
pub struct RelaxedDiagnostic {
    pub under_covered: Vec<String>,
    pub over_covered: Vec<String>,
}

#[derive(Debug)]
pub enum MasterOutcome {
    Solved(MasterSolution),
    Infeasible {
        zero_support_target_ids: Vec<String>,
        diagnostic: RelaxedDiagnostic,
    },
}

/// Hints must reproduce a feasible solution over the target set; columns
/// covering anything outside it are rejected.
pub fn filter_valid_hint_columns(
    columns: &[RosterColumn],
    hint: &[usize],
    targets: &BTreeSet<String>,
) -> Vec<usize> {
    hint.iter()
        .copied()
        .filter(|&i| {
            columns
                .get(i)
                .map_or(false, |c| c.block_ids.iter().all(|b| targets.contains(b)))
        })
        .collect()
}

pub fn solve_lexico(
    columns: &[RosterColumn],
    targets: &BTreeSet<String>,
    hint: Option<&[usize]>,
    cfg: &SolverConfig,
) -> MasterOutcome {
    let target_ids: Vec<String> = targets.iter().cloned().collect();
    let n = target_ids.len();
    if n == 0 {
        return MasterOutcome::Solved(MasterSolution {
            status: MasterStatus::Optimal,
            d_star: 0,
            selected: Vec::new(),
            quality: 0,
            stage2_complete: true,
            nodes_explored: 0,
        });
    }

    let target_pos: HashMap<&str, usize> = target_ids
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();
    let words = (n + 63) / 64;

    // Columns usable in an exact partition: valid, non-empty, and covering
    // only target blocks. Masks keep insertion order.
    let mut usable: Vec<usize> = Vec::new();
    let mut masks: Vec<Vec<u64>> = Vec::new();
    for (i, col) in columns.iter().enumerate() {
        if !col.is_valid || col.block_ids.is_empty() {
            continue;
        }
        if !col.block_ids.iter().all(|b| targets.contains(b)) {
            continue;
        }
        let mut mask = vec![0u64; words];
        for b in &col.block_ids {
            let p = target_pos[b.as_str()];
            mask[p / 64] |= 1 << (p % 64);
        }
        usable.push(i);
        masks.push(mask);
    }

    // Candidate columns per target, insertion order.
    let mut candidates: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (local, mask) in masks.iter().enumerate() {
        for (t, slot) in candidates.iter_mut().enumerate() {
            if mask[t / 64] & (1 << (t % 64)) != 0 {
                slot.push(local);
            }
        }
    }

    // Zero-support check: strict model infeasible, run the relaxed
    // diagnostic instead.
    let zero_support: Vec<String> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_empty())
        .map(|(t, _)| target_ids[t].clone())
        .collect();
    if !zero_support.is_empty() {
        warn!(
            missing = zero_support.len(),
            "strict master infeasible: targets with zero support"
        );
        let diagnostic = relaxed_diagnostic(&target_ids, &masks, words);
        return MasterOutcome::Infeasible {
            zero_support_target_ids: zero_support,
            diagnostic,
        };
    }

    let max_cover = masks
        .iter()
        .map(|m| popcount(m))
        .max()
        .unwrap_or(1)
        .max(1);

    let mut ctx = Search {
        masks: &masks,
        candidates: &candidates,
        n,
        max_cover,
        node_cap: cfg.master_node_cap,
        nodes: 0,
        truncated: false,
        best: None,
        best_len: usize::MAX,
        pinned_len: None,
        best_quality: i64::MAX,
        quality_of: Vec::new(),
    };

    // Incumbent from the greedy hint keeps stage 1 from starting cold.
    if let Some(hint_cols) = hint {
        let filtered = filter_valid_hint_columns(columns, hint_cols, targets);
        let local: Vec<usize> = filtered
            .iter()
            .filter_map(|&orig| usable.iter().position(|&u| u == orig))
            .collect();
        if is_exact_partition(&local, &masks, n, words) {
            debug!(len = local.len(), "hint accepted as incumbent");
            ctx.best_len = local.len();
            ctx.best = Some(local);
        }
    }

    // Stage 1: minimize headcount.
    let mut covered = vec![0u64; words];
    let mut selected = Vec::new();
    ctx.search_stage1(&mut covered, 0, &mut selected);

    let stage1_nodes = ctx.nodes;
    let stage1_truncated = ctx.truncated;
    let Some(stage1_best) = ctx.best.clone() else {
        // No partition exists even though every target has support.
        let diagnostic = relaxed_diagnostic(&target_ids, &masks, words);
        return MasterOutcome::Infeasible {
            zero_support_target_ids: Vec::new(),
            diagnostic,
        };
    };
    let d_star = stage1_best.len();
    info!(d_star, nodes = stage1_nodes, "stage 1 headcount fixed");

    // Stage 2: with headcount pinned at D*, minimize quality.
    ctx.quality_of = usable
        .iter()
        .map(|&orig| column_quality(&columns[orig], cfg))
        .collect();
    ctx.pinned_len = Some(d_star);
    ctx.best_quality = solution_quality(&stage1_best, &ctx.quality_of);
    ctx.node_cap = cfg.stage2_node_cap;
    ctx.nodes = 0;
    ctx.truncated = false;

    let mut covered = vec![0u64; words];
    let mut selected = Vec::new();
    ctx.search_stage2(&mut covered, 0, &mut selected, 0);

    let stage2_complete = !ctx.truncated;
    let final_local = ctx.best.clone().unwrap_or(stage1_best);
    let quality = solution_quality(&final_local, &ctx.quality_of);
    let selected: Vec<usize> = final_local.iter().map(|&l| usable[l]).collect();

    debug_assert!(selected.len() == d_star);
    info!(
        d_star,
        quality,
        stage2_complete,
        nodes = ctx.nodes,
        "master solved"
    );

    MasterOutcome::Solved(MasterSolution {
        status: if stage1_truncated {
            MasterStatus::Feasible
        } else {
            MasterStatus::Optimal
        },
        d_star,
        selected,
        quality,
        stage2_complete,
        nodes_explored: stage1_nodes + ctx.nodes,
    })
}

/// Stage-2 quality of one column: singleton penalty, FTE underfill below
/// the soft target, and PT fragmentation terms.
fn column_quality(col: &RosterColumn, cfg: &SolverConfig) -> i64 {
    let mut q = 0i64;
    if col.is_singleton() {
        q += cfg.w_singleton;
    }
    match col.roster_type {
        RosterType::Fte => {
            let underfill = i64::from((cfg.fte_soft_target_min - col.total_min).max(0));
            q += underfill * cfg.w_underfill_per_min;
        }
        RosterType::Pt => {
            q += col.working_days() as i64 * cfg.w_pt_day;
            if col.total_min < cfg.pt_min_week_min {
                q += cfg.w_pt_below_min;
            }
        }
    }
    q
}

fn solution_quality(selection: &[usize], quality_of: &[i64]) -> i64 {
    if quality_of.is_empty() {
        return i64::MAX;
    }
    selection.iter().map(|&i| quality_of[i]).sum()
}

fn popcount(mask: &[u64]) -> usize {
    mask.iter().map(|w| w.count_ones() as usize).sum()
}

fn is_exact_partition(selection: &[usize], masks: &[Vec<u64>], n: usize, words: usize) -> bool {
    let mut covered = vec![0u64; words];
    for &i in selection {
        let mask = &masks[i];
        if mask.iter().zip(&covered).any(|(m, c)| m & c != 0) {
            return false;
        }
        for (c, m) in covered.iter_mut().zip(mask) {
            *c |= m;
        }
    }
    popcount(&covered) == n
}

/// Relaxed model stand-in: a deterministic greedy cover whose leftovers are
/// the under-covered targets and whose overlaps are the over-covered ones.
/// Always terminates, used only to diagnose and steer regeneration.
fn relaxed_diagnostic(target_ids: &[String], masks: &[Vec<u64>], words: usize) -> RelaxedDiagnostic {
    let n = target_ids.len();
    let mut covered = vec![0u64; words];
    let mut counts = vec![0u32; n];

    loop {
        let mut best: Option<(usize, usize)> = None;
        for (i, mask) in masks.iter().enumerate() {
            let gain = mask
                .iter()
                .zip(&covered)
                .map(|(m, c)| (m & !c).count_ones() as usize)
                .sum::<usize>();
            if gain > 0 && best.map_or(true, |(_, g)| gain > g) {
                best = Some((i, gain));
            }
        }
        let Some((pick, _)) = best else { break };
        for t in 0..n {
            if masks[pick][t / 64] & (1 << (t % 64)) != 0 {
                counts[t] += 1;
            }
        }
        for (c, m) in covered.iter_mut().zip(&masks[pick]) {
            *c |= m;
        }
    }

    RelaxedDiagnostic {
        under_covered: (0..n)
            .filter(|&t| counts[t] == 0)
            .map(|t| target_ids[t].clone())
            .collect(),
        over_covered: (0..n)
            .filter(|&t| counts[t] > 1)
            .map(|t| target_ids[t].clone())
            .collect(),
    }
}

struct Search<'a> {
    masks: &'a [Vec<u64>],
    candidates: &'a [Vec<usize>],
    n: usize,
    max_cover: usize,
    node_cap: u64,
    nodes: u64,
    truncated: bool,
    best: Option<Vec<usize>>,
    best_len: usize,
    pinned_len: Option<usize>,
    best_quality: i64,
    quality_of: Vec<i64>,
}

impl Search<'_> {
    fn budget_spent(&mut self) -> bool {
        self.nodes += 1;
        if self.nodes > self.node_cap {
            self.truncated = true;
            return true;
        }
        false
    }

    /// Most-constrained uncovered target: fewest still-usable candidates,
    /// ties by target index.
    fn branch_target(&self, covered: &[u64]) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for t in 0..self.n {
            if covered[t / 64] & (1 << (t % 64)) != 0 {
                continue;
            }
            let usable = self.candidates[t]
                .iter()
                .filter(|&&c| !intersects(&self.masks[c], covered))
                .count();
            if best.map_or(true, |(_, u)| usable < u) {
                best = Some((t, usable));
            }
        }
        best.map(|(t, _)| t)
    }

    fn search_stage1(&mut self, covered: &mut Vec<u64>, covered_count: usize, selected: &mut Vec<usize>) {
        if self.truncated || self.budget_spent() {
            return;
        }

        if covered_count == self.n {
            if selected.len() < self.best_len {
                self.best_len = selected.len();
                self.best = Some(selected.clone());
            }
            return;
        }

        // Lower bound: remaining targets / widest column.
        let remaining = self.n - covered_count;
        let lb = (remaining + self.max_cover - 1) / self.max_cover;
        if selected.len() + lb >= self.best_len {
            return;
        }

        let Some(target) = self.branch_target(covered) else {
            return;
        };

        let branch_cols = self.candidates[target].clone();
        for c in branch_cols {
            if intersects(&self.masks[c], covered) {
                continue;
            }
            let gained = popcount(&self.masks[c]);
            apply(covered, &self.masks[c]);
            selected.push(c);
            self.search_stage1(covered, covered_count + gained, selected);
            selected.pop();
            unapply(covered, &self.masks[c]);
            if self.truncated {
                return;
            }
        }
    }

    fn search_stage2(
        &mut self,
        covered: &mut Vec<u64>,
        covered_count: usize,
        selected: &mut Vec<usize>,
        quality: i64,
    ) {
        if self.truncated || self.budget_spent() {
            return;
        }
        let pinned = self.pinned_len.expect("stage 2 runs pinned");

        if covered_count == self.n {
            if selected.len() == pinned && quality < self.best_quality {
                self.best_quality = quality;
                self.best = Some(selected.clone());
            }
            return;
        }

        if selected.len() >= pinned || quality >= self.best_quality {
            return;
        }
        let remaining = self.n - covered_count;
        let lb = (remaining + self.max_cover - 1) / self.max_cover;
        if selected.len() + lb > pinned {
            return;
        }

        let Some(target) = self.branch_target(covered) else {
            return;
        };

        let branch_cols = self.candidates[target].clone();
        for c in branch_cols {
            if intersects(&self.masks[c], covered) {
                continue;
            }
            let gained = popcount(&self.masks[c]);
            apply(covered, &self.masks[c]);
            selected.push(c);
            self.search_stage2(
                covered,
                covered_count + gained,
                selected,
                quality + self.quality_of[c],
            );
            selected.pop();
            unapply(covered, &self.masks[c]);
            if self.truncated {
                return;
            }
        }
    }
}

fn intersects(mask: &[u64], covered: &[u64]) -> bool {
    mask.iter().zip(covered).any(|(m, c)| m & c != 0)
}

fn apply(covered: &mut [u64], mask: &[u64]) {
    for (c, m) in covered.iter_mut().zip(mask) {
        *c |= m;
    }
}

fn unapply(covered: &mut [u64], mask: &[u64]) {
    for (c, m) in covered.iter_mut().zip(mask) {
        *c &= !m;
    }
}
