/// Anytime greedy assigner ("bin packing" strategy).
///
/// Serves two roles: a hint seed for the set-partitioning master and the
/// always-feasible fallback when the master proves nothing in budget.
/// Three phases: scalar best-fit construction into a fixed number of FTE
/// slots, a repair pipeline (ejection chains, min-hours balancing,
/// overflow, PT compaction), and a destroy/repair improvement loop with a
/// deterministic iteration budget.
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::domain::column::{can_add_block, BlockInfo, RosterRules};
use crate::domain::models::{Block, DriverRoster, RosterType, Weekday, DAY_MINUTES};

const PENALTY_NEW_DAY: f64 = 1000.0;
const PENALTY_SLACK_PER_HOUR: f64 = 20.0;
const PENALTY_TIGHT_REST: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverKind {
    Fte,
    FteOverflow,
    Pt,
}

impl DriverKind {
    fn roster_type(self) -> RosterType {
        match self {
            DriverKind::Fte | DriverKind::FteOverflow => RosterType::Fte,
            DriverKind::Pt => RosterType::Pt,
        }
    }
}

#[derive(Debug, Clone)]
struct Driver {
    id: String,
    kind: DriverKind,
    blocks: Vec<Block>,
    total_min: i32,
}

impl Driver {
    fn infos(&self) -> Vec<BlockInfo> {
        self.blocks.iter().map(BlockInfo::from).collect()
    }

    fn active_days(&self) -> Vec<Weekday> {
        let mut days: Vec<Weekday> = self.blocks.iter().map(|b| b.day).collect();
        days.sort();
        days.dedup();
        days
    }

    fn works_on(&self, day: Weekday) -> bool {
        self.blocks.iter().any(|b| b.day == day)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GreedyStats {
    pub fte_count: usize,
    pub fte_overflow_count: usize,
    pub pt_count: usize,
    pub under_min_count: usize,
}

pub struct GreedySolver {
    blocks: Vec<Block>,
    cfg: SolverConfig,
    rules: RosterRules,
    rng: ChaCha8Rng,
    drivers: Vec<Driver>,
    unassigned: Vec<Block>,
    fte_counter: usize,
    pt_counter: usize,
}

impl GreedySolver {
    pub fn new(blocks: Vec<Block>, seed: u64, cfg: &SolverConfig) -> Self {
        GreedySolver {
            blocks,
            cfg: cfg.clone(),
            rules: cfg.roster_rules(),
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
            drivers: Vec::new(),
            unassigned: Vec::new(),
            fte_counter: 0,
            pt_counter: 0,
        }
    }

    pub fn solve(mut self) -> (Vec<DriverRoster>, GreedyStats) {
        info!(blocks = self.blocks.len(), "greedy solver start");

        self.preprocess();
        self.construct();
        self.repair_ejection_chains();
        self.repair_min_hours();
        self.repair_overflow();
        self.repair_pt_compaction();
        self.improve_lns();

        self.build_result()
    }

    // =========================================================================
    // PHASE 0: PREPROCESSING
    // =========================================================================

    /// Hardest blocks first: Saturday, Friday, edge-of-day, then longest.
    fn preprocess(&mut self) {
        self.blocks.sort_by(|a, b| {
            difficulty_key(a)
                .partial_cmp(&difficulty_key(b))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let target = if self.cfg.target_ftes > 0 {
            self.cfg.target_ftes
        } else {
            let total: i32 = self.blocks.iter().map(|b| b.total_work_min).sum();
            ((total + self.cfg.fte_soft_target_min - 1) / self.cfg.fte_soft_target_min) as usize
        };
        for _ in 0..target {
            self.create_driver(DriverKind::Fte);
        }
        debug!(target_ftes = target, "FTE slots initialized");
    }

    // =========================================================================
    // PHASE 1: CONSTRUCTION
    // =========================================================================

    fn construct(&mut self) {
        let blocks = std::mem::take(&mut self.blocks);
        let mut unassigned = Vec::new();

        for block in blocks {
            let mut best: Option<(usize, f64)> = None;
            for (i, d) in self.drivers.iter().enumerate() {
                if d.kind != DriverKind::Fte || !self.can_take(d, &block) {
                    continue;
                }
                let score = self.score(d, &block);
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((i, score));
                }
            }

            match best {
                Some((i, _)) => self.assign(i, block),
                None => unassigned.push(block),
            }
        }

        self.unassigned = unassigned;
        debug!(unassigned = self.unassigned.len(), "construction done");
    }

    /// Scalar score: new-day penalty + remaining slack below the fill
    /// target + tight-rest penalty.
    fn score(&self, d: &Driver, block: &Block) -> f64 {
        let mut score = 0.0;

        if !d.works_on(block.day) {
            score += PENALTY_NEW_DAY;
        }

        let new_min = d.total_min + block.total_work_min;
        let slack_hours = f64::from((self.cfg.fte_soft_target_min - new_min).max(0)) / 60.0;
        score += slack_hours * PENALTY_SLACK_PER_HOUR;

        if self.rest_is_tight(d, block) {
            score += PENALTY_TIGHT_REST;
        }

        score
    }

    /// Rest to a neighbouring working day lands within 60 min of the floor.
    fn rest_is_tight(&self, d: &Driver, block: &Block) -> bool {
        let day = block.day.index() as i32;
        for other in &d.blocks {
            let other_day = other.day.index() as i32;
            let rest = if other_day == day - 1 {
                block.first_start + DAY_MINUTES - other.last_end
            } else if other_day == day + 1 {
                other.first_start + DAY_MINUTES - block.last_end
            } else {
                continue;
            };
            if rest >= self.rules.min_rest_min && rest < self.rules.min_rest_min + 60 {
                return true;
            }
        }
        false
    }

    // =========================================================================
    // PHASE 2: REPAIR
    // =========================================================================

    /// 1-swap ejection: evict one block from a full driver to make room,
    /// rehoming the evicted block elsewhere.
    fn repair_ejection_chains(&mut self) {
        debug!(blocks = self.unassigned.len(), "ejection chains");
        let unassigned = std::mem::take(&mut self.unassigned);
        let mut still_unassigned = Vec::new();

        for block in unassigned {
            if self.try_place_with_ejection(&block) {
                continue;
            }
            still_unassigned.push(block);
        }

        self.unassigned = still_unassigned;
    }

    fn try_place_with_ejection(&mut self, block: &Block) -> bool {
        // Emptiest FTEs first: most slack to absorb the chain.
        let mut candidates: Vec<usize> = (0..self.drivers.len())
            .filter(|&i| self.drivers[i].kind == DriverKind::Fte)
            .collect();
        candidates.sort_by_key(|&i| (self.drivers[i].total_min, self.drivers[i].id.clone()));

        let mut attempts = 0;
        for &i in &candidates {
            if attempts >= 50 {
                break;
            }
            attempts += 1;

            // Direct fit
            if self.can_take(&self.drivers[i], block) {
                self.assign(i, block.clone());
                return true;
            }

            // Ejection: pull one block out, fit the new one, rehome the
            // evicted block with someone else.
            let evictable: Vec<Block> = self.drivers[i].blocks.clone();
            for out in evictable {
                self.unassign(i, &out.id);

                if self.can_take(&self.drivers[i], block) {
                    let mut rehomed = false;
                    for &j in &candidates {
                        if j == i {
                            continue;
                        }
                        if self.can_take(&self.drivers[j], &out) {
                            self.assign(i, block.clone());
                            self.assign(j, out.clone());
                            rehomed = true;
                            break;
                        }
                    }
                    if rehomed {
                        return true;
                    }
                }

                // Revert the eviction
                self.assign(i, out);
            }
        }
        false
    }

    /// Move blocks from rich FTEs to those under the minimum-hours floor.
    fn repair_min_hours(&mut self) {
        let min = self.cfg.fte_soft_target_min;

        for _ in 0..50 {
            let victims: Vec<usize> = {
                let mut v: Vec<usize> = (0..self.drivers.len())
                    .filter(|&i| {
                        self.drivers[i].kind == DriverKind::Fte && self.drivers[i].total_min < min
                    })
                    .collect();
                v.sort_by_key(|&i| (self.drivers[i].total_min, self.drivers[i].id.clone()));
                v
            };
            if victims.is_empty() {
                break;
            }

            let mut moved_any = false;
            for victim in victims {
                if self.drivers[victim].total_min >= min {
                    continue;
                }

                let donors: Vec<usize> = {
                    let mut d: Vec<usize> = (0..self.drivers.len())
                        .filter(|&i| {
                            i != victim
                                && self.drivers[i].kind == DriverKind::Fte
                                && self.drivers[i].total_min > min + 120
                        })
                        .collect();
                    d.sort_by_key(|&i| {
                        (
                            std::cmp::Reverse(self.drivers[i].total_min),
                            self.drivers[i].id.clone(),
                        )
                    });
                    d
                };

                'donor: for donor in donors {
                    let mut donor_blocks = self.drivers[donor].blocks.clone();
                    donor_blocks.sort_by_key(|b| (b.total_work_min, b.id.clone()));

                    for b in donor_blocks {
                        // Keep the donor itself above the floor.
                        if self.drivers[donor].total_min - b.total_work_min < min - 60 {
                            continue;
                        }
                        if self.can_take(&self.drivers[victim], &b) {
                            self.unassign(donor, &b.id);
                            self.assign(victim, b);
                            moved_any = true;
                            break 'donor;
                        }
                    }
                }
            }

            if !moved_any {
                break;
            }
        }
    }

    /// Place leftovers: under-filled FTEs, then existing overflow/PT, then
    /// new overflow FTEs up to the cap, then new PTs as last resort.
    fn repair_overflow(&mut self) {
        debug!(blocks = self.unassigned.len(), "overflow placement");
        let unassigned = std::mem::take(&mut self.unassigned);
        let mut overflow_created = 0usize;

        for block in unassigned {
            // 1. Under-filled FTEs first
            let mut ftes: Vec<usize> = (0..self.drivers.len())
                .filter(|&i| self.drivers[i].kind == DriverKind::Fte)
                .collect();
            ftes.sort_by_key(|&i| (self.drivers[i].total_min, self.drivers[i].id.clone()));
            if let Some(&i) = ftes.iter().find(|&&i| self.can_take(&self.drivers[i], &block)) {
                self.assign(i, block);
                continue;
            }

            // 2. Existing overflow/PT, fullest first (best fit)
            let mut extras: Vec<usize> = (0..self.drivers.len())
                .filter(|&i| {
                    matches!(self.drivers[i].kind, DriverKind::FteOverflow | DriverKind::Pt)
                })
                .collect();
            extras.sort_by_key(|&i| {
                (
                    std::cmp::Reverse(self.drivers[i].total_min),
                    self.drivers[i].id.clone(),
                )
            });
            if let Some(&i) = extras
                .iter()
                .find(|&&i| self.can_take(&self.drivers[i], &block))
            {
                self.assign(i, block);
                continue;
            }

            // 3. Open a new overflow FTE
            if overflow_created < self.cfg.fte_overflow_cap {
                let i = self.create_driver(DriverKind::FteOverflow);
                if self.can_take(&self.drivers[i], &block) {
                    self.assign(i, block);
                    overflow_created += 1;
                    continue;
                }
            }

            // 4. Last resort: fresh PT container
            let i = self.create_driver(DriverKind::Pt);
            self.assign(i, block);
        }
    }

    /// Merge under-filled PT drivers into FTEs or each other.
    fn repair_pt_compaction(&mut self) {
        for _ in 0..5 {
            let mut moves_made = 0;

            let victims: Vec<usize> = {
                let mut v: Vec<usize> = (0..self.drivers.len())
                    .filter(|&i| {
                        self.drivers[i].kind == DriverKind::Pt && !self.drivers[i].blocks.is_empty()
                    })
                    .collect();
                v.sort_by_key(|&i| {
                    (
                        self.drivers[i].blocks.len(),
                        self.drivers[i].total_min,
                        self.drivers[i].id.clone(),
                    )
                });
                v
            };

            for victim in victims {
                if self.drivers[victim].blocks.is_empty() {
                    continue;
                }

                let mut candidates: Vec<usize> = (0..self.drivers.len())
                    .filter(|&i| i != victim && !self.drivers[i].blocks.is_empty())
                    .collect();
                // FTEs first, then fuller drivers.
                candidates.sort_by_key(|&i| {
                    (
                        u8::from(self.drivers[i].kind == DriverKind::Pt),
                        std::cmp::Reverse(self.drivers[i].total_min),
                        self.drivers[i].id.clone(),
                    )
                });

                let to_move = self.drivers[victim].blocks.clone();

                // Strategy A: clean merge into one target
                let mut merged = false;
                for &target in &candidates {
                    if self.fits_all(target, &to_move) {
                        for b in &to_move {
                            self.unassign(victim, &b.id.clone());
                            self.assign(target, b.clone());
                        }
                        merged = true;
                        moves_made += 1;
                        break;
                    }
                }

                // Strategy B: splinter across several targets
                if !merged {
                    let mut all_moved = true;
                    for b in to_move {
                        let mut moved = false;
                        for &target in &candidates {
                            if self.can_take(&self.drivers[target], &b) {
                                self.unassign(victim, &b.id);
                                self.assign(target, b.clone());
                                moved = true;
                                break;
                            }
                        }
                        if !moved {
                            all_moved = false;
                        }
                    }
                    if all_moved {
                        moves_made += 1;
                    }
                }
            }

            if moves_made == 0 {
                break;
            }
            debug!(merged = moves_made, "PT compaction round");
        }
    }

    fn fits_all(&mut self, target: usize, blocks: &[Block]) -> bool {
        // Simulate on a scratch copy so partial fits never leak.
        let mut scratch = self.drivers[target].clone();
        for b in blocks {
            if self.can_take(&scratch, b) {
                scratch.blocks.push(b.clone());
                scratch.total_min += b.total_work_min;
            } else {
                return false;
            }
        }
        true
    }

    // =========================================================================
    // PHASE 3: IMPROVEMENT (LNS)
    // =========================================================================

    /// Destroy 1 PT + 2 under-filled FTEs + 2 random drivers and repair
    /// greedily. A move is rolled back if it raises headcount or pushes a
    /// driver to 7 working days.
    fn improve_lns(&mut self) {
        for iteration in 0..self.cfg.lns_iterations {
            if self.drivers.iter().filter(|d| !d.blocks.is_empty()).count() < 5 {
                break;
            }

            let snapshot = self.drivers.clone();
            let headcount_before = self.headcount();

            let victims = self.pick_lns_victims();
            if victims.is_empty() {
                break;
            }

            let mut released: Vec<Block> = Vec::new();
            for &v in &victims {
                released.append(&mut self.drivers[v].blocks);
                self.drivers[v].total_min = 0;
            }
            released.sort_by_key(|b| (std::cmp::Reverse(b.total_work_min), b.id.clone()));

            let ok = self.lns_repair(released);

            let degraded = !ok
                || self.headcount() > headcount_before
                || self.drivers.iter().any(|d| d.active_days().len() >= 7);
            if degraded {
                self.drivers = snapshot;
            } else if iteration % 50 == 0 {
                debug!(iteration, headcount = self.headcount(), "LNS progress");
            }
        }

        // Drop emptied containers
        self.drivers.retain(|d| !d.blocks.is_empty());
    }

    fn pick_lns_victims(&mut self) -> Vec<usize> {
        let pts: Vec<usize> = (0..self.drivers.len())
            .filter(|&i| self.drivers[i].kind == DriverKind::Pt && !self.drivers[i].blocks.is_empty())
            .collect();
        let under: Vec<usize> = (0..self.drivers.len())
            .filter(|&i| {
                self.drivers[i].kind == DriverKind::Fte
                    && !self.drivers[i].blocks.is_empty()
                    && self.drivers[i].total_min < self.cfg.fte_soft_target_min
            })
            .collect();

        let mut victims = Vec::new();
        if let Some(&p) = pts.as_slice().choose(&mut self.rng) {
            victims.push(p);
        }
        let mut under_pool = under;
        under_pool.shuffle(&mut self.rng);
        victims.extend(under_pool.into_iter().take(2));

        let mut others: Vec<usize> = (0..self.drivers.len())
            .filter(|&i| !victims.contains(&i) && !self.drivers[i].blocks.is_empty())
            .collect();
        others.shuffle(&mut self.rng);
        let needed = 5usize.saturating_sub(victims.len());
        victims.extend(others.into_iter().take(needed));

        victims.sort_unstable();
        victims.dedup();
        victims
    }

    fn lns_repair(&mut self, released: Vec<Block>) -> bool {
        for block in released {
            let mut order: Vec<usize> = (0..self.drivers.len()).collect();
            order.shuffle(&mut self.rng);

            let mut best: Option<(usize, i64)> = None;
            for &i in &order {
                let d = &self.drivers[i];
                // Never push a driver into a 7th working day.
                if !d.works_on(block.day) && d.active_days().len() >= 6 {
                    continue;
                }
                if !self.can_take(d, &block) {
                    continue;
                }
                let mut score: i64 = 0;
                if d.kind == DriverKind::Pt {
                    score += 2000;
                }
                if !d.works_on(block.day) {
                    score += 100;
                }
                let slack =
                    i64::from(self.cfg.fte_max_week_min - (d.total_min + block.total_work_min));
                score += slack;
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((i, score));
                }
            }

            match best {
                Some((i, _)) => self.assign(i, block),
                None => return false,
            }
        }
        true
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn headcount(&self) -> usize {
        self.drivers.iter().filter(|d| !d.blocks.is_empty()).count()
    }

    fn create_driver(&mut self, kind: DriverKind) -> usize {
        let id = match kind {
            DriverKind::Fte | DriverKind::FteOverflow => {
                self.fte_counter += 1;
                format!("FTE{:03}", self.fte_counter)
            }
            DriverKind::Pt => {
                self.pt_counter += 1;
                format!("PT{:03}", self.pt_counter)
            }
        };
        self.drivers.push(Driver {
            id,
            kind,
            blocks: Vec::new(),
            total_min: 0,
        });
        self.drivers.len() - 1
    }

    fn assign(&mut self, driver: usize, block: Block) {
        let d = &mut self.drivers[driver];
        d.total_min += block.total_work_min;
        d.blocks.push(block);
    }

    fn unassign(&mut self, driver: usize, block_id: &str) {
        let d = &mut self.drivers[driver];
        if let Some(pos) = d.blocks.iter().position(|b| b.id == block_id) {
            let b = d.blocks.remove(pos);
            d.total_min -= b.total_work_min;
        }
    }

    fn can_take(&self, d: &Driver, block: &Block) -> bool {
        let cap = self.rules.week_cap(d.kind.roster_type());
        if d.total_min + block.total_work_min > cap {
            return false;
        }
        let infos = d.infos();
        can_add_block(
            &infos,
            &BlockInfo::from(block),
            d.total_min,
            d.kind.roster_type(),
            &self.rules,
        )
        .is_ok()
    }

    fn build_result(self) -> (Vec<DriverRoster>, GreedyStats) {
        let mut stats = GreedyStats::default();
        let mut rosters = Vec::new();

        for d in self.drivers {
            if d.blocks.is_empty() {
                continue;
            }
            match d.kind {
                DriverKind::Fte => stats.fte_count += 1,
                DriverKind::FteOverflow => stats.fte_overflow_count += 1,
                DriverKind::Pt => stats.pt_count += 1,
            }
            if d.kind.roster_type() == RosterType::Fte
                && d.total_min < self.cfg.fte_soft_target_min
            {
                stats.under_min_count += 1;
            }

            let mut blocks = d.blocks;
            blocks.sort_by_key(|b| (b.day.index(), b.first_start, b.id.clone()));
            let days_worked = {
                let mut days: Vec<Weekday> = blocks.iter().map(|b| b.day).collect();
                days.sort();
                days.dedup();
                days.len() as u8
            };

            rosters.push(DriverRoster {
                driver_id: d.id,
                roster_type: d.kind.roster_type(),
                total_min: d.total_min,
                days_worked,
                blocks,
            });
        }

        rosters.sort_by(|a, b| a.driver_id.cmp(&b.driver_id));
        info!(
            fte = stats.fte_count,
            overflow = stats.fte_overflow_count,
            pt = stats.pt_count,
            "greedy solver done"
        );
        (rosters, stats)
    }
}

fn difficulty_key(b: &Block) -> (f64, f64, f64, f64) {
    let is_sat = if b.day == Weekday::Saturday { 2.0 } else { 0.0 };
    let is_fri = if b.day == Weekday::Friday { 1.5 } else { 0.0 };
    let edge = if b.first_start <= 5 * 60 || b.last_end >= 20 * 60 {
        1.0
    } else {
        0.0
    };
    (
        -is_sat,
        -is_fri,
        -edge,
        -f64::from(b.total_work_min),
    )
}
