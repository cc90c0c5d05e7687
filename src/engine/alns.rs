// ==========================================
// 作物种植排产系统 - ALNS 自适应大邻域搜索
// ==========================================
// 每轮:
//   1. 轮盘赌选择破坏算子,移除 removal_rate 比例的（非固定）分配
//   2. 轮盘赌选择修复算子,从候选池/被移除分配中重新插入
//   3. 可行性检查评分
//   4. 接受准则: 模拟退火（按目标值相对差计算接受概率）; 不可行解一律拒绝
//   5. 记录算子得分,每 segment_size 轮按指数平滑更新权重
// 红线: 最优解只会被严格更优的可行解替换,结果不劣于种子
// ==========================================

use crate::config::{AlnsParams, OptimizationConfig};
use crate::domain::adjustment::ExcludedSlot;
use crate::domain::allocation::{windows_conflict, CropAllocation};
use crate::domain::types::OptimizationObjective;
use crate::engine::candidate::CandidatePool;
use crate::engine::feasibility::{FeasibilityChecker, SolutionEvaluation, OBJECTIVE_EPSILON};
use crate::engine::local_search::{SearchOutcome, StopReason};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// 修复时每个地块考察的候选数
const REPAIR_CANDIDATES_PER_FIELD: usize = 30;

// ==========================================
// 算子定义
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestroyOperator {
    Random,         // 随机移除（多样性）
    WorstProfit,    // 目标贡献最差者优先（贪心）
    ViolationFirst, // 有违规者优先
    FieldRemoval,   // 清空一个地块
}

impl DestroyOperator {
    pub const ALL: [DestroyOperator; 4] = [
        DestroyOperator::Random,
        DestroyOperator::WorstProfit,
        DestroyOperator::ViolationFirst,
        DestroyOperator::FieldRemoval,
    ];
}

impl fmt::Display for DestroyOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestroyOperator::Random => write!(f, "random"),
            DestroyOperator::WorstProfit => write!(f, "worst_profit"),
            DestroyOperator::ViolationFirst => write!(f, "violation_first"),
            DestroyOperator::FieldRemoval => write!(f, "field_removal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairOperator {
    GreedyInsert,
    RegretInsert, // regret-2
}

impl RepairOperator {
    pub const ALL: [RepairOperator; 2] = [RepairOperator::GreedyInsert, RepairOperator::RegretInsert];
}

impl fmt::Display for RepairOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairOperator::GreedyInsert => write!(f, "greedy_insert"),
            RepairOperator::RegretInsert => write!(f, "regret_insert"),
        }
    }
}

// ==========================================
// OperatorStats - 算子统计与自适应权重
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorStats {
    pub weight: f64,
    pub times_used: usize,
    pub total_score: f64,
    segment_score: f64,
    segment_uses: usize,
}

impl Default for OperatorStats {
    fn default() -> Self {
        Self {
            weight: 1.0,
            times_used: 0,
            total_score: 0.0,
            segment_score: 0.0,
            segment_uses: 0,
        }
    }
}

impl OperatorStats {
    pub fn record_use(&mut self, score: f64) {
        self.times_used += 1;
        self.total_score += score;
        self.segment_score += score;
        self.segment_uses += 1;
    }

    /// 段末更新: w = w × (1 − r) + 段均分 × r
    pub fn update_weight(&mut self, reaction_factor: f64, min_weight: f64) {
        if self.segment_uses > 0 {
            let segment_avg = self.segment_score / self.segment_uses as f64;
            self.weight = (self.weight * (1.0 - reaction_factor) + segment_avg * reaction_factor).max(min_weight);
        }
        self.segment_score = 0.0;
        self.segment_uses = 0;
    }
}

fn roulette<T: Copy, R: Rng + ?Sized>(stats: &[(T, OperatorStats)], rng: &mut R) -> usize {
    let total: f64 = stats.iter().map(|(_, s)| s.weight).sum();
    if total <= 0.0 || stats.is_empty() {
        return 0;
    }
    let mut roll = rng.gen::<f64>() * total;
    for (idx, (_, s)) in stats.iter().enumerate() {
        if roll < s.weight {
            return idx;
        }
        roll -= s.weight;
    }
    stats.len() - 1
}

/// 插入选项
struct InsertOption {
    allocation: Arc<CropAllocation>,
    gain: f64,
}

// ==========================================
// AlnsEngine - ALNS 引擎
// ==========================================
pub struct AlnsEngine<'a> {
    checker: &'a FeasibilityChecker,
    pool: &'a CandidatePool,
    config: &'a OptimizationConfig,
    pinned: &'a HashSet<String>,
    exclusions: &'a [ExcludedSlot],
    params: AlnsParams,
}

impl<'a> AlnsEngine<'a> {
    pub fn new(
        checker: &'a FeasibilityChecker,
        pool: &'a CandidatePool,
        config: &'a OptimizationConfig,
        pinned: &'a HashSet<String>,
    ) -> Self {
        Self {
            checker,
            pool,
            config,
            pinned,
            exclusions: &[],
            params: config.alns_params(),
        }
    }

    /// 被用户删除的时段,修复时不再插入
    pub fn with_exclusions(mut self, exclusions: &'a [ExcludedSlot]) -> Self {
        self.exclusions = exclusions;
        self
    }

    fn objective(&self) -> OptimizationObjective {
        self.checker.objective()
    }

    /// 从种子方案开始搜索
    pub fn run(&self, seed: Vec<Arc<CropAllocation>>) -> SearchOutcome {
        let started = Instant::now();
        let deadline = self.config.max_computation_time();
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);

        let mut destroy_stats: Vec<(DestroyOperator, OperatorStats)> =
            DestroyOperator::ALL.iter().map(|op| (*op, OperatorStats::default())).collect();
        let mut repair_stats: Vec<(RepairOperator, OperatorStats)> =
            RepairOperator::ALL.iter().map(|op| (*op, OperatorStats::default())).collect();

        let mut current = seed;
        let mut current_eval = self.checker.evaluate(&current);
        let mut best = current.clone();
        let mut best_eval = current_eval.clone();
        let mut temperature = self.params.initial_temperature;
        let mut improvements = 0usize;
        let mut stall = 0usize;
        let mut iterations = 0usize;
        let mut stop_reason = StopReason::MaxIterations;

        info!(
            allocations = current.len(),
            objective = current_eval.objective_value(),
            iterations = self.params.iterations,
            "ALNS 开始"
        );

        while iterations < self.params.iterations {
            if stall >= self.config.max_no_improvement {
                stop_reason = StopReason::NoImprovement;
                break;
            }
            if deadline.is_some_and(|limit| started.elapsed() >= limit) {
                stop_reason = StopReason::TimeLimit;
                break;
            }
            iterations += 1;

            let d_idx = roulette(&destroy_stats, &mut rng);
            let r_idx = roulette(&repair_stats, &mut rng);
            let destroy_op = destroy_stats[d_idx].0;
            let repair_op = repair_stats[r_idx].0;

            let (partial, removed) = self.destroy(destroy_op, &current, &current_eval, &mut rng);
            let candidate = self.repair(repair_op, partial, &removed);
            let candidate_eval = self.checker.evaluate(&candidate);

            let (accepted, score) = if candidate_eval.is_better_than(&best_eval) {
                best = candidate.clone();
                best_eval = candidate_eval.clone();
                improvements += 1;
                stall = 0;
                (true, self.params.score_best)
            } else {
                stall += 1;
                if !candidate_eval.is_feasible() {
                    (false, 0.0)
                } else if candidate_eval.objective_value() > current_eval.objective_value() + OBJECTIVE_EPSILON {
                    (true, self.params.score_better)
                } else if self.anneal(&current_eval, &candidate_eval, temperature, &mut rng) {
                    (true, self.params.score_accepted)
                } else {
                    (false, 0.0)
                }
            };

            debug!(
                iteration = iterations,
                destroy = %destroy_op,
                repair = %repair_op,
                removed = removed.len(),
                accepted,
                objective = candidate_eval.objective_value(),
                "ALNS 迭代"
            );

            if accepted {
                current = candidate;
                current_eval = candidate_eval;
            }

            destroy_stats[d_idx].1.record_use(score);
            repair_stats[r_idx].1.record_use(score);
            temperature *= self.params.cooling_rate;

            if iterations % self.params.segment_size == 0 {
                for (_, stats) in destroy_stats.iter_mut() {
                    stats.update_weight(self.params.reaction_factor, self.params.min_weight);
                }
                for (_, stats) in repair_stats.iter_mut() {
                    stats.update_weight(self.params.reaction_factor, self.params.min_weight);
                }
            }
        }

        info!(
            iterations,
            improvements,
            stop_reason = %stop_reason,
            objective = best_eval.objective_value(),
            destroy_weights = ?destroy_stats.iter().map(|(op, s)| (op.to_string(), s.weight)).collect::<Vec<_>>(),
            repair_weights = ?repair_stats.iter().map(|(op, s)| (op.to_string(), s.weight)).collect::<Vec<_>>(),
            "ALNS 结束"
        );

        SearchOutcome {
            solution: best,
            evaluation: best_eval,
            iterations,
            improvements,
            stop_reason,
            elapsed: started.elapsed(),
        }
    }

    /// 模拟退火接受: p = exp(−相对劣化 / T)
    fn anneal<R: Rng + ?Sized>(
        &self,
        current: &SolutionEvaluation,
        candidate: &SolutionEvaluation,
        temperature: f64,
        rng: &mut R,
    ) -> bool {
        if temperature <= 0.0 {
            return false;
        }
        let scale = current.objective_value().abs().max(1.0);
        let delta = (current.objective_value() - candidate.objective_value()) / scale;
        rng.gen::<f64>() < (-delta / temperature).exp()
    }

    // ==========================================
    // 破坏算子
    // ==========================================

    /// 返回 (剩余方案, 被移除分配)
    pub fn destroy<R: Rng + ?Sized>(
        &self,
        op: DestroyOperator,
        solution: &[Arc<CropAllocation>],
        evaluation: &SolutionEvaluation,
        rng: &mut R,
    ) -> (Vec<Arc<CropAllocation>>, Vec<Arc<CropAllocation>>) {
        let mut movable: Vec<usize> = solution
            .iter()
            .enumerate()
            .filter(|(_, a)| !self.pinned.contains(&a.allocation_id))
            .map(|(i, _)| i)
            .collect();
        if movable.is_empty() {
            return (solution.to_vec(), Vec::new());
        }
        let count = ((movable.len() as f64 * self.params.removal_rate).ceil() as usize).clamp(1, movable.len());
        let contribution = |i: &usize| -> f64 {
            let a = &solution[*i];
            match (self.objective(), evaluation.score(&a.allocation_id)) {
                (OptimizationObjective::MaximizeProfit, Some(s)) => s.profit,
                (OptimizationObjective::MaximizeProfit, None) => a.estimated_profit(),
                (OptimizationObjective::MinimizeCost, _) => -a.total_cost,
            }
        };

        let targets: HashSet<usize> = match op {
            DestroyOperator::Random => {
                movable.shuffle(rng);
                movable.into_iter().take(count).collect()
            }
            DestroyOperator::WorstProfit => {
                movable.sort_by(|a, b| contribution(a).partial_cmp(&contribution(b)).unwrap_or(Ordering::Equal));
                movable.into_iter().take(count).collect()
            }
            DestroyOperator::ViolationFirst => {
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for v in &evaluation.violations {
                    if let Some(id) = &v.allocation_id {
                        *counts.entry(id.as_str()).or_default() += 1;
                    }
                }
                movable.sort_by(|a, b| {
                    let ca = counts.get(solution[*a].allocation_id.as_str()).copied().unwrap_or(0);
                    let cb = counts.get(solution[*b].allocation_id.as_str()).copied().unwrap_or(0);
                    cb.cmp(&ca)
                        .then_with(|| contribution(a).partial_cmp(&contribution(b)).unwrap_or(Ordering::Equal))
                });
                movable.into_iter().take(count).collect()
            }
            DestroyOperator::FieldRemoval => {
                let fields: Vec<&str> = movable
                    .iter()
                    .map(|i| solution[*i].field_id())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                let Some(field_id) = fields.choose(rng).copied() else {
                    return (solution.to_vec(), Vec::new());
                };
                movable.into_iter().filter(|i| solution[*i].field_id() == field_id).collect()
            }
        };

        let mut kept = Vec::with_capacity(solution.len());
        let mut removed = Vec::with_capacity(targets.len());
        for (i, a) in solution.iter().enumerate() {
            if targets.contains(&i) {
                removed.push(a.clone());
            } else {
                kept.push(a.clone());
            }
        }
        (kept, removed)
    }

    // ==========================================
    // 修复算子
    // ==========================================

    pub fn repair(
        &self,
        op: RepairOperator,
        mut partial: Vec<Arc<CropAllocation>>,
        removed: &[Arc<CropAllocation>],
    ) -> Vec<Arc<CropAllocation>> {
        // 最小成本目标: 被清空的地块必须补回一个（最便宜的）分配
        let mut must_fill: BTreeSet<String> = match self.objective() {
            OptimizationObjective::MinimizeCost => removed
                .iter()
                .map(|a| a.field_id().to_string())
                .filter(|f| !partial.iter().any(|a| a.field_id() == f))
                .collect(),
            OptimizationObjective::MaximizeProfit => BTreeSet::new(),
        };

        loop {
            let options = self.insert_options(&partial, removed);
            let chosen = match op {
                RepairOperator::GreedyInsert => self.pick_greedy(&options, &must_fill),
                RepairOperator::RegretInsert => self.pick_regret(&options, &must_fill),
            };
            let Some(idx) = chosen else { break };
            let allocation = options[idx].allocation.clone();
            must_fill.remove(allocation.field_id());
            partial.push(allocation);
        }
        partial
    }

    /// 当前部分解下所有可插入（无休耕冲突、不落入被删除时段）的选项
    fn insert_options(&self, partial: &[Arc<CropAllocation>], removed: &[Arc<CropAllocation>]) -> Vec<InsertOption> {
        let fits = |candidate: &CropAllocation| {
            !self.exclusions.iter().any(|slot| slot.blocks(candidate))
                && !partial.iter().any(|a| {
                    a.field_id() == candidate.field_id()
                        && windows_conflict(
                            (a.start_date, a.completion_date),
                            (candidate.start_date, candidate.completion_date),
                            candidate.field.fallow_period_days,
                        )
                })
        };

        let mut options: Vec<InsertOption> = removed
            .iter()
            .filter(|a| fits(a) && !partial.iter().any(|p| p.allocation_id == a.allocation_id))
            .map(|a| InsertOption {
                allocation: a.clone(),
                gain: a.objective_gain(self.objective()),
            })
            .collect();

        for field_id in self.pool.field_ids() {
            for placement in self.pool.best_placements(&field_id, self.objective(), REPAIR_CANDIDATES_PER_FIELD, &fits) {
                let template = &placement.allocation;
                if let Ok(fresh) = template.with_area(template.area_used, self.config.cost_model) {
                    options.push(InsertOption {
                        gain: fresh.objective_gain(self.objective()),
                        allocation: Arc::new(fresh),
                    });
                }
            }
        }
        options
    }

    fn eligible(&self, option: &InsertOption, must_fill: &BTreeSet<String>) -> bool {
        option.gain > OBJECTIVE_EPSILON || must_fill.contains(option.allocation.field_id())
    }

    fn pick_greedy(&self, options: &[InsertOption], must_fill: &BTreeSet<String>) -> Option<usize> {
        options
            .iter()
            .enumerate()
            .filter(|(_, o)| self.eligible(o, must_fill))
            .max_by(|(ia, a), (ib, b)| a.gain.partial_cmp(&b.gain).unwrap_or(Ordering::Equal).then_with(|| ib.cmp(ia)))
            .map(|(i, _)| i)
    }

    /// regret-2: 选择 (最优 − 次优) 差值最大的地块,插入其最优选项
    fn pick_regret(&self, options: &[InsertOption], must_fill: &BTreeSet<String>) -> Option<usize> {
        let mut per_field: HashMap<&str, (usize, Option<f64>)> = HashMap::new();
        for (idx, option) in options.iter().enumerate() {
            if !self.eligible(option, must_fill) {
                continue;
            }
            let entry = per_field.entry(option.allocation.field_id()).or_insert((idx, None));
            let best_gain = options[entry.0].gain;
            if idx == entry.0 {
                continue;
            }
            if option.gain > best_gain {
                entry.1 = Some(best_gain);
                entry.0 = idx;
            } else if entry.1.map_or(true, |second| option.gain > second) {
                entry.1 = Some(option.gain);
            }
        }

        per_field
            .into_iter()
            .map(|(field_id, (best, second))| {
                let regret = match second {
                    Some(s) => options[best].gain - s,
                    None => f64::INFINITY,
                };
                (field_id, best, regret)
            })
            .max_by(|a, b| {
                a.2.partial_cmp(&b.2)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| options[a.1].gain.partial_cmp(&options[b.1].gain).unwrap_or(Ordering::Equal))
                    .then_with(|| b.0.cmp(a.0))
            })
            .map(|(_, best, _)| best)
    }
}
