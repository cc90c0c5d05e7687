// ==========================================
// 作物种植排产系统 - 局部搜索优化器
// ==========================================
// 策略: 每轮生成（抽样）邻域,全部评分后取最优的严格改进可行邻域（best-improvement）
// 终止: 达到迭代上限 / 连续无改进达到上限 / 超时（每轮开始时检查,非抢占）
// 红线: 当前解只会被严格更优的可行解替换,结果不劣于种子
// ==========================================

use crate::config::OptimizationConfig;
use crate::domain::adjustment::ExcludedSlot;
use crate::domain::allocation::CropAllocation;
use crate::engine::candidate::CandidatePool;
use crate::engine::feasibility::{FeasibilityChecker, SolutionEvaluation};
use crate::engine::neighbor::{NeighborContext, NeighborGenerator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 搜索终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxIterations,
    NoImprovement,
    TimeLimit,
    NoNeighbors,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxIterations => write!(f, "max_iterations"),
            StopReason::NoImprovement => write!(f, "no_improvement"),
            StopReason::TimeLimit => write!(f, "time_limit"),
            StopReason::NoNeighbors => write!(f, "no_neighbors"),
        }
    }
}

/// 搜索结果（局部搜索与 ALNS 共用）
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub solution: Vec<Arc<CropAllocation>>,
    pub evaluation: SolutionEvaluation,
    pub iterations: usize,
    pub improvements: usize,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

// ==========================================
// LocalSearchOptimizer - 局部搜索优化器
// ==========================================
pub struct LocalSearchOptimizer<'a> {
    checker: &'a FeasibilityChecker,
    pool: &'a CandidatePool,
    config: &'a OptimizationConfig,
    pinned: &'a HashSet<String>,
    exclusions: &'a [ExcludedSlot],
    generator: NeighborGenerator,
}

impl<'a> LocalSearchOptimizer<'a> {
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
            generator: NeighborGenerator::from_config(config),
        }
    }

    /// 被用户删除的时段,搜索中不再安排新分配
    pub fn with_exclusions(mut self, exclusions: &'a [ExcludedSlot]) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// 从种子方案开始搜索
    pub fn run(&self, seed: Vec<Arc<CropAllocation>>) -> SearchOutcome {
        let started = Instant::now();
        let deadline = self.config.max_computation_time();
        let ctx = NeighborContext::new(self.pool, self.config, self.pinned)
            .with_objective(self.checker.objective())
            .with_exclusions(self.exclusions);
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);

        let mut current = seed;
        let mut current_eval = self.checker.evaluate(&current);
        let mut improvements = 0usize;
        let mut stall = 0usize;
        let mut iterations = 0usize;
        let mut stop_reason = StopReason::MaxIterations;

        info!(
            allocations = current.len(),
            objective = current_eval.objective_value(),
            feasible = current_eval.is_feasible(),
            "局部搜索开始"
        );

        while iterations < self.config.max_local_search_iterations {
            if stall >= self.config.max_no_improvement {
                stop_reason = StopReason::NoImprovement;
                break;
            }
            if deadline.is_some_and(|limit| started.elapsed() >= limit) {
                stop_reason = StopReason::TimeLimit;
                break;
            }
            iterations += 1;

            let neighbors = self.generator.generate(&current, &ctx, &mut rng);
            if neighbors.is_empty() {
                stop_reason = StopReason::NoNeighbors;
                break;
            }

            let evaluations: Vec<SolutionEvaluation> = if self.config.enable_parallel_neighbor_evaluation {
                neighbors.par_iter().map(|n| self.checker.evaluate(&n.solution)).collect()
            } else {
                neighbors.iter().map(|n| self.checker.evaluate(&n.solution)).collect()
            };

            // 并行评分后串行择优,平局取下标最小者保证可复现
            let mut best: Option<usize> = None;
            for (idx, eval) in evaluations.iter().enumerate() {
                if !eval.is_feasible() {
                    continue;
                }
                match best {
                    Some(b) if !eval.is_better_than(&evaluations[b]) => {}
                    _ => best = Some(idx),
                }
            }

            match best {
                Some(idx) if evaluations[idx].is_better_than(&current_eval) => {
                    debug!(
                        iteration = iterations,
                        operation = %neighbors[idx].operation,
                        objective = evaluations[idx].objective_value(),
                        "接受改进邻域"
                    );
                    current = neighbors[idx].solution.clone();
                    current_eval = evaluations[idx].clone();
                    improvements += 1;
                    stall = 0;
                }
                _ => stall += 1,
            }
        }

        info!(
            iterations,
            improvements,
            stop_reason = %stop_reason,
            objective = current_eval.objective_value(),
            "局部搜索结束"
        );

        SearchOutcome {
            solution: current,
            evaluation: current_eval,
            iterations,
            improvements,
            stop_reason,
            elapsed: started.elapsed(),
        }
    }
}
