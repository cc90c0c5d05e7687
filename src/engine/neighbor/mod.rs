// ==========================================
// 作物种植排产系统 - 邻域生成器
// ==========================================
// 职责: 按操作权重调用九种邻域操作,按配额抽样
// 抽样: 每种操作配额 = ceil(权重 × max_neighbors_per_iteration)
// 红线: 同一随机种子 + 同一输入 → 同一邻域集合
// ==========================================

pub mod operations;

use crate::config::{OperationWeights, OptimizationConfig};
use crate::domain::adjustment::ExcludedSlot;
use crate::domain::allocation::CropAllocation;
use crate::domain::field::Field;
use crate::domain::types::{NeighborOperation, OptimizationObjective};
use crate::engine::candidate::CandidatePool;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

// ==========================================
// NeighborContext - 邻域操作的只读上下文
// ==========================================
#[derive(Clone, Copy)]
pub struct NeighborContext<'a> {
    pub pool: &'a CandidatePool,
    pub config: &'a OptimizationConfig,
    pub pinned: &'a HashSet<String>,
    pub objective: OptimizationObjective,
    pub exclusions: &'a [ExcludedSlot],
}

impl<'a> NeighborContext<'a> {
    pub fn new(pool: &'a CandidatePool, config: &'a OptimizationConfig, pinned: &'a HashSet<String>) -> Self {
        Self {
            pool,
            config,
            pinned,
            objective: OptimizationObjective::MaximizeProfit,
            exclusions: &[],
        }
    }

    pub fn with_objective(mut self, objective: OptimizationObjective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_exclusions(mut self, exclusions: &'a [ExcludedSlot]) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn is_pinned(&self, allocation: &CropAllocation) -> bool {
        self.pinned.contains(&allocation.allocation_id)
    }

    /// 新分配不得落入被删除的时段
    pub fn admits(&self, allocation: &CropAllocation) -> bool {
        !self.exclusions.iter().any(|slot| slot.blocks(allocation))
    }

    /// 候选池中有可行落位的地块
    pub fn fields(&self) -> Vec<&'a Arc<Field>> {
        let pool: &'a CandidatePool = self.pool;
        pool.field_ids().iter().filter_map(|id| pool.field(id)).collect()
    }
}

/// 一个邻域方案
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub operation: NeighborOperation,
    pub solution: Vec<Arc<CropAllocation>>,
}

impl Neighbor {
    pub fn new(operation: NeighborOperation, solution: Vec<Arc<CropAllocation>>) -> Self {
        Self { operation, solution }
    }
}

// ==========================================
// NeighborGenerator - 邻域生成器
// ==========================================
#[derive(Debug, Clone)]
pub struct NeighborGenerator {
    weights: OperationWeights,
    max_neighbors: usize,
    sampling: bool,
}

impl NeighborGenerator {
    pub fn from_config(config: &OptimizationConfig) -> Self {
        Self {
            weights: config.operation_weights.clone(),
            max_neighbors: config.max_neighbors_per_iteration,
            sampling: config.enable_neighbor_sampling,
        }
    }

    /// 生成当前方案的邻域
    pub fn generate<R: Rng + ?Sized>(
        &self,
        solution: &[Arc<CropAllocation>],
        ctx: &NeighborContext<'_>,
        rng: &mut R,
    ) -> Vec<Neighbor> {
        let mut neighbors = Vec::new();
        for op in NeighborOperation::ALL {
            let weight = self.weights.weight(op);
            if weight <= 0.0 {
                continue;
            }
            let mut produced = operations::generate(op, solution, ctx);
            let total = produced.len();
            if self.sampling {
                let quota = ((weight * self.max_neighbors as f64).ceil() as usize).max(1);
                if produced.len() > quota {
                    produced.shuffle(rng);
                    produced.truncate(quota);
                }
            }
            trace!(operation = %op, produced = total, kept = produced.len(), "邻域操作");
            neighbors.extend(produced);
        }

        if self.sampling && neighbors.len() > self.max_neighbors {
            neighbors.shuffle(rng);
            neighbors.truncate(self.max_neighbors);
        }
        neighbors
    }
}
