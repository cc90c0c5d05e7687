// ==========================================
// 作物种植排产系统 - 引擎层
// ==========================================
// 职责: 生育期评估、候选生成、区间调度、可行性检查、邻域搜索、ALNS、编排
// 红线: Engine 不拼 SQL, 外部数据只经网关进入
// 红线: 约束违规以 Violation 数据输出,不以错误中断
// ==========================================

pub mod alns;
pub mod candidate;
pub mod error;
pub mod feasibility;
pub mod gateways;
pub mod growth_period;
pub mod interval_scheduler;
pub mod local_search;
pub mod neighbor;
pub mod orchestrator;
pub mod result_builder;

// 重导出核心引擎
pub use alns::{AlnsEngine, DestroyOperator, OperatorStats, RepairOperator};
pub use candidate::{CandidateBatch, CandidateGenerator, CandidateJob, CandidatePool, Placement};
pub use error::{EvaluationError, OptimizationError, OptimizationResult};
pub use feasibility::{AllocationScore, AppliedInteraction, FeasibilityChecker, SolutionEvaluation};
pub use gateways::OptimizerGateways;
pub use growth_period::{GrowthEvaluation, GrowthPeriodEvaluator};
pub use interval_scheduler::{IntervalScheduler, IntervalSelection};
pub use local_search::{LocalSearchOptimizer, SearchOutcome, StopReason};
pub use neighbor::{Neighbor, NeighborContext, NeighborGenerator};
pub use orchestrator::{AllocationOrchestrator, OptimizationPhase};
pub use result_builder::OptimizationResultBuilder;
