// ==========================================
// 作物种植排产系统 - 结果构建器
// ==========================================
// 职责: 最终方案 → OptimizationSchedule
// - 分配写入约束后经济性（Scored）
// - 回填阶段切换日
// - 生成新的 schedule_id,快照 total_cost / total_revenue / total_profit
// - 只保留告警级违规（错误级方案不会到达这里）
// ==========================================

use crate::domain::allocation::CropAllocation;
use crate::domain::error::DomainResult;
use crate::domain::schedule::{OptimizationIntermediateResult, OptimizationSchedule, PlanningPeriod};
use crate::domain::types::OptimizationObjective;
use crate::engine::candidate::CandidatePool;
use crate::engine::feasibility::SolutionEvaluation;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct OptimizationResultBuilder<'a> {
    name: String,
    objective: OptimizationObjective,
    planning_period: Option<PlanningPeriod>,
    pool: Option<&'a CandidatePool>,
}

impl<'a> OptimizationResultBuilder<'a> {
    pub fn new(name: impl Into<String>, objective: OptimizationObjective) -> Self {
        Self {
            name: name.into(),
            objective,
            planning_period: None,
            pool: None,
        }
    }

    pub fn with_planning_period(mut self, period: PlanningPeriod) -> Self {
        self.planning_period = Some(period);
        self
    }

    /// 候选池用于回填阶段切换日
    pub fn with_pool(mut self, pool: &'a CandidatePool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(
        &self,
        solution: &[Arc<CropAllocation>],
        evaluation: &SolutionEvaluation,
    ) -> DomainResult<OptimizationSchedule> {
        let results: Vec<OptimizationIntermediateResult> = evaluation
            .scored_solution(solution)
            .into_iter()
            .map(|allocation| {
                let stage_crossings = self
                    .pool
                    .and_then(|pool| pool.placement(allocation.field_id(), allocation.crop_id(), allocation.start_date))
                    .map(|p| p.stage_crossings.clone())
                    .unwrap_or_default();
                let objective_score = match (self.objective, allocation.economics.profit()) {
                    (OptimizationObjective::MaximizeProfit, Some(profit)) => profit,
                    _ => allocation.objective_gain(self.objective),
                };
                OptimizationIntermediateResult {
                    allocation,
                    stage_crossings,
                    objective_score,
                }
            })
            .collect();

        let mut schedule = OptimizationSchedule::try_new(
            Uuid::new_v4().to_string(),
            self.name.clone(),
            self.objective,
            results,
            Some(evaluation.total_cost),
        )?;
        schedule.planning_period = self.planning_period;
        schedule.total_revenue = Some(evaluation.total_revenue);
        schedule.total_profit = Some(evaluation.total_profit);
        schedule.violations = evaluation.warnings();

        info!(
            schedule_id = %schedule.schedule_id,
            results = schedule.results.len(),
            total_cost = evaluation.total_cost,
            total_profit = evaluation.total_profit,
            warnings = schedule.violations.len(),
            "排产方案构建完成"
        );
        Ok(schedule)
    }
}
