// ==========================================
// 作物种植排产系统 - 排产方案
// ==========================================
// 红线: 设置 total_cost 时,同一地块内结果两两时间不重叠,否则构造失败
// 红线: total_cost >= 0
// ==========================================

use crate::domain::allocation::{CropAllocation, StageCrossing};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::types::OptimizationObjective;
use crate::domain::violation::Violation;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ==========================================
// PlanningPeriod - 计划期（闭区间）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PlanningPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if start >= end {
            return Err(DomainError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ==========================================
// OptimizationIntermediateResult - 评分候选
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationIntermediateResult {
    pub allocation: Arc<CropAllocation>,
    #[serde(default)]
    pub stage_crossings: Vec<StageCrossing>,
    pub objective_score: f64, // 约束前目标增益（排序/区间调度权重）
}

impl OptimizationIntermediateResult {
    pub fn new(
        allocation: CropAllocation,
        stage_crossings: Vec<StageCrossing>,
        objective: OptimizationObjective,
    ) -> Self {
        let objective_score = allocation.objective_gain(objective);
        Self {
            allocation: Arc::new(allocation),
            stage_crossings,
            objective_score,
        }
    }

    /// 由已有分配（搜索结果）包装
    pub fn from_allocation(allocation: Arc<CropAllocation>, objective: OptimizationObjective) -> Self {
        let objective_score = allocation.objective_gain(objective);
        Self {
            allocation,
            stage_crossings: Vec::new(),
            objective_score,
        }
    }

    pub fn result_id(&self) -> &str {
        &self.allocation.allocation_id
    }

    pub fn field_id(&self) -> &str {
        self.allocation.field_id()
    }

    pub fn crop_id(&self) -> &str {
        self.allocation.crop_id()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.allocation.start_date
    }

    pub fn completion_date(&self) -> NaiveDate {
        self.allocation.completion_date
    }

    pub fn total_cost(&self) -> f64 {
        self.allocation.total_cost
    }
}

// ==========================================
// OptimizationSchedule - 排产方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSchedule {
    pub schedule_id: String,
    pub name: String,
    pub objective: OptimizationObjective,
    #[serde(default)]
    pub planning_period: Option<PlanningPeriod>,
    pub results: Vec<OptimizationIntermediateResult>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub total_revenue: Option<f64>,
    #[serde(default)]
    pub total_profit: Option<f64>,
    #[serde(default)]
    pub violations: Vec<Violation>, // 仅告警级（错误级方案不会被构造）
    pub created_at: DateTime<Utc>,
}

impl OptimizationSchedule {
    /// 创建方案并校验
    ///
    /// 结果按 start_date 排序后校验:
    /// - total_cost >= 0
    /// - 设置 total_cost 时同一地块内两两不重叠
    pub fn try_new(
        schedule_id: impl Into<String>,
        name: impl Into<String>,
        objective: OptimizationObjective,
        mut results: Vec<OptimizationIntermediateResult>,
        total_cost: Option<f64>,
    ) -> DomainResult<Self> {
        results.sort_by(|a, b| {
            a.start_date()
                .cmp(&b.start_date())
                .then_with(|| a.field_id().cmp(b.field_id()))
        });
        let schedule = Self {
            schedule_id: schedule_id.into(),
            name: name.into(),
            objective,
            planning_period: None,
            results,
            total_cost,
            total_revenue: None,
            total_profit: None,
            violations: Vec::new(),
            created_at: Utc::now(),
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// 校验不变量（持久化加载后也会调用）
    pub fn validate(&self) -> DomainResult<()> {
        let Some(total_cost) = self.total_cost else {
            return Ok(());
        };
        if !(total_cost.is_finite() && total_cost >= 0.0) {
            return Err(DomainError::NegativeTotalCost(total_cost));
        }

        // 不重叠按地块判定: 同一地块内按起始日排序后首尾不交叠,
        // 不同地块的结果允许时间重叠（方案整体并非单一时间轴）
        let mut by_field: BTreeMap<&str, Vec<&OptimizationIntermediateResult>> = BTreeMap::new();
        for result in &self.results {
            by_field.entry(result.field_id()).or_default().push(result);
        }
        for (field_id, mut items) in by_field {
            items.sort_by_key(|r| r.start_date());
            for pair in items.windows(2) {
                if pair[0].completion_date() > pair[1].start_date() {
                    return Err(DomainError::OverlappingResults {
                        field_id: field_id.to_string(),
                        first: pair[0].result_id().to_string(),
                        second: pair[1].result_id().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn allocations(&self) -> Vec<Arc<CropAllocation>> {
        self.results.iter().map(|r| r.allocation.clone()).collect()
    }

    pub fn results_for_field(&self, field_id: &str) -> Vec<&OptimizationIntermediateResult> {
        self.results.iter().filter(|r| r.field_id() == field_id).collect()
    }

    pub fn field_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.results.iter().map(|r| r.field_id().to_string()).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
