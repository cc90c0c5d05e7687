// ==========================================
// 作物种植排产系统 - 作物分配（值对象）
// ==========================================
// 红线: 不可变值对象,任何变换都生成带新 ID 的新分配
// 红线: 收益/利润在约束评分前为 Unscored,邻域操作不猜测约束后经济性
// 时间窗: 半开区间 [start_date, completion_date)
// ==========================================

use crate::domain::crop::Crop;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::field::Field;
use crate::domain::types::{CostModel, OptimizationObjective, StressKind};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// Economics - 约束后经济性
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Economics {
    #[default]
    Unscored,
    Scored { revenue: f64, profit: f64 },
}

impl Economics {
    pub fn revenue(&self) -> Option<f64> {
        match self {
            Economics::Unscored => None,
            Economics::Scored { revenue, .. } => Some(*revenue),
        }
    }

    pub fn profit(&self) -> Option<f64> {
        match self {
            Economics::Unscored => None,
            Economics::Scored { profit, .. } => Some(*profit),
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Economics::Scored { .. })
    }
}

// ==========================================
// StressSummary - 生育期胁迫天数统计
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StressSummary {
    pub high_temp_days: u32,
    pub low_temp_days: u32,
    pub frost_days: u32,
    pub sterility_days: u32,
    pub low_sun_days: u32,
    pub good_sun_days: u32,
}

impl StressSummary {
    pub fn days(&self, kind: StressKind) -> u32 {
        match kind {
            StressKind::HighTemp => self.high_temp_days,
            StressKind::LowTemp => self.low_temp_days,
            StressKind::Frost => self.frost_days,
            StressKind::Sterility => self.sterility_days,
            StressKind::LowSun => self.low_sun_days,
        }
    }

    pub fn record(&mut self, kind: StressKind) {
        match kind {
            StressKind::HighTemp => self.high_temp_days += 1,
            StressKind::LowTemp => self.low_temp_days += 1,
            StressKind::Frost => self.frost_days += 1,
            StressKind::Sterility => self.sterility_days += 1,
            StressKind::LowSun => self.low_sun_days += 1,
        }
    }

    pub fn total_stress_days(&self) -> u32 {
        StressKind::ALL.iter().map(|k| self.days(*k)).sum()
    }
}

/// 阶段切换日期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCrossing {
    pub stage_name: String,
    pub date: NaiveDate,
}

/// 生育评估结果（构造分配所需的部分）
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthOutcome {
    pub start_date: NaiveDate,
    pub completion_date: NaiveDate,
    pub accumulated_gdd: f64,
    pub yield_factor: f64,
    pub stress: StressSummary,
}

// ==========================================
// CropAllocation - 作物分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropAllocation {
    pub allocation_id: String,
    pub field: Arc<Field>,
    pub crop: Arc<Crop>,
    pub area_used: f64,
    pub start_date: NaiveDate,
    pub completion_date: NaiveDate,
    pub growth_days: u32,
    pub accumulated_gdd: f64,
    pub total_cost: f64,
    pub base_revenue: Option<f64>, // 约束前预估收益 = 面积 × 单位收益 × 产量系数
    pub yield_factor: f64,
    pub stress: StressSummary,
    #[serde(default)]
    pub economics: Economics,
}

impl CropAllocation {
    /// 创建分配并校验
    ///
    /// # 校验
    /// - 0 < area_used <= field.area
    /// - completion_date > start_date
    ///
    /// # 计算
    /// - total_cost = daily_fixed_cost × growth_days（面积比例模型再乘面积占比）
    /// - base_revenue = area_used × revenue_per_area × yield_factor（单价未知为 None）
    pub fn try_new(
        field: Arc<Field>,
        crop: Arc<Crop>,
        area_used: f64,
        outcome: &GrowthOutcome,
        cost_model: CostModel,
    ) -> DomainResult<Self> {
        if outcome.completion_date <= outcome.start_date {
            return Err(DomainError::InvalidDateRange {
                start: outcome.start_date,
                end: outcome.completion_date,
            });
        }
        Self::check_area(&field, area_used)?;

        let growth_days = (outcome.completion_date - outcome.start_date).num_days() as u32;
        let total_cost = cost_for(&field, area_used, growth_days, cost_model);
        let base_revenue = revenue_for(&crop, area_used, outcome.yield_factor);

        Ok(Self {
            allocation_id: Uuid::new_v4().to_string(),
            field,
            crop,
            area_used,
            start_date: outcome.start_date,
            completion_date: outcome.completion_date,
            growth_days,
            accumulated_gdd: outcome.accumulated_gdd,
            total_cost,
            base_revenue,
            yield_factor: outcome.yield_factor,
            stress: outcome.stress,
            economics: Economics::Unscored,
        })
    }

    fn check_area(field: &Field, area_used: f64) -> DomainResult<()> {
        if !(area_used.is_finite() && area_used > 0.0) {
            return Err(DomainError::NonPositiveArea {
                entity: "area_used".to_string(),
                value: area_used,
            });
        }
        if area_used > field.area + AREA_EPSILON {
            return Err(DomainError::AreaExceedsField {
                field_id: field.field_id.clone(),
                area_used,
                field_area: field.area,
            });
        }
        Ok(())
    }

    /// 以新面积生成新分配（新 ID,成本/预估收益重算,经济性重置为 Unscored）
    pub fn with_area(&self, area_used: f64, cost_model: CostModel) -> DomainResult<Self> {
        Self::check_area(&self.field, area_used)?;
        Ok(Self {
            allocation_id: Uuid::new_v4().to_string(),
            area_used,
            total_cost: cost_for(&self.field, area_used, self.growth_days, cost_model),
            base_revenue: revenue_for(&self.crop, area_used, self.yield_factor),
            economics: Economics::Unscored,
            ..self.clone()
        })
    }

    /// 写入约束后经济性（评分不改变分配身份）
    pub fn scored(&self, revenue: f64) -> Self {
        Self {
            economics: Economics::Scored {
                revenue,
                profit: revenue - self.total_cost,
            },
            ..self.clone()
        }
    }

    pub fn field_id(&self) -> &str {
        &self.field.field_id
    }

    pub fn crop_id(&self) -> &str {
        &self.crop.crop_id
    }

    pub fn area_fraction(&self) -> f64 {
        self.area_used / self.field.area
    }

    /// 半开区间重叠判定
    pub fn overlaps(&self, other: &CropAllocation) -> bool {
        self.start_date < other.completion_date && other.start_date < self.completion_date
    }

    /// 考虑休耕期后的冲突判定（不含时间重叠本身之外的任何约束）
    pub fn conflicts_with_fallow(&self, other: &CropAllocation, fallow_days: u32) -> bool {
        windows_conflict(
            (self.start_date, self.completion_date),
            (other.start_date, other.completion_date),
            fallow_days,
        )
    }

    /// 约束前预估利润
    pub fn estimated_profit(&self) -> f64 {
        self.base_revenue.unwrap_or(0.0) - self.total_cost
    }

    /// 约束前目标增益（越大越好）
    pub fn objective_gain(&self, objective: OptimizationObjective) -> f64 {
        match objective {
            OptimizationObjective::MaximizeProfit => self.estimated_profit(),
            OptimizationObjective::MinimizeCost => -self.total_cost,
        }
    }

    /// 同一地块、同一作物、同一起始日的签名（候选池查找用）
    pub fn placement_key(&self) -> (String, String, NaiveDate) {
        (
            self.field.field_id.clone(),
            self.crop.crop_id.clone(),
            self.start_date,
        )
    }
}

/// 面积比较容差
pub const AREA_EPSILON: f64 = 1e-6;

fn cost_for(field: &Field, area_used: f64, growth_days: u32, cost_model: CostModel) -> f64 {
    let base = field.daily_fixed_cost * growth_days as f64;
    match cost_model {
        CostModel::FieldFixed => base,
        CostModel::AreaProportional => base * (area_used / field.area),
    }
}

fn revenue_for(crop: &Crop, area_used: f64, yield_factor: f64) -> Option<f64> {
    crop.revenue_per_area.map(|r| area_used * r * yield_factor)
}

/// 两个半开时间窗在休耕期约束下是否冲突
pub fn windows_conflict(
    a: (NaiveDate, NaiveDate),
    b: (NaiveDate, NaiveDate),
    fallow_days: u32,
) -> bool {
    let gap = Duration::days(fallow_days as i64);
    let (first, second) = if a.0 <= b.0 { (a, b) } else { (b, a) };
    second.0 < first.1 + gap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn outcome(start: NaiveDate, end: NaiveDate) -> GrowthOutcome {
        GrowthOutcome {
            start_date: start,
            completion_date: end,
            accumulated_gdd: 1000.0,
            yield_factor: 0.9,
            stress: StressSummary::default(),
        }
    }

    fn field() -> Arc<Field> {
        Arc::new(Field::new("F1", "北田", 1000.0, 5000.0).unwrap())
    }

    fn crop() -> Arc<Crop> {
        Arc::new(Crop::new("rice", "水稻").with_revenue_per_area(100.0))
    }

    #[test]
    fn test_cost_and_revenue_computation() {
        let alloc = CropAllocation::try_new(
            field(),
            crop(),
            500.0,
            &outcome(date(4, 1), date(4, 11)),
            CostModel::FieldFixed,
        )
        .unwrap();
        assert_eq!(alloc.growth_days, 10);
        assert_eq!(alloc.total_cost, 50_000.0);
        assert_eq!(alloc.base_revenue, Some(500.0 * 100.0 * 0.9));
        assert_eq!(alloc.economics, Economics::Unscored);
    }

    #[test]
    fn test_area_proportional_cost() {
        let alloc = CropAllocation::try_new(
            field(),
            crop(),
            500.0,
            &outcome(date(4, 1), date(4, 11)),
            CostModel::AreaProportional,
        )
        .unwrap();
        assert_eq!(alloc.total_cost, 25_000.0);
    }

    #[test]
    fn test_rejects_invalid_area_and_dates() {
        let bad_dates = CropAllocation::try_new(
            field(),
            crop(),
            500.0,
            &outcome(date(4, 11), date(4, 11)),
            CostModel::FieldFixed,
        );
        assert!(matches!(bad_dates, Err(DomainError::InvalidDateRange { .. })));

        let too_big = CropAllocation::try_new(
            field(),
            crop(),
            1500.0,
            &outcome(date(4, 1), date(4, 11)),
            CostModel::FieldFixed,
        );
        assert!(matches!(too_big, Err(DomainError::AreaExceedsField { .. })));
    }

    #[test]
    fn test_with_area_issues_fresh_identity() {
        let alloc = CropAllocation::try_new(
            field(),
            crop(),
            1000.0,
            &outcome(date(4, 1), date(4, 11)),
            CostModel::FieldFixed,
        )
        .unwrap();
        let scaled = alloc.with_area(500.0, CostModel::FieldFixed).unwrap();
        assert_ne!(scaled.allocation_id, alloc.allocation_id);
        assert_eq!(scaled.total_cost, alloc.total_cost);
        assert_eq!(scaled.base_revenue, Some(500.0 * 100.0 * 0.9));
        assert_eq!(alloc.area_used, 1000.0);
    }

    #[test]
    fn test_half_open_overlap_and_fallow() {
        let a = (date(1, 1), date(1, 11));
        let b = (date(1, 11), date(1, 21));
        assert!(!windows_conflict(a, b, 0));
        assert!(windows_conflict(a, b, 5));
        assert!(windows_conflict(a, (date(1, 5), date(1, 15)), 0));
    }
}
