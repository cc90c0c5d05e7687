// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{Duration, NaiveDate};
use crop_planning_aps::domain::allocation::{CropAllocation, GrowthOutcome, StressSummary};
use crop_planning_aps::domain::crop::{Crop, CropRequirement, StageRequirement, SunshineProfile, TemperatureProfile};
use crop_planning_aps::domain::field::Field;
use crop_planning_aps::domain::interaction::InteractionRule;
use crop_planning_aps::domain::schedule::{OptimizationIntermediateResult, PlanningPeriod};
use crop_planning_aps::domain::types::{CostModel, OptimizationObjective};
use crop_planning_aps::domain::weather::{WeatherRecord, WeatherSeries};
use crop_planning_aps::engine::{AllocationOrchestrator, OptimizerGateways};
use crop_planning_aps::repository::{
    InMemoryCropRequirementGateway, InMemoryFieldGateway, InMemoryInteractionRuleGateway, InMemoryWeatherGateway,
};
use std::sync::Arc;

// ==========================================
// 日期
// ==========================================

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

pub fn period(start: NaiveDate, end: NaiveDate) -> PlanningPeriod {
    PlanningPeriod::new(start, end).unwrap()
}

// ==========================================
// Field 构建器
// ==========================================

pub struct FieldBuilder {
    field_id: String,
    area: f64,
    daily_fixed_cost: f64,
    location: Option<String>,
    fallow_period_days: Option<u32>,
    groups: Vec<String>,
}

impl FieldBuilder {
    pub fn new(field_id: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            area: 1000.0,
            daily_fixed_cost: 10.0,
            location: None,
            fallow_period_days: None,
            groups: Vec::new(),
        }
    }

    pub fn area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    pub fn daily_cost(mut self, cost: f64) -> Self {
        self.daily_fixed_cost = cost;
        self
    }

    pub fn location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn fallow(mut self, days: u32) -> Self {
        self.fallow_period_days = Some(days);
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.groups.push(group.to_string());
        self
    }

    pub fn build(self) -> Field {
        let mut field = Field::new(&self.field_id, format!("地块{}", self.field_id), self.area, self.daily_fixed_cost)
            .unwrap()
            .with_groups(self.groups);
        if let Some(location) = self.location {
            field = field.with_location(location);
        }
        if let Some(days) = self.fallow_period_days {
            field = field.with_fallow_period_days(days);
        }
        field
    }

    pub fn arc(self) -> Arc<Field> {
        Arc::new(self.build())
    }
}

// ==========================================
// CropRequirement 构建器
// ==========================================

pub struct RequirementBuilder {
    crop: Crop,
    stages: Vec<StageRequirement>,
}

impl RequirementBuilder {
    pub fn new(crop_id: &str) -> Self {
        Self {
            crop: Crop::new(crop_id, crop_id),
            stages: Vec::new(),
        }
    }

    pub fn revenue(mut self, revenue_per_area: f64) -> Self {
        self.crop = self.crop.with_revenue_per_area(revenue_per_area);
        self
    }

    pub fn max_revenue(mut self, max_revenue: f64) -> Self {
        self.crop = self.crop.with_max_revenue(max_revenue);
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        let mut groups = self.crop.groups.clone();
        groups.push(group.to_string());
        self.crop = self.crop.with_groups(groups);
        self
    }

    /// 追加阶段（基温 10℃）
    pub fn stage(mut self, name: &str, required_gdd: f64) -> Self {
        let order = self.stages.len() as u32;
        self.stages.push(StageRequirement {
            stage_name: name.to_string(),
            order,
            temperature: TemperatureProfile::with_base(10.0),
            sunshine: SunshineProfile::default(),
            required_gdd,
        });
        self
    }

    pub fn build(self) -> CropRequirement {
        let stages = if self.stages.is_empty() {
            vec![StageRequirement {
                stage_name: "全生育期".to_string(),
                order: 0,
                temperature: TemperatureProfile::with_base(10.0),
                sunshine: SunshineProfile::default(),
                required_gdd: 100.0,
            }]
        } else {
            self.stages
        };
        CropRequirement::new(self.crop, stages).unwrap()
    }
}

// ==========================================
// 气象
// ==========================================

/// 从 start 起连续 days 天、日均温恒定的序列
pub fn uniform_weather(start: NaiveDate, days: i64, mean: f64) -> WeatherSeries {
    WeatherSeries::new(
        (0..days)
            .map(|i| WeatherRecord::with_mean(start + Duration::days(i), mean))
            .collect(),
    )
    .unwrap()
}

// ==========================================
// 分配 / 候选
// ==========================================

/// 直接构造分配（completion 为半开区间终点）
pub fn allocation(field: &Arc<Field>, crop: &Arc<Crop>, start: NaiveDate, completion: NaiveDate, area: f64) -> Arc<CropAllocation> {
    Arc::new(
        CropAllocation::try_new(
            field.clone(),
            crop.clone(),
            area,
            &GrowthOutcome {
                start_date: start,
                completion_date: completion,
                accumulated_gdd: 0.0,
                yield_factor: 1.0,
                stress: StressSummary::default(),
            },
            CostModel::FieldFixed,
        )
        .unwrap(),
    )
}

/// 固定成本的候选（覆盖按日成本计算的结果）
pub fn candidate_with_cost(
    field: &Arc<Field>,
    crop: &Arc<Crop>,
    start: NaiveDate,
    completion: NaiveDate,
    cost: f64,
    objective: OptimizationObjective,
) -> OptimizationIntermediateResult {
    let base = allocation(field, crop, start, completion, field.area);
    let priced = CropAllocation {
        total_cost: cost,
        ..(*base).clone()
    };
    OptimizationIntermediateResult::new(priced, vec![], objective)
}

// ==========================================
// 编排器
// ==========================================

/// 全内存网关编排器: 所有位置共用同一气象序列
pub fn in_memory_orchestrator(
    fields: Vec<Field>,
    requirements: Vec<CropRequirement>,
    weather: WeatherSeries,
    rules: Vec<InteractionRule>,
) -> AllocationOrchestrator {
    AllocationOrchestrator::new(OptimizerGateways::in_memory(
        InMemoryFieldGateway::new(fields),
        InMemoryCropRequirementGateway::new(requirements),
        InMemoryWeatherGateway::uniform(weather),
        InMemoryInteractionRuleGateway::new(rules),
    ))
}

pub fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
