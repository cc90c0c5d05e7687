// ==========================================
// 作物种植排产系统 - 作物与生育需求模型
// ==========================================
// 来源: 外部作物需求仓储（阈值由上游提供,本系统不推导）
// 结构: Crop + 有序阶段列表 {温度/日照/积温需求}
// ==========================================

use crate::domain::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

// ==========================================
// Crop - 作物
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub crop_id: String,
    pub name: String,
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub revenue_per_area: Option<f64>, // 单位面积收益（未知则收益按 0 计）
    #[serde(default)]
    pub max_revenue: Option<f64>,      // 市场需求上限（整个方案内该作物收益封顶）
    #[serde(default)]
    pub groups: Vec<String>,           // 作物分组（科/属等,用于交互规则）
}

impl Crop {
    pub fn new(crop_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            crop_id: crop_id.into(),
            name: name.into(),
            variety: None,
            revenue_per_area: None,
            max_revenue: None,
            groups: Vec::new(),
        }
    }

    pub fn with_revenue_per_area(mut self, revenue_per_area: f64) -> Self {
        self.revenue_per_area = Some(revenue_per_area);
        self
    }

    pub fn with_max_revenue(mut self, max_revenue: f64) -> Self {
        self.max_revenue = Some(max_revenue);
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// 分组匹配（作物ID/名称本身也视为分组）
    pub fn in_group(&self, group: &str) -> bool {
        self.crop_id == group || self.name == group || self.groups.iter().any(|g| g == group)
    }
}

// ==========================================
// TemperatureProfile - 温度需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureProfile {
    pub base_temperature: f64,           // 生育下限温度（GDD 基温）
    pub optimal_min: f64,
    pub optimal_max: f64,
    pub low_stress_threshold: f64,       // 日均温低于此值记低温胁迫
    pub high_stress_threshold: f64,      // 日最高温高于此值记高温胁迫
    pub frost_threshold: f64,            // 日最低温不高于此值记霜冻
    #[serde(default)]
    pub sterility_risk_threshold: Option<f64>, // 日最高温不低于此值记不育风险
}

impl TemperatureProfile {
    /// 以基温构造一个宽松的温度需求（测试/默认场景）
    pub fn with_base(base_temperature: f64) -> Self {
        Self {
            base_temperature,
            optimal_min: base_temperature + 10.0,
            optimal_max: base_temperature + 20.0,
            low_stress_threshold: base_temperature,
            high_stress_threshold: base_temperature + 25.0,
            frost_threshold: 0.0,
            sterility_risk_threshold: None,
        }
    }
}

// ==========================================
// SunshineProfile - 日照需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunshineProfile {
    pub minimum_sunshine_hours: f64, // 低于此值记日照不足
    pub target_sunshine_hours: f64,  // 不低于此值记日照良好
}

impl Default for SunshineProfile {
    fn default() -> Self {
        Self {
            minimum_sunshine_hours: 0.0,
            target_sunshine_hours: 6.0,
        }
    }
}

// ==========================================
// StageRequirement - 生育阶段需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRequirement {
    pub stage_name: String,
    pub order: u32,
    pub temperature: TemperatureProfile,
    #[serde(default)]
    pub sunshine: SunshineProfile,
    pub required_gdd: f64, // 完成本阶段所需积温
}

// ==========================================
// CropRequirement - 作物生育需求（有序阶段）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRequirement {
    pub crop: Crop,
    pub stages: Vec<StageRequirement>,
}

impl CropRequirement {
    /// 创建并校验: 阶段非空、积温需求为正,按 order 排序
    pub fn new(crop: Crop, mut stages: Vec<StageRequirement>) -> DomainResult<Self> {
        stages.sort_by_key(|s| s.order);
        let requirement = Self { crop, stages };
        requirement.validate()?;
        Ok(requirement)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.stages.is_empty() {
            return Err(DomainError::EmptyStages(self.crop.crop_id.clone()));
        }
        for stage in &self.stages {
            if !(stage.required_gdd.is_finite() && stage.required_gdd > 0.0) {
                return Err(DomainError::FieldValueError {
                    field: format!("{}.{}.required_gdd", self.crop.crop_id, stage.stage_name),
                    message: format!("积温需求必须为正: {}", stage.required_gdd),
                });
            }
        }
        Ok(())
    }

    pub fn crop_id(&self) -> &str {
        &self.crop.crop_id
    }

    pub fn total_required_gdd(&self) -> f64 {
        self.stages.iter().map(|s| s.required_gdd).sum()
    }
}
