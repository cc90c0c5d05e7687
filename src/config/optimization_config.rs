// ==========================================
// 作物种植排产系统 - 优化配置
// ==========================================
// 红线: 每次优化创建一次,运行中不可变
// 说明: #[serde(default)] 允许部分 JSON 覆写,缺省项取默认值
// ==========================================

use crate::domain::types::{CostModel, NeighborOperation, SearchStrategy, StressKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 权重求和容差
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ==========================================
// 配置错误
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置无效 (field={field}): {message}")]
    Invalid { field: String, message: String },

    #[error("配置存储失败: {0}")]
    Storage(String),

    #[error("配置序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for ConfigError {
    fn from(err: rusqlite::Error) -> Self {
        ConfigError::Storage(err.to_string())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.into(),
    }
}

// ==========================================
// OperationWeights - 邻域操作权重（和为 1.0）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationWeights {
    pub field_swap: f64,
    pub field_move: f64,
    pub field_replace: f64,
    pub field_remove: f64,
    pub crop_insert: f64,
    pub crop_change: f64,
    pub period_replace: f64,
    pub quantity_adjust: f64,
    pub area_adjust: f64,
}

impl Default for OperationWeights {
    fn default() -> Self {
        Self {
            field_swap: 0.10,
            field_move: 0.10,
            field_replace: 0.10,
            field_remove: 0.10,
            crop_insert: 0.15,
            crop_change: 0.10,
            period_replace: 0.15,
            quantity_adjust: 0.10,
            area_adjust: 0.10,
        }
    }
}

impl OperationWeights {
    pub fn weight(&self, op: NeighborOperation) -> f64 {
        match op {
            NeighborOperation::FieldSwap => self.field_swap,
            NeighborOperation::FieldMove => self.field_move,
            NeighborOperation::FieldReplace => self.field_replace,
            NeighborOperation::FieldRemove => self.field_remove,
            NeighborOperation::CropInsert => self.crop_insert,
            NeighborOperation::CropChange => self.crop_change,
            NeighborOperation::PeriodReplace => self.period_replace,
            NeighborOperation::QuantityAdjust => self.quantity_adjust,
            NeighborOperation::AreaAdjust => self.area_adjust,
        }
    }

    pub fn sum(&self) -> f64 {
        NeighborOperation::ALL.iter().map(|op| self.weight(*op)).sum()
    }
}

// ==========================================
// 产量折减策略
// ==========================================
// 多日胁迫的组合方式可插拔:
// - MultiplicativeRetention: 每个胁迫日乘一次保留率
// - WorstCase: 只取出现过的最差保留率一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum YieldPenaltyPolicy {
    #[default]
    MultiplicativeRetention,
    WorstCase,
}

/// 单个胁迫日的产量保留率
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressRetention {
    pub high_temp: f64,
    pub low_temp: f64,
    pub frost: f64,
    pub sterility: f64,
    pub low_sun: f64,
}

impl Default for StressRetention {
    fn default() -> Self {
        Self {
            high_temp: 0.98,
            low_temp: 0.99,
            frost: 0.95,
            sterility: 0.90,
            low_sun: 0.995,
        }
    }
}

impl StressRetention {
    pub fn retention(&self, kind: StressKind) -> f64 {
        match kind {
            StressKind::HighTemp => self.high_temp,
            StressKind::LowTemp => self.low_temp,
            StressKind::Frost => self.frost,
            StressKind::Sterility => self.sterility,
            StressKind::LowSun => self.low_sun,
        }
    }
}

/// 胁迫天数 → 违规严重度阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SeverityThreshold {
    #[serde(default)]
    pub warning_days: Option<u32>,
    #[serde(default)]
    pub error_days: Option<u32>,
}

impl SeverityThreshold {
    pub fn new(warning_days: Option<u32>, error_days: Option<u32>) -> Self {
        Self {
            warning_days,
            error_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressSeverityPolicy {
    pub high_temp: SeverityThreshold,
    pub low_temp: SeverityThreshold,
    pub frost: SeverityThreshold,
    pub sterility: SeverityThreshold,
}

impl Default for StressSeverityPolicy {
    fn default() -> Self {
        Self {
            high_temp: SeverityThreshold::new(Some(3), None),
            low_temp: SeverityThreshold::new(Some(5), None),
            frost: SeverityThreshold::new(Some(1), Some(5)),
            sterility: SeverityThreshold::new(Some(1), Some(5)),
        }
    }
}

impl StressSeverityPolicy {
    pub fn threshold(&self, kind: StressKind) -> Option<SeverityThreshold> {
        match kind {
            StressKind::HighTemp => Some(self.high_temp),
            StressKind::LowTemp => Some(self.low_temp),
            StressKind::Frost => Some(self.frost),
            StressKind::Sterility => Some(self.sterility),
            StressKind::LowSun => None,
        }
    }
}

// ==========================================
// AlnsParams - ALNS 参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlnsParams {
    pub iterations: usize,
    pub removal_rate: f64,        // 每次破坏移除的分配比例 (0,1]
    pub initial_temperature: f64, // 相对退火温度（按目标值相对差计）
    pub cooling_rate: f64,
    pub segment_size: usize,      // 权重更新周期
    pub reaction_factor: f64,     // 权重指数衰减系数
    pub min_weight: f64,
    pub score_best: f64,
    pub score_better: f64,
    pub score_accepted: f64,
}

impl Default for AlnsParams {
    fn default() -> Self {
        Self {
            iterations: 200,
            removal_rate: 0.3,
            initial_temperature: 0.05,
            cooling_rate: 0.995,
            segment_size: 20,
            reaction_factor: 0.2,
            min_weight: 0.05,
            score_best: 33.0,
            score_better: 9.0,
            score_accepted: 3.0,
        }
    }
}

// ==========================================
// OptimizationConfig - 优化配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    // ===== 候选生成 =====
    pub area_levels: Vec<f64>,           // 面积档位（地块面积比例）
    pub start_date_step_days: u32,       // 起始日步长
    pub top_period_candidates: usize,    // 每档面积保留的最优时段数
    pub enable_candidate_filtering: bool,
    pub enable_parallel_candidate_generation: bool,
    pub cost_model: CostModel,
    pub yield_policy: YieldPenaltyPolicy,
    pub stress_retention: StressRetention,

    // ===== 约束评估 =====
    pub stress_severity: StressSeverityPolicy,

    // ===== 搜索 =====
    pub search_strategy: SearchStrategy,
    pub max_local_search_iterations: usize,
    pub max_no_improvement: usize,
    pub max_neighbors_per_iteration: usize,
    pub max_computation_time_secs: Option<f64>,
    pub enable_neighbor_sampling: bool,
    pub enable_parallel_neighbor_evaluation: bool,
    pub operation_weights: OperationWeights,
    pub quantity_adjust_multipliers: Vec<f64>,
    pub min_area_fraction: f64,          // 面积调整后允许的最小地块占比
    pub alns: Option<AlnsParams>,
    pub random_seed: u64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            area_levels: vec![1.0, 0.75, 0.5, 0.25],
            start_date_step_days: 1,
            top_period_candidates: 10,
            enable_candidate_filtering: true,
            enable_parallel_candidate_generation: true,
            cost_model: CostModel::FieldFixed,
            yield_policy: YieldPenaltyPolicy::MultiplicativeRetention,
            stress_retention: StressRetention::default(),
            stress_severity: StressSeverityPolicy::default(),
            search_strategy: SearchStrategy::LocalSearch,
            max_local_search_iterations: 100,
            max_no_improvement: 20,
            max_neighbors_per_iteration: 200,
            max_computation_time_secs: None,
            enable_neighbor_sampling: true,
            enable_parallel_neighbor_evaluation: true,
            operation_weights: OperationWeights::default(),
            quantity_adjust_multipliers: vec![0.8, 0.9, 1.1, 1.2],
            min_area_fraction: 0.1,
            alns: None,
            random_seed: 42,
        }
    }
}

impl OptimizationConfig {
    /// 从 JSON 文件加载并校验
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: OptimizationConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 启用 ALNS（缺省参数）
    pub fn with_alns(mut self, params: AlnsParams) -> Self {
        self.search_strategy = SearchStrategy::Alns;
        self.alns = Some(params);
        self
    }

    /// ALNS 参数（未配置时取默认）
    pub fn alns_params(&self) -> AlnsParams {
        self.alns.clone().unwrap_or_default()
    }

    pub fn max_computation_time(&self) -> Option<Duration> {
        self.max_computation_time_secs.map(Duration::from_secs_f64)
    }

    /// 校验配置
    ///
    /// # 校验规则
    /// 1. 面积档位非空且 ∈ (0,1]
    /// 2. 操作权重非负且和为 1.0
    /// 3. 迭代/邻域上限 >= 1
    /// 4. ALNS removal_rate ∈ (0,1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.area_levels.is_empty() {
            return Err(invalid("area_levels", "面积档位不能为空"));
        }
        if let Some(level) = self.area_levels.iter().find(|l| !(**l > 0.0 && **l <= 1.0)) {
            return Err(invalid("area_levels", format!("面积档位超出 (0,1]: {}", level)));
        }
        if self.start_date_step_days == 0 {
            return Err(invalid("start_date_step_days", "起始日步长必须 >= 1"));
        }
        if self.top_period_candidates == 0 {
            return Err(invalid("top_period_candidates", "必须 >= 1"));
        }
        if self.max_local_search_iterations == 0 {
            return Err(invalid("max_local_search_iterations", "必须 >= 1"));
        }
        if self.max_no_improvement == 0 {
            return Err(invalid("max_no_improvement", "必须 >= 1"));
        }
        if self.max_neighbors_per_iteration == 0 {
            return Err(invalid("max_neighbors_per_iteration", "必须 >= 1"));
        }
        if let Some(secs) = self.max_computation_time_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(invalid("max_computation_time_secs", format!("必须为正: {}", secs)));
            }
        }

        let weights = &self.operation_weights;
        if NeighborOperation::ALL.iter().any(|op| weights.weight(*op) < 0.0) {
            return Err(invalid("operation_weights", "操作权重不能为负"));
        }
        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid("operation_weights", format!("操作权重之和必须为 1.0, 实际 {:.6}", sum)));
        }

        if self.quantity_adjust_multipliers.iter().any(|m| !(*m > 0.0 && m.is_finite())) {
            return Err(invalid("quantity_adjust_multipliers", "倍率必须为正"));
        }
        if !(self.min_area_fraction > 0.0 && self.min_area_fraction <= 1.0) {
            return Err(invalid("min_area_fraction", format!("超出 (0,1]: {}", self.min_area_fraction)));
        }
        if StressKind::ALL
            .iter()
            .map(|k| self.stress_retention.retention(*k))
            .any(|r| !(0.0..=1.0).contains(&r))
        {
            return Err(invalid("stress_retention", "保留率必须在 [0,1]"));
        }

        if let Some(alns) = &self.alns {
            if alns.iterations == 0 {
                return Err(invalid("alns.iterations", "必须 >= 1"));
            }
            if !(alns.removal_rate > 0.0 && alns.removal_rate <= 1.0) {
                return Err(invalid("alns.removal_rate", format!("超出 (0,1]: {}", alns.removal_rate)));
            }
            if !(alns.cooling_rate > 0.0 && alns.cooling_rate <= 1.0) {
                return Err(invalid("alns.cooling_rate", format!("超出 (0,1]: {}", alns.cooling_rate)));
            }
            if alns.segment_size == 0 {
                return Err(invalid("alns.segment_size", "必须 >= 1"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OptimizationConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.operation_weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = OptimizationConfig::default();
        config.operation_weights.crop_insert = 0.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "operation_weights"));
    }

    #[test]
    fn test_area_levels_range() {
        let mut config = OptimizationConfig::default();
        config.area_levels = vec![1.2];
        assert!(config.validate().is_err());
        config.area_levels = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alns_removal_rate_range() {
        let config = OptimizationConfig::default().with_alns(AlnsParams {
            removal_rate: 0.0,
            ..AlnsParams::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: OptimizationConfig =
            serde_json::from_str(r#"{"max_no_improvement": 5, "alns": {"iterations": 50}}"#).unwrap();
        assert_eq!(config.max_no_improvement, 5);
        assert_eq!(config.area_levels, vec![1.0, 0.75, 0.5, 0.25]);
        assert_eq!(config.alns_params().iterations, 50);
        assert_eq!(config.alns_params().removal_rate, 0.3);
        assert!(config.validate().is_ok());
    }
}
