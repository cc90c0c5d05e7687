// ==========================================
// 作物种植排产系统 - 领域类型定义
// ==========================================
// 职责: 闭合枚举（违规类型/严重度/交互规则/目标函数/邻域操作）
// 序列化格式: snake_case (与配置文件、持久化 JSON 一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 违规类型 (Violation Type)
// ==========================================
// 红线: 闭合集合,不允许运行期扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    FallowPeriod,             // 休耕期不足
    ContinuousCultivation,    // 连作障害
    FieldCropIncompatibility, // 地块-作物不相容
    HighTempStress,           // 高温胁迫
    LowTempStress,            // 低温胁迫
    FrostRisk,                // 霜冻风险
    SterilityRisk,            // 不育风险
    AreaConstraint,           // 面积约束
}

impl ViolationType {
    /// 违规代码（用于报表/日志）
    pub fn code(&self) -> &'static str {
        match self {
            ViolationType::FallowPeriod => "FALLOW_001",
            ViolationType::ContinuousCultivation => "ROTATION_001",
            ViolationType::FieldCropIncompatibility => "COMPAT_001",
            ViolationType::HighTempStress => "TEMP_HIGH_001",
            ViolationType::LowTempStress => "TEMP_LOW_001",
            ViolationType::FrostRisk => "FROST_001",
            ViolationType::SterilityRisk => "STERILITY_001",
            ViolationType::AreaConstraint => "AREA_001",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationType::FallowPeriod => write!(f, "fallow_period"),
            ViolationType::ContinuousCultivation => write!(f, "continuous_cultivation"),
            ViolationType::FieldCropIncompatibility => write!(f, "field_crop_incompatibility"),
            ViolationType::HighTempStress => write!(f, "high_temp_stress"),
            ViolationType::LowTempStress => write!(f, "low_temp_stress"),
            ViolationType::FrostRisk => write!(f, "frost_risk"),
            ViolationType::SterilityRisk => write!(f, "sterility_risk"),
            ViolationType::AreaConstraint => write!(f, "area_constraint"),
        }
    }
}

// ==========================================
// 严重度 (Severity)
// ==========================================
// Error: 方案不可行; Warning: 按 impact_ratio 折减收益
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 交互规则类型 (Interaction Rule Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionRuleType {
    ContinuousCultivation, // 时间维度: 同地块前后茬
    BeneficialRotation,    // 时间维度: 有益轮作
    CompanionPlanting,     // 空间维度: 伴生
    Allelopathy,           // 空间维度: 化感抑制
    SoilCompatibility,     // 地块-作物: 土壤
    ClimateCompatibility,  // 地块-作物: 气候
}

/// 规则适用的上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleContext {
    Temporal,
    Spatial,
    FieldCrop,
}

impl InteractionRuleType {
    pub fn context(&self) -> RuleContext {
        match self {
            InteractionRuleType::ContinuousCultivation | InteractionRuleType::BeneficialRotation => {
                RuleContext::Temporal
            }
            InteractionRuleType::CompanionPlanting | InteractionRuleType::Allelopathy => {
                RuleContext::Spatial
            }
            InteractionRuleType::SoilCompatibility | InteractionRuleType::ClimateCompatibility => {
                RuleContext::FieldCrop
            }
        }
    }

    /// 折减（impact_ratio < 1）时记录的违规类型
    /// - 时间维度（连作/轮作）→ continuous_cultivation
    /// - 空间维度（伴生/化感）与地块-作物维度 → field_crop_incompatibility
    pub fn violation_type(&self) -> ViolationType {
        match self.context() {
            RuleContext::Temporal => ViolationType::ContinuousCultivation,
            RuleContext::Spatial | RuleContext::FieldCrop => ViolationType::FieldCropIncompatibility,
        }
    }
}

impl fmt::Display for InteractionRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionRuleType::ContinuousCultivation => write!(f, "continuous_cultivation"),
            InteractionRuleType::BeneficialRotation => write!(f, "beneficial_rotation"),
            InteractionRuleType::CompanionPlanting => write!(f, "companion_planting"),
            InteractionRuleType::Allelopathy => write!(f, "allelopathy"),
            InteractionRuleType::SoilCompatibility => write!(f, "soil_compatibility"),
            InteractionRuleType::ClimateCompatibility => write!(f, "climate_compatibility"),
        }
    }
}

// ==========================================
// 优化目标 (Objective)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationObjective {
    #[default]
    MaximizeProfit,
    MinimizeCost,
}

impl fmt::Display for OptimizationObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationObjective::MaximizeProfit => write!(f, "maximize_profit"),
            OptimizationObjective::MinimizeCost => write!(f, "minimize_cost"),
        }
    }
}

impl std::str::FromStr for OptimizationObjective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "maximize_profit" | "profit" => Ok(OptimizationObjective::MaximizeProfit),
            "minimize_cost" | "cost" => Ok(OptimizationObjective::MinimizeCost),
            other => Err(format!("未知优化目标: {}", other)),
        }
    }
}

// ==========================================
// 胁迫类型 (Stress Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressKind {
    HighTemp,
    LowTemp,
    Frost,
    Sterility,
    LowSun,
}

impl StressKind {
    pub const ALL: [StressKind; 5] = [
        StressKind::HighTemp,
        StressKind::LowTemp,
        StressKind::Frost,
        StressKind::Sterility,
        StressKind::LowSun,
    ];

    /// 对应的违规类型（日照不足只影响产量,不产生违规）
    pub fn violation_type(&self) -> Option<ViolationType> {
        match self {
            StressKind::HighTemp => Some(ViolationType::HighTempStress),
            StressKind::LowTemp => Some(ViolationType::LowTempStress),
            StressKind::Frost => Some(ViolationType::FrostRisk),
            StressKind::Sterility => Some(ViolationType::SterilityRisk),
            StressKind::LowSun => None,
        }
    }
}

impl fmt::Display for StressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StressKind::HighTemp => write!(f, "high_temp"),
            StressKind::LowTemp => write!(f, "low_temp"),
            StressKind::Frost => write!(f, "frost"),
            StressKind::Sterility => write!(f, "sterility"),
            StressKind::LowSun => write!(f, "low_sun"),
        }
    }
}

// ==========================================
// 成本模型 (Cost Model)
// ==========================================
// 默认: 地块级固定日成本,与使用面积无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    #[default]
    FieldFixed,
    AreaProportional,
}

// ==========================================
// 搜索策略 (Search Strategy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    #[default]
    LocalSearch,
    Alns,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::LocalSearch => write!(f, "local_search"),
            SearchStrategy::Alns => write!(f, "alns"),
        }
    }
}

// ==========================================
// 邻域操作 (Neighbor Operation)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborOperation {
    FieldSwap,
    FieldMove,
    FieldReplace,
    FieldRemove,
    CropInsert,
    CropChange,
    PeriodReplace,
    QuantityAdjust,
    AreaAdjust,
}

impl NeighborOperation {
    pub const ALL: [NeighborOperation; 9] = [
        NeighborOperation::FieldSwap,
        NeighborOperation::FieldMove,
        NeighborOperation::FieldReplace,
        NeighborOperation::FieldRemove,
        NeighborOperation::CropInsert,
        NeighborOperation::CropChange,
        NeighborOperation::PeriodReplace,
        NeighborOperation::QuantityAdjust,
        NeighborOperation::AreaAdjust,
    ];
}

impl fmt::Display for NeighborOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NeighborOperation::FieldSwap => "field_swap",
            NeighborOperation::FieldMove => "field_move",
            NeighborOperation::FieldReplace => "field_replace",
            NeighborOperation::FieldRemove => "field_remove",
            NeighborOperation::CropInsert => "crop_insert",
            NeighborOperation::CropChange => "crop_change",
            NeighborOperation::PeriodReplace => "period_replace",
            NeighborOperation::QuantityAdjust => "quantity_adjust",
            NeighborOperation::AreaAdjust => "area_adjust",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_type_serde_is_snake_case() {
        let json = serde_json::to_string(&ViolationType::FieldCropIncompatibility).unwrap();
        assert_eq!(json, "\"field_crop_incompatibility\"");
        assert_eq!(
            ViolationType::FieldCropIncompatibility.to_string(),
            "field_crop_incompatibility"
        );
    }

    #[test]
    fn test_rule_context() {
        assert_eq!(
            InteractionRuleType::BeneficialRotation.context(),
            RuleContext::Temporal
        );
        assert_eq!(InteractionRuleType::Allelopathy.context(), RuleContext::Spatial);
        assert_eq!(
            InteractionRuleType::ClimateCompatibility.context(),
            RuleContext::FieldCrop
        );
    }

    #[test]
    fn test_objective_from_str() {
        assert_eq!(
            "profit".parse::<OptimizationObjective>().unwrap(),
            OptimizationObjective::MaximizeProfit
        );
        assert!("speed".parse::<OptimizationObjective>().is_err());
    }
}
