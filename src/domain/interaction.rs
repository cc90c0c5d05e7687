// ==========================================
// 作物种植排产系统 - 交互规则
// ==========================================
// 生命周期: 优化开始时由 InteractionRuleGateway 加载一次,优化过程中只读
// 匹配: 时间/空间规则匹配作物分组; 地块-作物规则 source=地块分组, target=作物分组
// ==========================================

use crate::domain::crop::Crop;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::field::Field;
use crate::domain::types::{InteractionRuleType, RuleContext};
use serde::{Deserialize, Serialize};

/// 增益类规则允许的最大系数
pub const MAX_BENEFIT_RATIO: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRule {
    pub rule_id: String,
    pub rule_type: InteractionRuleType,
    pub source_group: String,
    pub target_group: String,
    pub impact_ratio: f64,
    #[serde(default = "default_directional")]
    pub is_directional: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_directional() -> bool {
    true
}

impl InteractionRule {
    pub fn new(
        rule_id: impl Into<String>,
        rule_type: InteractionRuleType,
        source_group: impl Into<String>,
        target_group: impl Into<String>,
        impact_ratio: f64,
        is_directional: bool,
    ) -> DomainResult<Self> {
        let rule = Self {
            rule_id: rule_id.into(),
            rule_type,
            source_group: source_group.into(),
            target_group: target_group.into(),
            impact_ratio,
            is_directional,
            description: None,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// 抑制类规则 impact_ratio ∈ [0,1]; 有益轮作/伴生允许 (0, MAX_BENEFIT_RATIO]
    pub fn validate(&self) -> DomainResult<()> {
        let upper = if self.is_beneficial_type() {
            MAX_BENEFIT_RATIO
        } else {
            1.0
        };
        if !(self.impact_ratio.is_finite() && self.impact_ratio >= 0.0 && self.impact_ratio <= upper) {
            return Err(DomainError::ImpactRatioOutOfRange {
                context: format!("rule[{}].impact_ratio", self.rule_id),
                value: self.impact_ratio,
            });
        }
        Ok(())
    }

    fn is_beneficial_type(&self) -> bool {
        matches!(
            self.rule_type,
            InteractionRuleType::BeneficialRotation | InteractionRuleType::CompanionPlanting
        )
    }

    pub fn context(&self) -> RuleContext {
        self.rule_type.context()
    }

    /// 作物对作物规则: previous/neighbor 为 source, affected 为 target
    ///
    /// 非方向性规则允许 source/target 互换
    pub fn matches_crops(&self, source: &Crop, target: &Crop) -> bool {
        let forward = source.in_group(&self.source_group) && target.in_group(&self.target_group);
        if forward || self.is_directional {
            return forward;
        }
        source.in_group(&self.target_group) && target.in_group(&self.source_group)
    }

    /// 地块对作物规则
    pub fn matches_field_crop(&self, field: &Field, crop: &Crop) -> bool {
        field.in_group(&self.source_group) && crop.in_group(&self.target_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop(id: &str, group: &str) -> Crop {
        Crop::new(id, id).with_groups(vec![group.to_string()])
    }

    #[test]
    fn test_ratio_bounds_by_type() {
        assert!(InteractionRule::new("R1", InteractionRuleType::ContinuousCultivation, "a", "a", 1.2, true).is_err());
        assert!(InteractionRule::new("R2", InteractionRuleType::BeneficialRotation, "a", "b", 1.2, true).is_ok());
        assert!(InteractionRule::new("R3", InteractionRuleType::Allelopathy, "a", "b", -0.1, true).is_err());
    }

    #[test]
    fn test_directional_matching() {
        let rule = InteractionRule::new("R1", InteractionRuleType::Allelopathy, "Juglandaceae", "Solanaceae", 0.6, true).unwrap();
        let walnut = crop("walnut", "Juglandaceae");
        let tomato = crop("tomato", "Solanaceae");
        assert!(rule.matches_crops(&walnut, &tomato));
        assert!(!rule.matches_crops(&tomato, &walnut));

        let symmetric = InteractionRule { is_directional: false, ..rule };
        assert!(symmetric.matches_crops(&tomato, &walnut));
    }

    #[test]
    fn test_field_crop_matching() {
        let rule = InteractionRule::new("R1", InteractionRuleType::SoilCompatibility, "clay", "Solanaceae", 0.8, true).unwrap();
        let field = Field::new("F1", "北田", 1000.0, 10.0).unwrap().with_groups(vec!["clay".to_string()]);
        assert!(rule.matches_field_crop(&field, &crop("tomato", "Solanaceae")));
        assert!(!rule.matches_field_crop(&field, &crop("cabbage", "Brassicaceae")));
    }
}
