// ==========================================
// 作物种植排产系统 - 地块领域模型
// ==========================================
// 来源: 外部地块网关 {field_id, area, daily_fixed_cost, location?}
// 红线: 构造即校验,运行期只读
// ==========================================

use crate::domain::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

/// 默认休耕期（天）
pub const DEFAULT_FALLOW_PERIOD_DAYS: u32 = 28;

fn default_fallow_period_days() -> u32 {
    DEFAULT_FALLOW_PERIOD_DAYS
}

// ==========================================
// Field - 地块
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub field_id: String,         // 地块ID
    pub name: String,             // 地块名称
    pub area: f64,                // 面积 (m²)
    pub daily_fixed_cost: f64,    // 日固定成本
    #[serde(default)]
    pub location: Option<String>, // 位置键（气象数据查询用）
    #[serde(default = "default_fallow_period_days")]
    pub fallow_period_days: u32,  // 两茬之间的最小休耕天数
    #[serde(default)]
    pub groups: Vec<String>,      // 地块分组（土壤/气候相容规则匹配）
}

impl Field {
    /// 创建地块并校验
    ///
    /// # 校验
    /// - area > 0
    /// - daily_fixed_cost >= 0
    pub fn new(
        field_id: impl Into<String>,
        name: impl Into<String>,
        area: f64,
        daily_fixed_cost: f64,
    ) -> DomainResult<Self> {
        let field = Self {
            field_id: field_id.into(),
            name: name.into(),
            area,
            daily_fixed_cost,
            location: None,
            fallow_period_days: DEFAULT_FALLOW_PERIOD_DAYS,
            groups: Vec::new(),
        };
        field.validate()?;
        Ok(field)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_fallow_period_days(mut self, days: u32) -> Self {
        self.fallow_period_days = days;
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// 反序列化后的显式校验
    pub fn validate(&self) -> DomainResult<()> {
        if self.field_id.trim().is_empty() {
            return Err(DomainError::FieldValueError {
                field: "field_id".to_string(),
                message: "地块ID不能为空".to_string(),
            });
        }
        if !(self.area.is_finite() && self.area > 0.0) {
            return Err(DomainError::NonPositiveArea {
                entity: format!("field[{}].area", self.field_id),
                value: self.area,
            });
        }
        if !(self.daily_fixed_cost.is_finite() && self.daily_fixed_cost >= 0.0) {
            return Err(DomainError::FieldValueError {
                field: "daily_fixed_cost".to_string(),
                message: format!("日固定成本不能为负: {}", self.daily_fixed_cost),
            });
        }
        Ok(())
    }

    /// 气象查询键: 有 location 用 location,否则退化为 field_id
    pub fn weather_key(&self) -> &str {
        self.location.as_deref().unwrap_or(&self.field_id)
    }

    /// 分组匹配（地块ID本身也视为一个分组）
    pub fn in_group(&self, group: &str) -> bool {
        self.field_id == group || self.groups.iter().any(|g| g == group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_rejects_non_positive_area() {
        assert!(matches!(
            Field::new("F1", "北田", 0.0, 100.0),
            Err(DomainError::NonPositiveArea { .. })
        ));
        assert!(Field::new("F1", "北田", -5.0, 100.0).is_err());
    }

    #[test]
    fn test_field_rejects_negative_cost() {
        assert!(Field::new("F1", "北田", 1000.0, -1.0).is_err());
    }

    #[test]
    fn test_weather_key_falls_back_to_field_id() {
        let field = Field::new("F1", "北田", 1000.0, 5000.0).unwrap();
        assert_eq!(field.weather_key(), "F1");
        let field = field.with_location("tokyo");
        assert_eq!(field.weather_key(), "tokyo");
    }

    #[test]
    fn test_default_fallow_on_deserialize() {
        let field: Field = serde_json::from_str(
            r#"{"field_id":"F1","name":"北田","area":1000.0,"daily_fixed_cost":5000.0}"#,
        )
        .unwrap();
        assert_eq!(field.fallow_period_days, DEFAULT_FALLOW_PERIOD_DAYS);
        assert!(field.in_group("F1"));
    }
}
