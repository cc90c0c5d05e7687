// ==========================================
// 作物种植排产系统 - 约束违规
// ==========================================
// 红线: 违规是数据,不是异常
// Error → 方案不可行; Warning → 收益按 impact_ratio 折减
// ==========================================

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::types::{Severity, ViolationType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub violation_type: ViolationType,
    pub code: String,
    pub message: String,
    pub severity: Severity,
    pub impact_ratio: f64, // [0,1], 1.0 = 对产量/收益无影响
    #[serde(default)]
    pub allocation_id: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl Violation {
    /// 创建违规并校验 impact_ratio ∈ [0,1]
    pub fn new(
        violation_type: ViolationType,
        severity: Severity,
        message: impl Into<String>,
        impact_ratio: f64,
    ) -> DomainResult<Self> {
        if !(0.0..=1.0).contains(&impact_ratio) {
            return Err(DomainError::ImpactRatioOutOfRange {
                context: format!("violation[{}].impact_ratio", violation_type),
                value: impact_ratio,
            });
        }
        Ok(Self {
            violation_type,
            code: violation_type.code().to_string(),
            message: message.into(),
            severity,
            impact_ratio,
            allocation_id: None,
            details: None,
        })
    }

    /// 硬约束违规（impact_ratio 固定为 0）
    pub fn error(violation_type: ViolationType, message: impl Into<String>) -> Self {
        Self {
            violation_type,
            code: violation_type.code().to_string(),
            message: message.into(),
            severity: Severity::Error,
            impact_ratio: 0.0,
            allocation_id: None,
            details: None,
        }
    }

    /// 软约束告警（impact_ratio 超界时截断到 [0,1]）
    pub fn warning(violation_type: ViolationType, message: impl Into<String>, impact_ratio: f64) -> Self {
        Self {
            violation_type,
            code: violation_type.code().to_string(),
            message: message.into(),
            severity: Severity::Warning,
            impact_ratio: impact_ratio.clamp(0.0, 1.0),
            allocation_id: None,
            details: None,
        }
    }

    pub fn for_allocation(mut self, allocation_id: impl Into<String>) -> Self {
        self.allocation_id = Some(allocation_id.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
