// ==========================================
// 作物种植排产系统 - 领域层错误类型
// ==========================================
// 职责: 构造期不变量校验失败（值对象/排产方案）
// 说明: 出现 OverlappingResults / NegativeTotalCost 意味着调度或搜索存在缺陷
// ==========================================

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("面积必须为正数: {entity}={value}")]
    NonPositiveArea { entity: String, value: f64 },

    #[error("面积超出地块容量: field_id={field_id}, area_used={area_used}, field_area={field_area}")]
    AreaExceedsField {
        field_id: String,
        area_used: f64,
        field_area: f64,
    },

    #[error("日期区间无效: start={start}, end={end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("方案内结果时间重叠: field_id={field_id}, first={first}, second={second}")]
    OverlappingResults {
        field_id: String,
        first: String,
        second: String,
    },

    #[error("总成本不能为负: total_cost={0}")]
    NegativeTotalCost(f64),

    #[error("影响系数超出范围: {context}={value}")]
    ImpactRatioOutOfRange { context: String, value: f64 },

    #[error("气象数据日期重复: {0}")]
    DuplicateWeatherDate(NaiveDate),

    #[error("作物生育阶段为空: crop_id={0}")]
    EmptyStages(String),

    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },
}

/// Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
