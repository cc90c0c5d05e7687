// ==========================================
// 作物种植排产系统 - 引擎层错误类型
// ==========================================
// 分类:
// - EvaluationError: 单个候选评估失败（非致命,候选直接丢弃）
// - OptimizationError: optimize/adjust 顶层错误（输入校验/存储/任务失败）
// 说明: 约束违规不是错误,以 Violation 数据表达
// ==========================================

use crate::config::ConfigError;
use crate::domain::error::DomainError;
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// 生育期评估错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("气象数据不足: crop_id={crop_id}, start={start_date}, 缺失日期={missing_date}, 已积温={accumulated_gdd:.1}")]
    InsufficientWeatherData {
        crop_id: String,
        start_date: NaiveDate,
        missing_date: NaiveDate,
        accumulated_gdd: f64,
    },

    #[error("超出计划期: crop_id={crop_id}, start={start_date}, horizon_end={horizon_end}")]
    ExceedsHorizon {
        crop_id: String,
        start_date: NaiveDate,
        horizon_end: NaiveDate,
    },

    #[error("作物无生育阶段: crop_id={0}")]
    NoStages(String),
}

/// 优化顶层错误
#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {entity}(id={id})")]
    NotFound { entity: String, id: String },

    #[error("领域校验失败: {0}")]
    Domain(#[from] DomainError),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("仓储错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("后台任务失败: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for OptimizationError {
    fn from(err: tokio::task::JoinError) -> Self {
        OptimizationError::TaskJoin(err.to_string())
    }
}

/// Result 类型别名
pub type OptimizationResult<T> = Result<T, OptimizationError>;
