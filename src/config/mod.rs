// ==========================================
// 作物种植排产系统 - 配置层
// ==========================================
// 职责: 优化配置定义、校验、档案存储
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod optimization_config;
pub mod optimization_config_reader;

// 重导出核心配置
pub use config_manager::{ConfigManager, DEFAULT_PROFILE};
pub use optimization_config::{
    AlnsParams, ConfigError, OperationWeights, OptimizationConfig, SeverityThreshold,
    StressRetention, StressSeverityPolicy, YieldPenaltyPolicy,
};
pub use optimization_config_reader::OptimizationConfigReader;
