// ==========================================
// 作物种植排产系统 - 优化配置读取 Trait
// ==========================================
// 职责: 定义编排器所需的配置读取接口（不包含实现）
// 实现者: ConfigManager（从 config_kv 表读取）
// ==========================================

use crate::config::optimization_config::{ConfigError, OptimizationConfig};
use async_trait::async_trait;

#[async_trait]
pub trait OptimizationConfigReader: Send + Sync {
    /// 按档案名加载优化配置
    ///
    /// # 返回
    /// - 已校验的配置; 档案不存在时返回默认配置
    async fn load_optimization_config(&self, profile: &str) -> Result<OptimizationConfig, ConfigError>;
}
