// ==========================================
// 作物种植排产系统 - 引擎层网关聚合
// ==========================================
// 职责: 聚合编排器所需的全部外部网关
// 目标: 编排器构造只接收一个参数,测试时整体替换为内存实现
// ==========================================

use crate::repository::{
    CropRequirementGateway, FieldGateway, InMemoryCropRequirementGateway, InMemoryFieldGateway,
    InMemoryInteractionRuleGateway, InMemoryOptimizationResultGateway, InMemoryWeatherGateway,
    InteractionRuleGateway, OptimizationResultGateway, WeatherGateway,
};
use std::sync::Arc;

/// 优化器网关集合
///
/// # 包含的网关
/// - `fields`: 地块数据
/// - `crops`: 作物生育需求
/// - `weather`: 日气象
/// - `rules`: 交互规则
/// - `results`: 排产方案存储
#[derive(Clone)]
pub struct OptimizerGateways {
    pub fields: Arc<dyn FieldGateway>,
    pub crops: Arc<dyn CropRequirementGateway>,
    pub weather: Arc<dyn WeatherGateway>,
    pub rules: Arc<dyn InteractionRuleGateway>,
    pub results: Arc<dyn OptimizationResultGateway>,
}

impl OptimizerGateways {
    pub fn new(
        fields: Arc<dyn FieldGateway>,
        crops: Arc<dyn CropRequirementGateway>,
        weather: Arc<dyn WeatherGateway>,
        rules: Arc<dyn InteractionRuleGateway>,
        results: Arc<dyn OptimizationResultGateway>,
    ) -> Self {
        Self {
            fields,
            crops,
            weather,
            rules,
            results,
        }
    }

    /// 全内存网关（测试/嵌入）
    pub fn in_memory(
        fields: InMemoryFieldGateway,
        crops: InMemoryCropRequirementGateway,
        weather: InMemoryWeatherGateway,
        rules: InMemoryInteractionRuleGateway,
    ) -> Self {
        Self {
            fields: Arc::new(fields),
            crops: Arc::new(crops),
            weather: Arc::new(weather),
            rules: Arc::new(rules),
            results: Arc::new(InMemoryOptimizationResultGateway::new()),
        }
    }

    pub fn with_results(mut self, results: Arc<dyn OptimizationResultGateway>) -> Self {
        self.results = results;
        self
    }
}
