// ==========================================
// Mock 配置读取器 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use crop_planning_aps::config::{ConfigError, OptimizationConfig, OptimizationConfigReader};
use std::collections::HashMap;
use std::sync::Mutex;

/// 内存配置档案,记录被请求过的档案名
#[derive(Debug, Default)]
pub struct MockConfigReader {
    profiles: HashMap<String, OptimizationConfig>,
    requested: Mutex<Vec<String>>,
}

impl MockConfigReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, name: &str, config: OptimizationConfig) -> Self {
        self.profiles.insert(name.to_string(), config);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl OptimizationConfigReader for MockConfigReader {
    async fn load_optimization_config(&self, profile: &str) -> Result<OptimizationConfig, ConfigError> {
        self.requested.lock().unwrap().push(profile.to_string());
        Ok(self.profiles.get(profile).cloned().unwrap_or_default())
    }
}
