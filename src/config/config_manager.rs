// ==========================================
// 作物种植排产系统 - 配置管理器
// ==========================================
// 职责: 优化配置档案的加载、保存、枚举
// 存储: config_kv 表 (scope_id + key → JSON value)
// 键格式: optimization_config/{profile}
// ==========================================

use crate::config::optimization_config::{ConfigError, OptimizationConfig};
use crate::config::optimization_config_reader::OptimizationConfigReader;
use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const GLOBAL_SCOPE: &str = "global";
const PROFILE_PREFIX: &str = "optimization_config/";

/// 默认档案名
pub const DEFAULT_PROFILE: &str = "default";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;
            configure_sqlite_connection(&guard)?;
            ensure_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> Result<MutexGuard<'_, Connection>, ConfigError> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))
    }

    fn profile_key(profile: &str) -> String {
        format!("{}{}", PROFILE_PREFIX, profile.trim())
    }

    /// 读取配置档案
    ///
    /// # 返回
    /// - 档案存在: 反序列化并校验
    /// - 档案不存在: OptimizationConfig::default()
    pub fn get_optimization_config(&self, profile: &str) -> Result<OptimizationConfig, ConfigError> {
        let key = Self::profile_key(profile);
        let raw: Option<String> = {
            let conn = self.get_conn()?;
            conn.query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get(0),
            )
            .optional()?
        };

        let config = match raw {
            Some(json) => {
                debug!(profile = %profile, "加载优化配置档案");
                serde_json::from_str::<OptimizationConfig>(&json)?
            }
            None => {
                debug!(profile = %profile, "配置档案不存在，使用默认配置");
                OptimizationConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// 保存配置档案（先校验,UPSERT）
    pub fn save_optimization_config(
        &self,
        profile: &str,
        config: &OptimizationConfig,
    ) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string(config)?;
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, Self::profile_key(profile), json],
        )?;
        info!(profile = %profile, "优化配置档案已保存");
        Ok(())
    }

    /// 列出所有档案名
    pub fn list_profiles(&self) -> Result<Vec<String>, ConfigError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT key FROM config_kv WHERE scope_id = ?1 AND key LIKE ?2 ORDER BY key",
        )?;
        let pattern = format!("{}%", PROFILE_PREFIX);
        let rows = stmt.query_map(params![GLOBAL_SCOPE, pattern], |row| row.get::<_, String>(0))?;

        let mut profiles = Vec::new();
        for row in rows {
            let key = row?;
            profiles.push(key.trim_start_matches(PROFILE_PREFIX).to_string());
        }
        Ok(profiles)
    }

    /// 删除档案
    ///
    /// # 返回
    /// - true: 删除成功; false: 档案不存在
    pub fn delete_profile(&self, profile: &str) -> Result<bool, ConfigError> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, Self::profile_key(profile)],
        )?;
        Ok(affected > 0)
    }
}

#[async_trait]
impl OptimizationConfigReader for ConfigManager {
    async fn load_optimization_config(&self, profile: &str) -> Result<OptimizationConfig, ConfigError> {
        self.get_optimization_config(profile)
    }
}
