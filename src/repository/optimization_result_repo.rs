// ==========================================
// 作物种植排产系统 - 排产方案仓储（SQLite）
// ==========================================
// 表: optimization_schedule（schedule_id 主键,方案整体以 JSON 存于 payload_json）
// 红线: 加载后重新执行方案校验,损坏数据不进入引擎
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::schedule::OptimizationSchedule;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::OptimizationResultGateway;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct SqliteOptimizationResultRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteOptimizationResultRepository {
    /// 打开（或创建）数据库文件
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn decode(schedule_id: &str, payload: &str) -> RepositoryResult<OptimizationSchedule> {
        let schedule: OptimizationSchedule = serde_json::from_str(payload)?;
        schedule.validate().map_err(|e| {
            RepositoryError::ValidationError(format!("schedule[{}] 校验失败: {}", schedule_id, e))
        })?;
        Ok(schedule)
    }
}

#[async_trait]
impl OptimizationResultGateway for SqliteOptimizationResultRepository {
    async fn save(&self, schedule: &OptimizationSchedule) -> RepositoryResult<()> {
        let payload = serde_json::to_string(schedule)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO optimization_schedule (
                schedule_id, name, objective, total_cost, payload_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                schedule.schedule_id,
                schedule.name,
                schedule.objective.to_string(),
                schedule.total_cost,
                payload,
                schedule.created_at.to_rfc3339(),
            ],
        )?;
        debug!(schedule_id = %schedule.schedule_id, results = schedule.results.len(), "排产方案已保存");
        Ok(())
    }

    async fn get(&self, schedule_id: &str) -> RepositoryResult<Option<OptimizationSchedule>> {
        let conn = self.get_conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload_json FROM optimization_schedule WHERE schedule_id = ?1",
                params![schedule_id],
                |row| row.get(0),
            )
            .optional()?;
        payload.map(|p| Self::decode(schedule_id, &p)).transpose()
    }

    async fn get_all(&self) -> RepositoryResult<Vec<OptimizationSchedule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT schedule_id, payload_json FROM optimization_schedule ORDER BY created_at ASC, schedule_id ASC",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut schedules = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            schedules.push(Self::decode(&id, &payload)?);
        }
        Ok(schedules)
    }

    async fn delete(&self, schedule_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM optimization_schedule WHERE schedule_id = ?1",
            params![schedule_id],
        )?;
        Ok(affected > 0)
    }

    async fn clear(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM optimization_schedule", [])?;
        Ok(affected)
    }
}
