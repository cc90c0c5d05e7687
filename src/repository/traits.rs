// ==========================================
// 作物种植排产系统 - 网关 Trait
// ==========================================
// 职责: 定义优化器消费的外部数据接口（不包含实现）
// 红线: 网关不含业务规则,只做数据读取/保存
// 实现者: memory.rs（测试/嵌入）, json_file.rs / weather_csv.rs / optimization_result_repo.rs（生产）
// ==========================================

use crate::domain::crop::CropRequirement;
use crate::domain::field::Field;
use crate::domain::interaction::InteractionRule;
use crate::domain::schedule::OptimizationSchedule;
use crate::domain::weather::WeatherSeries;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::NaiveDate;

// ==========================================
// FieldGateway - 地块数据
// ==========================================
#[async_trait]
pub trait FieldGateway: Send + Sync {
    /// 按ID批量查询地块
    ///
    /// # 返回
    /// - 按传入顺序返回; 任一ID不存在返回 NotFound
    async fn get_fields(&self, field_ids: &[String]) -> RepositoryResult<Vec<Field>>;

    /// 查询全部地块
    async fn get_all_fields(&self) -> RepositoryResult<Vec<Field>>;
}

// ==========================================
// CropRequirementGateway - 作物生育需求
// ==========================================
#[async_trait]
pub trait CropRequirementGateway: Send + Sync {
    /// 按作物ID批量查询; 任一ID不存在返回 NotFound
    async fn get_requirements(&self, crop_ids: &[String]) -> RepositoryResult<Vec<CropRequirement>>;

    async fn get_all_requirements(&self) -> RepositoryResult<Vec<CropRequirement>>;
}

// ==========================================
// WeatherGateway - 日气象
// ==========================================
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    /// 查询某位置 [start, end] 的日气象
    ///
    /// 缺测不报错,由生育期评估在用到时判定数据不足
    async fn get_weather(&self, location_key: &str, start: NaiveDate, end: NaiveDate)
        -> RepositoryResult<WeatherSeries>;
}

// ==========================================
// InteractionRuleGateway - 交互规则（优化开始时加载一次）
// ==========================================
#[async_trait]
pub trait InteractionRuleGateway: Send + Sync {
    async fn get_rules(&self) -> RepositoryResult<Vec<InteractionRule>>;
}

// ==========================================
// OptimizationResultGateway - 排产方案存储（按 schedule_id）
// ==========================================
#[async_trait]
pub trait OptimizationResultGateway: Send + Sync {
    /// 保存方案（同ID覆盖）
    async fn save(&self, schedule: &OptimizationSchedule) -> RepositoryResult<()>;

    /// 查询方案; 不存在返回 None
    async fn get(&self, schedule_id: &str) -> RepositoryResult<Option<OptimizationSchedule>>;

    /// 查询全部方案（按创建时间升序）
    async fn get_all(&self) -> RepositoryResult<Vec<OptimizationSchedule>>;

    /// 删除方案,返回是否存在
    async fn delete(&self, schedule_id: &str) -> RepositoryResult<bool>;

    /// 清空,返回删除条数
    async fn clear(&self) -> RepositoryResult<usize>;
}
