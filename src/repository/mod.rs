// ==========================================
// 作物种植排产系统 - 数据网关层
// ==========================================
// 红线: 网关不含业务逻辑
// 职责: 提供地块/作物/气象/交互规则的只读接口与排产方案存储
// 约束: 所有 SQL 使用参数化查询
// ==========================================

pub mod error;
pub mod json_file;
pub mod memory;
pub mod optimization_result_repo;
pub mod traits;
pub mod weather_csv;

pub use error::{RepositoryError, RepositoryResult};
pub use json_file::{JsonFileCropRequirementGateway, JsonFileFieldGateway, JsonFileInteractionRuleGateway};
pub use memory::{
    InMemoryCropRequirementGateway, InMemoryFieldGateway, InMemoryInteractionRuleGateway,
    InMemoryOptimizationResultGateway, InMemoryWeatherGateway,
};
pub use optimization_result_repo::SqliteOptimizationResultRepository;
pub use traits::{
    CropRequirementGateway, FieldGateway, InteractionRuleGateway, OptimizationResultGateway, WeatherGateway,
};
pub use weather_csv::CsvWeatherGateway;
