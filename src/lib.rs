// ==========================================
// 作物种植排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 决策支持系统（排产方案供人工确认与调整）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据网关层 - 外部数据与方案存储
pub mod repository;

// 引擎层 - 优化算法
pub mod engine;

// 配置层 - 优化配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CostModel, InteractionRuleType, NeighborOperation, OptimizationObjective, SearchStrategy,
    Severity, StressKind, ViolationType,
};

// 领域实体
pub use domain::{
    AdjustmentResult, Crop, CropAllocation, CropRequirement, Field, InteractionRule,
    MoveInstruction, OptimizationIntermediateResult, OptimizationSchedule, PlanningPeriod,
    Violation, WeatherSeries,
};

// 配置
pub use config::{ConfigManager, OptimizationConfig};

// 引擎
pub use engine::{
    AllocationOrchestrator, CandidateGenerator, FeasibilityChecker, GrowthPeriodEvaluator,
    IntervalScheduler, OptimizationError, OptimizerGateways,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "作物种植排产系统";
