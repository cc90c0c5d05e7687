// ==========================================
// 作物种植排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象、闭合枚举
// 红线: 不含数据访问逻辑,不含引擎逻辑
// 红线: 不变量在构造期校验,不在使用处临时复查
// ==========================================

pub mod adjustment;
pub mod allocation;
pub mod crop;
pub mod error;
pub mod field;
pub mod interaction;
pub mod schedule;
pub mod types;
pub mod violation;
pub mod weather;

// 重导出核心类型
pub use adjustment::{AdjustmentResult, ExcludedSlot, MoveAction, MoveInstruction, RejectedMove};
pub use allocation::{CropAllocation, Economics, GrowthOutcome, StageCrossing, StressSummary};
pub use crop::{Crop, CropRequirement, StageRequirement, SunshineProfile, TemperatureProfile};
pub use error::{DomainError, DomainResult};
pub use field::Field;
pub use interaction::InteractionRule;
pub use schedule::{OptimizationIntermediateResult, OptimizationSchedule, PlanningPeriod};
pub use types::{
    CostModel, InteractionRuleType, NeighborOperation, OptimizationObjective, RuleContext,
    SearchStrategy, Severity, StressKind, ViolationType,
};
pub use violation::Violation;
pub use weather::{WeatherRecord, WeatherSeries};
