// ==========================================
// 作物种植排产系统 - 命令行入口
// ==========================================
// 用法: crop-planning-aps <manifest.json>
// 清单: 数据文件路径 + 计划期 + 优化目标 + 配置档案
// 输出: 方案保存到 SQLite,并以 JSON 打印到标准输出
// ==========================================

use anyhow::{bail, Context, Result};
use crop_planning_aps::config::{ConfigManager, OptimizationConfigReader, DEFAULT_PROFILE};
use crop_planning_aps::domain::schedule::PlanningPeriod;
use crop_planning_aps::domain::types::OptimizationObjective;
use crop_planning_aps::engine::{AllocationOrchestrator, OptimizerGateways};
use crop_planning_aps::repository::{
    CropRequirementGateway, CsvWeatherGateway, FieldGateway, InMemoryInteractionRuleGateway, InteractionRuleGateway,
    JsonFileCropRequirementGateway, JsonFileFieldGateway, JsonFileInteractionRuleGateway,
    SqliteOptimizationResultRepository,
};
use crop_planning_aps::{db, logging, OptimizationConfig};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 运行清单
#[derive(Debug, Deserialize)]
struct RunManifest {
    fields_path: PathBuf,
    crops_path: PathBuf,
    weather_dir: PathBuf,
    #[serde(default)]
    rules_path: Option<PathBuf>,
    #[serde(default)]
    field_ids: Option<Vec<String>>, // 缺省: 全部地块
    #[serde(default)]
    crop_ids: Option<Vec<String>>, // 缺省: 全部作物
    period_start: NaiveDate,
    period_end: NaiveDate,
    #[serde(default = "default_objective")]
    objective: OptimizationObjective,
    #[serde(default)]
    config_path: Option<PathBuf>, // 优先于档案
    #[serde(default)]
    config_profile: Option<String>,
    #[serde(default)]
    db_path: Option<String>,
}

fn default_objective() -> OptimizationObjective {
    OptimizationObjective::MaximizeProfit
}

/// 清单内相对路径以清单所在目录为基准
fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let manifest_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => bail!("用法: crop-planning-aps <manifest.json>"),
    };
    let raw = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("无法读取运行清单: {}", manifest_path.display()))?;
    let manifest: RunManifest = serde_json::from_str(&raw).context("运行清单格式错误")?;
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    tracing::info!("==================================================");
    tracing::info!("{} v{}", crop_planning_aps::APP_NAME, crop_planning_aps::VERSION);
    tracing::info!("==================================================");

    let db_path = manifest.db_path.clone().unwrap_or_else(db::default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let config: OptimizationConfig = match &manifest.config_path {
        Some(path) => OptimizationConfig::from_json_file(resolve(base, path))?,
        None => {
            let manager = ConfigManager::new(&db_path)?;
            let profile = manifest.config_profile.as_deref().unwrap_or(DEFAULT_PROFILE);
            manager.load_optimization_config(profile).await?
        }
    };

    let fields = Arc::new(JsonFileFieldGateway::new(resolve(base, &manifest.fields_path)));
    let crops = Arc::new(JsonFileCropRequirementGateway::new(resolve(base, &manifest.crops_path)));
    let rules: Arc<dyn InteractionRuleGateway> = match &manifest.rules_path {
        Some(path) => Arc::new(JsonFileInteractionRuleGateway::new(resolve(base, path))),
        None => Arc::new(InMemoryInteractionRuleGateway::default()),
    };
    let gateways = OptimizerGateways::new(
        fields.clone(),
        crops.clone(),
        Arc::new(CsvWeatherGateway::new(resolve(base, &manifest.weather_dir))),
        rules,
        Arc::new(SqliteOptimizationResultRepository::new(&db_path)?),
    );

    let field_ids = match manifest.field_ids {
        Some(ids) => ids,
        None => fields.get_all_fields().await?.into_iter().map(|f| f.field_id).collect(),
    };
    let crop_ids = match manifest.crop_ids {
        Some(ids) => ids,
        None => crops
            .get_all_requirements()
            .await?
            .into_iter()
            .map(|r| r.crop.crop_id)
            .collect(),
    };
    let period = PlanningPeriod::new(manifest.period_start, manifest.period_end)?;

    let orchestrator = AllocationOrchestrator::new(gateways);
    let schedule = orchestrator
        .optimize_crops(&field_ids, &crop_ids, period, manifest.objective, &config)
        .await?;

    println!("{}", serde_json::to_string_pretty(&schedule)?);
    Ok(())
}
