// ==========================================
// 作物种植排产系统 - 优化编排器
// ==========================================
// 状态机: Init → Seed → Search → Finalize
// - Init: 输入校验,加载地块/交互规则,并发拉取各位置气象
// - Seed: 候选生成（后台线程 + rayon）,逐地块区间调度,剔除错误级分配
// - Search: 局部搜索或 ALNS（后台线程）
// - Finalize: 构建方案并保存
// 红线: 引擎内部无全局可变状态,网关与配置显式传入
// ==========================================

use crate::config::{OptimizationConfig, OptimizationConfigReader, DEFAULT_PROFILE};
use crate::domain::adjustment::{AdjustmentResult, ExcludedSlot, MoveAction, MoveInstruction, RejectedMove};
use crate::domain::allocation::CropAllocation;
use crate::domain::crop::CropRequirement;
use crate::domain::field::Field;
use crate::domain::interaction::InteractionRule;
use crate::domain::schedule::{OptimizationSchedule, PlanningPeriod};
use crate::domain::types::{CostModel, OptimizationObjective, SearchStrategy};
use crate::domain::weather::WeatherSeries;
use crate::engine::alns::AlnsEngine;
use crate::engine::candidate::{CandidateGenerator, CandidateJob, CandidatePool};
use crate::engine::error::{OptimizationError, OptimizationResult};
use crate::engine::feasibility::FeasibilityChecker;
use crate::engine::gateways::OptimizerGateways;
use crate::engine::interval_scheduler::IntervalScheduler;
use crate::engine::local_search::{LocalSearchOptimizer, SearchOutcome};
use crate::engine::result_builder::OptimizationResultBuilder;
use crate::repository::RepositoryError;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// 编排阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationPhase {
    Init,
    Seed,
    Search,
    Finalize,
}

impl fmt::Display for OptimizationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationPhase::Init => write!(f, "init"),
            OptimizationPhase::Seed => write!(f, "seed"),
            OptimizationPhase::Search => write!(f, "search"),
            OptimizationPhase::Finalize => write!(f, "finalize"),
        }
    }
}

/// Init 阶段产物
struct PreparedInput {
    rules: Arc<Vec<InteractionRule>>,
    pool: Arc<CandidatePool>,
}

// ==========================================
// AllocationOrchestrator - 优化编排器
// ==========================================
pub struct AllocationOrchestrator {
    gateways: OptimizerGateways,
    config_reader: Option<Arc<dyn OptimizationConfigReader>>,
}

impl AllocationOrchestrator {
    pub fn new(gateways: OptimizerGateways) -> Self {
        Self {
            gateways,
            config_reader: None,
        }
    }

    pub fn with_config_reader(mut self, reader: Arc<dyn OptimizationConfigReader>) -> Self {
        self.config_reader = Some(reader);
        self
    }

    pub fn gateways(&self) -> &OptimizerGateways {
        &self.gateways
    }

    /// 加载配置档案（未注入读取器时使用默认配置）
    pub async fn load_config(&self, profile: Option<&str>) -> OptimizationResult<OptimizationConfig> {
        match &self.config_reader {
            Some(reader) => Ok(reader
                .load_optimization_config(profile.unwrap_or(DEFAULT_PROFILE))
                .await?),
            None => Ok(OptimizationConfig::default()),
        }
    }

    /// 按作物ID优化（生育需求从网关加载）
    pub async fn optimize_crops(
        &self,
        field_ids: &[String],
        crop_ids: &[String],
        planning_period: PlanningPeriod,
        objective: OptimizationObjective,
        config: &OptimizationConfig,
    ) -> OptimizationResult<OptimizationSchedule> {
        if crop_ids.is_empty() {
            return Err(OptimizationError::InvalidInput("作物列表为空".to_string()));
        }
        let requirements = self.gateways.crops.get_requirements(crop_ids).await.map_err(lift)?;
        self.optimize(field_ids, requirements, planning_period, objective, config)
            .await
    }

    /// 完整优化
    ///
    /// # 返回
    /// - 新 schedule_id 的方案（已保存）; 搜索超时不是错误,返回当前最优可行解
    #[instrument(skip_all, fields(fields = field_ids.len(), crops = crop_requirements.len(), objective = %objective))]
    pub async fn optimize(
        &self,
        field_ids: &[String],
        crop_requirements: Vec<CropRequirement>,
        planning_period: PlanningPeriod,
        objective: OptimizationObjective,
        config: &OptimizationConfig,
    ) -> OptimizationResult<OptimizationSchedule> {
        let started = Instant::now();

        // ==========================================
        // Init
        // ==========================================
        info!(phase = %OptimizationPhase::Init, period_start = %planning_period.start, period_end = %planning_period.end, "优化开始");
        config.validate()?;
        if field_ids.is_empty() {
            return Err(OptimizationError::InvalidInput("地块列表为空".to_string()));
        }
        if crop_requirements.is_empty() {
            return Err(OptimizationError::InvalidInput("作物列表为空".to_string()));
        }
        let unique: HashSet<&String> = field_ids.iter().collect();
        if unique.len() != field_ids.len() {
            return Err(OptimizationError::InvalidInput("地块ID重复".to_string()));
        }
        for requirement in &crop_requirements {
            requirement.validate()?;
        }

        let fields: Vec<Arc<Field>> = self
            .gateways
            .fields
            .get_fields(field_ids)
            .await
            .map_err(lift)?
            .into_iter()
            .map(Arc::new)
            .collect();
        let requirements: Vec<Arc<CropRequirement>> = crop_requirements.into_iter().map(Arc::new).collect();
        let prepared = self
            .prepare(&fields, &requirements, planning_period, objective, config)
            .await?;

        // ==========================================
        // Seed
        // ==========================================
        info!(phase = %OptimizationPhase::Seed, candidates = prepared.pool.total_candidates(), "构造初始解");
        let checker = FeasibilityChecker::new(prepared.rules.clone(), config.stress_severity.clone(), objective);
        let seed = seed_solution(&prepared.pool, &fields, objective);
        let seed = drop_error_allocations(&checker, seed, &HashSet::new());
        let checker = require_seeded_fields(checker, &seed, objective);

        // ==========================================
        // Search
        // ==========================================
        let outcome = self
            .search(checker, prepared.pool.clone(), seed, config, HashSet::new(), Vec::new())
            .await?;

        // ==========================================
        // Finalize
        // ==========================================
        let name = format!("{}_{}_{}", objective, planning_period.start, planning_period.end);
        let schedule = self
            .finalize(&name, objective, planning_period, &prepared.pool, &outcome)
            .await?;
        info!(
            schedule_id = %schedule.schedule_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "优化完成"
        );
        Ok(schedule)
    }

    /// 人工调整工作流
    ///
    /// # 流程
    /// 1. 加载原方案,按顺序应用移动指令; 不可行的移动带原因拒绝
    /// 2. 成功移动的分配被固定,其余部分重新优化
    /// 3. 结果保存为新方案（原方案保留）
    #[instrument(skip_all, fields(schedule_id = %schedule_id, moves = moves.len()))]
    pub async fn adjust(
        &self,
        schedule_id: &str,
        moves: Vec<MoveInstruction>,
        config: &OptimizationConfig,
    ) -> OptimizationResult<AdjustmentResult> {
        info!(phase = %OptimizationPhase::Init, "调整开始");
        config.validate()?;
        let existing = self
            .gateways
            .results
            .get(schedule_id)
            .await?
            .ok_or_else(|| OptimizationError::NotFound {
                entity: "OptimizationSchedule".to_string(),
                id: schedule_id.to_string(),
            })?;
        let objective = existing.objective;
        let period = match existing.planning_period {
            Some(period) => period,
            None => derive_period(&existing)?,
        };

        // 地块: 原方案地块 + 移动目标中网关已知的地块
        let mut fields_by_id: HashMap<String, Arc<Field>> = HashMap::new();
        for result in &existing.results {
            fields_by_id
                .entry(result.field_id().to_string())
                .or_insert_with(|| result.allocation.field.clone());
        }
        let targets: HashSet<&str> = moves
            .iter()
            .filter_map(|m| match &m.action {
                MoveAction::Move { to_field_id, .. } => Some(to_field_id.as_str()),
                MoveAction::Remove => None,
            })
            .collect();
        for field in self.gateways.fields.get_all_fields().await? {
            if fields_by_id.contains_key(&field.field_id) || targets.contains(field.field_id.as_str()) {
                fields_by_id.insert(field.field_id.clone(), Arc::new(field));
            }
        }
        let mut fields: Vec<Arc<Field>> = fields_by_id.values().cloned().collect();
        fields.sort_by(|a, b| a.field_id.cmp(&b.field_id));

        let mut crop_ids: Vec<String> = existing.results.iter().map(|r| r.crop_id().to_string()).collect();
        crop_ids.sort();
        crop_ids.dedup();
        let requirements: Vec<Arc<CropRequirement>> = self
            .gateways
            .crops
            .get_requirements(&crop_ids)
            .await
            .map_err(lift)?
            .into_iter()
            .map(Arc::new)
            .collect();
        let prepared = self.prepare(&fields, &requirements, period, objective, config).await?;

        // ==========================================
        // Seed: 应用移动
        // ==========================================
        info!(phase = %OptimizationPhase::Seed, "应用移动指令");
        let checker = FeasibilityChecker::new(prepared.rules.clone(), config.stress_severity.clone(), objective);
        let mut solution = existing.allocations();
        let mut pinned: HashSet<String> = HashSet::new();
        let mut exclusions: Vec<ExcludedSlot> = Vec::new();
        let mut applied_moves = Vec::new();
        let mut rejected_moves = Vec::new();

        for instruction in moves {
            let applied = apply_move(
                &instruction,
                &mut solution,
                &MoveContext {
                    fields: &fields_by_id,
                    pool: &prepared.pool,
                    checker: &checker,
                    pinned: &pinned,
                    cost_model: config.cost_model,
                    period,
                },
            );
            match applied {
                Ok(outcome) => {
                    match outcome {
                        MoveOutcome::Moved(id) => {
                            pinned.insert(id);
                        }
                        MoveOutcome::Removed(slot) => exclusions.push(slot),
                    }
                    applied_moves.push(instruction);
                }
                Err(reason) => {
                    debug!(allocation_id = %instruction.allocation_id, reason = %reason, "移动被拒绝");
                    rejected_moves.push(RejectedMove { instruction, reason });
                }
            }
        }

        let seed = drop_error_allocations(&checker, solution, &pinned);
        let checker = require_seeded_fields(checker, &seed, objective);

        let outcome = self
            .search(checker, prepared.pool.clone(), seed, config, pinned, exclusions)
            .await?;
        let schedule = self
            .finalize(&existing.name, objective, period, &prepared.pool, &outcome)
            .await?;

        info!(
            schedule_id = %schedule.schedule_id,
            applied = applied_moves.len(),
            rejected = rejected_moves.len(),
            "调整完成"
        );
        Ok(AdjustmentResult {
            schedule,
            applied_moves,
            rejected_moves,
        })
    }

    // ==========================================
    // 内部阶段
    // ==========================================

    /// 加载交互规则、拉取气象并生成候选池
    async fn prepare(
        &self,
        fields: &[Arc<Field>],
        requirements: &[Arc<CropRequirement>],
        period: PlanningPeriod,
        objective: OptimizationObjective,
        config: &OptimizationConfig,
    ) -> OptimizationResult<PreparedInput> {
        let rules = Arc::new(self.gateways.rules.get_rules().await?);
        let weather = self.fetch_weather(fields, period).await?;
        debug!(rules = rules.len(), locations = weather.len(), "外部数据加载完成");

        let jobs: Vec<CandidateJob> = fields
            .iter()
            .flat_map(|field| {
                let series = weather.get(field.weather_key()).cloned().unwrap_or_default();
                requirements.iter().map(move |requirement| CandidateJob {
                    field: field.clone(),
                    requirement: requirement.clone(),
                    weather: series.clone(),
                })
            })
            .collect();

        let generator = CandidateGenerator::new(config, objective, period);
        let batches = tokio::task::spawn_blocking(move || generator.generate_all(&jobs)).await?;
        Ok(PreparedInput {
            rules,
            pool: Arc::new(CandidatePool::from_batches(batches)),
        })
    }

    /// 按位置去重后并发拉取气象; 位置无数据时以空序列代替（其候选全部因气象不足丢弃）
    async fn fetch_weather(
        &self,
        fields: &[Arc<Field>],
        period: PlanningPeriod,
    ) -> OptimizationResult<HashMap<String, Arc<WeatherSeries>>> {
        let mut keys: Vec<String> = fields.iter().map(|f| f.weather_key().to_string()).collect();
        keys.sort();
        keys.dedup();

        let gateway = &self.gateways.weather;
        let results = join_all(keys.iter().map(|key| gateway.get_weather(key, period.start, period.end))).await;

        let mut series_by_key = HashMap::with_capacity(keys.len());
        for (key, result) in keys.into_iter().zip(results) {
            let series = match result {
                Ok(series) => series,
                Err(RepositoryError::NotFound { .. }) => {
                    warn!(location = %key, "无气象数据,该位置候选将全部丢弃");
                    WeatherSeries::default()
                }
                Err(err) => return Err(err.into()),
            };
            series_by_key.insert(key, Arc::new(series));
        }
        Ok(series_by_key)
    }

    async fn search(
        &self,
        checker: FeasibilityChecker,
        pool: Arc<CandidatePool>,
        seed: Vec<Arc<CropAllocation>>,
        config: &OptimizationConfig,
        pinned: HashSet<String>,
        exclusions: Vec<ExcludedSlot>,
    ) -> OptimizationResult<SearchOutcome> {
        info!(
            phase = %OptimizationPhase::Search,
            strategy = %config.search_strategy,
            seed_allocations = seed.len(),
            pinned = pinned.len(),
            excluded_slots = exclusions.len(),
            "搜索开始"
        );
        let config = config.clone();
        let outcome = tokio::task::spawn_blocking(move || match config.search_strategy {
            SearchStrategy::LocalSearch => LocalSearchOptimizer::new(&checker, &pool, &config, &pinned)
                .with_exclusions(&exclusions)
                .run(seed),
            SearchStrategy::Alns => AlnsEngine::new(&checker, &pool, &config, &pinned)
                .with_exclusions(&exclusions)
                .run(seed),
        })
        .await?;
        Ok(outcome)
    }

    async fn finalize(
        &self,
        name: &str,
        objective: OptimizationObjective,
        period: PlanningPeriod,
        pool: &CandidatePool,
        outcome: &SearchOutcome,
    ) -> OptimizationResult<OptimizationSchedule> {
        info!(
            phase = %OptimizationPhase::Finalize,
            iterations = outcome.iterations,
            improvements = outcome.improvements,
            stop_reason = %outcome.stop_reason,
            "构建最终方案"
        );
        if !outcome.evaluation.is_feasible() {
            warn!(
                errors = outcome.evaluation.error_count(),
                missing_fields = ?outcome.evaluation.missing_fields,
                "最终方案仍含错误级违规"
            );
        }
        let schedule = OptimizationResultBuilder::new(name, objective)
            .with_planning_period(period)
            .with_pool(pool)
            .build(&outcome.solution, &outcome.evaluation)?;
        self.gateways.results.save(&schedule).await?;
        Ok(schedule)
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 网关 NotFound 提升为顶层 NotFound
fn lift(err: RepositoryError) -> OptimizationError {
    match err {
        RepositoryError::NotFound { entity, id } => OptimizationError::NotFound { entity, id },
        other => OptimizationError::Repository(other),
    }
}

/// 逐地块区间调度得到初始解
fn seed_solution(
    pool: &CandidatePool,
    fields: &[Arc<Field>],
    objective: OptimizationObjective,
) -> Vec<Arc<CropAllocation>> {
    let scheduler = IntervalScheduler::new(objective);
    let mut seed = Vec::new();
    for field in fields {
        let candidates = pool.field_candidates(&field.field_id);
        let selection = scheduler.schedule(field, &candidates);
        debug!(
            field_id = %field.field_id,
            candidates = candidates.len(),
            selected = selection.selected.len(),
            total_cost = selection.total_cost,
            "地块区间调度完成"
        );
        seed.extend(selection.selected.into_iter().map(|r| r.allocation));
    }
    seed
}

/// 反复剔除错误级违规涉及的非固定分配,直到没有可剔除者
fn drop_error_allocations(
    checker: &FeasibilityChecker,
    mut solution: Vec<Arc<CropAllocation>>,
    pinned: &HashSet<String>,
) -> Vec<Arc<CropAllocation>> {
    loop {
        let evaluation = checker.evaluate(&solution);
        let offending: HashSet<String> = evaluation
            .error_allocation_ids()
            .into_iter()
            .filter(|id| !pinned.contains(id))
            .collect();
        if offending.is_empty() {
            return solution;
        }
        debug!(dropped = offending.len(), "剔除错误级分配");
        solution.retain(|a| !offending.contains(&a.allocation_id));
    }
}

/// 最小成本目标: 初始解覆盖的地块不允许被搜索清空
fn require_seeded_fields(
    checker: FeasibilityChecker,
    seed: &[Arc<CropAllocation>],
    objective: OptimizationObjective,
) -> FeasibilityChecker {
    match objective {
        OptimizationObjective::MinimizeCost => {
            checker.with_required_fields(seed.iter().map(|a| a.field_id().to_string()))
        }
        OptimizationObjective::MaximizeProfit => checker,
    }
}

/// 未记录计划期的旧方案: 由结果时间范围推出
fn derive_period(schedule: &OptimizationSchedule) -> OptimizationResult<PlanningPeriod> {
    let start = schedule.results.iter().map(|r| r.start_date()).min();
    let end = schedule.results.iter().map(|r| r.completion_date()).max();
    match (start, end) {
        (Some(start), Some(end)) => Ok(PlanningPeriod::new(start, end)?),
        _ => Err(OptimizationError::InvalidInput(format!(
            "方案 {} 无结果且未记录计划期",
            schedule.schedule_id
        ))),
    }
}

struct MoveContext<'a> {
    fields: &'a HashMap<String, Arc<Field>>,
    pool: &'a CandidatePool,
    checker: &'a FeasibilityChecker,
    pinned: &'a HashSet<String>,
    cost_model: CostModel,
    period: PlanningPeriod,
}

/// 移动指令的应用结果
#[derive(Debug, Clone, PartialEq)]
enum MoveOutcome {
    Moved(String),         // 新分配ID（需固定）
    Removed(ExcludedSlot), // 被删除的时段（搜索不再回填）
}

/// 应用单条移动指令
///
/// # 返回
/// - Ok(MoveOutcome): 移动或删除成功
/// - Err(reason): 拒绝原因,solution 不变
///
/// 目标地块上与新窗口冲突（含休耕期）的非固定分配被让出; 与固定分配冲突则拒绝
fn apply_move(
    instruction: &MoveInstruction,
    solution: &mut Vec<Arc<CropAllocation>>,
    ctx: &MoveContext<'_>,
) -> Result<MoveOutcome, String> {
    let idx = solution
        .iter()
        .position(|a| a.allocation_id == instruction.allocation_id)
        .ok_or_else(|| format!("分配不存在: {}", instruction.allocation_id))?;

    let (to_field_id, to_start_date, to_area) = match &instruction.action {
        MoveAction::Remove => {
            let removed = solution.remove(idx);
            return Ok(MoveOutcome::Removed(ExcludedSlot::from_allocation(&removed)));
        }
        MoveAction::Move {
            to_field_id,
            to_start_date,
            to_area,
        } => (to_field_id, *to_start_date, *to_area),
    };

    let field = ctx
        .fields
        .get(to_field_id)
        .ok_or_else(|| format!("目标地块不存在: {}", to_field_id))?;
    if !ctx.period.contains(to_start_date) {
        return Err(format!(
            "起始日 {} 不在计划期 {}~{} 内",
            to_start_date, ctx.period.start, ctx.period.end
        ));
    }

    let current = &solution[idx];
    let placement = ctx
        .pool
        .placement(to_field_id, current.crop_id(), to_start_date)
        .ok_or_else(|| {
            format!(
                "作物 {} 在地块 {} 自 {} 起无法在计划期内完成生育",
                current.crop_id(),
                to_field_id,
                to_start_date
            )
        })?;
    let area = to_area.unwrap_or(current.area_used).min(field.area);
    let moved = Arc::new(
        placement
            .allocation
            .with_area(area, ctx.cost_model)
            .map_err(|e| e.to_string())?,
    );

    let fallow = field.fallow_period_days;
    let mut next = Vec::with_capacity(solution.len());
    let mut evicted = 0usize;
    for (i, other) in solution.iter().enumerate() {
        if i == idx {
            continue;
        }
        if other.field_id() == to_field_id.as_str() && other.conflicts_with_fallow(&moved, fallow) {
            if ctx.pinned.contains(&other.allocation_id) {
                return Err(format!(
                    "与已固定分配 {} 时间冲突（含休耕期 {} 天）",
                    other.allocation_id, fallow
                ));
            }
            evicted += 1;
            continue;
        }
        next.push(other.clone());
    }
    let moved_id = moved.allocation_id.clone();
    next.push(moved);

    let evaluation = ctx.checker.evaluate(&next);
    if let Some(violation) = evaluation
        .violations
        .iter()
        .find(|v| v.is_error() && v.allocation_id.as_deref() == Some(moved_id.as_str()))
    {
        return Err(format!("移动后不可行: {}", violation.message));
    }

    debug!(
        allocation_id = %instruction.allocation_id,
        new_allocation_id = %moved_id,
        field_id = %to_field_id,
        evicted,
        "移动已应用"
    );
    *solution = next;
    Ok(MoveOutcome::Moved(moved_id))
}
