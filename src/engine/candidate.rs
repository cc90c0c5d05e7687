// ==========================================
// 作物种植排产系统 - 候选生成引擎
// ==========================================
// 职责: 对每个 (地块, 作物) 组合,按起始日 × 面积档位生成候选分配
// 并行: 组合之间无共享可变状态,rayon par_iter 扇出,结果汇总后再建池
// 红线: 评估失败（气象不足/超出计划期）只丢弃该候选,不影响本次运行
// ==========================================

use crate::config::OptimizationConfig;
use crate::domain::allocation::{windows_conflict, CropAllocation, StageCrossing};
use crate::domain::crop::{Crop, CropRequirement};
use crate::domain::field::Field;
use crate::domain::schedule::{OptimizationIntermediateResult, PlanningPeriod};
use crate::domain::types::{CostModel, OptimizationObjective};
use crate::domain::weather::WeatherSeries;
use crate::engine::growth_period::GrowthPeriodEvaluator;
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ==========================================
// CandidateJob - 单个 (地块, 作物) 生成任务
// ==========================================
#[derive(Debug, Clone)]
pub struct CandidateJob {
    pub field: Arc<Field>,
    pub requirement: Arc<CropRequirement>,
    pub weather: Arc<WeatherSeries>,
}

// ==========================================
// Placement - 某起始日的满面积落位模板
// ==========================================
// 邻域/修复算子通过模板 + with_area 生成新分配
#[derive(Debug, Clone)]
pub struct Placement {
    pub allocation: Arc<CropAllocation>,
    pub stage_crossings: Vec<StageCrossing>,
}

/// 单个任务的生成结果
#[derive(Debug, Clone)]
pub struct CandidateBatch {
    pub field_id: String,
    pub crop_id: String,
    pub candidates: Vec<OptimizationIntermediateResult>, // 过滤后（区间调度输入）
    pub placements: Vec<Placement>,                      // 每个可行起始日一个模板
    pub discarded: usize,                                // 评估失败丢弃的起始日数
}

// ==========================================
// CandidateGenerator - 候选生成引擎
// ==========================================
pub struct CandidateGenerator {
    evaluator: GrowthPeriodEvaluator,
    objective: OptimizationObjective,
    period: PlanningPeriod,
    area_levels: Vec<f64>,
    step_days: i64,
    top_period_candidates: usize,
    enable_filtering: bool,
    enable_parallel: bool,
    cost_model: CostModel,
}

impl CandidateGenerator {
    pub fn new(config: &OptimizationConfig, objective: OptimizationObjective, period: PlanningPeriod) -> Self {
        Self {
            evaluator: GrowthPeriodEvaluator::from_config(config),
            objective,
            period,
            area_levels: config.area_levels.clone(),
            step_days: config.start_date_step_days.max(1) as i64,
            top_period_candidates: config.top_period_candidates,
            enable_filtering: config.enable_candidate_filtering,
            enable_parallel: config.enable_parallel_candidate_generation,
            cost_model: config.cost_model,
        }
    }

    pub fn evaluator(&self) -> &GrowthPeriodEvaluator {
        &self.evaluator
    }

    /// 批量生成（每个任务独立,可并行）
    #[instrument(skip_all, fields(jobs = jobs.len(), parallel = self.enable_parallel))]
    pub fn generate_all(&self, jobs: &[CandidateJob]) -> Vec<CandidateBatch> {
        let batches: Vec<CandidateBatch> = if self.enable_parallel {
            jobs.par_iter().map(|job| self.generate(job)).collect()
        } else {
            jobs.iter().map(|job| self.generate(job)).collect()
        };

        let total: usize = batches.iter().map(|b| b.candidates.len()).sum();
        let discarded: usize = batches.iter().map(|b| b.discarded).sum();
        info!(candidates = total, discarded, "候选生成完成");
        batches
    }

    /// 单个 (地块, 作物) 组合的候选生成
    ///
    /// # 流程
    /// 1. 计划期内按步长遍历起始日,每个起始日评估一次生育期
    /// 2. 评估成功: 记录满面积模板,并按面积档位展开候选
    /// 3. 过滤开启时,每个面积档位保留 top_period_candidates 个时段（优先互不冲突者）
    pub fn generate(&self, job: &CandidateJob) -> CandidateBatch {
        let field = &job.field;
        let crop = Arc::new(job.requirement.crop.clone());
        let mut by_level: Vec<Vec<OptimizationIntermediateResult>> = vec![Vec::new(); self.area_levels.len()];
        let mut placements = Vec::new();
        let mut discarded = 0usize;

        for start in self.start_dates() {
            let evaluation = match self.evaluator.evaluate(&job.requirement, &job.weather, start, Some(self.period.end)) {
                Ok(evaluation) => evaluation,
                Err(err) => {
                    discarded += 1;
                    debug!(field_id = %field.field_id, crop_id = %crop.crop_id, start = %start, error = %err, "候选丢弃");
                    continue;
                }
            };
            let outcome = evaluation.outcome();

            match CropAllocation::try_new(field.clone(), crop.clone(), field.area, &outcome, self.cost_model) {
                Ok(template) => placements.push(Placement {
                    allocation: Arc::new(template),
                    stage_crossings: evaluation.stage_crossings.clone(),
                }),
                Err(err) => {
                    discarded += 1;
                    debug!(field_id = %field.field_id, error = %err, "模板构造失败");
                    continue;
                }
            }

            for (idx, level) in self.area_levels.iter().enumerate() {
                let area = field.area * level;
                if let Ok(allocation) =
                    CropAllocation::try_new(field.clone(), crop.clone(), area, &outcome, self.cost_model)
                {
                    by_level[idx].push(OptimizationIntermediateResult::new(
                        allocation,
                        evaluation.stage_crossings.clone(),
                        self.objective,
                    ));
                }
            }
        }

        let candidates = by_level
            .into_iter()
            .flat_map(|level| self.filter_level(level))
            .collect::<Vec<_>>();

        debug!(
            field_id = %field.field_id,
            crop_id = %crop.crop_id,
            candidates = candidates.len(),
            placements = placements.len(),
            discarded,
            "组合候选生成完成"
        );

        CandidateBatch {
            field_id: field.field_id.clone(),
            crop_id: crop.crop_id.clone(),
            candidates,
            placements,
            discarded,
        }
    }

    fn start_dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut day = self.period.start;
        while day <= self.period.end {
            dates.push(day);
            day += Duration::days(self.step_days);
        }
        dates
    }

    /// 先按增益降序贪心挑选互不冲突（含休耕期）的时段,名额未满再按增益补足
    fn filter_level(&self, mut level: Vec<OptimizationIntermediateResult>) -> Vec<OptimizationIntermediateResult> {
        let limit = self.top_period_candidates;
        if !self.enable_filtering || level.len() <= limit {
            return level;
        }
        level.sort_by(|a, b| {
            b.objective_score
                .partial_cmp(&a.objective_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.start_date().cmp(&b.start_date()))
        });

        let mut kept: Vec<usize> = Vec::with_capacity(limit);
        for (i, candidate) in level.iter().enumerate() {
            if kept.len() >= limit {
                break;
            }
            let fallow = candidate.allocation.field.fallow_period_days;
            let clashes = kept.iter().any(|&k| {
                windows_conflict(
                    (level[k].start_date(), level[k].completion_date()),
                    (candidate.start_date(), candidate.completion_date()),
                    fallow,
                )
            });
            if !clashes {
                kept.push(i);
            }
        }
        for i in 0..level.len() {
            if kept.len() >= limit {
                break;
            }
            if !kept.contains(&i) {
                kept.push(i);
            }
        }

        let kept: HashSet<usize> = kept.into_iter().collect();
        level
            .into_iter()
            .enumerate()
            .filter(|(i, _)| kept.contains(i))
            .map(|(_, candidate)| candidate)
            .collect()
    }
}

// ==========================================
// CandidatePool - 候选池
// ==========================================
// 键: (field_id, crop_id)
// 用途: 区间调度输入、邻域/修复算子的落位查找、结果构建的阶段切换日回填
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    entries: BTreeMap<(String, String), PoolEntry>,
    fields: HashMap<String, Arc<Field>>,
}

#[derive(Debug, Clone, Default)]
struct PoolEntry {
    candidates: Vec<OptimizationIntermediateResult>,
    placements: BTreeMap<NaiveDate, Placement>,
}

impl CandidatePool {
    pub fn from_batches(batches: Vec<CandidateBatch>) -> Self {
        let mut pool = Self::default();
        for batch in batches {
            pool.insert(batch);
        }
        pool
    }

    pub fn insert(&mut self, batch: CandidateBatch) {
        if let Some(placement) = batch.placements.first() {
            self.fields
                .entry(batch.field_id.clone())
                .or_insert_with(|| placement.allocation.field.clone());
        }
        let entry = self.entries.entry((batch.field_id, batch.crop_id)).or_default();
        entry.candidates.extend(batch.candidates);
        for placement in batch.placements {
            entry.placements.insert(placement.allocation.start_date, placement);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|e| e.placements.is_empty())
    }

    pub fn total_candidates(&self) -> usize {
        self.entries.values().map(|e| e.candidates.len()).sum()
    }

    pub fn field(&self, field_id: &str) -> Option<&Arc<Field>> {
        self.fields.get(field_id)
    }

    /// 有可行落位的地块ID（有序）
    pub fn field_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.fields.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 某地块上有可行落位的作物ID（有序）
    pub fn crop_ids_for_field(&self, field_id: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|((f, _), e)| f == field_id && !e.placements.is_empty())
            .map(|((_, c), _)| c.as_str())
            .collect()
    }

    /// 某地块全部作物的候选（区间调度输入）
    pub fn field_candidates(&self, field_id: &str) -> Vec<OptimizationIntermediateResult> {
        self.entries
            .iter()
            .filter(|((f, _), _)| f == field_id)
            .flat_map(|(_, e)| e.candidates.iter().cloned())
            .collect()
    }

    pub fn placement(&self, field_id: &str, crop_id: &str, start: NaiveDate) -> Option<&Placement> {
        self.entries
            .get(&(field_id.to_string(), crop_id.to_string()))
            .and_then(|e| e.placements.get(&start))
    }

    /// 某 (地块, 作物) 的全部落位,按起始日升序
    pub fn placements(&self, field_id: &str, crop_id: &str) -> impl Iterator<Item = &Placement> {
        self.entries
            .get(&(field_id.to_string(), crop_id.to_string()))
            .into_iter()
            .flat_map(|e| e.placements.values())
    }

    /// 起始日最接近 target 的落位
    pub fn nearest_placement(&self, field_id: &str, crop_id: &str, target: NaiveDate) -> Option<&Placement> {
        self.placements(field_id, crop_id)
            .min_by_key(|p| ((p.allocation.start_date - target).num_days().abs(), p.allocation.start_date))
    }

    /// 某地块全部作物的落位中,满足 admit 且目标增益最高的若干个（平局取起始日早者）
    pub fn best_placements<F>(
        &self,
        field_id: &str,
        objective: OptimizationObjective,
        limit: usize,
        admit: F,
    ) -> Vec<&Placement>
    where
        F: Fn(&CropAllocation) -> bool,
    {
        let mut open: Vec<&Placement> = self
            .entries
            .iter()
            .filter(|((f, _), _)| f == field_id)
            .flat_map(|(_, e)| e.placements.values())
            .filter(|p| admit(&p.allocation))
            .collect();
        open.sort_by(|a, b| {
            b.allocation
                .objective_gain(objective)
                .partial_cmp(&a.allocation.objective_gain(objective))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.allocation.start_date.cmp(&b.allocation.start_date))
                .then_with(|| a.allocation.crop_id().cmp(b.allocation.crop_id()))
        });
        open.truncate(limit);
        open
    }
}
