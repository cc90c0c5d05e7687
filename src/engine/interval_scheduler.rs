// ==========================================
// 作物种植排产系统 - 区间调度引擎
// ==========================================
// 职责: 单地块上,从所有作物候选中选出互不冲突的最优子集
// 算法: 加权区间调度 DP
//   - 按 (completion_date, start_date, 原序号) 稳定排序
//   - p(i) = 最后一个满足 completion_j + 休耕期 <= start_i 的候选
//   - best[i] = better(best[i-1], value_i + best[p(i)])
// 目标:
//   - MaximizeProfit: value = 预估利润,非正候选不参与
//   - MinimizeCost:   value = −成本,只在非空选择中取最小成本
// 平局: 价值相同时优先最后一个入选候选起始日更晚者
// ==========================================

use crate::domain::field::Field;
use crate::domain::schedule::OptimizationIntermediateResult;
use crate::domain::types::OptimizationObjective;
use chrono::{Duration, NaiveDate};
use tracing::debug;

/// 价值比较容差
const VALUE_EPSILON: f64 = 1e-9;

// ==========================================
// IntervalSelection - 单地块调度结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSelection {
    pub field_id: String,
    pub selected: Vec<OptimizationIntermediateResult>, // 按起始日升序
    pub total_cost: f64,
    pub total_value: f64,
}

impl IntervalSelection {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct DpState {
    value: f64,
    last_start: NaiveDate,
    last: usize,
}

// ==========================================
// IntervalScheduler - 区间调度引擎
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct IntervalScheduler {
    objective: OptimizationObjective,
}

impl IntervalScheduler {
    pub fn new(objective: OptimizationObjective) -> Self {
        Self { objective }
    }

    fn value_of(&self, candidate: &OptimizationIntermediateResult) -> f64 {
        candidate.allocation.objective_gain(self.objective)
    }

    /// 单地块调度
    ///
    /// # 参数
    /// - field: 地块（提供休耕期）
    /// - candidates: 候选列表（其他地块的候选会被忽略）
    ///
    /// # 返回
    /// - 互不冲突的选中子集; 输入相同则结果相同
    pub fn schedule(&self, field: &Field, candidates: &[OptimizationIntermediateResult]) -> IntervalSelection {
        let gap = Duration::days(field.fallow_period_days as i64);

        let mut items: Vec<(usize, &OptimizationIntermediateResult)> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.field_id() == field.field_id)
            .filter(|(_, c)| match self.objective {
                OptimizationObjective::MaximizeProfit => self.value_of(c) > VALUE_EPSILON,
                OptimizationObjective::MinimizeCost => true,
            })
            .collect();
        items.sort_by(|(ia, a), (ib, b)| {
            a.completion_date()
                .cmp(&b.completion_date())
                .then_with(|| a.start_date().cmp(&b.start_date()))
                .then_with(|| ia.cmp(ib))
        });

        let n = items.len();
        // best[k]: 前 k 个候选中最优的非空选择
        let mut best: Vec<Option<DpState>> = vec![None; n + 1];
        // chain[i]: 候选 i 入选时接在其后的 best 下标
        let mut chain: Vec<Option<usize>> = vec![None; n];

        for i in 0..n {
            let (_, current) = items[i];
            let start = current.start_date();
            let p = items[..i].partition_point(|(_, c)| c.completion_date() + gap <= start);

            let mut take_value = self.value_of(current);
            if let Some(pred) = best[p].filter(|s| s.value > 0.0) {
                take_value += pred.value;
                chain[i] = Some(p);
            }
            let take = DpState {
                value: take_value,
                last_start: start,
                last: i,
            };

            best[i + 1] = Some(match best[i] {
                None => take,
                Some(skip) => {
                    let diff = take.value - skip.value;
                    if diff > VALUE_EPSILON || (diff.abs() <= VALUE_EPSILON && take.last_start > skip.last_start) {
                        take
                    } else {
                        skip
                    }
                }
            });
        }

        let mut picked = Vec::new();
        let mut cursor = best[n];
        while let Some(state) = cursor {
            picked.push(state.last);
            cursor = chain[state.last].and_then(|k| best[k]);
        }
        picked.reverse();

        let selected: Vec<OptimizationIntermediateResult> = picked.iter().map(|i| items[*i].1.clone()).collect();
        let total_cost = selected.iter().map(|c| c.total_cost()).sum();
        let total_value = selected.iter().map(|c| self.value_of(c)).sum();

        debug!(
            field_id = %field.field_id,
            candidates = n,
            selected = selected.len(),
            total_cost,
            "区间调度完成"
        );

        IntervalSelection {
            field_id: field.field_id.clone(),
            selected,
            total_cost,
            total_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::{CropAllocation, GrowthOutcome, StressSummary};
    use crate::domain::crop::Crop;
    use crate::domain::types::CostModel;
    use std::sync::Arc;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    /// 以日成本 1 构造候选,使成本 = 生育天数 × daily_cost
    fn candidate(
        field: &Arc<Field>,
        crop: &str,
        start: NaiveDate,
        end: NaiveDate,
        revenue_per_area: f64,
        objective: OptimizationObjective,
    ) -> OptimizationIntermediateResult {
        let alloc = CropAllocation::try_new(
            field.clone(),
            Arc::new(Crop::new(crop, crop).with_revenue_per_area(revenue_per_area)),
            field.area,
            &GrowthOutcome {
                start_date: start,
                completion_date: end,
                accumulated_gdd: 0.0,
                yield_factor: 1.0,
                stress: StressSummary::default(),
            },
            CostModel::FieldFixed,
        )
        .unwrap();
        OptimizationIntermediateResult::new(alloc, vec![], objective)
    }

    fn field(fallow: u32) -> Arc<Field> {
        Arc::new(Field::new("F1", "北田", 1.0, 10.0).unwrap().with_fallow_period_days(fallow))
    }

    #[test]
    fn test_profit_prefers_compatible_pair() {
        let f = field(0);
        let obj = OptimizationObjective::MaximizeProfit;
        // A: 1/1-1/10 利润 900; B: 1/5-1/15 利润 1400; C: 1/11-1/20 利润 900
        let a = candidate(&f, "A", date(1, 1), date(1, 11), 1000.0, obj);
        let b = candidate(&f, "B", date(1, 5), date(1, 16), 1510.0, obj);
        let c = candidate(&f, "C", date(1, 11), date(1, 21), 1000.0, obj);

        let selection = IntervalScheduler::new(obj).schedule(&f, &[a.clone(), b, c.clone()]);
        let crops: Vec<&str> = selection.selected.iter().map(|r| r.crop_id()).collect();
        assert_eq!(crops, vec!["A", "C"]);
        assert_eq!(selection.total_value, 1800.0);
    }

    #[test]
    fn test_fallow_gap_blocks_adjacent_pair() {
        let f = field(5);
        let obj = OptimizationObjective::MaximizeProfit;
        let a = candidate(&f, "A", date(1, 1), date(1, 11), 1000.0, obj);
        let b = candidate(&f, "B", date(1, 5), date(1, 16), 1510.0, obj);
        let c = candidate(&f, "C", date(1, 11), date(1, 21), 1000.0, obj);

        let selection = IntervalScheduler::new(obj).schedule(&f, &[a, b, c]);
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].crop_id(), "B");
    }

    #[test]
    fn test_min_cost_picks_cheapest_non_empty() {
        let f = field(0);
        let obj = OptimizationObjective::MinimizeCost;
        // 成本: A=100, B=110
        let a = candidate(&f, "A", date(1, 1), date(1, 11), 0.0, obj);
        let b = candidate(&f, "B", date(1, 5), date(1, 16), 0.0, obj);

        let selection = IntervalScheduler::new(obj).schedule(&f, &[a, b]);
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].crop_id(), "A");
        assert_eq!(selection.total_cost, 100.0);
    }

    #[test]
    fn test_tie_prefers_later_start() {
        let f = field(0);
        let obj = OptimizationObjective::MinimizeCost;
        let early = candidate(&f, "early", date(1, 1), date(1, 11), 0.0, obj);
        let late = candidate(&f, "late", date(2, 1), date(2, 11), 0.0, obj);

        let selection = IntervalScheduler::new(obj).schedule(&f, &[early, late]);
        assert_eq!(selection.selected[0].crop_id(), "late");
    }

    #[test]
    fn test_unprofitable_candidates_skipped() {
        let f = field(0);
        let obj = OptimizationObjective::MaximizeProfit;
        let loss = candidate(&f, "loss", date(1, 1), date(1, 11), 50.0, obj);
        let selection = IntervalScheduler::new(obj).schedule(&f, &[loss]);
        assert!(selection.is_empty());
        assert_eq!(selection.total_cost, 0.0);
    }
}
