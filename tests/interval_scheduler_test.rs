// ==========================================
// IntervalScheduler 集成测试
// ==========================================
// 测试范围: 单地块非重叠选择、最小成本/最大利润目标、休耕期、幂等性
// ==========================================

mod helpers;

use chrono::Duration;
use crop_planning_aps::domain::allocation::windows_conflict;
use crop_planning_aps::domain::crop::Crop;
use crop_planning_aps::domain::types::OptimizationObjective;
use crop_planning_aps::engine::IntervalScheduler;
use helpers::test_data_builder::*;
use std::sync::Arc;

// ==========================================
// 场景: 三个候选 A / B / C
// ==========================================
// A: 1/1~1/10 成本 1000
// B: 1/5~1/15 成本 800（与 A 重叠）
// C: 1/11~1/20 成本 600（紧接 A）

#[test]
fn test_overlapping_pair_selects_exactly_one() {
    let field = FieldBuilder::new("F").area(1000.0).daily_cost(5000.0).fallow(0).arc();
    let crop = Arc::new(Crop::new("rice", "水稻"));
    let objective = OptimizationObjective::MinimizeCost;
    let a = candidate_with_cost(&field, &crop, date(1, 1), date(1, 11), 1000.0, objective);
    let b = candidate_with_cost(&field, &crop, date(1, 5), date(1, 16), 800.0, objective);

    let selection = IntervalScheduler::new(objective).schedule(&field, &[a, b.clone()]);

    assert_eq!(selection.selected.len(), 1);
    assert_eq!(selection.selected[0].result_id(), b.result_id());
    assert_eq!(selection.total_cost, 800.0);
}

#[test]
fn test_min_cost_picks_cheapest_non_empty_selection() {
    let field = FieldBuilder::new("F").area(1000.0).daily_cost(5000.0).fallow(0).arc();
    let crop = Arc::new(Crop::new("rice", "水稻"));
    let objective = OptimizationObjective::MinimizeCost;
    let a = candidate_with_cost(&field, &crop, date(1, 1), date(1, 11), 1000.0, objective);
    let b = candidate_with_cost(&field, &crop, date(1, 5), date(1, 16), 800.0, objective);
    let c = candidate_with_cost(&field, &crop, date(1, 11), date(1, 21), 600.0, objective);

    let selection = IntervalScheduler::new(objective).schedule(&field, &[a, b, c.clone()]);

    // {A+C}=1600 与 {B}=800 均不如 {C}=600
    assert_eq!(selection.selected.len(), 1);
    assert_eq!(selection.selected[0].result_id(), c.result_id());
    assert_eq!(selection.total_cost, 600.0);
}

#[test]
fn test_max_profit_chains_compatible_candidates() {
    let field = FieldBuilder::new("F").area(1000.0).daily_cost(5000.0).fallow(0).arc();
    let crop = Arc::new(Crop::new("rice", "水稻").with_revenue_per_area(3.0));
    let objective = OptimizationObjective::MaximizeProfit;
    let a = candidate_with_cost(&field, &crop, date(1, 1), date(1, 11), 1000.0, objective);
    let b = candidate_with_cost(&field, &crop, date(1, 5), date(1, 16), 800.0, objective);
    let c = candidate_with_cost(&field, &crop, date(1, 11), date(1, 21), 600.0, objective);

    let selection = IntervalScheduler::new(objective).schedule(&field, &[a.clone(), b, c.clone()]);

    let ids: Vec<&str> = selection.selected.iter().map(|r| r.result_id()).collect();
    assert_eq!(ids, vec![a.result_id(), c.result_id()]);
    assert_eq!(selection.total_cost, 1600.0);
    assert_eq!(selection.total_value, 4400.0);
}

#[test]
fn test_fallow_period_breaks_chain() {
    let field = FieldBuilder::new("F").area(1000.0).daily_cost(5000.0).fallow(28).arc();
    let crop = Arc::new(Crop::new("rice", "水稻").with_revenue_per_area(3.0));
    let objective = OptimizationObjective::MaximizeProfit;
    let a = candidate_with_cost(&field, &crop, date(1, 1), date(1, 11), 1000.0, objective);
    let b = candidate_with_cost(&field, &crop, date(1, 5), date(1, 16), 800.0, objective);
    let c = candidate_with_cost(&field, &crop, date(1, 11), date(1, 21), 600.0, objective);

    let selection = IntervalScheduler::new(objective).schedule(&field, &[a, b, c.clone()]);

    assert_eq!(selection.selected.len(), 1);
    assert_eq!(selection.selected[0].result_id(), c.result_id());
}

// ==========================================
// 性质: 非重叠 + 幂等
// ==========================================

#[test]
fn test_selection_never_conflicts_and_is_idempotent() {
    let field = FieldBuilder::new("F").area(1000.0).daily_cost(10.0).fallow(5).arc();
    let crop = Arc::new(Crop::new("rice", "水稻").with_revenue_per_area(2.0));

    for objective in [OptimizationObjective::MaximizeProfit, OptimizationObjective::MinimizeCost] {
        let candidates: Vec<_> = (0..30i64)
            .map(|i| {
                let start = date(1, 1) + Duration::days(i * 3);
                let length = 5 + (i * 7) % 11;
                let cost = 100.0 + ((i * 37) % 13) as f64 * 50.0;
                candidate_with_cost(&field, &crop, start, start + Duration::days(length), cost, objective)
            })
            .collect();

        let scheduler = IntervalScheduler::new(objective);
        let first = scheduler.schedule(&field, &candidates);
        let second = scheduler.schedule(&field, &candidates);

        assert!(!first.is_empty());
        assert_eq!(first, second);
        for (i, x) in first.selected.iter().enumerate() {
            for y in &first.selected[i + 1..] {
                assert!(
                    x.completion_date() <= y.start_date() || y.completion_date() <= x.start_date(),
                    "{} 与 {} 重叠",
                    x.result_id(),
                    y.result_id()
                );
                assert!(!windows_conflict(
                    (x.start_date(), x.completion_date()),
                    (y.start_date(), y.completion_date()),
                    field.fallow_period_days
                ));
            }
        }
    }
}

#[test]
fn test_other_field_candidates_ignored() {
    let f1 = FieldBuilder::new("F1").fallow(0).arc();
    let f2 = FieldBuilder::new("F2").fallow(0).arc();
    let crop = Arc::new(Crop::new("rice", "水稻").with_revenue_per_area(3.0));
    let objective = OptimizationObjective::MaximizeProfit;
    let on_f2 = candidate_with_cost(&f2, &crop, date(1, 1), date(1, 11), 100.0, objective);

    let selection = IntervalScheduler::new(objective).schedule(&f1, &[on_f2]);
    assert!(selection.is_empty());
    assert_eq!(selection.total_cost, 0.0);
}
