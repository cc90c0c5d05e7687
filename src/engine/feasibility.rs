// ==========================================
// 作物种植排产系统 - 可行性检查引擎
// ==========================================
// 职责: 在完整约束上下文中评估一个多地块方案
// 检查项:
//   (a) 面积: 同地块任一时刻在地面积之和 <= 地块面积（扫描线,超出记在后开始者,Error）
//   (b) 休耕: 同地块任意两茬窗口（含休耕期）冲突 → Error
//   (c) 交互规则: 时间（同地块紧邻前茬）/ 空间（同地块或同位置的并发分配）/
//       地块-作物,impact_ratio 连乘到受影响分配的收益上
//   (d) 胁迫: 生育期胁迫天数按阈值转换为 Warning / Error
// 红线: 不修改输入; 违规是数据
// 红线: 含 Error 的方案不可行,搜索不得将其作为当前最优
// ==========================================

use crate::config::StressSeverityPolicy;
use crate::domain::allocation::{CropAllocation, AREA_EPSILON};
use crate::domain::interaction::InteractionRule;
use crate::domain::types::{InteractionRuleType, OptimizationObjective, RuleContext, StressKind, ViolationType};
use crate::domain::violation::Violation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// 目标值比较容差
pub const OBJECTIVE_EPSILON: f64 = 1e-9;

/// 单个分配的约束后经济性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationScore {
    pub allocation_id: String,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub revenue_multiplier: f64, // 交互规则连乘结果
}

/// 已生效的交互规则记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedInteraction {
    pub rule_id: String,
    pub rule_type: InteractionRuleType,
    pub allocation_id: String,
    pub related_allocation_id: Option<String>,
    pub impact_ratio: f64,
}

// ==========================================
// SolutionEvaluation - 方案评估结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionEvaluation {
    pub objective: OptimizationObjective,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub violations: Vec<Violation>,
    pub interactions: Vec<AppliedInteraction>,
    pub allocation_scores: HashMap<String, AllocationScore>,
    pub missing_fields: Vec<String>, // 最小成本目标下被清空的必选地块
}

impl SolutionEvaluation {
    pub fn error_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.violations.len() - self.error_count()
    }

    pub fn is_feasible(&self) -> bool {
        self.error_count() == 0 && self.missing_fields.is_empty()
    }

    /// 统一为越大越好的目标值
    pub fn objective_value(&self) -> f64 {
        match self.objective {
            OptimizationObjective::MaximizeProfit => self.total_profit,
            OptimizationObjective::MinimizeCost => -self.total_cost,
        }
    }

    /// 可行且目标值严格更优
    pub fn is_better_than(&self, other: &SolutionEvaluation) -> bool {
        self.is_feasible() && (!other.is_feasible() || self.objective_value() > other.objective_value() + OBJECTIVE_EPSILON)
    }

    pub fn score(&self, allocation_id: &str) -> Option<&AllocationScore> {
        self.allocation_scores.get(allocation_id)
    }

    /// 含 Error 级违规的分配ID
    pub fn error_allocation_ids(&self) -> HashSet<String> {
        self.violations
            .iter()
            .filter(|v| v.is_error())
            .filter_map(|v| v.allocation_id.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<Violation> {
        self.violations.iter().filter(|v| !v.is_error()).cloned().collect()
    }

    /// 写入约束后经济性（保持分配ID）
    pub fn scored_solution(&self, solution: &[Arc<CropAllocation>]) -> Vec<Arc<CropAllocation>> {
        solution
            .iter()
            .map(|a| match self.score(&a.allocation_id) {
                Some(score) => Arc::new(a.scored(score.revenue)),
                None => a.clone(),
            })
            .collect()
    }
}

// ==========================================
// FeasibilityChecker - 可行性检查引擎
// ==========================================
// 无内部可变状态,可在多线程中并发评估不同方案
#[derive(Debug, Clone)]
pub struct FeasibilityChecker {
    rules: Arc<Vec<InteractionRule>>,
    severity: StressSeverityPolicy,
    objective: OptimizationObjective,
    required_fields: BTreeSet<String>,
}

impl FeasibilityChecker {
    pub fn new(rules: Arc<Vec<InteractionRule>>, severity: StressSeverityPolicy, objective: OptimizationObjective) -> Self {
        Self {
            rules,
            severity,
            objective,
            required_fields: BTreeSet::new(),
        }
    }

    /// 最小成本目标下不得被清空的地块
    pub fn with_required_fields(mut self, fields: impl IntoIterator<Item = String>) -> Self {
        self.required_fields = fields.into_iter().collect();
        self
    }

    pub fn objective(&self) -> OptimizationObjective {
        self.objective
    }

    pub fn rules(&self) -> &[InteractionRule] {
        &self.rules
    }

    /// 评估完整方案
    pub fn evaluate(&self, solution: &[Arc<CropAllocation>]) -> SolutionEvaluation {
        let mut violations = Vec::new();
        let mut interactions = Vec::new();
        let mut multipliers: HashMap<&str, f64> = solution
            .iter()
            .map(|a| (a.allocation_id.as_str(), 1.0))
            .collect();

        let by_field = group_by_field(solution);

        for allocations in by_field.values() {
            self.check_area(allocations, &mut violations);
            self.check_fallow(allocations, &mut violations);
            self.apply_temporal_rules(allocations, &mut multipliers, &mut violations, &mut interactions);
        }
        self.apply_spatial_rules(solution, &mut multipliers, &mut violations, &mut interactions);
        self.apply_field_crop_rules(solution, &mut multipliers, &mut violations, &mut interactions);
        self.check_stress(solution, &mut violations);

        // 收益 = 预估收益 × 交互系数,再按作物市场上限等比例封顶
        let mut revenues: HashMap<&str, f64> = solution
            .iter()
            .map(|a| {
                let m = multipliers.get(a.allocation_id.as_str()).copied().unwrap_or(1.0);
                (a.allocation_id.as_str(), (a.base_revenue.unwrap_or(0.0) * m).max(0.0))
            })
            .collect();
        apply_market_caps(solution, &mut revenues);

        let mut allocation_scores = HashMap::with_capacity(solution.len());
        let mut total_revenue = 0.0;
        let mut total_cost = 0.0;
        for a in solution {
            let revenue = revenues.get(a.allocation_id.as_str()).copied().unwrap_or(0.0);
            total_revenue += revenue;
            total_cost += a.total_cost;
            allocation_scores.insert(
                a.allocation_id.clone(),
                AllocationScore {
                    allocation_id: a.allocation_id.clone(),
                    revenue,
                    cost: a.total_cost,
                    profit: revenue - a.total_cost,
                    revenue_multiplier: multipliers.get(a.allocation_id.as_str()).copied().unwrap_or(1.0),
                },
            );
        }

        let missing_fields = match self.objective {
            OptimizationObjective::MinimizeCost => self
                .required_fields
                .iter()
                .filter(|f| !by_field.contains_key(f.as_str()))
                .cloned()
                .collect(),
            OptimizationObjective::MaximizeProfit => Vec::new(),
        };

        SolutionEvaluation {
            objective: self.objective,
            total_revenue,
            total_cost,
            total_profit: total_revenue - total_cost,
            violations,
            interactions,
            allocation_scores,
            missing_fields,
        }
    }

    /// 扫描线: 起止事件按日期排序,同日先结束后开始（半开窗口）
    /// 开始事件使在地面积超出地块面积时,记在该开始者上
    fn check_area(&self, allocations: &[&Arc<CropAllocation>], violations: &mut Vec<Violation>) {
        let Some(first) = allocations.first() else { return };
        let capacity = first.field.area;

        let mut events: Vec<(NaiveDate, AreaEvent, usize)> = Vec::with_capacity(allocations.len() * 2);
        for (i, a) in allocations.iter().enumerate() {
            events.push((a.start_date, AreaEvent::Start, i));
            events.push((a.completion_date, AreaEvent::End, i));
        }
        events.sort();

        let mut active = 0.0;
        for (_, event, i) in events {
            let current = allocations[i];
            match event {
                AreaEvent::End => active -= current.area_used,
                AreaEvent::Start => {
                    active += current.area_used;
                    if active > capacity + AREA_EPSILON {
                        violations.push(
                            Violation::error(
                                ViolationType::AreaConstraint,
                                format!(
                                    "地块 {} 并发面积 {:.1} 超出地块面积 {:.1}",
                                    current.field_id(),
                                    active,
                                    capacity
                                ),
                            )
                            .for_allocation(current.allocation_id.clone()),
                        );
                    }
                }
            }
        }
    }

    fn check_fallow(&self, allocations: &[&Arc<CropAllocation>], violations: &mut Vec<Violation>) {
        for (i, current) in allocations.iter().enumerate() {
            let fallow = current.field.fallow_period_days;
            for prev in &allocations[..i] {
                if prev.conflicts_with_fallow(current, fallow) {
                    violations.push(
                        Violation::error(
                            ViolationType::FallowPeriod,
                            format!(
                                "地块 {} 两茬间隔不足 {} 天: {}({}~{}) 与 {}({}~{})",
                                current.field_id(),
                                fallow,
                                prev.crop_id(),
                                prev.start_date,
                                prev.completion_date,
                                current.crop_id(),
                                current.start_date,
                                current.completion_date
                            ),
                        )
                        .for_allocation(current.allocation_id.clone())
                        .with_details(format!("previous_allocation_id={}", prev.allocation_id)),
                    );
                }
            }
        }
    }

    /// 时间维度: 紧邻前茬 = 同地块内完成日 <= 本茬起始日且完成最晚者
    fn apply_temporal_rules<'a>(
        &self,
        allocations: &[&'a Arc<CropAllocation>],
        multipliers: &mut HashMap<&'a str, f64>,
        violations: &mut Vec<Violation>,
        interactions: &mut Vec<AppliedInteraction>,
    ) {
        for current in allocations {
            let previous = allocations
                .iter()
                .filter(|p| p.completion_date <= current.start_date)
                .max_by_key(|p| (p.completion_date, p.start_date));
            let Some(previous) = previous else { continue };

            for rule in self.rules_in(RuleContext::Temporal) {
                if !rule.matches_crops(&previous.crop, &current.crop) {
                    continue;
                }
                self.apply_ratio(current, Some(previous), rule, multipliers, violations, interactions);
            }
        }
    }

    /// 空间维度: 同地块或同位置、时间重叠的其他分配
    fn apply_spatial_rules<'a>(
        &self,
        solution: &'a [Arc<CropAllocation>],
        multipliers: &mut HashMap<&'a str, f64>,
        violations: &mut Vec<Violation>,
        interactions: &mut Vec<AppliedInteraction>,
    ) {
        let spatial: Vec<&InteractionRule> = self.rules_in(RuleContext::Spatial).collect();
        if spatial.is_empty() {
            return;
        }
        for current in solution {
            for neighbor in solution {
                if neighbor.allocation_id == current.allocation_id || !neighbor.overlaps(current) {
                    continue;
                }
                let same_place = neighbor.field_id() == current.field_id()
                    || matches!(
                        (&neighbor.field.location, &current.field.location),
                        (Some(a), Some(b)) if a == b
                    );
                if !same_place {
                    continue;
                }
                for rule in &spatial {
                    if rule.matches_crops(&neighbor.crop, &current.crop) {
                        self.apply_ratio(current, Some(neighbor), rule, multipliers, violations, interactions);
                    }
                }
            }
        }
    }

    fn apply_field_crop_rules<'a>(
        &self,
        solution: &'a [Arc<CropAllocation>],
        multipliers: &mut HashMap<&'a str, f64>,
        violations: &mut Vec<Violation>,
        interactions: &mut Vec<AppliedInteraction>,
    ) {
        for current in solution {
            for rule in self.rules_in(RuleContext::FieldCrop) {
                if rule.matches_field_crop(&current.field, &current.crop) {
                    self.apply_ratio(current, None, rule, multipliers, violations, interactions);
                }
            }
        }
    }

    fn apply_ratio<'a>(
        &self,
        current: &'a Arc<CropAllocation>,
        related: Option<&Arc<CropAllocation>>,
        rule: &InteractionRule,
        multipliers: &mut HashMap<&'a str, f64>,
        violations: &mut Vec<Violation>,
        interactions: &mut Vec<AppliedInteraction>,
    ) {
        *multipliers.entry(current.allocation_id.as_str()).or_insert(1.0) *= rule.impact_ratio;
        interactions.push(AppliedInteraction {
            rule_id: rule.rule_id.clone(),
            rule_type: rule.rule_type,
            allocation_id: current.allocation_id.clone(),
            related_allocation_id: related.map(|r| r.allocation_id.clone()),
            impact_ratio: rule.impact_ratio,
        });

        if rule.impact_ratio >= 1.0 {
            return;
        }
        let mut violation = Violation::warning(
            rule.rule_type.violation_type(),
            format!(
                "规则 {} ({}) 作用于 {} @ {}: 收益系数 {:.2}",
                rule.rule_id,
                rule.rule_type,
                current.crop_id(),
                current.field_id(),
                rule.impact_ratio
            ),
            rule.impact_ratio,
        )
        .for_allocation(current.allocation_id.clone());
        if let Some(related) = related {
            violation = violation.with_details(format!("related_allocation_id={}", related.allocation_id));
        }
        violations.push(violation);
    }

    fn check_stress(&self, solution: &[Arc<CropAllocation>], violations: &mut Vec<Violation>) {
        for allocation in solution {
            for kind in StressKind::ALL {
                let (Some(violation_type), Some(threshold)) = (kind.violation_type(), self.severity.threshold(kind))
                else {
                    continue;
                };
                let days = allocation.stress.days(kind);
                if days == 0 {
                    continue;
                }
                let message = format!(
                    "{} @ {} 生育期内 {} 胁迫 {} 天",
                    allocation.crop_id(),
                    allocation.field_id(),
                    kind,
                    days
                );
                let violation = if threshold.error_days.is_some_and(|d| days >= d) {
                    Violation::error(violation_type, message)
                } else if threshold.warning_days.is_some_and(|d| days >= d) {
                    // 产量影响已计入 yield_factor
                    Violation::warning(violation_type, message, 1.0)
                } else {
                    continue;
                };
                violations.push(violation.for_allocation(allocation.allocation_id.clone()));
            }
        }
    }

    fn rules_in(&self, context: RuleContext) -> impl Iterator<Item = &InteractionRule> {
        self.rules.iter().filter(move |r| r.context() == context)
    }
}

/// 面积扫描事件（End 排在 Start 之前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AreaEvent {
    End,
    Start,
}

/// 按地块分组,组内按 (start_date, allocation_id) 排序
fn group_by_field(solution: &[Arc<CropAllocation>]) -> BTreeMap<&str, Vec<&Arc<CropAllocation>>> {
    let mut by_field: BTreeMap<&str, Vec<&Arc<CropAllocation>>> = BTreeMap::new();
    for a in solution {
        by_field.entry(a.field_id()).or_default().push(a);
    }
    for allocations in by_field.values_mut() {
        allocations.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then_with(|| a.allocation_id.cmp(&b.allocation_id))
        });
    }
    by_field
}

fn apply_market_caps(solution: &[Arc<CropAllocation>], revenues: &mut HashMap<&str, f64>) {
    let mut per_crop: HashMap<&str, (f64, f64)> = HashMap::new();
    for a in solution {
        if let Some(cap) = a.crop.max_revenue {
            let entry = per_crop.entry(a.crop_id()).or_insert((0.0, cap));
            entry.0 += revenues.get(a.allocation_id.as_str()).copied().unwrap_or(0.0);
        }
    }
    for a in solution {
        if let Some((sum, cap)) = per_crop.get(a.crop_id()) {
            if *sum > *cap && *sum > 0.0 {
                if let Some(r) = revenues.get_mut(a.allocation_id.as_str()) {
                    *r *= cap / sum;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::{GrowthOutcome, StressSummary};
    use crate::domain::crop::Crop;
    use crate::domain::field::Field;
    use crate::domain::types::CostModel;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn field(id: &str) -> Arc<Field> {
        Arc::new(Field::new(id, id, 1000.0, 10.0).unwrap().with_fallow_period_days(0))
    }

    fn allocation(
        field: &Arc<Field>,
        crop: &Arc<Crop>,
        area: f64,
        start: NaiveDate,
        end: NaiveDate,
        stress: StressSummary,
    ) -> Arc<CropAllocation> {
        Arc::new(
            CropAllocation::try_new(
                field.clone(),
                crop.clone(),
                area,
                &GrowthOutcome {
                    start_date: start,
                    completion_date: end,
                    accumulated_gdd: 0.0,
                    yield_factor: 1.0,
                    stress,
                },
                CostModel::FieldFixed,
            )
            .unwrap(),
        )
    }

    fn tomato() -> Arc<Crop> {
        Arc::new(
            Crop::new("tomato", "トマト")
                .with_revenue_per_area(10.0)
                .with_groups(vec!["Solanaceae".to_string()]),
        )
    }

    fn checker(rules: Vec<InteractionRule>) -> FeasibilityChecker {
        FeasibilityChecker::new(
            Arc::new(rules),
            StressSeverityPolicy::default(),
            OptimizationObjective::MaximizeProfit,
        )
    }

    // ==========================================
    // 约束测试
    // ==========================================

    #[test]
    fn test_continuous_cultivation_scales_later_revenue() {
        let f = field("F1");
        let crop = tomato();
        let first = allocation(&f, &crop, 1000.0, date(2025, 4, 1), date(2025, 8, 1), StressSummary::default());
        let second = allocation(&f, &crop, 1000.0, date(2026, 4, 1), date(2026, 8, 1), StressSummary::default());
        let rule = InteractionRule::new(
            "R1",
            InteractionRuleType::ContinuousCultivation,
            "Solanaceae",
            "Solanaceae",
            0.7,
            true,
        )
        .unwrap();

        let eval = checker(vec![rule]).evaluate(&[first.clone(), second.clone()]);

        assert!(eval.is_feasible());
        assert_eq!(eval.score(&first.allocation_id).unwrap().revenue, 10_000.0);
        assert!((eval.score(&second.allocation_id).unwrap().revenue - 7_000.0).abs() < 1e-9);
        assert_eq!(eval.warning_count(), 1);
        let warning = &eval.violations[0];
        assert_eq!(warning.violation_type, ViolationType::ContinuousCultivation);
        assert_eq!(warning.impact_ratio, 0.7);
        assert_eq!(warning.allocation_id.as_deref(), Some(second.allocation_id.as_str()));
    }

    #[test]
    fn test_concurrent_area_overflow_is_error() {
        let f = field("F1");
        let crop = tomato();
        let a = allocation(&f, &crop, 600.0, date(2025, 4, 1), date(2025, 6, 1), StressSummary::default());
        let b = allocation(&f, &crop, 600.0, date(2025, 5, 1), date(2025, 7, 1), StressSummary::default());

        let eval = checker(vec![]).evaluate(&[a, b.clone()]);
        assert!(!eval.is_feasible());
        let area_errors: Vec<&Violation> = eval
            .violations
            .iter()
            .filter(|v| v.violation_type == ViolationType::AreaConstraint)
            .collect();
        assert_eq!(area_errors.len(), 1);
        assert_eq!(area_errors[0].allocation_id.as_deref(), Some(b.allocation_id.as_str()));
        assert!(eval.error_allocation_ids().contains(&b.allocation_id));
    }

    #[test]
    fn test_area_sweep_uses_true_peak() {
        let f = field("F1");
        let crop = tomato();
        // 两茬首尾相接各 600,另一茬 400 横跨两者: 峰值 1000
        let early = allocation(&f, &crop, 600.0, date(2025, 4, 1), date(2025, 4, 11), StressSummary::default());
        let late = allocation(&f, &crop, 600.0, date(2025, 4, 11), date(2025, 4, 21), StressSummary::default());
        let spanning = allocation(&f, &crop, 400.0, date(2025, 4, 1), date(2025, 4, 21), StressSummary::default());

        let eval = checker(vec![]).evaluate(&[early.clone(), late.clone(), spanning.clone()]);
        assert!(!eval
            .violations
            .iter()
            .any(|v| v.violation_type == ViolationType::AreaConstraint));

        // 再加 100 使峰值 1100
        let extra = allocation(&f, &crop, 100.0, date(2025, 4, 15), date(2025, 4, 18), StressSummary::default());
        let eval = checker(vec![]).evaluate(&[early, late, spanning, extra.clone()]);
        let area_errors: Vec<&Violation> = eval
            .violations
            .iter()
            .filter(|v| v.violation_type == ViolationType::AreaConstraint)
            .collect();
        assert_eq!(area_errors.len(), 1);
        assert_eq!(area_errors[0].allocation_id.as_deref(), Some(extra.allocation_id.as_str()));
    }

    #[test]
    fn test_allelopathy_reduces_revenue_with_warning() {
        let f1 = Arc::new(Field::new("F1", "F1", 1000.0, 10.0).unwrap().with_location("east"));
        let f2 = Arc::new(Field::new("F2", "F2", 1000.0, 10.0).unwrap().with_location("east"));
        let walnut = Arc::new(Crop::new("walnut", "walnut").with_revenue_per_area(10.0));
        let a = allocation(&f1, &walnut, 1000.0, date(2025, 4, 1), date(2025, 6, 1), StressSummary::default());
        let b = allocation(&f2, &tomato(), 1000.0, date(2025, 5, 1), date(2025, 7, 1), StressSummary::default());
        let rule = InteractionRule::new("R4", InteractionRuleType::Allelopathy, "walnut", "tomato", 0.6, true).unwrap();

        let eval = checker(vec![rule]).evaluate(&[a, b.clone()]);

        assert!(eval.is_feasible());
        assert!((eval.score(&b.allocation_id).unwrap().revenue - 6_000.0).abs() < 1e-9);
        assert_eq!(eval.warning_count(), 1);
        let warning = &eval.violations[0];
        assert_eq!(warning.violation_type, ViolationType::FieldCropIncompatibility);
        assert_eq!(warning.impact_ratio, 0.6);
        assert_eq!(warning.allocation_id.as_deref(), Some(b.allocation_id.as_str()));
    }

    #[test]
    fn test_fallow_gap_violation() {
        let f = Arc::new(Field::new("F1", "F1", 1000.0, 10.0).unwrap().with_fallow_period_days(14));
        let crop = tomato();
        let a = allocation(&f, &crop, 1000.0, date(2025, 4, 1), date(2025, 6, 1), StressSummary::default());
        let b = allocation(&f, &crop, 1000.0, date(2025, 6, 5), date(2025, 8, 1), StressSummary::default());

        let eval = checker(vec![]).evaluate(&[a, b]);
        assert_eq!(eval.error_count(), 1);
        assert_eq!(eval.violations[0].violation_type, ViolationType::FallowPeriod);
    }

    #[test]
    fn test_stress_severity_thresholds() {
        let f = field("F1");
        let crop = tomato();
        let stressed = allocation(
            &f,
            &crop,
            1000.0,
            date(2025, 4, 1),
            date(2025, 6, 1),
            StressSummary {
                frost_days: 5,
                high_temp_days: 3,
                low_temp_days: 1,
                ..StressSummary::default()
            },
        );
        let eval = checker(vec![]).evaluate(&[stressed]);
        assert_eq!(eval.error_count(), 1);
        assert_eq!(eval.warning_count(), 1);
        assert!(eval
            .violations
            .iter()
            .any(|v| v.violation_type == ViolationType::FrostRisk && v.is_error()));
        // 胁迫告警不再折减收益
        assert_eq!(eval.total_revenue, 10_000.0);
    }

    #[test]
    fn test_spatial_rules_by_location() {
        let f1 = Arc::new(Field::new("F1", "F1", 1000.0, 10.0).unwrap().with_location("tokyo"));
        let f2 = Arc::new(Field::new("F2", "F2", 1000.0, 10.0).unwrap().with_location("tokyo"));
        let basil = Arc::new(Crop::new("basil", "basil").with_revenue_per_area(10.0));
        let a = allocation(&f1, &basil, 1000.0, date(2025, 4, 1), date(2025, 6, 1), StressSummary::default());
        let b = allocation(&f2, &tomato(), 1000.0, date(2025, 5, 1), date(2025, 7, 1), StressSummary::default());
        let rule =
            InteractionRule::new("R2", InteractionRuleType::CompanionPlanting, "basil", "tomato", 1.2, true).unwrap();

        let eval = checker(vec![rule]).evaluate(&[a.clone(), b.clone()]);
        assert!(eval.violations.is_empty());
        assert!((eval.score(&b.allocation_id).unwrap().revenue - 12_000.0).abs() < 1e-9);
        assert_eq!(eval.score(&a.allocation_id).unwrap().revenue, 10_000.0);
        assert_eq!(eval.interactions.len(), 1);
    }

    #[test]
    fn test_field_crop_incompatibility_and_market_cap() {
        let f = Arc::new(
            Field::new("F1", "F1", 1000.0, 10.0)
                .unwrap()
                .with_groups(vec!["clay".to_string()]),
        );
        let capped = Arc::new(Crop::new("melon", "melon").with_revenue_per_area(10.0).with_max_revenue(4_000.0));
        let a = allocation(&f, &capped, 1000.0, date(2025, 4, 1), date(2025, 6, 1), StressSummary::default());
        let rule =
            InteractionRule::new("R3", InteractionRuleType::SoilCompatibility, "clay", "melon", 0.5, true).unwrap();

        let eval = checker(vec![rule]).evaluate(&[a]);
        assert_eq!(eval.violations[0].violation_type, ViolationType::FieldCropIncompatibility);
        // 10000 × 0.5 = 5000 → 封顶 4000
        assert!((eval.total_revenue - 4_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_cost_requires_seeded_fields() {
        let checker = FeasibilityChecker::new(
            Arc::new(vec![]),
            StressSeverityPolicy::default(),
            OptimizationObjective::MinimizeCost,
        )
        .with_required_fields(vec!["F1".to_string()]);
        let eval = checker.evaluate(&[]);
        assert!(!eval.is_feasible());
        assert_eq!(eval.missing_fields, vec!["F1".to_string()]);
    }
}
