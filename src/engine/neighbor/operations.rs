// ==========================================
// 作物种植排产系统 - 邻域操作库
// ==========================================
// 九种操作,按 NeighborOperation 枚举分派
// 红线: 不修改输入方案; 未触及的分配保持 Arc 身份
// 红线: 固定（pinned）分配不参与任何操作
// 红线: 新分配一律 Unscored,由可行性检查评分
// ==========================================

use crate::domain::allocation::{windows_conflict, CropAllocation, AREA_EPSILON};
use crate::domain::field::Field;
use crate::domain::types::NeighborOperation;
use crate::engine::neighbor::{Neighbor, NeighborContext};
use std::sync::Arc;

/// 插入类操作每个地块考察的候选数
const INSERT_CANDIDATES_PER_FIELD: usize = 10;

/// 按操作类型生成全部邻域
pub fn generate(op: NeighborOperation, solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    match op {
        NeighborOperation::FieldSwap => field_swap(solution, ctx),
        NeighborOperation::FieldMove => field_move(solution, ctx),
        NeighborOperation::FieldReplace => field_replace(solution, ctx),
        NeighborOperation::FieldRemove => field_remove(solution, ctx),
        NeighborOperation::CropInsert => crop_insert(solution, ctx),
        NeighborOperation::CropChange => crop_change(solution, ctx),
        NeighborOperation::PeriodReplace => period_replace(solution, ctx),
        NeighborOperation::QuantityAdjust => quantity_adjust(solution, ctx),
        NeighborOperation::AreaAdjust => area_adjust(solution, ctx),
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn movable<'s>(solution: &'s [Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<(usize, &'s Arc<CropAllocation>)> {
    solution
        .iter()
        .enumerate()
        .filter(|(_, a)| !ctx.is_pinned(a))
        .collect()
}

/// 在目标地块上,除 skip 以外是否有与 candidate 冲突（含休耕期）的分配
fn conflicts(solution: &[Arc<CropAllocation>], skip: &[usize], candidate: &CropAllocation) -> bool {
    solution.iter().enumerate().any(|(idx, other)| {
        !skip.contains(&idx)
            && other.field_id() == candidate.field_id()
            && windows_conflict(
                (other.start_date, other.completion_date),
                (candidate.start_date, candidate.completion_date),
                candidate.field.fallow_period_days,
            )
    })
}

/// 以 template 的落位、指定面积生成新分配（落入被删除时段时返回 None）
fn place(template: &CropAllocation, area: f64, ctx: &NeighborContext<'_>) -> Option<Arc<CropAllocation>> {
    if !ctx.admits(template) {
        return None;
    }
    let area = area.min(template.field.area);
    template.with_area(area, ctx.config.cost_model).ok().map(Arc::new)
}

/// 把 solution[idx] 替换为 replacement（None 表示删除）,其余元素保持原 Arc
fn replaced(solution: &[Arc<CropAllocation>], idx: usize, replacement: Option<Arc<CropAllocation>>) -> Vec<Arc<CropAllocation>> {
    let mut next = Vec::with_capacity(solution.len());
    for (i, a) in solution.iter().enumerate() {
        if i == idx {
            if let Some(r) = &replacement {
                next.push(r.clone());
            }
        } else {
            next.push(a.clone());
        }
    }
    next
}

fn other_fields<'p>(ctx: &NeighborContext<'p>, field_id: &str) -> Vec<&'p Arc<Field>> {
    ctx.fields().into_iter().filter(|f| f.field_id != field_id).collect()
}

// ==========================================
// 地块类操作
// ==========================================

/// 两个不同地块上的分配互换地块（作物/起始日/面积尽量保持）
fn field_swap(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    let items = movable(solution, ctx);
    let mut neighbors = Vec::new();
    for (x, (i, a)) in items.iter().enumerate() {
        for (j, b) in items.iter().skip(x + 1) {
            if a.field_id() == b.field_id() {
                continue;
            }
            let Some(a_on_b) = ctx
                .pool
                .placement(b.field_id(), a.crop_id(), a.start_date)
                .and_then(|p| place(&p.allocation, a.area_used, ctx))
            else {
                continue;
            };
            let Some(b_on_a) = ctx
                .pool
                .placement(a.field_id(), b.crop_id(), b.start_date)
                .and_then(|p| place(&p.allocation, b.area_used, ctx))
            else {
                continue;
            };
            let skip = [*i, *j];
            if conflicts(solution, &skip, &a_on_b) || conflicts(solution, &skip, &b_on_a) {
                continue;
            }
            let mut next = replaced(solution, *i, Some(a_on_b));
            next[*j] = b_on_a;
            neighbors.push(Neighbor::new(NeighborOperation::FieldSwap, next));
        }
    }
    neighbors
}

/// 分配移动到另一个地块（目标地块上须无冲突）
fn field_move(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    let mut neighbors = Vec::new();
    for (i, a) in movable(solution, ctx) {
        for target in other_fields(ctx, a.field_id()) {
            let Some(moved) = ctx
                .pool
                .placement(&target.field_id, a.crop_id(), a.start_date)
                .and_then(|p| place(&p.allocation, a.area_used, ctx))
            else {
                continue;
            };
            if conflicts(solution, &[i], &moved) {
                continue;
            }
            neighbors.push(Neighbor::new(NeighborOperation::FieldMove, replaced(solution, i, Some(moved))));
        }
    }
    neighbors
}

/// 分配移动到另一个地块,并替换掉目标地块上与之冲突的（非固定）分配
fn field_replace(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    let mut neighbors = Vec::new();
    for (i, a) in movable(solution, ctx) {
        for target in other_fields(ctx, a.field_id()) {
            let Some(moved) = ctx
                .pool
                .placement(&target.field_id, a.crop_id(), a.start_date)
                .and_then(|p| place(&p.allocation, a.area_used, ctx))
            else {
                continue;
            };
            let occupants: Vec<usize> = solution
                .iter()
                .enumerate()
                .filter(|(idx, other)| {
                    *idx != i
                        && other.field_id() == target.field_id
                        && windows_conflict(
                            (other.start_date, other.completion_date),
                            (moved.start_date, moved.completion_date),
                            target.fallow_period_days,
                        )
                })
                .map(|(idx, _)| idx)
                .collect();
            if occupants.is_empty() || occupants.iter().any(|idx| ctx.is_pinned(&solution[*idx])) {
                continue;
            }
            let next: Vec<Arc<CropAllocation>> = solution
                .iter()
                .enumerate()
                .filter(|(idx, _)| !occupants.contains(idx))
                .map(|(idx, alloc)| if idx == i { moved.clone() } else { alloc.clone() })
                .collect();
            neighbors.push(Neighbor::new(NeighborOperation::FieldReplace, next));
        }
    }
    neighbors
}

/// 删除一个分配（每个分配一个邻域）
fn field_remove(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    movable(solution, ctx)
        .into_iter()
        .map(|(i, _)| Neighbor::new(NeighborOperation::FieldRemove, replaced(solution, i, None)))
        .collect()
}

// ==========================================
// 作物类操作
// ==========================================

/// 从候选池的全部落位中,插入一个新分配到空闲时段（满面积）
fn crop_insert(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    let mut neighbors = Vec::new();
    for field in ctx.fields() {
        let open = ctx.pool.best_placements(&field.field_id, ctx.objective, INSERT_CANDIDATES_PER_FIELD, |a| {
            ctx.admits(a) && !conflicts(solution, &[], a)
        });
        for placement in open {
            let template = &placement.allocation;
            let Some(inserted) = place(template, template.area_used, ctx) else {
                continue;
            };
            let mut next = solution.to_vec();
            next.push(inserted);
            neighbors.push(Neighbor::new(NeighborOperation::CropInsert, next));
        }
    }
    neighbors
}

/// 同地块、同起始日换种其他作物（面积保持）
fn crop_change(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    let mut neighbors = Vec::new();
    for (i, a) in movable(solution, ctx) {
        for crop_id in ctx.pool.crop_ids_for_field(a.field_id()) {
            if crop_id == a.crop_id() {
                continue;
            }
            let Some(changed) = ctx
                .pool
                .placement(a.field_id(), crop_id, a.start_date)
                .and_then(|p| place(&p.allocation, a.area_used, ctx))
            else {
                continue;
            };
            if conflicts(solution, &[i], &changed) {
                continue;
            }
            neighbors.push(Neighbor::new(NeighborOperation::CropChange, replaced(solution, i, Some(changed))));
        }
    }
    neighbors
}

/// 同地块同作物换一个时段（面积保持）,考察离原起始日最近的若干时段
fn period_replace(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    let limit = ctx.config.top_period_candidates.max(1);
    let mut neighbors = Vec::new();
    for (i, a) in movable(solution, ctx) {
        let mut alternatives: Vec<_> = ctx
            .pool
            .placements(a.field_id(), a.crop_id())
            .filter(|p| p.allocation.start_date != a.start_date)
            .collect();
        alternatives.sort_by_key(|p| ((p.allocation.start_date - a.start_date).num_days().abs(), p.allocation.start_date));

        for placement in alternatives.into_iter().take(limit) {
            let Some(shifted) = place(&placement.allocation, a.area_used, ctx) else {
                continue;
            };
            if conflicts(solution, &[i], &shifted) {
                continue;
            }
            neighbors.push(Neighbor::new(NeighborOperation::PeriodReplace, replaced(solution, i, Some(shifted))));
        }
    }
    neighbors
}

// ==========================================
// 面积类操作
// ==========================================

fn area_in_bounds(field: &Field, area: f64, min_fraction: f64) -> bool {
    area <= field.area + AREA_EPSILON && area + AREA_EPSILON >= field.area * min_fraction
}

/// 面积按倍率缩放
fn quantity_adjust(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    let mut neighbors = Vec::new();
    for (i, a) in movable(solution, ctx) {
        for multiplier in &ctx.config.quantity_adjust_multipliers {
            let area = a.area_used * multiplier;
            if !area_in_bounds(&a.field, area, ctx.config.min_area_fraction) {
                continue;
            }
            if let Ok(adjusted) = a.with_area(area, ctx.config.cost_model) {
                neighbors.push(Neighbor::new(
                    NeighborOperation::QuantityAdjust,
                    replaced(solution, i, Some(Arc::new(adjusted))),
                ));
            }
        }
    }
    neighbors
}

/// 面积切换到其他面积档位
fn area_adjust(solution: &[Arc<CropAllocation>], ctx: &NeighborContext<'_>) -> Vec<Neighbor> {
    let mut neighbors = Vec::new();
    for (i, a) in movable(solution, ctx) {
        for level in &ctx.config.area_levels {
            let area = a.field.area * level;
            if (area - a.area_used).abs() <= AREA_EPSILON || !area_in_bounds(&a.field, area, ctx.config.min_area_fraction) {
                continue;
            }
            if let Ok(adjusted) = a.with_area(area, ctx.config.cost_model) {
                neighbors.push(Neighbor::new(
                    NeighborOperation::AreaAdjust,
                    replaced(solution, i, Some(Arc::new(adjusted))),
                ));
            }
        }
    }
    neighbors
}
