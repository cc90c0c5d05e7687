// ==========================================
// 作物种植排产系统 - 人工调整指令
// ==========================================
// 用途: adjust 工作流（应用用户移动 → 拒绝不可行移动并给出原因 → 重优化剩余部分）
// ==========================================

use crate::domain::allocation::CropAllocation;
use crate::domain::schedule::OptimizationSchedule;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MoveAction {
    /// 移动到指定地块/起始日（面积缺省沿用原值,超出地块时截断为地块面积）
    Move {
        to_field_id: String,
        to_start_date: NaiveDate,
        #[serde(default)]
        to_area: Option<f64>,
    },
    /// 删除该分配
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveInstruction {
    pub allocation_id: String,
    #[serde(flatten)]
    pub action: MoveAction,
}

impl MoveInstruction {
    pub fn remove(allocation_id: impl Into<String>) -> Self {
        Self {
            allocation_id: allocation_id.into(),
            action: MoveAction::Remove,
        }
    }

    pub fn move_to(
        allocation_id: impl Into<String>,
        to_field_id: impl Into<String>,
        to_start_date: NaiveDate,
        to_area: Option<f64>,
    ) -> Self {
        Self {
            allocation_id: allocation_id.into(),
            action: MoveAction::Move {
                to_field_id: to_field_id.into(),
                to_start_date,
                to_area,
            },
        }
    }
}

/// 被拒绝的移动（带显式原因）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedMove {
    pub instruction: MoveInstruction,
    pub reason: String,
}

/// 被用户删除的时段: 重新优化时该地块在此窗口内不再安排新分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedSlot {
    pub field_id: String,
    pub start_date: NaiveDate,
    pub completion_date: NaiveDate, // 半开终点
}

impl ExcludedSlot {
    pub fn from_allocation(allocation: &CropAllocation) -> Self {
        Self {
            field_id: allocation.field_id().to_string(),
            start_date: allocation.start_date,
            completion_date: allocation.completion_date,
        }
    }

    /// 同地块且窗口与该时段重叠
    pub fn blocks(&self, allocation: &CropAllocation) -> bool {
        allocation.field_id() == self.field_id
            && allocation.start_date < self.completion_date
            && self.start_date < allocation.completion_date
    }
}

/// adjust 结果
#[derive(Debug, Clone)]
pub struct AdjustmentResult {
    pub schedule: OptimizationSchedule,
    pub applied_moves: Vec<MoveInstruction>,
    pub rejected_moves: Vec<RejectedMove>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_instruction_json_shape() {
        let json = r#"{"allocation_id":"A1","action":"move","to_field_id":"F2","to_start_date":"2025-04-01"}"#;
        let instruction: MoveInstruction = serde_json::from_str(json).unwrap();
        assert_eq!(
            instruction,
            MoveInstruction::move_to("A1", "F2", NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), None)
        );

        let json = r#"{"allocation_id":"A2","action":"remove"}"#;
        let instruction: MoveInstruction = serde_json::from_str(json).unwrap();
        assert_eq!(instruction, MoveInstruction::remove("A2"));
    }

    #[test]
    fn test_excluded_slot_blocks_overlapping_windows_on_same_field() {
        use crate::domain::allocation::GrowthOutcome;
        use crate::domain::crop::Crop;
        use crate::domain::field::Field;
        use crate::domain::types::CostModel;
        use std::sync::Arc;

        let date = |m: u32, d: u32| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        let f1 = Arc::new(Field::new("F1", "F1", 1000.0, 10.0).unwrap());
        let f2 = Arc::new(Field::new("F2", "F2", 1000.0, 10.0).unwrap());
        let rice = Arc::new(Crop::new("rice", "水稻"));
        let wheat = Arc::new(Crop::new("wheat", "小麦"));
        let make = |field: &Arc<Field>, crop: &Arc<Crop>, start: NaiveDate, end: NaiveDate| {
            CropAllocation::try_new(
                field.clone(),
                crop.clone(),
                500.0,
                &GrowthOutcome {
                    start_date: start,
                    completion_date: end,
                    accumulated_gdd: 0.0,
                    yield_factor: 1.0,
                    stress: Default::default(),
                },
                CostModel::FieldFixed,
            )
            .unwrap()
        };

        let slot = ExcludedSlot::from_allocation(&make(&f1, &rice, date(4, 10), date(4, 20)));

        assert!(slot.blocks(&make(&f1, &rice, date(4, 1), date(4, 11))));
        assert!(slot.blocks(&make(&f1, &wheat, date(4, 15), date(4, 25))));
        // 半开窗口: 首尾相接不算重叠
        assert!(!slot.blocks(&make(&f1, &rice, date(4, 20), date(4, 30))));
        assert!(!slot.blocks(&make(&f1, &rice, date(3, 31), date(4, 10))));
        assert!(!slot.blocks(&make(&f2, &rice, date(4, 10), date(4, 20))));
    }
}
