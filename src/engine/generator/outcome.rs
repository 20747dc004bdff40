use crate::domain::timetable::TimetableEntry;
use crate::domain::types::SessionKind;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 未排原因
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnassignedReason {
    NoEligibleFaculty,     // 课程无有效授课资格
    NoCompatibleClassroom, // 没有满足课型与容量的教室
    NoFreeSlot,            // 搜索空间耗尽
}

impl UnassignedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnassignedReason::NoEligibleFaculty => "NO_ELIGIBLE_FACULTY",
            UnassignedReason::NoCompatibleClassroom => "NO_COMPATIBLE_CLASSROOM",
            UnassignedReason::NoFreeSlot => "NO_FREE_SLOT",
        }
    }
}

impl fmt::Display for UnassignedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 未排需求单元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignedUnit {
    pub batch_id: String,
    pub subject_id: String,
    pub kind: SessionKind,
    pub unit_index: u32, // 该 (班级, 课程, 课型) 下的第几个课次，从 0 开始
    pub reason: UnassignedReason,
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub requirement_units: u32,
    pub candidates_examined: u64,
    pub reserved_slots: u32,         // 其他已发布课表预占用的时间片
    pub cross_check_mismatches: u32, // 占用索引与冲突检测结论不一致次数（应为 0）
}

// ==========================================
// GenerationOutcome - 生成结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub entries: Vec<TimetableEntry>,
    pub unassigned: Vec<UnassignedUnit>,
    pub stats: GenerationStats,
}

impl GenerationOutcome {
    pub fn unassigned_count(&self) -> usize {
        self.unassigned.len()
    }

    pub fn is_complete(&self) -> bool {
        self.unassigned.is_empty()
    }
}
