// ==========================================
// 教学排课系统 - 时间片占用索引
// ==========================================
// 职责: 单次生成过程内的 (资源类型, 资源ID, 星期, 时间片) 占用表
// 说明: 不持久化，不共享；由生成过程独占并显式传递
// 等价性: 与 ConflictDetector 在生成过程内的每个候选上结论一致
// ==========================================

use crate::domain::catalog::TimeSlotCatalog;
use crate::domain::timetable::TimetableEntry;
use crate::domain::types::{DayOfWeek, ResourceKind};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct SlotAssignmentTracker {
    occupied: HashMap<(ResourceKind, DayOfWeek, u32), HashSet<String>>,
}

impl SlotAssignmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_free(&self, kind: ResourceKind, resource_id: &str, day: DayOfWeek, slot_no: u32) -> bool {
        self.occupied
            .get(&(kind, day, slot_no))
            .map_or(true, |ids| !ids.contains(resource_id))
    }

    pub fn mark_occupied(&mut self, kind: ResourceKind, resource_id: &str, day: DayOfWeek, slot_no: u32) {
        self.occupied
            .entry((kind, day, slot_no))
            .or_default()
            .insert(resource_id.to_string());
    }

    /// 一次提交同时占用教师、班级、教室
    pub fn occupy(
        &mut self,
        faculty_id: &str,
        batch_id: &str,
        classroom_id: &str,
        day: DayOfWeek,
        slot_no: u32,
    ) {
        self.mark_occupied(ResourceKind::Faculty, faculty_id, day, slot_no);
        self.mark_occupied(ResourceKind::Batch, batch_id, day, slot_no);
        self.mark_occupied(ResourceKind::Classroom, classroom_id, day, slot_no);
    }

    /// 预占用: 已提交明细占据其时间范围内相交的全部时间片
    ///
    /// 明细的时间不必与目录对齐；只要相交即视为占用。
    /// 返回被占用的时间片数量。
    pub fn reserve_entry(&mut self, entry: &TimetableEntry, catalog: &TimeSlotCatalog) -> usize {
        let mut count = 0;
        for slot in catalog.slots() {
            if slot.overlaps(entry.start_time, entry.end_time) {
                self.occupy(
                    &entry.faculty_id,
                    &entry.batch_id,
                    &entry.classroom_id,
                    entry.day,
                    slot.slot_no,
                );
                count += 1;
            }
        }
        count
    }

    /// 已占用的 (资源, 星期, 时间片) 总数
    pub fn occupied_count(&self) -> usize {
        self.occupied.values().map(HashSet::len).sum()
    }
}
