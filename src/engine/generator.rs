// ==========================================
// 教学排课系统 - 课表生成引擎
// ==========================================
// 红线: 贪心 + 固定遍历顺序，不回溯
// 红线: 实验课必须实验室；容量 >= 班级人数
// 红线: 单个需求单元排不下不影响整体，计入未排数量
// ==========================================
// 职责: (班级, 课程) 需求展开 -> 逐单元搜索 星期 × 时间片 × 候选教师 × 教室
// 输入: 课表 + 班级 + 课程 + 教师资格 + 教室 + 时间片目录
// 输出: 课表明细 + 未排单元（含原因）
// ==========================================

mod core;
mod outcome;

#[cfg(test)]
mod tests;

pub use self::core::{GenerationInput, GenerationOptions, TimetableGenerator};
pub use outcome::{GenerationOutcome, GenerationStats, UnassignedReason, UnassignedUnit};
