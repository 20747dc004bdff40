// ==========================================
// 教学排课系统 - 课表领域模型
// ==========================================
// 职责: Timetable（课表）与 TimetableEntry（课表明细）
// 红线: 课表发布后，周课表明细不可再增删；代课仅以按日期生效的明细追加
// ==========================================

use crate::domain::types::{DayOfWeek, EntrySource, SessionKind, TimetableStatus};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Timetable - 课表
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timetable {
    pub timetable_id: String,                 // 课表ID
    pub name: String,                         // 名称
    pub department_id: Option<String>,        // 院系（None 表示全校）
    pub semester: i32,                        // 学期
    pub academic_year: String,                // 学年，如 2026-2027
    pub status: TimetableStatus,              // 生命周期状态
    pub revision: i32,                        // 乐观锁：修订号
    pub config_snapshot_json: Option<String>, // 最近一次生成时的配置快照
    pub created_by: String,                   // 创建人
    pub created_at: NaiveDateTime,            // 创建时间
    pub updated_at: NaiveDateTime,            // 更新时间
}

impl Timetable {
    pub fn is_editable(&self) -> bool {
        self.status.is_editable()
    }
}

// ==========================================
// TimetableEntry - 课表明细（一次排课）
// ==========================================
// substitution_date 为空: 每周重复的常规明细
// substitution_date 非空: 仅在该日期生效的代课明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub entry_id: String,
    pub timetable_id: String,
    pub day: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: String,
    pub faculty_id: String,
    pub batch_id: String,
    pub classroom_id: String,
    pub kind: SessionKind,
    pub source: EntrySource,
    pub is_substitution: bool,
    pub original_faculty_id: Option<String>,
    pub substitution_date: Option<NaiveDate>,
}

impl TimetableEntry {
    /// 是否为每周重复的常规明细
    pub fn is_weekly(&self) -> bool {
        self.substitution_date.is_none()
    }

    /// 展示用时间段，如 "MON 10:00-11:00"
    pub fn time_label(&self) -> String {
        format!(
            "{} {}-{}",
            self.day,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

// ==========================================
// EntryDraft - 人工录入的候选明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub day: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: String,
    pub faculty_id: String,
    pub batch_id: String,
    pub classroom_id: String,
    pub kind: SessionKind,
}

impl EntryDraft {
    /// 落为人工明细
    pub fn into_entry(self, entry_id: String, timetable_id: String) -> TimetableEntry {
        TimetableEntry {
            entry_id,
            timetable_id,
            day: self.day,
            start_time: self.start_time,
            end_time: self.end_time,
            subject_id: self.subject_id,
            faculty_id: self.faculty_id,
            batch_id: self.batch_id,
            classroom_id: self.classroom_id,
            kind: self.kind,
            source: EntrySource::Manual,
            is_substitution: false,
            original_faculty_id: None,
            substitution_date: None,
        }
    }
}
