// ==========================================
// 教学排课系统 - 冲突检测引擎
// ==========================================
// 职责: 判断候选排课是否与已提交明细冲突
// 规则: 同一天 AND 共享资源（教师/班级/教室任一）AND 时间相交
// 时间区间按半开 [start, end) 处理，端点相接不算冲突
// 使用方: 自动生成（交叉校验）、人工录入、代课接受/指派、发布前审计
// ==========================================

use crate::domain::catalog::time_ranges_overlap;
use crate::domain::timetable::TimetableEntry;
use crate::domain::types::DayOfWeek;
use chrono::{Datelike, NaiveDate, NaiveTime};

// ==========================================
// SlotClaim - 候选占用
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotClaim<'a> {
    pub day: DayOfWeek,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub faculty_id: &'a str,
    pub batch_id: &'a str,
    pub classroom_id: &'a str,
}

impl<'a> SlotClaim<'a> {
    /// 以现有明细为模板，换成另一位教师（代课场景）
    pub fn for_substitute(entry: &'a TimetableEntry, faculty_id: &'a str) -> Self {
        Self {
            faculty_id,
            ..SlotClaim::from(entry)
        }
    }

    fn shares_resource_with(&self, entry: &TimetableEntry) -> bool {
        entry.faculty_id == self.faculty_id
            || entry.batch_id == self.batch_id
            || entry.classroom_id == self.classroom_id
    }
}

impl<'a> From<&'a TimetableEntry> for SlotClaim<'a> {
    fn from(entry: &'a TimetableEntry) -> Self {
        Self {
            day: entry.day,
            start: entry.start_time,
            end: entry.end_time,
            faculty_id: &entry.faculty_id,
            batch_id: &entry.batch_id,
            classroom_id: &entry.classroom_id,
        }
    }
}

// ==========================================
// ConflictDetector - 冲突检测引擎
// ==========================================
// 纯查询，无副作用
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector {}

impl ConflictDetector {
    pub fn new() -> Self {
        Self {}
    }

    /// 单条明细与候选是否冲突
    pub fn collides(&self, existing: &TimetableEntry, candidate: &SlotClaim<'_>) -> bool {
        existing.day == candidate.day
            && candidate.shares_resource_with(existing)
            && time_ranges_overlap(
                candidate.start,
                candidate.end,
                existing.start_time,
                existing.end_time,
            )
    }

    /// 返回与候选冲突的全部周明细
    ///
    /// 只比较每周重复的明细；按日期生效的代课明细请使用 [`Self::find_conflicts_on_date`]。
    pub fn find_conflicts<'e>(
        &self,
        existing: &'e [TimetableEntry],
        candidate: &SlotClaim<'_>,
    ) -> Vec<&'e TimetableEntry> {
        existing
            .iter()
            .filter(|e| e.is_weekly() && self.collides(e, candidate))
            .collect()
    }

    pub fn has_conflict(&self, existing: &[TimetableEntry], candidate: &SlotClaim<'_>) -> bool {
        existing
            .iter()
            .any(|e| e.is_weekly() && self.collides(e, candidate))
    }

    /// 具体日期上的冲突（代课检查）
    ///
    /// 星期由日期推导，候选自带的 day 被忽略。
    /// 周明细按星期匹配；代课明细只在其生效日期参与比较。
    pub fn find_conflicts_on_date<'e>(
        &self,
        existing: &'e [TimetableEntry],
        date: NaiveDate,
        candidate: &SlotClaim<'_>,
    ) -> Vec<&'e TimetableEntry> {
        let on_date = SlotClaim {
            day: DayOfWeek::from(date.weekday()),
            ..*candidate
        };
        existing
            .iter()
            .filter(|e| match e.substitution_date {
                None => true,
                Some(d) => d == date,
            })
            .filter(|e| self.collides(e, &on_date))
            .collect()
    }

    /// 全量两两审计（发布前）
    ///
    /// # 返回
    /// 互相冲突的明细对，按输入顺序 (前, 后)
    pub fn audit<'e>(&self, entries: &'e [TimetableEntry]) -> Vec<(&'e TimetableEntry, &'e TimetableEntry)> {
        let weekly: Vec<&TimetableEntry> = entries.iter().filter(|e| e.is_weekly()).collect();
        let mut pairs = Vec::new();
        for (i, a) in weekly.iter().enumerate() {
            let claim = SlotClaim::from(*a);
            for b in &weekly[i + 1..] {
                if self.collides(b, &claim) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EntrySource, SessionKind};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn entry(id: &str, day: DayOfWeek, start: NaiveTime, end: NaiveTime, f: &str, b: &str, c: &str) -> TimetableEntry {
        TimetableEntry {
            entry_id: id.to_string(),
            timetable_id: "TT1".to_string(),
            day,
            start_time: start,
            end_time: end,
            subject_id: "S1".to_string(),
            faculty_id: f.to_string(),
            batch_id: b.to_string(),
            classroom_id: c.to_string(),
            kind: SessionKind::Lecture,
            source: EntrySource::Manual,
            is_substitution: false,
            original_faculty_id: None,
            substitution_date: None,
        }
    }

    fn claim<'a>(day: DayOfWeek, start: NaiveTime, end: NaiveTime, f: &'a str, b: &'a str, c: &'a str) -> SlotClaim<'a> {
        SlotClaim {
            day,
            start,
            end,
            faculty_id: f,
            batch_id: b,
            classroom_id: c,
        }
    }

    #[test]
    fn test_each_resource_axis_conflicts() {
        let detector = ConflictDetector::new();
        let existing = vec![entry("E1", DayOfWeek::Mon, t(10, 0), t(11, 0), "F1", "B1", "R1")];

        // 同教师
        assert!(detector.has_conflict(&existing, &claim(DayOfWeek::Mon, t(10, 30), t(11, 30), "F1", "B2", "R2")));
        // 同班级
        assert!(detector.has_conflict(&existing, &claim(DayOfWeek::Mon, t(10, 0), t(11, 0), "F2", "B1", "R2")));
        // 同教室
        assert!(detector.has_conflict(&existing, &claim(DayOfWeek::Mon, t(9, 30), t(10, 30), "F2", "B2", "R1")));
        // 无共享资源
        assert!(!detector.has_conflict(&existing, &claim(DayOfWeek::Mon, t(10, 0), t(11, 0), "F2", "B2", "R2")));
    }

    #[test]
    fn test_different_day_never_conflicts() {
        let detector = ConflictDetector::new();
        let existing = vec![entry("E1", DayOfWeek::Mon, t(10, 0), t(11, 0), "F1", "B1", "R1")];
        assert!(!detector.has_conflict(&existing, &claim(DayOfWeek::Tue, t(10, 0), t(11, 0), "F1", "B1", "R1")));
    }

    #[test]
    fn test_touching_boundaries_are_free() {
        let detector = ConflictDetector::new();
        let existing = vec![entry("E1", DayOfWeek::Mon, t(10, 0), t(11, 0), "F1", "B1", "R1")];
        assert!(!detector.has_conflict(&existing, &claim(DayOfWeek::Mon, t(11, 0), t(12, 0), "F1", "B1", "R1")));
        assert!(!detector.has_conflict(&existing, &claim(DayOfWeek::Mon, t(9, 0), t(10, 0), "F1", "B1", "R1")));
    }

    #[test]
    fn test_find_conflicts_lists_every_collision() {
        let detector = ConflictDetector::new();
        let existing = vec![
            entry("E1", DayOfWeek::Mon, t(10, 0), t(11, 0), "F1", "B1", "R1"),
            entry("E2", DayOfWeek::Mon, t(10, 0), t(11, 0), "F2", "B2", "R2"),
            entry("E3", DayOfWeek::Mon, t(11, 0), t(12, 0), "F1", "B1", "R1"),
        ];
        let found = detector.find_conflicts(&existing, &claim(DayOfWeek::Mon, t(10, 0), t(11, 0), "F1", "B9", "R2"));
        let ids: Vec<&str> = found.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["E1", "E2"]);
    }

    #[test]
    fn test_date_check_uses_weekday_and_dated_entries() {
        let detector = ConflictDetector::new();
        // 2026-10-19 是周一
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();

        let mut dated = entry("SUB1", DayOfWeek::Mon, t(14, 0), t(15, 0), "G", "B5", "R5");
        dated.is_substitution = true;
        dated.substitution_date = Some(monday);
        let existing = vec![entry("E1", DayOfWeek::Mon, t(10, 0), t(11, 0), "G", "B1", "R1"), dated];

        // 候选自带的 day 被日期覆盖
        let c = claim(DayOfWeek::Fri, t(10, 0), t(11, 0), "G", "B2", "R2");
        assert_eq!(detector.find_conflicts_on_date(&existing, monday, &c).len(), 1);

        let afternoon = claim(DayOfWeek::Mon, t(14, 30), t(15, 30), "G", "B2", "R2");
        assert_eq!(detector.find_conflicts_on_date(&existing, monday, &afternoon).len(), 1);
        assert!(detector.find_conflicts_on_date(&existing, next_monday, &afternoon).is_empty());

        // 周明细检查忽略代课明细
        assert!(!detector.has_conflict(&existing, &afternoon));
    }

    #[test]
    fn test_audit_reports_colliding_pairs() {
        let detector = ConflictDetector::new();
        let entries = vec![
            entry("E1", DayOfWeek::Mon, t(10, 0), t(11, 0), "F1", "B1", "R1"),
            entry("E2", DayOfWeek::Mon, t(11, 0), t(12, 0), "F1", "B1", "R1"),
            entry("E3", DayOfWeek::Mon, t(10, 30), t(11, 30), "F3", "B3", "R1"),
        ];
        let pairs = detector.audit(&entries);
        let ids: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(a, b)| (a.entry_id.as_str(), b.entry_id.as_str()))
            .collect();
        assert_eq!(ids, vec![("E1", "E3"), ("E2", "E3")]);
    }
}
