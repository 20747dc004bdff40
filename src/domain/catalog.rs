// ==========================================
// 教学排课系统 - 时间片目录
// ==========================================
// 职责: 固定日课表网格（工作日 × 时间片）
// 说明: 时间片不按实体持久化，由配置 time_slot_catalog 给出
// ==========================================

use crate::domain::types::DayOfWeek;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// 半开区间 [start, end) 是否相交
///
/// 端点相接（10:00-11:00 与 11:00-12:00）不算相交。
pub fn time_ranges_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

// ==========================================
// TimeSlot - 时间片
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub slot_no: u32,      // 目录内序号（即遍历顺序）
    pub start: NaiveTime,  // 开始时间
    pub end: NaiveTime,    // 结束时间（不含）
}

impl TimeSlot {
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        time_ranges_overlap(self.start, self.end, start, end)
    }

    /// 展示用标签，如 "09:00-10:00"
    pub fn label(&self) -> String {
        format!("{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

// ==========================================
// TimeSlotCatalog - 周课表网格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotCatalog {
    days: Vec<DayOfWeek>,
    slots: Vec<TimeSlot>,
}

impl TimeSlotCatalog {
    /// 构造并校验目录
    ///
    /// # 校验
    /// - 至少一个工作日、一个时间片
    /// - 工作日不重复
    /// - 每个时间片 start < end，且时间片之间互不相交
    pub fn new(days: Vec<DayOfWeek>, ranges: Vec<(NaiveTime, NaiveTime)>) -> Result<Self, String> {
        if days.is_empty() {
            return Err("工作日列表不能为空".to_string());
        }
        if ranges.is_empty() {
            return Err("时间片目录不能为空".to_string());
        }
        for (i, d) in days.iter().enumerate() {
            if days[..i].contains(d) {
                return Err(format!("工作日重复: {}", d));
            }
        }

        let mut slots = Vec::with_capacity(ranges.len());
        for (idx, (start, end)) in ranges.into_iter().enumerate() {
            if start >= end {
                return Err(format!(
                    "时间片{}非法: start={} 不早于 end={}",
                    idx,
                    start.format("%H:%M"),
                    end.format("%H:%M")
                ));
            }
            if let Some(other) = slots.iter().find(|s: &&TimeSlot| s.overlaps(start, end)) {
                return Err(format!(
                    "时间片{}-{}与{}相交",
                    start.format("%H:%M"),
                    end.format("%H:%M"),
                    other.label()
                ));
            }
            slots.push(TimeSlot {
                slot_no: idx as u32,
                start,
                end,
            });
        }

        Ok(Self { days, slots })
    }

    /// 默认目录: 周一至周五，09:00-13:00 与 14:00-17:00 每小时一节（13:00-14:00 午休）
    pub fn default_catalog() -> Self {
        let hours = [9u32, 10, 11, 12, 14, 15, 16];
        let slots = hours
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| {
                Some(TimeSlot {
                    slot_no: idx as u32,
                    start: NaiveTime::from_hms_opt(*h, 0, 0)?,
                    end: NaiveTime::from_hms_opt(*h + 1, 0, 0)?,
                })
            })
            .collect();

        Self {
            days: vec![
                DayOfWeek::Mon,
                DayOfWeek::Tue,
                DayOfWeek::Wed,
                DayOfWeek::Thu,
                DayOfWeek::Fri,
            ],
            slots,
        }
    }

    pub fn days(&self) -> &[DayOfWeek] {
        &self.days
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn is_working_day(&self, day: DayOfWeek) -> bool {
        self.days.contains(&day)
    }

    /// 周内可用时间片总数
    pub fn weekly_capacity(&self) -> usize {
        self.days.len() * self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        assert!(!time_ranges_overlap(t(10, 0), t(11, 0), t(11, 0), t(12, 0)));
        assert!(!time_ranges_overlap(t(11, 0), t(12, 0), t(10, 0), t(11, 0)));
        assert!(time_ranges_overlap(t(10, 0), t(11, 0), t(10, 30), t(11, 30)));
        assert!(time_ranges_overlap(t(10, 0), t(12, 0), t(10, 30), t(11, 0)));
    }

    #[test]
    fn test_default_catalog_has_lunch_gap() {
        let catalog = TimeSlotCatalog::default_catalog();
        assert_eq!(catalog.days().len(), 5);
        assert_eq!(catalog.slots().len(), 7);
        assert!(catalog
            .slots()
            .iter()
            .all(|s| !s.overlaps(t(13, 0), t(14, 0))));
        assert_eq!(catalog.weekly_capacity(), 35);
        assert_eq!(catalog.slots()[4].label(), "14:00-15:00");
    }

    #[test]
    fn test_catalog_rejects_overlapping_slots() {
        let result = TimeSlotCatalog::new(
            vec![DayOfWeek::Mon],
            vec![(t(9, 0), t(10, 0)), (t(9, 30), t(10, 30))],
        );
        assert!(result.is_err());

        let result = TimeSlotCatalog::new(vec![DayOfWeek::Mon], vec![(t(10, 0), t(9, 0))]);
        assert!(result.is_err());

        let result = TimeSlotCatalog::new(
            vec![DayOfWeek::Mon, DayOfWeek::Mon],
            vec![(t(9, 0), t(10, 0))],
        );
        assert!(result.is_err());
    }
}
