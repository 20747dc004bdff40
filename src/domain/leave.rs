// ==========================================
// 教学排课系统 - 请假领域模型
// ==========================================
// 请假审批通过后触发代课级联；驳回/撤销时取消全部未完结邀约
// ==========================================

use crate::domain::types::LeaveStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub leave_id: String,
    pub faculty_id: String,
    pub start_date: NaiveDate,       // 起始日期（含）
    pub end_date: NaiveDate,         // 结束日期（含）
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub reviewed_by: Option<String>, // 审批人
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl LeaveRequest {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// 按日期升序遍历请假区间（含首尾）
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |d| *d <= self.end_date)
    }
}
