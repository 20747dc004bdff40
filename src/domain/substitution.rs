// ==========================================
// 教学排课系统 - 代课邀约领域模型
// ==========================================
// 一条邀约 = 一次课（课表明细）在一个具体日期上的代课人选
// 红线: 同一 (明细, 日期) 任一时刻只有一条活跃邀约
// ==========================================

use crate::domain::types::OfferStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionOffer {
    pub offer_id: String,
    pub entry_id: String,                      // 受影响的课表明细
    pub leave_id: String,                      // 来源请假单
    pub original_faculty_id: String,           // 请假教师
    pub substitute_faculty_id: Option<String>, // 当前邀约对象（None = 待人工指派）
    pub sub_date: NaiveDate,                   // 代课日期
    pub status: OfferStatus,
    pub declined_faculty_ids: Vec<String>,     // 已拒绝的候选人（沿级联链累积）
    pub previous_offer_id: Option<String>,     // 级联前一条邀约
    pub substitute_entry_id: Option<String>,   // 接受/指派后生成的代课明细
    pub resolved_by: Option<String>,           // 接受人或指派人
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SubstitutionOffer {
    /// 是否仍在等待人工指派（候选人已耗尽）
    pub fn awaits_manual_assignment(&self) -> bool {
        self.status == OfferStatus::Pending && self.substitute_faculty_id.is_none()
    }
}
