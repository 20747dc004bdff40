// ==========================================
// 教学排课系统 - 请假与代课 API
// ==========================================
// 职责: 请假审批、代课邀约级联、接受/拒绝/指派
// 红线: 接受/指派在写入事务内重新做冲突检测
// 红线: 通知在事务提交后发送，失败只记日志
// ==========================================

mod leave;
mod offers;

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{require_non_empty, validate_leave_range};
use crate::config::{ConfigManager, EngineConfigReader};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::leave::LeaveRequest;
use crate::domain::substitution::SubstitutionOffer;
use crate::domain::timetable::TimetableEntry;
use crate::domain::types::{ActingRole, EntrySource, LeaveStatus, NotificationKind, OfferStatus};
use crate::engine::notifier::{Notification, OptionalNotifier};
use crate::engine::preference::PreferenceRanker;
use crate::engine::substitution::{CascadeContext, OfferEvent, OfferTransition, SubstitutionCascade};
use crate::perf::PerfGuard;
use crate::repository::{
    run_in_transaction, ActionLogRepository, LeaveRequestRepository, ResourceRepository,
    SubstitutionOfferRepository, TimetableEntryRepository,
};

// ==========================================
// 请求与结果
// ==========================================

/// 候选教师对邀约的答复
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferResponse {
    Accept,
    Decline,
}

/// 请假级联结果
#[derive(Debug, Clone, Serialize)]
pub struct LeaveCascadeReport {
    pub leave_id: String,
    pub offers_created: usize,
    /// 无合格候选、直接等待人工指派的邀约数
    pub offers_awaiting_assignment: usize,
    pub offers: Vec<SubstitutionOffer>,
}

/// 答复结果；拒绝且仍有候选时 next_offer 为新建邀约
#[derive(Debug, Clone, Serialize)]
pub struct OfferResponseResult {
    pub offer: SubstitutionOffer,
    pub next_offer: Option<SubstitutionOffer>,
}

/// 请假驳回/撤销结果
#[derive(Debug, Clone, Serialize)]
pub struct LeaveClosure {
    pub leave: LeaveRequest,
    pub offers_cancelled: usize,
    pub entries_removed: usize,
}

// ==========================================
// SubstitutionApi - 请假与代课 API
// ==========================================
pub struct SubstitutionApi {
    conn: Arc<Mutex<Connection>>,
    leave_repo: Arc<LeaveRequestRepository>,
    offer_repo: Arc<SubstitutionOfferRepository>,
    config_manager: Arc<ConfigManager>,
    notifier: OptionalNotifier,
    cascade: SubstitutionCascade,
}

impl SubstitutionApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        leave_repo: Arc<LeaveRequestRepository>,
        offer_repo: Arc<SubstitutionOfferRepository>,
        config_manager: Arc<ConfigManager>,
        notifier: OptionalNotifier,
    ) -> Self {
        Self {
            conn,
            leave_repo,
            offer_repo,
            config_manager,
            notifier,
            cascade: SubstitutionCascade::new(),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_leave(&self, leave_id: &str) -> ApiResult<LeaveRequest> {
        self.leave_repo
            .find_by_id(leave_id)?
            .ok_or_else(|| ApiError::NotFound(format!("请假单{}不存在", leave_id)))
    }

    pub fn list_leaves_for_faculty(&self, faculty_id: &str) -> ApiResult<Vec<LeaveRequest>> {
        Ok(self.leave_repo.find_by_faculty(faculty_id)?)
    }

    pub fn get_offer(&self, offer_id: &str) -> ApiResult<SubstitutionOffer> {
        self.offer_repo
            .find_by_id(offer_id)?
            .ok_or_else(|| ApiError::NotFound(format!("代课邀约{}不存在", offer_id)))
    }

    /// 请假单下全部邀约（含已拒绝/已取消的历史记录）
    pub fn list_offers_for_leave(&self, leave_id: &str) -> ApiResult<Vec<SubstitutionOffer>> {
        Ok(self.offer_repo.find_by_leave(leave_id)?)
    }

    /// 发给该教师、待答复的邀约
    pub fn pending_offers_for_faculty(&self, faculty_id: &str) -> ApiResult<Vec<SubstitutionOffer>> {
        Ok(self.offer_repo.find_pending_for_faculty(faculty_id)?)
    }

    /// 候选人已耗尽、等待人工指派的邀约
    pub fn offers_awaiting_assignment(&self) -> ApiResult<Vec<SubstitutionOffer>> {
        Ok(self.offer_repo.find_awaiting_assignment()?)
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn now() -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn load_offer_tx(tx: &Connection, offer_id: &str) -> ApiResult<SubstitutionOffer> {
        SubstitutionOfferRepository::find_by_id_tx(tx, offer_id)?
            .ok_or_else(|| ApiError::NotFound(format!("代课邀约{}不存在", offer_id)))
    }

    fn load_entry_tx(tx: &Connection, entry_id: &str) -> ApiResult<TimetableEntry> {
        TimetableEntryRepository::find_by_id_tx(tx, entry_id)?
            .ok_or_else(|| ApiError::NotFound(format!("课表明细{}不存在", entry_id)))
    }

    fn require_faculty_tx(tx: &Connection, faculty_id: &str) -> ApiResult<()> {
        match ResourceRepository::find_faculty_tx(tx, faculty_id)? {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("教师{}不存在", faculty_id))),
        }
    }

    /// 组装通知；收件人优先取教师邮箱
    fn notification_tx(
        tx: &Connection,
        faculty_id: &str,
        kind: NotificationKind,
        data: JsonValue,
    ) -> ApiResult<Notification> {
        let recipient = ResourceRepository::find_faculty_tx(tx, faculty_id)?
            .and_then(|f| f.email)
            .filter(|email| !email.trim().is_empty())
            .unwrap_or_else(|| faculty_id.to_string());
        Ok(Notification {
            recipient,
            faculty_id: faculty_id.to_string(),
            kind,
            data,
        })
    }

    fn offer_payload(offer: &SubstitutionOffer, entry: &TimetableEntry) -> JsonValue {
        serde_json::json!({
            "offer_id": offer.offer_id,
            "leave_id": offer.leave_id,
            "entry_id": entry.entry_id,
            "subject_id": entry.subject_id,
            "batch_id": entry.batch_id,
            "classroom_id": entry.classroom_id,
            "sub_date": offer.sub_date,
            "slot": entry.time_label(),
            "original_faculty_id": offer.original_faculty_id,
            "substitute_faculty_id": offer.substitute_faculty_id,
        })
    }

    fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            self.notifier.notify_best_effort(notification);
        }
    }
}
