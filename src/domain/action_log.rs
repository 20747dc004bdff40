// ==========================================
// 教学排课系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪（生成、人工调整、状态迁移、代课级联）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,            // 日志ID
    pub timetable_id: Option<String>, // 关联课表（请假/配置类操作可为None）
    pub action_type: String,          // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,     // 操作时间戳
    pub actor: String,                // 操作人

    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 简要描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateTimetable,   // 创建课表
    GenerateTimetable, // 自动生成
    AddManualEntry,    // 人工录入
    RemoveEntry,       // 删除明细
    StatusTransition,  // 生命周期迁移
    LeaveSubmitted,    // 提交请假
    LeaveApproved,     // 请假通过（触发级联）
    LeaveCancelled,    // 请假撤销/驳回
    OfferAccepted,     // 代课接受
    OfferDeclined,     // 代课拒绝
    OfferAssigned,     // 代课指派
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateTimetable => "CreateTimetable",
            ActionType::GenerateTimetable => "GenerateTimetable",
            ActionType::AddManualEntry => "AddManualEntry",
            ActionType::RemoveEntry => "RemoveEntry",
            ActionType::StatusTransition => "StatusTransition",
            ActionType::LeaveSubmitted => "LeaveSubmitted",
            ActionType::LeaveApproved => "LeaveApproved",
            ActionType::LeaveCancelled => "LeaveCancelled",
            ActionType::OfferAccepted => "OfferAccepted",
            ActionType::OfferDeclined => "OfferDeclined",
            ActionType::OfferAssigned => "OfferAssigned",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CreateTimetable" => Some(ActionType::CreateTimetable),
            "GenerateTimetable" => Some(ActionType::GenerateTimetable),
            "AddManualEntry" => Some(ActionType::AddManualEntry),
            "RemoveEntry" => Some(ActionType::RemoveEntry),
            "StatusTransition" => Some(ActionType::StatusTransition),
            "LeaveSubmitted" => Some(ActionType::LeaveSubmitted),
            "LeaveApproved" => Some(ActionType::LeaveApproved),
            "LeaveCancelled" => Some(ActionType::LeaveCancelled),
            "OfferAccepted" => Some(ActionType::OfferAccepted),
            "OfferDeclined" => Some(ActionType::OfferDeclined),
            "OfferAssigned" => Some(ActionType::OfferAssigned),
            _ => None,
        }
    }
}

impl ActionLog {
    /// 创建新的操作日志（ID 自动生成）
    pub fn new(timetable_id: Option<String>, action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            timetable_id,
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
