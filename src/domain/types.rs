// ==========================================
// 教学排课系统 - 领域类型定义
// ==========================================
// 职责: 星期、课型、生命周期状态等枚举
// 约定: 数据库存储统一使用 SCREAMING_SNAKE_CASE 字符串
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 星期 (Day Of Week)
// ==========================================
// 顺序即排课遍历顺序: MON < TUE < ... < SUN
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl DayOfWeek {
    /// 全部星期（固定顺序）
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    /// 从字符串解析（兼容 MON / MONDAY / mon）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MON" | "MONDAY" => Some(DayOfWeek::Mon),
            "TUE" | "TUESDAY" => Some(DayOfWeek::Tue),
            "WED" | "WEDNESDAY" => Some(DayOfWeek::Wed),
            "THU" | "THURSDAY" => Some(DayOfWeek::Thu),
            "FRI" | "FRIDAY" => Some(DayOfWeek::Fri),
            "SAT" | "SATURDAY" => Some(DayOfWeek::Sat),
            "SUN" | "SUNDAY" => Some(DayOfWeek::Sun),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "MON",
            DayOfWeek::Tue => "TUE",
            DayOfWeek::Wed => "WED",
            DayOfWeek::Thu => "THU",
            DayOfWeek::Fri => "FRI",
            DayOfWeek::Sat => "SAT",
            DayOfWeek::Sun => "SUN",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }
}

// ==========================================
// 课型 (Session Kind)
// ==========================================
// 红线: 实验课 (PRACTICAL) 必须安排在实验室
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionKind {
    Lecture,   // 理论课
    Tutorial,  // 习题课
    Practical, // 实验课
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl SessionKind {
    /// 需求展开顺序
    pub const ALL: [SessionKind; 3] = [
        SessionKind::Lecture,
        SessionKind::Tutorial,
        SessionKind::Practical,
    ];

    /// 是否必须使用实验室
    pub fn requires_lab(&self) -> bool {
        matches!(self, SessionKind::Practical)
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LECTURE" => Some(SessionKind::Lecture),
            "TUTORIAL" => Some(SessionKind::Tutorial),
            "PRACTICAL" => Some(SessionKind::Practical),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SessionKind::Lecture => "LECTURE",
            SessionKind::Tutorial => "TUTORIAL",
            SessionKind::Practical => "PRACTICAL",
        }
    }
}

// ==========================================
// 课表状态 (Timetable Status)
// ==========================================
// 生命周期: DRAFT -> PENDING_APPROVAL -> APPROVED -> PUBLISHED
// 唯一允许的回退: PENDING_APPROVAL -> DRAFT（重新生成）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimetableStatus {
    Draft,           // 草稿
    PendingApproval, // 待审批
    Approved,        // 已审批
    Published,       // 已发布
}

impl fmt::Display for TimetableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl TimetableStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(TimetableStatus::Draft),
            "PENDING_APPROVAL" => Some(TimetableStatus::PendingApproval),
            "APPROVED" => Some(TimetableStatus::Approved),
            "PUBLISHED" => Some(TimetableStatus::Published),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            TimetableStatus::Draft => "DRAFT",
            TimetableStatus::PendingApproval => "PENDING_APPROVAL",
            TimetableStatus::Approved => "APPROVED",
            TimetableStatus::Published => "PUBLISHED",
        }
    }

    /// 状态迁移是否合法
    pub fn can_transition_to(&self, next: TimetableStatus) -> bool {
        matches!(
            (self, next),
            (TimetableStatus::Draft, TimetableStatus::PendingApproval)
                | (TimetableStatus::PendingApproval, TimetableStatus::Draft)
                | (TimetableStatus::PendingApproval, TimetableStatus::Approved)
                | (TimetableStatus::Approved, TimetableStatus::Published)
        )
    }

    /// 发布前的课表明细允许增删
    pub fn is_editable(&self) -> bool {
        !matches!(self, TimetableStatus::Published)
    }

    /// 仅草稿/待审批允许重新生成
    pub fn allows_generation(&self) -> bool {
        matches!(self, TimetableStatus::Draft | TimetableStatus::PendingApproval)
    }
}

// ==========================================
// 请假状态 (Leave Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LeaveStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(LeaveStatus::Pending),
            "APPROVED" => Some(LeaveStatus::Approved),
            "REJECTED" => Some(LeaveStatus::Rejected),
            "CANCELLED" => Some(LeaveStatus::Cancelled),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
            LeaveStatus::Cancelled => "CANCELLED",
        }
    }
}

// ==========================================
// 代课邀约状态 (Offer Status)
// ==========================================
// PENDING 可迁移至 ACCEPTED / ASSIGNED / DECLINED / CANCELLED
// DECLINED 仅作为历史记录保留（级联后由新邀约接替）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,   // 待响应
    Accepted,  // 教师接受
    Declined,  // 教师拒绝（已级联）
    Assigned,  // 管理员指派
    Cancelled, // 请假撤销/驳回
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OfferStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(OfferStatus::Pending),
            "ACCEPTED" => Some(OfferStatus::Accepted),
            "DECLINED" => Some(OfferStatus::Declined),
            "ASSIGNED" => Some(OfferStatus::Assigned),
            "CANCELLED" => Some(OfferStatus::Cancelled),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Declined => "DECLINED",
            OfferStatus::Assigned => "ASSIGNED",
            OfferStatus::Cancelled => "CANCELLED",
        }
    }

    /// 同一 (课表明细, 日期) 只允许存在一条活跃邀约
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OfferStatus::Pending | OfferStatus::Accepted | OfferStatus::Assigned
        )
    }

    /// 已绑定代课教师
    pub fn is_resolved(&self) -> bool {
        matches!(self, OfferStatus::Accepted | OfferStatus::Assigned)
    }
}

// ==========================================
// 资源类型 (Resource Kind)
// ==========================================
// 冲突检测的三条资源轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Faculty,
    Batch,
    Classroom,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Faculty => write!(f, "FACULTY"),
            ResourceKind::Batch => write!(f, "BATCH"),
            ResourceKind::Classroom => write!(f, "CLASSROOM"),
        }
    }
}

// ==========================================
// 明细来源 (Entry Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrySource {
    Generated,    // 自动生成
    Manual,       // 人工录入
    Substitution, // 代课（按日期生效）
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl EntrySource {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GENERATED" => Some(EntrySource::Generated),
            "MANUAL" => Some(EntrySource::Manual),
            "SUBSTITUTION" => Some(EntrySource::Substitution),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntrySource::Generated => "GENERATED",
            EntrySource::Manual => "MANUAL",
            EntrySource::Substitution => "SUBSTITUTION",
        }
    }
}

// ==========================================
// 操作角色 (Acting Role)
// ==========================================
// 管理员指派代课仅限以下角色；鉴权由外部完成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActingRole {
    Admin,
    DepartmentHead,
}

impl fmt::Display for ActingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActingRole::Admin => write!(f, "ADMIN"),
            ActingRole::DepartmentHead => write!(f, "DEPARTMENT_HEAD"),
        }
    }
}

// ==========================================
// 通知模板 (Notification Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    SubstitutionRequest,  // 代课邀约
    SubstitutionAccepted, // 代课已接受（通知请假教师）
    SubstitutionAssigned, // 代课已指派（通知代课与请假教师）
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::SubstitutionRequest => "SUBSTITUTION_REQUEST",
            NotificationKind::SubstitutionAccepted => "SUBSTITUTION_ACCEPTED",
            NotificationKind::SubstitutionAssigned => "SUBSTITUTION_ASSIGNED",
        }
    }
}
