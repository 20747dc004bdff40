// ==========================================
// 教学排课系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod catalog;
pub mod leave;
pub mod resource;
pub mod substitution;
pub mod timetable;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use catalog::{time_ranges_overlap, TimeSlot, TimeSlotCatalog};
pub use leave::LeaveRequest;
pub use resource::{Batch, Classroom, Faculty, FacultyEligibility, SessionRequirement, Subject};
pub use substitution::SubstitutionOffer;
pub use timetable::{EntryDraft, Timetable, TimetableEntry};
pub use types::{
    ActingRole, DayOfWeek, EntrySource, LeaveStatus, NotificationKind, OfferStatus, ResourceKind,
    SessionKind, TimetableStatus,
};
