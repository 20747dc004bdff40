// ==========================================
// 教学排课系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 排课与代课引擎（实体维护、鉴权、通知投递在外部）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 操作耗时与 SQL 统计
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ActingRole, DayOfWeek, EntrySource, LeaveStatus, OfferStatus, SessionKind, TimetableStatus,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Batch, Classroom, EntryDraft, Faculty, FacultyEligibility, LeaveRequest,
    Subject, SubstitutionOffer, TimeSlotCatalog, Timetable, TimetableEntry,
};

// 引擎
pub use engine::{
    ConflictDetector, PreferenceRanker, SlotAssignmentTracker, SubstitutionCascade,
    TimetableGenerator,
};

// API
pub use api::{ApiError, ApiResult, SubstitutionApi, TimetableApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "教学排课系统";
