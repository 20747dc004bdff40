// ==========================================
// 教学排课系统 - API 层
// ==========================================
// 职责: 对外暴露的业务操作（由 CLI/HTTP 层调用）
// 红线: 校验在分配逻辑之前完成；冲突/状态错误原样返回，不自动重试
// ==========================================

pub mod error;
pub mod substitution_api;
pub mod timetable_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use substitution_api::{
    LeaveCascadeReport, LeaveClosure, OfferResponse, OfferResponseResult, SubstitutionApi,
};
pub use timetable_api::{CreateTimetableRequest, GenerationReport, TimetableApi, EXPORT_HEADERS};
