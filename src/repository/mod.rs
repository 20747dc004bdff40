// ==========================================
// 教学排课系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: `_tx` 关联函数接受调用方事务，供 API 层组合"检查 + 写入"
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod leave_repo;
pub mod resource_repo;
pub mod row_codec;
pub mod substitution_repo;
pub mod timetable_repo;
pub mod transaction;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use leave_repo::LeaveRequestRepository;
pub use resource_repo::ResourceRepository;
pub use substitution_repo::SubstitutionOfferRepository;
pub use timetable_repo::{TimetableEntryRepository, TimetableRepository};
pub use transaction::run_in_transaction;
