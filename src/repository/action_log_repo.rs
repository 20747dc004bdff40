// ==========================================
// 教学排课系统 - 操作日志数据仓储
// ==========================================
// 红线: 所有写入必须记录
// 业务写入与审计日志同事务提交，使用 insert_tx
// ==========================================

mod core;
mod queries;


pub use self::core::ActionLogRepository;
