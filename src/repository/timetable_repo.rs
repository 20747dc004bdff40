// ==========================================
// 教学排课系统 - 课表数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: *_tx 函数接受事务内连接，供 API 层在一个事务中组合检查与写入
// ==========================================

mod entry;
mod timetable;


pub use entry::TimetableEntryRepository;
pub use timetable::TimetableRepository;
