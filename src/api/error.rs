// ==========================================
// 教学排课系统 - API层错误类型
// ==========================================
// 职责: 统一对外错误分类，转换 Repository / 引擎错误
// 分类: 校验错误 / 冲突错误（附冲突明细）/ 未找到 / 状态错误 / 数据访问错误
// 说明: 生成未排满不是错误，见 GenerationReport.unassigned_count
// ==========================================

use crate::domain::timetable::TimetableEntry;
use crate::engine::substitution::CascadeError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与业务规则错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    /// 与已有课程冲突，conflicts 原样返回给调用方展示
    #[error("排课冲突: {message}（冲突{}条）", .conflicts.len())]
    Conflict {
        message: String,
        conflicts: Vec<TimetableEntry>,
    },

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 当前生命周期状态不允许该操作
    #[error("状态错误: {0}")]
    StateError(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 冲突明细（非冲突错误返回空）
    pub fn conflicts(&self) -> &[TimetableEntry] {
        match self {
            ApiError::Conflict { conflicts, .. } => conflicts,
            _ => &[],
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                timetable_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "课表{}已被其他操作修改（期望revision={}，实际revision={}）",
                timetable_id, expected, actual
            )),

            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            // 活跃邀约唯一索引等
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::StateError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("引用的记录不存在: {}", msg))
            }

            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

// ==========================================
// 从 CascadeError 转换
// ==========================================
impl From<CascadeError> for ApiError {
    fn from(err: CascadeError) -> Self {
        match err {
            CascadeError::ScheduleConflict {
                faculty_id,
                date,
                conflicts,
            } => ApiError::Conflict {
                message: format!("教师{}在{}已有课程", faculty_id, date),
                conflicts,
            },
            other @ CascadeError::OriginalFacultyCannotSubstitute { .. } => {
                ApiError::ValidationError(other.to_string())
            }
            other => ApiError::StateError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
