// ==========================================
// 教学排课系统 - 仓储层错误
// ==========================================
// 约定: rusqlite 的约束失败按消息归类（UNIQUE / FOREIGN KEY）
// 活跃邀约唯一索引冲突会以 UniqueConstraintViolation 上抛
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 课表版本 =====
    #[error("课表revision不一致: timetable_id={timetable_id}, 期望={expected}, 实际={actual}")]
    OptimisticLockFailure {
        timetable_id: String,
        expected: i32,
        actual: i32,
    },

    // ===== 状态机 =====
    #[error("状态不允许迁移: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("{entity}不存在: id={id}")]
    NotFound { entity: String, id: String },

    // ===== SQLite =====
    #[error("连接锁获取失败: {0}")]
    LockError(String),

    #[error("事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 行数据 =====
    #[error("字段{field}取值非法: {message}")]
    FieldValueError { field: String, message: String },
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                RepositoryError::UniqueConstraintViolation(msg)
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("FOREIGN KEY") => {
                RepositoryError::ForeignKeyViolation(msg)
            }
            rusqlite::Error::FromSqlConversionFailure(idx, _, e) => RepositoryError::FieldValueError {
                field: format!("column#{}", idx),
                message: e.to_string(),
            },
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
