// ==========================================
// 教学排课系统 - 事务边界
// ==========================================
// 红线: 生成（先删后插）与代课迁移（复检 + 写入）必须在同一事务内完成
// 闭包返回 Ok 提交；返回 Err 时事务随 drop 回滚
// ==========================================

use crate::repository::error::RepositoryError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};

/// 在 IMMEDIATE 事务中执行闭包
///
/// IMMEDIATE 在开始时即取得写锁，检查与写入之间不会被其他连接插入写操作。
pub fn run_in_transaction<T, E, F>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<RepositoryError>,
{
    let mut guard = conn
        .lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))?;
    let tx = guard
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

    let value = f(&tx)?;

    tx.commit()
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
    Ok(value)
}
