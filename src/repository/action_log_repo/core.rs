use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::fmt_ts;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ActionLogRepository - 审计日志仓储
// ==========================================
// 只追加；业务写入方通过 insert_tx 与审计记录同事务提交
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 独立写入一条日志，返回 action_id
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, log)?;
        Ok(log.action_id.clone())
    }

    pub fn insert_tx(tx: &Connection, log: &ActionLog) -> RepositoryResult<()> {
        let payload = log.payload_json.as_ref().map(|v| v.to_string());
        tx.execute(
            r#"INSERT INTO action_log
                   (action_id, timetable_id, action_type, action_ts, actor, payload_json, detail)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                log.action_id,
                log.timetable_id,
                log.action_type,
                fmt_ts(log.action_ts),
                log.actor,
                payload,
                log.detail,
            ],
        )?;
        Ok(())
    }
}
