// ==========================================
// 教学排课系统 - 请假单仓储
// ==========================================

use crate::domain::leave::LeaveRequest;
use crate::domain::types::LeaveStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{fmt_date, fmt_ts, get_date, get_enum, get_ts};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT leave_id, faculty_id, start_date, end_date, reason,
                                       status, reviewed_by, created_at, updated_at
                                FROM leave_request"#;

pub struct LeaveRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LeaveRequestRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert_tx(tx: &Connection, leave: &LeaveRequest) -> RepositoryResult<()> {
        tx.execute(
            r#"INSERT INTO leave_request (
                leave_id, faculty_id, start_date, end_date, reason,
                status, reviewed_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &leave.leave_id,
                &leave.faculty_id,
                fmt_date(leave.start_date),
                fmt_date(leave.end_date),
                &leave.reason,
                leave.status.to_db_str(),
                &leave.reviewed_by,
                fmt_ts(leave.created_at),
                fmt_ts(leave.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, leave_id: &str) -> RepositoryResult<Option<LeaveRequest>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, leave_id)
    }

    pub fn find_by_id_tx(tx: &Connection, leave_id: &str) -> RepositoryResult<Option<LeaveRequest>> {
        let sql = format!("{} WHERE leave_id = ?", SELECT_COLUMNS);
        Ok(tx.query_row(&sql, params![leave_id], Self::map_row).optional()?)
    }

    /// 教师的请假单（起始日期升序）
    pub fn find_by_faculty(&self, faculty_id: &str) -> RepositoryResult<Vec<LeaveRequest>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE faculty_id = ? ORDER BY start_date, leave_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let leaves = stmt
            .query_map(params![faculty_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(leaves)
    }

    /// 更新审批状态
    ///
    /// 仅当当前状态等于 `expected` 时生效，否则返回 InvalidStateTransition
    pub fn update_status_tx(
        tx: &Connection,
        leave_id: &str,
        expected: LeaveStatus,
        status: LeaveStatus,
        reviewed_by: &str,
    ) -> RepositoryResult<()> {
        let rows = tx.execute(
            r#"UPDATE leave_request
               SET status = ?, reviewed_by = ?, updated_at = datetime('now', 'localtime')
               WHERE leave_id = ? AND status = ?"#,
            params![status.to_db_str(), reviewed_by, leave_id, expected.to_db_str()],
        )?;

        if rows == 0 {
            return match Self::find_by_id_tx(tx, leave_id)? {
                None => Err(RepositoryError::not_found("LeaveRequest", leave_id)),
                Some(current) => Err(RepositoryError::InvalidStateTransition {
                    from: current.status.to_string(),
                    to: status.to_string(),
                }),
            };
        }
        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<LeaveRequest> {
        Ok(LeaveRequest {
            leave_id: row.get(0)?,
            faculty_id: row.get(1)?,
            start_date: get_date(row, 2)?,
            end_date: get_date(row, 3)?,
            reason: row.get(4)?,
            status: get_enum(row, 5, LeaveStatus::from_db_str)?,
            reviewed_by: row.get(6)?,
            created_at: get_ts(row, 7)?,
            updated_at: get_ts(row, 8)?,
        })
    }
}
