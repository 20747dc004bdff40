use crate::domain::timetable::Timetable;
use crate::domain::types::TimetableStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{fmt_ts, get_enum, get_ts};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT timetable_id, name, department_id, semester, academic_year,
                                       status, revision, config_snapshot_json,
                                       created_by, created_at, updated_at
                                FROM timetable"#;

// ==========================================
// TimetableRepository - 课表仓储
// ==========================================
pub struct TimetableRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TimetableRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create(&self, timetable: &Timetable) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, timetable)?;
        Ok(timetable.timetable_id.clone())
    }

    pub fn insert_tx(tx: &Connection, timetable: &Timetable) -> RepositoryResult<()> {
        tx.execute(
            r#"INSERT INTO timetable (
                timetable_id, name, department_id, semester, academic_year,
                status, revision, config_snapshot_json,
                created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &timetable.timetable_id,
                &timetable.name,
                &timetable.department_id,
                &timetable.semester,
                &timetable.academic_year,
                timetable.status.to_db_str(),
                &timetable.revision,
                &timetable.config_snapshot_json,
                &timetable.created_by,
                fmt_ts(timetable.created_at),
                fmt_ts(timetable.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, timetable_id: &str) -> RepositoryResult<Option<Timetable>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, timetable_id)
    }

    pub fn find_by_id_tx(tx: &Connection, timetable_id: &str) -> RepositoryResult<Option<Timetable>> {
        let sql = format!("{} WHERE timetable_id = ?", SELECT_COLUMNS);
        Ok(tx
            .query_row(&sql, params![timetable_id], Self::map_row)
            .optional()?)
    }

    /// 按状态查询（创建时间升序）
    pub fn find_by_status(&self, status: TimetableStatus) -> RepositoryResult<Vec<Timetable>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE status = ? ORDER BY created_at, timetable_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let timetables = stmt
            .query_map(params![status.to_db_str()], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(timetables)
    }

    /// 更新状态 (带乐观锁检查)
    ///
    /// # 返回
    /// 新的 revision
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision不匹配
    /// - `RepositoryError::NotFound`: timetable_id不存在
    pub fn update_status_tx(
        tx: &Connection,
        timetable_id: &str,
        expected_revision: i32,
        status: TimetableStatus,
    ) -> RepositoryResult<i32> {
        let rows = tx.execute(
            r#"UPDATE timetable
               SET status = ?, revision = revision + 1, updated_at = datetime('now', 'localtime')
               WHERE timetable_id = ? AND revision = ?"#,
            params![status.to_db_str(), timetable_id, expected_revision],
        )?;
        Self::check_revision(tx, timetable_id, expected_revision, rows)
    }

    /// 记录生成（刷新配置快照，bump revision）
    pub fn mark_generated_tx(
        tx: &Connection,
        timetable_id: &str,
        expected_revision: i32,
        status: TimetableStatus,
        config_snapshot_json: Option<&str>,
    ) -> RepositoryResult<i32> {
        let rows = tx.execute(
            r#"UPDATE timetable
               SET status = ?, config_snapshot_json = ?, revision = revision + 1,
                   updated_at = datetime('now', 'localtime')
               WHERE timetable_id = ? AND revision = ?"#,
            params![status.to_db_str(), config_snapshot_json, timetable_id, expected_revision],
        )?;
        Self::check_revision(tx, timetable_id, expected_revision, rows)
    }

    fn check_revision(
        tx: &Connection,
        timetable_id: &str,
        expected_revision: i32,
        rows_affected: usize,
    ) -> RepositoryResult<i32> {
        let actual: Option<i32> = tx
            .query_row(
                "SELECT revision FROM timetable WHERE timetable_id = ?",
                params![timetable_id],
                |row| row.get(0),
            )
            .optional()?;

        match (rows_affected, actual) {
            (0, Some(actual)) => Err(RepositoryError::OptimisticLockFailure {
                timetable_id: timetable_id.to_string(),
                expected: expected_revision,
                actual,
            }),
            (_, None) => Err(RepositoryError::not_found("Timetable", timetable_id)),
            (_, Some(new_revision)) => Ok(new_revision),
        }
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Timetable> {
        Ok(Timetable {
            timetable_id: row.get(0)?,
            name: row.get(1)?,
            department_id: row.get(2)?,
            semester: row.get(3)?,
            academic_year: row.get(4)?,
            status: get_enum(row, 5, TimetableStatus::from_db_str)?,
            revision: row.get(6)?,
            config_snapshot_json: row.get(7)?,
            created_by: row.get(8)?,
            created_at: get_ts(row, 9)?,
            updated_at: get_ts(row, 10)?,
        })
    }
}
