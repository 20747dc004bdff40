use crate::domain::timetable::TimetableEntry;
use crate::domain::types::{DayOfWeek, EntrySource, SessionKind, TimetableStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{fmt_date, fmt_time, get_enum, get_opt_date, get_time};
use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT e.entry_id, e.timetable_id, e.day_of_week, e.start_time, e.end_time,
                                       e.subject_id, e.faculty_id, e.batch_id, e.classroom_id,
                                       e.session_kind, e.source, e.is_substitution,
                                       e.original_faculty_id, e.substitution_date
                                FROM timetable_entry e"#;

// ==========================================
// TimetableEntryRepository - 课表明细仓储
// ==========================================
// 红线: 批量写入必须处于调用方事务内
pub struct TimetableEntryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TimetableEntryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    pub fn insert_tx(tx: &Connection, entry: &TimetableEntry) -> RepositoryResult<()> {
        Self::batch_insert_tx(tx, std::slice::from_ref(entry)).map(|_| ())
    }

    /// 批量插入明细
    pub fn batch_insert_tx(tx: &Connection, entries: &[TimetableEntry]) -> RepositoryResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut stmt = tx.prepare_cached(
            r#"INSERT INTO timetable_entry (
                    entry_id, timetable_id, day_of_week, start_time, end_time,
                    subject_id, faculty_id, batch_id, classroom_id,
                    session_kind, source, is_substitution,
                    original_faculty_id, substitution_date
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )?;

        for entry in entries {
            stmt.execute(params![
                &entry.entry_id,
                &entry.timetable_id,
                entry.day.to_db_str(),
                fmt_time(entry.start_time),
                fmt_time(entry.end_time),
                &entry.subject_id,
                &entry.faculty_id,
                &entry.batch_id,
                &entry.classroom_id,
                entry.kind.to_db_str(),
                entry.source.to_db_str(),
                if entry.is_substitution { 1 } else { 0 },
                &entry.original_faculty_id,
                entry.substitution_date.map(fmt_date),
            ])?;
        }

        Ok(entries.len())
    }

    /// 清空课表全部明细（重新生成前）
    pub fn delete_by_timetable_tx(tx: &Connection, timetable_id: &str) -> RepositoryResult<usize> {
        Ok(tx.execute(
            "DELETE FROM timetable_entry WHERE timetable_id = ?",
            params![timetable_id],
        )?)
    }

    pub fn delete_tx(tx: &Connection, entry_id: &str) -> RepositoryResult<usize> {
        Ok(tx.execute(
            "DELETE FROM timetable_entry WHERE entry_id = ?",
            params![entry_id],
        )?)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id_tx(tx: &Connection, entry_id: &str) -> RepositoryResult<Option<TimetableEntry>> {
        let sql = format!("{} WHERE e.entry_id = ?", SELECT_COLUMNS);
        Ok(tx.query_row(&sql, params![entry_id], Self::map_row).optional()?)
    }

    /// 课表全部明细（周明细在前，按 星期/开始时间/ID 排序）
    pub fn find_by_timetable(&self, timetable_id: &str) -> RepositoryResult<Vec<TimetableEntry>> {
        let conn = self.get_conn()?;
        Self::find_by_timetable_tx(&conn, timetable_id)
    }

    pub fn find_by_timetable_tx(tx: &Connection, timetable_id: &str) -> RepositoryResult<Vec<TimetableEntry>> {
        let sql = format!("{} WHERE e.timetable_id = ?", SELECT_COLUMNS);
        Self::query_sorted(tx, &sql, params![timetable_id])
    }

    /// 课表周明细
    pub fn find_weekly_by_timetable_tx(tx: &Connection, timetable_id: &str) -> RepositoryResult<Vec<TimetableEntry>> {
        let sql = format!(
            "{} WHERE e.timetable_id = ? AND e.substitution_date IS NULL",
            SELECT_COLUMNS
        );
        Self::query_sorted(tx, &sql, params![timetable_id])
    }

    /// 教师在已发布课表中的周明细
    pub fn find_published_weekly_for_faculty_tx(
        tx: &Connection,
        faculty_id: &str,
    ) -> RepositoryResult<Vec<TimetableEntry>> {
        let sql = format!(
            r#"{} JOIN timetable t ON t.timetable_id = e.timetable_id
               WHERE t.status = ? AND e.faculty_id = ? AND e.substitution_date IS NULL"#,
            SELECT_COLUMNS
        );
        Self::query_sorted(
            tx,
            &sql,
            params![TimetableStatus::Published.to_db_str(), faculty_id],
        )
    }

    /// 教师在日期区间内承担的代课明细（已发布课表）
    pub fn find_published_dated_for_faculty_tx(
        tx: &Connection,
        faculty_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<TimetableEntry>> {
        let sql = format!(
            r#"{} JOIN timetable t ON t.timetable_id = e.timetable_id
               WHERE t.status = ? AND e.faculty_id = ?
                 AND e.substitution_date BETWEEN ? AND ?"#,
            SELECT_COLUMNS
        );
        Self::query_sorted(
            tx,
            &sql,
            params![
                TimetableStatus::Published.to_db_str(),
                faculty_id,
                fmt_date(start_date),
                fmt_date(end_date)
            ],
        )
    }

    /// 教师在具体日期上的已承担课程
    ///
    /// = 已发布课表中该星期的周明细 + 该日期生效的代课明细
    pub fn find_faculty_schedule_on_date_tx(
        tx: &Connection,
        faculty_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<TimetableEntry>> {
        let day = DayOfWeek::from(date.weekday());
        let sql = format!(
            r#"{} JOIN timetable t ON t.timetable_id = e.timetable_id
               WHERE t.status = ? AND e.faculty_id = ?
                 AND ((e.substitution_date IS NULL AND e.day_of_week = ?)
                      OR e.substitution_date = ?)"#,
            SELECT_COLUMNS
        );
        Self::query_sorted(
            tx,
            &sql,
            params![
                TimetableStatus::Published.to_db_str(),
                faculty_id,
                day.to_db_str(),
                fmt_date(date)
            ],
        )
    }

    /// 其他已发布课表的周明细（生成时预占用）
    pub fn find_published_weekly_excluding_tx(
        tx: &Connection,
        timetable_id: &str,
    ) -> RepositoryResult<Vec<TimetableEntry>> {
        let sql = format!(
            r#"{} JOIN timetable t ON t.timetable_id = e.timetable_id
               WHERE t.status = ? AND e.timetable_id <> ? AND e.substitution_date IS NULL"#,
            SELECT_COLUMNS
        );
        Self::query_sorted(
            tx,
            &sql,
            params![TimetableStatus::Published.to_db_str(), timetable_id],
        )
    }

    fn query_sorted<P: rusqlite::Params>(
        tx: &Connection,
        sql: &str,
        params: P,
    ) -> RepositoryResult<Vec<TimetableEntry>> {
        let mut stmt = tx.prepare(sql)?;
        let mut entries = stmt
            .query_map(params, Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        // 星期按枚举顺序，不能依赖字符串排序
        entries.sort_by(|a, b| {
            (a.substitution_date, a.day, a.start_time, &a.entry_id)
                .cmp(&(b.substitution_date, b.day, b.start_time, &b.entry_id))
        });
        Ok(entries)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<TimetableEntry> {
        Ok(TimetableEntry {
            entry_id: row.get(0)?,
            timetable_id: row.get(1)?,
            day: get_enum(row, 2, DayOfWeek::from_db_str)?,
            start_time: get_time(row, 3)?,
            end_time: get_time(row, 4)?,
            subject_id: row.get(5)?,
            faculty_id: row.get(6)?,
            batch_id: row.get(7)?,
            classroom_id: row.get(8)?,
            kind: get_enum(row, 9, SessionKind::from_db_str)?,
            source: get_enum(row, 10, EntrySource::from_db_str)?,
            is_substitution: row.get::<_, i32>(11)? != 0,
            original_faculty_id: row.get(12)?,
            substitution_date: get_opt_date(row, 13)?,
        })
    }
}
