// ==========================================
// 教学排课系统 - 代课邀约仓储
// ==========================================
// 红线: 同一 (明细, 日期) 只允许一条活跃邀约（由部分唯一索引兜底）
// 状态更新携带期望状态，防止并发响应覆盖
// ==========================================

use crate::domain::substitution::SubstitutionOffer;
use crate::domain::types::OfferStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{fmt_date, fmt_ts, get_date, get_enum, get_string_list, get_ts};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT offer_id, entry_id, leave_id, original_faculty_id,
                                       substitute_faculty_id, sub_date, status,
                                       declined_faculty_ids, previous_offer_id,
                                       substitute_entry_id, resolved_by,
                                       created_at, updated_at
                                FROM substitution_offer"#;

const ACTIVE_STATUSES: &str = "('PENDING', 'ACCEPTED', 'ASSIGNED')";

pub struct SubstitutionOfferRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SubstitutionOfferRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    pub fn insert_tx(tx: &Connection, offer: &SubstitutionOffer) -> RepositoryResult<()> {
        tx.execute(
            r#"INSERT INTO substitution_offer (
                offer_id, entry_id, leave_id, original_faculty_id,
                substitute_faculty_id, sub_date, status,
                declined_faculty_ids, previous_offer_id,
                substitute_entry_id, resolved_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &offer.offer_id,
                &offer.entry_id,
                &offer.leave_id,
                &offer.original_faculty_id,
                &offer.substitute_faculty_id,
                fmt_date(offer.sub_date),
                offer.status.to_db_str(),
                Self::encode_declined(&offer.declined_faculty_ids)?,
                &offer.previous_offer_id,
                &offer.substitute_entry_id,
                &offer.resolved_by,
                fmt_ts(offer.created_at),
                fmt_ts(offer.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 写回可变字段
    ///
    /// 仅当库中状态仍为 `expected_status` 时生效
    pub fn update_tx(
        tx: &Connection,
        offer: &SubstitutionOffer,
        expected_status: OfferStatus,
    ) -> RepositoryResult<()> {
        let rows = tx.execute(
            r#"UPDATE substitution_offer
               SET substitute_faculty_id = ?, status = ?, declined_faculty_ids = ?,
                   substitute_entry_id = ?, resolved_by = ?, updated_at = ?
               WHERE offer_id = ? AND status = ?"#,
            params![
                &offer.substitute_faculty_id,
                offer.status.to_db_str(),
                Self::encode_declined(&offer.declined_faculty_ids)?,
                &offer.substitute_entry_id,
                &offer.resolved_by,
                fmt_ts(offer.updated_at),
                &offer.offer_id,
                expected_status.to_db_str(),
            ],
        )?;

        if rows == 0 {
            return match Self::find_by_id_tx(tx, &offer.offer_id)? {
                None => Err(RepositoryError::not_found("SubstitutionOffer", &offer.offer_id)),
                Some(current) => Err(RepositoryError::InvalidStateTransition {
                    from: current.status.to_string(),
                    to: offer.status.to_string(),
                }),
            };
        }
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, offer_id: &str) -> RepositoryResult<Option<SubstitutionOffer>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, offer_id)
    }

    pub fn find_by_id_tx(tx: &Connection, offer_id: &str) -> RepositoryResult<Option<SubstitutionOffer>> {
        let sql = format!("{} WHERE offer_id = ?", SELECT_COLUMNS);
        Ok(tx.query_row(&sql, params![offer_id], Self::map_row).optional()?)
    }

    /// 请假教师名下已存在活跃邀约的 (明细, 日期)
    pub fn find_active_pairs_by_original_faculty_tx(
        tx: &Connection,
        faculty_id: &str,
    ) -> RepositoryResult<HashSet<(String, NaiveDate)>> {
        let sql = format!(
            "SELECT entry_id, sub_date FROM substitution_offer WHERE original_faculty_id = ? AND status IN {}",
            ACTIVE_STATUSES
        );
        let mut stmt = tx.prepare(&sql)?;
        let pairs = stmt
            .query_map(params![faculty_id], |row| Ok((row.get::<_, String>(0)?, get_date(row, 1)?)))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(pairs)
    }

    /// 以某条明细为对象的活跃邀约
    pub fn find_active_by_entry_tx(tx: &Connection, entry_id: &str) -> RepositoryResult<Vec<SubstitutionOffer>> {
        let sql = format!(
            "{} WHERE entry_id = ? AND status IN {} ORDER BY sub_date, rowid",
            SELECT_COLUMNS, ACTIVE_STATUSES
        );
        Self::query_list(tx, &sql, params![entry_id])
    }

    /// 请假单下的全部邀约（含历史），按 日期/创建顺序
    pub fn find_by_leave(&self, leave_id: &str) -> RepositoryResult<Vec<SubstitutionOffer>> {
        let conn = self.get_conn()?;
        Self::find_by_leave_tx(&conn, leave_id)
    }

    pub fn find_by_leave_tx(tx: &Connection, leave_id: &str) -> RepositoryResult<Vec<SubstitutionOffer>> {
        let sql = format!(
            "{} WHERE leave_id = ? ORDER BY sub_date, entry_id, rowid",
            SELECT_COLUMNS
        );
        Self::query_list(tx, &sql, params![leave_id])
    }

    /// 等待某教师响应的邀约
    pub fn find_pending_for_faculty(&self, faculty_id: &str) -> RepositoryResult<Vec<SubstitutionOffer>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE substitute_faculty_id = ? AND status = 'PENDING' ORDER BY sub_date, rowid",
            SELECT_COLUMNS
        );
        Self::query_list(&conn, &sql, params![faculty_id])
    }

    /// 候选人已耗尽、等待人工指派的邀约
    pub fn find_awaiting_assignment(&self) -> RepositoryResult<Vec<SubstitutionOffer>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE substitute_faculty_id IS NULL AND status = 'PENDING' ORDER BY sub_date, rowid",
            SELECT_COLUMNS
        );
        Self::query_list(&conn, &sql, [])
    }

    fn query_list<P: rusqlite::Params>(
        tx: &Connection,
        sql: &str,
        params: P,
    ) -> RepositoryResult<Vec<SubstitutionOffer>> {
        let mut stmt = tx.prepare(sql)?;
        let offers = stmt
            .query_map(params, Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(offers)
    }

    fn encode_declined(ids: &[String]) -> RepositoryResult<String> {
        serde_json::to_string(ids).map_err(|e| RepositoryError::FieldValueError {
            field: "declined_faculty_ids".to_string(),
            message: e.to_string(),
        })
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<SubstitutionOffer> {
        Ok(SubstitutionOffer {
            offer_id: row.get(0)?,
            entry_id: row.get(1)?,
            leave_id: row.get(2)?,
            original_faculty_id: row.get(3)?,
            substitute_faculty_id: row.get(4)?,
            sub_date: get_date(row, 5)?,
            status: get_enum(row, 6, OfferStatus::from_db_str)?,
            declined_faculty_ids: get_string_list(row, 7)?,
            previous_offer_id: row.get(8)?,
            substitute_entry_id: row.get(9)?,
            resolved_by: row.get(10)?,
            created_at: get_ts(row, 11)?,
            updated_at: get_ts(row, 12)?,
        })
    }
}
