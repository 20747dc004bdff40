use super::core::ActionLogRepository;
use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use crate::repository::row_codec::get_ts;
use rusqlite::{params, OptionalExtension, Params, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT action_id, timetable_id, action_type, action_ts, actor, payload_json, detail
    FROM action_log
"#;

impl ActionLogRepository {
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE action_id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![action_id], Self::map_row).optional()?)
    }

    /// 课表审计轨迹（时间升序，同一时刻按写入顺序）
    pub fn find_by_timetable(&self, timetable_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        self.query(
            "WHERE timetable_id = ?1 ORDER BY action_ts ASC, rowid ASC",
            params![timetable_id],
        )
    }

    /// 请假单审计轨迹: 提交、审批级联、邀约答复/指派、撤销
    ///
    /// 请假类日志不挂课表，按负载中的 leave_id 关联。
    pub fn find_by_leave(&self, leave_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        self.query(
            r#"WHERE json_valid(payload_json)
                 AND json_extract(payload_json, '$.leave_id') = ?1
               ORDER BY action_ts ASC, rowid ASC"#,
            params![leave_id],
        )
    }

    /// 按操作类型查询（最新在前）
    pub fn find_by_action_type(&self, action_type: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        self.query(
            "WHERE action_type = ?1 ORDER BY action_ts DESC, rowid DESC LIMIT ?2",
            params![action_type, limit],
        )
    }

    fn query<P: Params>(&self, clause: &str, params: P) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} {}", SELECT_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params, Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    fn map_row(row: &Row) -> rusqlite::Result<ActionLog> {
        let payload: Option<String> = row.get(5)?;
        Ok(ActionLog {
            action_id: row.get(0)?,
            timetable_id: row.get(1)?,
            action_type: row.get(2)?,
            action_ts: get_ts(row, 3)?,
            actor: row.get(4)?,
            // 非法 JSON 视为缺失
            payload_json: payload.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(6)?,
        })
    }
}
