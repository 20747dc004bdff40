// ==========================================
// 教学排课系统 - 课表 API
// ==========================================
// 职责: 课表生命周期、自动生成、人工调整、导出
// 红线: 所有写入必须记录 ActionLog，且与业务写入同事务
// 红线: 同一课表的生成请求串行执行；不同课表互不阻塞
// ==========================================

mod entries;
mod export;
mod generation;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{require_non_empty, validate_entry_draft, validate_entry_resources};
use crate::config::{ConfigManager, EngineConfigReader};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::timetable::{EntryDraft, Timetable, TimetableEntry};
use crate::domain::types::TimetableStatus;
use crate::engine::conflict::{ConflictDetector, SlotClaim};
use crate::engine::generator::{
    GenerationInput, GenerationStats, TimetableGenerator, UnassignedUnit,
};
use crate::engine::preference::PreferenceRanker;
use crate::perf::PerfGuard;
use crate::repository::{
    run_in_transaction, ActionLogRepository, ResourceRepository, TimetableEntryRepository,
    TimetableRepository,
};

pub use export::EXPORT_HEADERS;

// ==========================================
// 请求与结果
// ==========================================

/// 创建课表请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTimetableRequest {
    pub name: String,
    pub department_id: Option<String>, // None = 全校
    pub semester: i32,
    pub academic_year: String,
}

/// 生成结果
///
/// unassigned_count > 0 不是错误：生成已完成，剩余单元需人工补排
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub timetable_id: String,
    pub revision: i32,
    pub entries_created: usize,
    pub entries_discarded: usize,
    pub unassigned_count: usize,
    pub unassigned: Vec<UnassignedUnit>,
    pub stats: GenerationStats,
}

// ==========================================
// TimetableLocks - 按课表串行化生成
// ==========================================
#[derive(Default)]
struct TimetableLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TimetableLocks {
    async fn acquire(&self, timetable_id: &str) -> ApiResult<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self
                .inner
                .lock()
                .map_err(|e| ApiError::InternalError(format!("课表锁表不可用: {}", e)))?;
            locks.entry(timetable_id.to_string()).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }

    /// 释放后清理无人持有/等待的课表锁
    fn prune(&self, timetable_id: &str) {
        let Ok(mut locks) = self.inner.lock() else {
            return;
        };
        if locks
            .get(timetable_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(timetable_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

// ==========================================
// TimetableApi - 课表 API
// ==========================================
pub struct TimetableApi {
    conn: Arc<Mutex<Connection>>,
    timetable_repo: Arc<TimetableRepository>,
    entry_repo: Arc<TimetableEntryRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    detector: ConflictDetector,
    generation_locks: TimetableLocks,
}

impl TimetableApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        timetable_repo: Arc<TimetableRepository>,
        entry_repo: Arc<TimetableEntryRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            conn,
            timetable_repo,
            entry_repo,
            action_log_repo,
            config_manager,
            detector: ConflictDetector::new(),
            generation_locks: TimetableLocks::default(),
        }
    }

    fn load_tx(tx: &Connection, timetable_id: &str) -> ApiResult<Timetable> {
        TimetableRepository::find_by_id_tx(tx, timetable_id)?
            .ok_or_else(|| ApiError::NotFound(format!("课表{}不存在", timetable_id)))
    }

    fn config_error(e: Box<dyn std::error::Error + Send + Sync>) -> ApiError {
        ApiError::ConfigError(e.to_string())
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_timetable(&self, timetable_id: &str) -> ApiResult<Timetable> {
        self.timetable_repo
            .find_by_id(timetable_id)?
            .ok_or_else(|| ApiError::NotFound(format!("课表{}不存在", timetable_id)))
    }

    pub fn list_by_status(&self, status: TimetableStatus) -> ApiResult<Vec<Timetable>> {
        Ok(self.timetable_repo.find_by_status(status)?)
    }

    /// 课表操作日志（时间升序）
    pub fn list_action_logs(&self, timetable_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_timetable(timetable_id)?)
    }

    // ==========================================
    // 生命周期
    // ==========================================

    /// 创建课表（DRAFT）
    pub fn create_timetable(&self, request: CreateTimetableRequest, actor: &str) -> ApiResult<Timetable> {
        let _perf = PerfGuard::new("create_timetable");

        require_non_empty("name", &request.name)?;
        require_non_empty("academic_year", &request.academic_year)?;
        require_non_empty("actor", actor)?;
        if request.semester <= 0 {
            return Err(ApiError::ValidationError(format!("学期必须为正数: {}", request.semester)));
        }

        let now = chrono::Local::now().naive_local();
        let timetable = Timetable {
            timetable_id: uuid::Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            department_id: request.department_id.filter(|d| !d.trim().is_empty()),
            semester: request.semester,
            academic_year: request.academic_year.trim().to_string(),
            status: TimetableStatus::Draft,
            revision: 1,
            config_snapshot_json: None,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };

        run_in_transaction(&self.conn, |tx| -> ApiResult<()> {
            TimetableRepository::insert_tx(tx, &timetable)?;
            let log = ActionLog::new(Some(timetable.timetable_id.clone()), ActionType::CreateTimetable, actor)
                .with_payload(&serde_json::json!({
                    "name": timetable.name,
                    "department_id": timetable.department_id,
                    "semester": timetable.semester,
                    "academic_year": timetable.academic_year,
                }))
                .with_detail(format!("创建课表: {}", timetable.name));
            ActionLogRepository::insert_tx(tx, &log)?;
            Ok(())
        })?;

        info!(timetable_id = %timetable.timetable_id, name = %timetable.name, "课表已创建");
        Ok(timetable)
    }

    pub fn submit_for_approval(&self, timetable_id: &str, actor: &str) -> ApiResult<Timetable> {
        self.transition(timetable_id, TimetableStatus::PendingApproval, actor)
    }

    pub fn return_to_draft(&self, timetable_id: &str, actor: &str) -> ApiResult<Timetable> {
        self.transition(timetable_id, TimetableStatus::Draft, actor)
    }

    pub fn approve(&self, timetable_id: &str, actor: &str) -> ApiResult<Timetable> {
        self.transition(timetable_id, TimetableStatus::Approved, actor)
    }

    /// 发布前做全量冲突审计，有冲突则拒绝
    pub fn publish(&self, timetable_id: &str, actor: &str) -> ApiResult<Timetable> {
        self.transition(timetable_id, TimetableStatus::Published, actor)
    }

    fn transition(&self, timetable_id: &str, target: TimetableStatus, actor: &str) -> ApiResult<Timetable> {
        let _perf = PerfGuard::new("timetable_transition").with_subject(timetable_id);

        require_non_empty("timetable_id", timetable_id)?;
        require_non_empty("actor", actor)?;

        let (from, updated) = run_in_transaction(&self.conn, |tx| -> ApiResult<(TimetableStatus, Timetable)> {
            let timetable = Self::load_tx(tx, timetable_id)?;
            let from = timetable.status;
            if !from.can_transition_to(target) {
                return Err(ApiError::InvalidStateTransition {
                    from: from.to_string(),
                    to: target.to_string(),
                });
            }

            if target == TimetableStatus::Published {
                self.audit_before_publish(tx, timetable_id)?;
            }

            let revision = TimetableRepository::update_status_tx(tx, timetable_id, timetable.revision, target)?;

            let log = ActionLog::new(Some(timetable_id.to_string()), ActionType::StatusTransition, actor)
                .with_payload(&serde_json::json!({
                    "from": from.to_db_str(),
                    "to": target.to_db_str(),
                    "revision": revision,
                }))
                .with_detail(format!("{} -> {}", from, target));
            ActionLogRepository::insert_tx(tx, &log)?;

            Ok((from, Self::load_tx(tx, timetable_id)?))
        })?;

        info!(
            timetable_id = %timetable_id,
            from = %from,
            to = %target,
            revision = updated.revision,
            "课表状态已变更"
        );
        Ok(updated)
    }

    /// 发布审计: 课表内两两冲突 + 与其他已发布课表的冲突
    fn audit_before_publish(&self, tx: &Connection, timetable_id: &str) -> ApiResult<()> {
        let entries = TimetableEntryRepository::find_weekly_by_timetable_tx(tx, timetable_id)?;
        let published = TimetableEntryRepository::find_published_weekly_excluding_tx(tx, timetable_id)?;

        let mut pairs: Vec<(&TimetableEntry, &TimetableEntry)> = self.detector.audit(&entries);
        for entry in &entries {
            for other in self.detector.find_conflicts(&published, &SlotClaim::from(entry)) {
                pairs.push((entry, other));
            }
        }

        if pairs.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::new();
        let mut conflicts = Vec::new();
        for (a, b) in &pairs {
            for e in [*a, *b] {
                if seen.insert(e.entry_id.clone()) {
                    conflicts.push(e.clone());
                }
            }
        }

        warn!(
            timetable_id = %timetable_id,
            colliding_pairs = pairs.len(),
            "发布审计发现冲突"
        );
        Err(ApiError::Conflict {
            message: format!("课表{}存在{}对冲突明细，不能发布", timetable_id, pairs.len()),
            conflicts,
        })
    }
}
