// ==========================================
// 教学排课系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 红线: 全部仓储与 ConfigManager 共享同一个 Arc<Mutex<Connection>>
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{SubstitutionApi, TimetableApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::notifier::OptionalNotifier;
use crate::perf::install_sqlite_tracing;
use crate::repository::{
    ActionLogRepository, LeaveRequestRepository, ResourceRepository, SubstitutionOfferRepository,
    TimetableEntryRepository, TimetableRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 课表API
    pub timetable_api: Arc<TimetableApi>,

    /// 请假与代课API
    pub substitution_api: Arc<SubstitutionApi>,

    /// 教学资源（实体服务维护的只读数据，另提供录入入口）
    pub resource_repo: Arc<ResourceRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建应用状态（不发送通知）
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_notifier(db_path, OptionalNotifier::none())
    }

    /// 创建应用状态
    ///
    /// # 说明
    /// 1. 打开连接并执行建库脚本（幂等）
    /// 2. 初始化所有Repository
    /// 3. 创建所有API实例
    pub fn with_notifier(db_path: String, notifier: OptionalNotifier) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        install_sqlite_tracing(&mut conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let timetable_repo = Arc::new(TimetableRepository::new(conn.clone()));
        let entry_repo = Arc::new(TimetableEntryRepository::new(conn.clone()));
        let resource_repo = Arc::new(ResourceRepository::new(conn.clone()));
        let leave_repo = Arc::new(LeaveRequestRepository::new(conn.clone()));
        let offer_repo = Arc::new(SubstitutionOfferRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let timetable_api = Arc::new(TimetableApi::new(
            conn.clone(),
            timetable_repo,
            entry_repo,
            action_log_repo.clone(),
            config_manager.clone(),
        ));

        let substitution_api = Arc::new(SubstitutionApi::new(
            conn,
            leave_repo,
            offer_repo,
            config_manager.clone(),
            notifier.clone(),
        ));

        tracing::info!(notifier_configured = notifier.is_configured(), "AppState初始化完成");

        Ok(Self {
            db_path,
            timetable_api,
            substitution_api,
            resource_repo,
            config_manager,
            action_log_repo,
        })
    }
}

/// 默认数据库路径
///
/// 顺序: CAMPUS_TIMETABLE_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("CAMPUS_TIMETABLE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./campus_timetable.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("campus-timetable");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("campus_timetable.db");
        }
    }

    path.to_string_lossy().to_string()
}
