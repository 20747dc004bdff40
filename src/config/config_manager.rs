// ==========================================
// 教学排课系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::engine_config_trait::{ConfigResult, EngineConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::catalog::TimeSlotCatalog;
use crate::domain::types::DayOfWeek;
use crate::engine::generator::GenerationOptions;
use async_trait::async_trait;
use chrono::NaiveTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const DEFAULT_WORKING_DAYS: &str = "MON,TUE,WED,THU,FRI";

/// time_slot_catalog 配置中的一项
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotSpec {
    start: String,
    end: String,
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 布尔配置: true/false/1/0，其他值回退默认并告警
    fn get_bool_or_default(&self, key: &str, default: bool) -> ConfigResult<bool> {
        let value = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match value.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => {
                tracing::warn!(config_key = key, raw_value = %value, "布尔配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 写入 global 配置（存在则覆盖）
    pub fn set_global_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
               ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')"#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取生效配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 生成课表时写入 timetable.config_snapshot_json
    /// - 缺省项以默认值填充，快照可独立复现一次生成
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        {
            let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            let mut stmt =
                conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
            for row in rows {
                let (key, value) = row?;
                config_map.insert(key, value);
            }
        }

        for (key, default) in config_keys::defaults() {
            config_map
                .entry(key.to_string())
                .or_insert_with(|| default.to_string());
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    // ===== 解析 =====

    fn parse_working_days(value: &str) -> Option<Vec<DayOfWeek>> {
        let days: Option<Vec<DayOfWeek>> = value
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(DayOfWeek::from_db_str)
            .collect();
        days.filter(|d| !d.is_empty())
    }

    fn parse_slot_ranges(value: &str) -> Result<Vec<(NaiveTime, NaiveTime)>, String> {
        let specs: Vec<SlotSpec> = serde_json::from_str(value).map_err(|e| e.to_string())?;
        specs
            .iter()
            .map(|s| -> Result<(NaiveTime, NaiveTime), String> {
                let start = NaiveTime::parse_from_str(s.start.trim(), "%H:%M").map_err(|e| e.to_string())?;
                let end = NaiveTime::parse_from_str(s.end.trim(), "%H:%M").map_err(|e| e.to_string())?;
                Ok((start, end))
            })
            .collect()
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_working_days(&self) -> ConfigResult<Vec<DayOfWeek>> {
        let value = self.get_config_or_default(config_keys::WORKING_DAYS, DEFAULT_WORKING_DAYS)?;
        match Self::parse_working_days(&value) {
            Some(days) => Ok(days),
            None => {
                tracing::warn!(
                    config_key = config_keys::WORKING_DAYS,
                    raw_value = %value,
                    "工作日配置格式错误，使用默认值"
                );
                Ok(TimeSlotCatalog::default_catalog().days().to_vec())
            }
        }
    }

    async fn get_time_slot_catalog(&self) -> ConfigResult<TimeSlotCatalog> {
        let days = self.get_working_days().await?;
        let default = TimeSlotCatalog::default_catalog();

        let raw = match self.get_config_value(config_keys::TIME_SLOT_CATALOG)? {
            Some(v) => v,
            None => {
                let ranges = default.slots().iter().map(|s| (s.start, s.end)).collect();
                return Ok(TimeSlotCatalog::new(days, ranges)?);
            }
        };

        let catalog = Self::parse_slot_ranges(&raw).and_then(|ranges| TimeSlotCatalog::new(days.clone(), ranges));
        match catalog {
            Ok(catalog) => Ok(catalog),
            Err(reason) => {
                tracing::warn!(
                    config_key = config_keys::TIME_SLOT_CATALOG,
                    raw_value = %raw,
                    reason = %reason,
                    "时间片目录配置非法，使用默认目录"
                );
                let ranges = default.slots().iter().map(|s| (s.start, s.end)).collect();
                Ok(TimeSlotCatalog::new(days, ranges)?)
            }
        }
    }

    async fn get_generation_options(&self) -> ConfigResult<GenerationOptions> {
        let defaults = GenerationOptions::default();

        let daily_raw = self.get_config_or_default(config_keys::MAX_DAILY_SESSIONS_PER_SUBJECT, "0")?;
        let max_daily_sessions_per_subject = daily_raw.trim().parse::<u32>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::MAX_DAILY_SESSIONS_PER_SUBJECT,
                raw_value = %daily_raw,
                "每日上限配置格式错误，使用默认值"
            );
            defaults.max_daily_sessions_per_subject
        });

        Ok(GenerationOptions {
            prefer_non_lab_for_theory: self.get_bool_or_default(
                config_keys::PREFER_NON_LAB_FOR_THEORY,
                defaults.prefer_non_lab_for_theory,
            )?,
            max_daily_sessions_per_subject,
            cross_check: self.get_bool_or_default(config_keys::GENERATION_CROSS_CHECK, defaults.cross_check)?,
        })
    }

    async fn get_notify_all_ranked_candidates(&self) -> ConfigResult<bool> {
        self.get_bool_or_default(config_keys::NOTIFY_ALL_RANKED_CANDIDATES, true)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 课表网格
    pub const WORKING_DAYS: &str = "working_days";
    pub const TIME_SLOT_CATALOG: &str = "time_slot_catalog"; // JSON: [{"start":"09:00","end":"10:00"}]

    // 生成
    pub const PREFER_NON_LAB_FOR_THEORY: &str = "prefer_non_lab_for_theory";
    pub const MAX_DAILY_SESSIONS_PER_SUBJECT: &str = "max_daily_sessions_per_subject";
    pub const GENERATION_CROSS_CHECK: &str = "generation_cross_check";

    // 代课
    pub const NOTIFY_ALL_RANKED_CANDIDATES: &str = "notify_all_ranked_candidates";

    /// 快照中缺省项的默认值
    pub fn defaults() -> [(&'static str, &'static str); 6] {
        [
            (WORKING_DAYS, super::DEFAULT_WORKING_DAYS),
            (
                TIME_SLOT_CATALOG,
                r#"[{"start":"09:00","end":"10:00"},{"start":"10:00","end":"11:00"},{"start":"11:00","end":"12:00"},{"start":"12:00","end":"13:00"},{"start":"14:00","end":"15:00"},{"start":"15:00","end":"16:00"},{"start":"16:00","end":"17:00"}]"#,
            ),
            (PREFER_NON_LAB_FOR_THEORY, "true"),
            (MAX_DAILY_SESSIONS_PER_SUBJECT, "0"),
            (GENERATION_CROSS_CHECK, "false"),
            (NOTIFY_ALL_RANKED_CANDIDATES, "true"),
        ]
    }
}
