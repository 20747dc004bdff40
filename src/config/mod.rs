// ==========================================
// 教学排课系统 - 配置层
// ==========================================
// 职责: 排课与代课参数读取，缺省值兜底
// 存储: config_kv 表（scope_id = 'global'）
// ==========================================

pub mod config_manager;
pub mod engine_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config_trait::EngineConfigReader;
