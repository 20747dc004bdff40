// ==========================================
// 教学排课系统 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义生成/代课引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::catalog::TimeSlotCatalog;
use crate::domain::types::DayOfWeek;
use crate::engine::generator::GenerationOptions;
use async_trait::async_trait;
use std::error::Error;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
// 约定: 配置缺失或格式错误时返回默认值，不返回错误
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 工作日（即生成时的星期遍历顺序）
    ///
    /// # 默认值
    /// - MON,TUE,WED,THU,FRI
    async fn get_working_days(&self) -> ConfigResult<Vec<DayOfWeek>>;

    /// 周课表网格 = 工作日 × 时间片目录
    ///
    /// # 默认值
    /// - 09:00-13:00、14:00-17:00 每小时一节
    async fn get_time_slot_catalog(&self) -> ConfigResult<TimeSlotCatalog>;

    /// 生成参数
    async fn get_generation_options(&self) -> ConfigResult<GenerationOptions>;

    /// 请假审批后是否通知全部候选人（否则只通知首位）
    ///
    /// # 默认值
    /// - true
    async fn get_notify_all_ranked_candidates(&self) -> ConfigResult<bool>;
}
