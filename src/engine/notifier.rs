// ==========================================
// 教学排课系统 - 代课通知
// ==========================================
// 职责: 定义通知 trait，由外部投递服务实现
// 红线: 通知尽力而为；失败只记日志，不回滚状态迁移
// ==========================================

use crate::domain::types::NotificationKind;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// 一条待投递的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// 收件联系方式（邮箱；缺失时为教师ID）
    pub recipient: String,
    pub faculty_id: String,
    pub kind: NotificationKind,
    /// 模板数据
    pub data: JsonValue,
}

/// 通知发送者 Trait
///
/// 实现方不应阻塞调用线程；返回值只用于记录日志。
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作通知者
///
/// 用于不需要通知的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, notification: Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpNotifier: 跳过通知 - faculty_id={}, kind={}",
            notification.faculty_id,
            notification.kind.as_str()
        );
        Ok(())
    }
}

/// 通道通知者
///
/// 通知写入无界队列，由引擎外的投递任务消费。
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new(sender: UnboundedSender<Notification>) -> Self {
        Self { sender }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.sender
            .send(notification)
            .map_err(|e| format!("通知队列已关闭: kind={}", e.0.kind.as_str()).into())
    }
}

/// 可选的通知者包装
///
/// 简化 Option<Arc<dyn Notifier>> 的使用
#[derive(Clone)]
pub struct OptionalNotifier {
    inner: Option<Arc<dyn Notifier>>,
}

impl OptionalNotifier {
    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Some(notifier),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发送通知（如果配置了通知者）
    pub fn notify(&self, notification: Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(notifier) => notifier.notify(notification),
            None => {
                tracing::debug!(
                    "OptionalNotifier: 未配置通知者，跳过 - faculty_id={}, kind={}",
                    notification.faculty_id,
                    notification.kind.as_str()
                );
                Ok(())
            }
        }
    }

    /// 发送并吞掉错误（只记 warn）
    pub fn notify_best_effort(&self, notification: Notification) {
        let faculty_id = notification.faculty_id.clone();
        let kind = notification.kind;
        if let Err(e) = self.notify(notification) {
            tracing::warn!(
                faculty_id = %faculty_id,
                kind = kind.as_str(),
                error = %e,
                "通知发送失败，已忽略"
            );
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalNotifier {
    fn default() -> Self {
        Self::none()
    }
}
