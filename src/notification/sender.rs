//! 通知发送器模块
//!
//! 定义通知发送的trait和消息结构

use crate::error::NotificationError;
use crate::health::Transition;
use anyhow::Result;
use async_trait::async_trait;

/// 通知消息结构
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// 消息标题
    pub title: String,
    /// 消息内容
    pub content: String,
    /// 消息类型
    pub message_type: MessageType,
}

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// 告警消息
    Alert,
    /// 恢复消息
    Recovery,
    /// 信息消息
    Info,
}

impl MessageType {
    /// 根据本轮变化判断消息类型：只要有目标下线即为告警
    pub fn for_changes(changes: &[Transition]) -> Self {
        if changes.iter().any(|t| !t.is_recovery()) {
            MessageType::Alert
        } else {
            MessageType::Recovery
        }
    }
}

/// 通知渠道trait
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 渠道名称，用于日志
    fn name(&self) -> &str;

    /// 发送消息
    ///
    /// # 参数
    /// * `message` - 通知消息
    ///
    /// # 返回
    /// * `Result<()>` - 发送结果
    async fn send_message(&self, message: &NotificationMessage) -> Result<()>;
}

/// 状态变化通知器trait
///
/// 扫描调度器每轮最多调用一次，只在有状态变化时调用
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 通知本轮的状态变化
    ///
    /// # 参数
    /// * `changes` - 按完成顺序排列的状态变化
    ///
    /// # 返回
    /// * `Result<(), NotificationError>` - 投递失败时返回错误，由调用方记录
    async fn notify(&self, changes: &[Transition]) -> std::result::Result<(), NotificationError>;
}
