//! 通知分发器
//!
//! 将一轮扫描的状态变化渲染为一条消息，并投递到所有已配置的渠道

use crate::config::types::NotificationConfig;
use crate::error::NotificationError;
use crate::health::Transition;
use crate::notification::email::EmailSender;
use crate::notification::feishu::FeishuSender;
use crate::notification::pushover::PushoverSender;
use crate::notification::sender::{MessageType, NotificationMessage, NotificationSender, Notifier};
use crate::notification::template::ChangeTemplate;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// 通知分发器
pub struct NotificationDispatcher {
    /// 消息标题
    subject: String,
    /// 消息模板
    template: ChangeTemplate,
    /// 通知渠道
    senders: Vec<Arc<dyn NotificationSender>>,
}

impl NotificationDispatcher {
    /// 创建通知分发器
    pub fn new(
        subject: impl Into<String>,
        template: ChangeTemplate,
        senders: Vec<Arc<dyn NotificationSender>>,
    ) -> Self {
        Self {
            subject: subject.into(),
            template,
            senders,
        }
    }

    /// 根据配置创建通知分发器
    ///
    /// # 参数
    /// * `config` - 通知配置
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 模板无效或渠道创建失败时返回错误
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let template = ChangeTemplate::new(config.template.as_deref())?;

        let mut senders: Vec<Arc<dyn NotificationSender>> = Vec::new();
        if let Some(ref pushover) = config.pushover {
            let sender = PushoverSender::new(pushover)
                .map_err(|e| NotificationError::ConfigError(e.to_string()))?;
            senders.push(Arc::new(sender));
        }
        if let Some(ref feishu) = config.feishu {
            let sender =
                FeishuSender::new(feishu).map_err(|e| NotificationError::ConfigError(e.to_string()))?;
            senders.push(Arc::new(sender));
        }
        if let Some(ref email) = config.email {
            let sender =
                EmailSender::new(email).map_err(|e| NotificationError::ConfigError(e.to_string()))?;
            senders.push(Arc::new(sender));
        }

        Ok(Self::new(config.subject.clone(), template, senders))
    }

    /// 已配置的渠道名称
    pub fn channel_names(&self) -> Vec<&str> {
        self.senders.iter().map(|s| s.name()).collect()
    }

    /// 将状态变化渲染为通知消息
    pub fn build_message(&self, changes: &[Transition]) -> Result<NotificationMessage, NotificationError> {
        Ok(NotificationMessage {
            title: self.subject.clone(),
            content: self.template.render(changes)?,
            message_type: MessageType::for_changes(changes),
        })
    }

    /// 投递消息到所有渠道
    ///
    /// 每个渠道都会尝试一次，任一渠道失败时返回汇总错误
    pub async fn broadcast(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        if self.senders.is_empty() {
            info!("未配置通知渠道，仅记录日志:\n{}", message.content);
            return Ok(());
        }

        let mut failed = Vec::new();
        for sender in &self.senders {
            match sender.send_message(message).await {
                Ok(()) => info!("通过 {} 发送通知成功", sender.name()),
                Err(e) => {
                    error!("通过 {} 发送通知失败: {}", sender.name(), e);
                    failed.push(sender.name().to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::SendError(format!(
                "{}/{} 个渠道发送失败: {}",
                failed.len(),
                self.senders.len(),
                failed.join(", ")
            )))
        }
    }
}

#[async_trait]
impl Notifier for NotificationDispatcher {
    async fn notify(&self, changes: &[Transition]) -> Result<(), NotificationError> {
        if changes.is_empty() {
            return Ok(());
        }

        let message = self.build_message(changes)?;
        info!("发送状态变化通知，变化数量: {}", changes.len());
        self.broadcast(&message).await
    }
}
