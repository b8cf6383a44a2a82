//! 通知模块
//!
//! 提供状态变化通知的分发、消息模板以及Pushover、飞书和邮件通知渠道

pub mod dispatcher;
pub mod email;
pub mod feishu;
pub mod pushover;
pub mod sender;
pub mod template;

// 重新导出主要类型
pub use dispatcher::NotificationDispatcher;
pub use email::EmailSender;
pub use feishu::FeishuSender;
pub use pushover::PushoverSender;
pub use sender::{MessageType, NotificationMessage, NotificationSender, Notifier};
pub use template::ChangeTemplate;
