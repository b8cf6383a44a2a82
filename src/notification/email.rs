//! 邮件通知发送器
//!
//! 通过SMTP发送纯文本邮件，默认使用STARTTLS，配置了用户名和密码时先登录

use crate::config::types::EmailConfig;
use crate::notification::sender::{NotificationMessage, NotificationSender};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, error, info};

/// SMTP会话超时时间
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// 邮件通知发送器
pub struct EmailSender {
    /// SMTP传输
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// 发件人
    from: Mailbox,
    /// 收件人
    to: Mailbox,
    /// SMTP服务器（用于日志）
    server: String,
}

impl EmailSender {
    /// 创建新的邮件发送器
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let (host, port) = config.server_address().map_err(|e| anyhow!(e))?;
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("发件人地址无效: {}", config.from))?;
        let to: Mailbox = config
            .to
            .parse()
            .with_context(|| format!("收件人地址无效: {}", config.to))?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
                .context("创建SMTP传输失败")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host.as_str())
        };
        builder = builder.port(port).timeout(Some(SMTP_TIMEOUT));

        if let Some((user, pass)) = config.credentials() {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
            server: format!("{}:{}", host, port),
        })
    }

    /// 构建邮件
    fn build_email(&self, message: &NotificationMessage) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(message.title.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.content.clone())
            .context("构建邮件失败")
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn name(&self) -> &str {
        "email"
    }

    async fn send_message(&self, message: &NotificationMessage) -> Result<()> {
        debug!("发送邮件到 {}，SMTP服务器: {}", self.to, self.server);
        let email = self.build_email(message)?;

        match self.transport.send(email).await {
            Ok(response) => {
                info!("邮件发送成功: {}", response.code());
                Ok(())
            }
            Err(e) => {
                error!("邮件发送失败 {}: {}", self.server, e);
                Err(anyhow!("邮件发送失败: {}", e))
            }
        }
    }
}
