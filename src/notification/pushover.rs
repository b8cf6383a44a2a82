//! Pushover推送通知发送器

use crate::config::types::PushoverConfig;
use crate::notification::sender::{NotificationMessage, NotificationSender};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

/// Pushover消息接口路径
const MESSAGES_PATH: &str = "/1/messages.json";

/// Pushover通知发送器
pub struct PushoverSender {
    /// HTTP客户端
    client: Client,
    /// 接口地址（不含路径）
    api_url: String,
    /// 应用token
    api_token: String,
    /// 用户key
    user_key: String,
    /// 提示音
    sound: String,
}

impl PushoverSender {
    /// 创建新的Pushover发送器
    pub fn new(config: &PushoverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            user_key: config.user_key.clone(),
            sound: config.sound.clone(),
        })
    }
}

#[async_trait]
impl NotificationSender for PushoverSender {
    fn name(&self) -> &str {
        "pushover"
    }

    async fn send_message(&self, message: &NotificationMessage) -> Result<()> {
        let url = format!("{}{}", self.api_url, MESSAGES_PATH);
        debug!("发送Pushover消息: {}", url);

        let params = [
            ("token", self.api_token.as_str()),
            ("user", self.user_key.as_str()),
            ("title", message.title.as_str()),
            ("message", message.content.as_str()),
            ("sound", self.sound.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .context("发送Pushover消息失败")?;

        if response.status().is_success() {
            info!("Pushover消息发送成功");
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Pushover消息发送失败: {} - {}", status, text);
            Err(anyhow::anyhow!("Pushover消息发送失败: {}", status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::sender::MessageType;
    use mockito::Matcher;

    fn config(api_url: String) -> PushoverConfig {
        PushoverConfig {
            api_token: "app-token".to_string(),
            user_key: "user-key".to_string(),
            sound: "falling".to_string(),
            api_url,
        }
    }

    fn message() -> NotificationMessage {
        NotificationMessage {
            title: "Service status changed!".to_string(),
            content: "10.0.0.2:53:udp = up.\n".to_string(),
            message_type: MessageType::Recovery,
        }
    }

    #[tokio::test]
    async fn test_send_message_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", MESSAGES_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("token".into(), "app-token".into()),
                Matcher::UrlEncoded("user".into(), "user-key".into()),
                Matcher::UrlEncoded("sound".into(), "falling".into()),
                Matcher::UrlEncoded("message".into(), "10.0.0.2:53:udp = up.\n".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":1}"#)
            .create_async()
            .await;

        let sender = PushoverSender::new(&config(server.url())).unwrap();
        sender.send_message(&message()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_message_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", MESSAGES_PATH)
            .with_status(400)
            .with_body(r#"{"status":0,"errors":["application token is invalid"]}"#)
            .create_async()
            .await;

        let sender = PushoverSender::new(&config(format!("{}/", server.url()))).unwrap();
        let err = sender.send_message(&message()).await.unwrap_err();
        assert!(err.to_string().contains("400"));
    }
}
