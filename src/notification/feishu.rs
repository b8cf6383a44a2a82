//! 飞书通知发送器模块
//!
//! 实现飞书webhook通知功能，支持签名校验

use crate::config::types::FeishuConfig;
use crate::notification::sender::{MessageType, NotificationMessage, NotificationSender};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, error, info};

type HmacSha256 = Hmac<Sha256>;

/// 飞书通知发送器
pub struct FeishuSender {
    /// HTTP客户端
    client: Client,
    /// webhook URL
    webhook_url: String,
    /// 签名密钥
    secret: Option<String>,
}

impl FeishuSender {
    /// 创建新的飞书发送器
    ///
    /// # 参数
    /// * `config` - 飞书渠道配置
    ///
    /// # 返回
    /// * `Result<Self>` - 发送器实例
    pub fn new(config: &FeishuConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
            secret: config.secret.clone(),
        })
    }

    /// 计算签名：以 `timestamp\nsecret` 为密钥对空消息做HMAC-SHA256，再进行base64编码
    pub fn sign(timestamp: i64, secret: &str) -> Result<String> {
        let string_to_sign = format!("{timestamp}\n{secret}");
        let mac = HmacSha256::new_from_slice(string_to_sign.as_bytes())
            .map_err(|e| anyhow::anyhow!("签名密钥无效: {}", e))?;
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// 构建飞书消息体
    fn build_message_body(&self, message: &NotificationMessage) -> Result<Value> {
        let color = match message.message_type {
            MessageType::Alert => "red",
            MessageType::Recovery => "green",
            MessageType::Info => "blue",
        };

        let mut body = json!({
            "msg_type": "interactive",
            "card": {
                "elements": [
                    {
                        "tag": "div",
                        "text": {
                            "content": message.content,
                            "tag": "lark_md"
                        }
                    }
                ],
                "header": {
                    "title": {
                        "content": message.title,
                        "tag": "plain_text"
                    },
                    "template": color
                }
            }
        });

        if let Some(ref secret) = self.secret {
            let timestamp = chrono::Utc::now().timestamp();
            body["timestamp"] = json!(timestamp.to_string());
            body["sign"] = json!(Self::sign(timestamp, secret)?);
        }

        Ok(body)
    }

    /// 发送消息到飞书
    async fn send_to_webhook(&self, body: &Value) -> Result<()> {
        debug!("发送消息到飞书webhook: {}", self.webhook_url);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(body)
            .send()
            .await
            .context("发送飞书消息失败")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("飞书消息发送失败: {} - {}", status, text);
            return Err(anyhow::anyhow!("飞书消息发送失败: {}", status));
        }

        // 飞书在业务错误时仍返回200，需要检查返回码
        let reply: Value = response.json().await.unwrap_or(Value::Null);
        match reply.get("code").and_then(Value::as_i64) {
            Some(code) if code != 0 => {
                let msg = reply.get("msg").and_then(Value::as_str).unwrap_or("未知错误");
                error!("飞书返回错误: {} - {}", code, msg);
                Err(anyhow::anyhow!("飞书返回错误 {}: {}", code, msg))
            }
            _ => {
                info!("飞书消息发送成功");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl NotificationSender for FeishuSender {
    fn name(&self) -> &str {
        "feishu"
    }

    async fn send_message(&self, message: &NotificationMessage) -> Result<()> {
        let body = self.build_message_body(message)?;
        self.send_to_webhook(&body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(url: &str, secret: Option<&str>) -> FeishuSender {
        FeishuSender::new(&FeishuConfig {
            webhook_url: url.to_string(),
            secret: secret.map(str::to_string),
        })
        .unwrap()
    }

    fn alert() -> NotificationMessage {
        NotificationMessage {
            title: "Service status changed!".to_string(),
            content: "10.0.0.1:80:tcp = down.\n".to_string(),
            message_type: MessageType::Alert,
        }
    }

    #[test]
    fn test_sign_is_deterministic_base64() {
        let first = FeishuSender::sign(1_700_000_000, "secret").unwrap();
        let second = FeishuSender::sign(1_700_000_000, "secret").unwrap();
        assert_eq!(first, second);
        // SHA-256 摘要经base64编码后固定为44个字符
        assert_eq!(first.len(), 44);
        assert_ne!(first, FeishuSender::sign(1_700_000_001, "secret").unwrap());
    }

    #[test]
    fn test_message_body_colors_and_signature() {
        let unsigned = sender("http://localhost/hook", None)
            .build_message_body(&alert())
            .unwrap();
        assert_eq!(unsigned["card"]["header"]["template"], "red");
        assert!(unsigned.get("sign").is_none());

        let signed = sender("http://localhost/hook", Some("secret"))
            .build_message_body(&alert())
            .unwrap();
        assert!(signed["sign"].is_string());
        assert!(signed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_send_message_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body(r#"{"code":0,"msg":"success"}"#)
            .create_async()
            .await;

        let sender = sender(&format!("{}/hook", server.url()), None);
        sender.send_message(&alert()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_message_business_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body(r#"{"code":19021,"msg":"sign match fail"}"#)
            .create_async()
            .await;

        let sender = sender(&format!("{}/hook", server.url()), Some("wrong"));
        let err = sender.send_message(&alert()).await.unwrap_err();
        assert!(err.to_string().contains("19021"));
    }
}
