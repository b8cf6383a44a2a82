//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::error::ConfigError;
use crate::health::{EndpointId, RetryPolicy, UdpProbeKind};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// 日志中替代敏感字段的占位符
const REDACTED: &str = "***";

/// 主配置结构
///
/// `monitor` 放在最前面，保证序列化为TOML时普通值位于表之前
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 监控目标列表，格式 `地址:端口[:协议]`
    #[serde(default)]
    pub monitor: Vec<String>,
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 通知配置
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 两轮扫描之间的间隔（分钟）
    #[serde(default = "default_interval")]
    pub interval_minutes: u64,
    /// 每次检测的最大尝试次数
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// 重试间隔（秒）
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
    /// 单次探测超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// UDP探测方式
    #[serde(default)]
    pub udp_probe: UdpProbeKind,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval(),
            retry_count: default_retry_count(),
            retry_delay_seconds: default_retry_delay(),
            timeout_seconds: default_timeout(),
            udp_probe: UdpProbeKind::default(),
            log_level: default_log_level(),
        }
    }
}

/// 通知配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// 消息标题
    #[serde(default = "default_subject")]
    pub subject: String,
    /// 自定义Handlebars消息模板
    pub template: Option<String>,
    /// Pushover渠道
    pub pushover: Option<PushoverConfig>,
    /// 飞书渠道
    pub feishu: Option<FeishuConfig>,
    /// 邮件渠道
    pub email: Option<EmailConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            template: None,
            pushover: None,
            feishu: None,
            email: None,
        }
    }
}

/// Pushover渠道配置
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct PushoverConfig {
    /// 应用token
    pub api_token: String,
    /// 用户key
    pub user_key: String,
    /// 提示音
    #[serde(default = "default_sound")]
    pub sound: String,
    /// 接口地址
    #[serde(default = "default_pushover_api")]
    pub api_url: String,
}

impl PushoverConfig {
    /// 使用默认提示音和接口地址创建配置
    pub fn new(api_token: impl Into<String>, user_key: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            user_key: user_key.into(),
            sound: default_sound(),
            api_url: default_pushover_api(),
        }
    }
}

impl fmt::Debug for PushoverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushoverConfig")
            .field("api_token", &REDACTED)
            .field("user_key", &REDACTED)
            .field("sound", &self.sound)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// 飞书渠道配置
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct FeishuConfig {
    /// webhook URL
    pub webhook_url: String,
    /// 签名密钥
    pub secret: Option<String>,
}

// webhook URL 中包含机器人token
impl fmt::Debug for FeishuConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeishuConfig")
            .field("webhook_url", &REDACTED)
            .field("secret", &self.secret.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// 邮件渠道配置
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailConfig {
    /// SMTP服务器，格式 `主机[:端口]`，默认端口25
    pub smtp_server: String,
    /// 发件人地址
    pub from: String,
    /// 收件人地址
    pub to: String,
    /// SMTP用户名
    pub username: Option<String>,
    /// SMTP密码
    pub password: Option<String>,
    /// 是否使用STARTTLS
    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

impl EmailConfig {
    /// SMTP默认端口
    pub const DEFAULT_PORT: u16 = 25;

    /// 创建邮件配置，默认启用STARTTLS且不登录
    pub fn new(
        smtp_server: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            smtp_server: smtp_server.into(),
            from: from.into(),
            to: to.into(),
            username: None,
            password: None,
            starttls: default_starttls(),
        }
    }

    /// 拆分SMTP服务器的主机和端口
    ///
    /// # 返回
    /// * `Result<(String, u16), String>` - 主机为空或端口无效时返回错误
    pub fn server_address(&self) -> Result<(String, u16), String> {
        let server = self.smtp_server.trim();
        let (host, port) = match server.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .ok()
                    .filter(|port| *port != 0)
                    .ok_or_else(|| format!("SMTP服务器端口无效: {}", server))?;
                (host, port)
            }
            None => (server, Self::DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(format!("SMTP服务器地址无效: {}", server));
        }
        Ok((host.to_string(), port))
    }

    /// 同时配置了用户名和密码时返回登录凭据
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("starttls", &self.starttls)
            .finish()
    }
}

/// 扫描间隔上限（分钟），即一周
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
/// 最大尝试次数上限
pub const MAX_RETRY_COUNT: u32 = 100;
/// 重试间隔与探测超时上限（秒）
pub const MAX_WAIT_SECONDS: u64 = 3600;

// 默认值函数
fn default_interval() -> u64 {
    5
}
fn default_retry_count() -> u32 {
    5
}
fn default_retry_delay() -> u64 {
    10
}
fn default_timeout() -> u64 {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_subject() -> String {
    "Service status changed!".to_string()
}
fn default_sound() -> String {
    "falling".to_string()
}
fn default_pushover_api() -> String {
    "https://api.pushover.net".to_string()
}
fn default_starttls() -> bool {
    true
}

impl Config {
    /// 解析所有监控目标
    ///
    /// # 返回
    /// * `Result<Vec<EndpointId>, ConfigError>` - 任一目标格式错误即返回错误
    pub fn endpoints(&self) -> Result<Vec<EndpointId>, ConfigError> {
        self.monitor.iter().map(|spec| spec.parse()).collect()
    }

    /// 根据全局配置构建重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.global.retry_count,
            Duration::from_secs(self.global.retry_delay_seconds),
            Duration::from_secs(self.global.timeout_seconds),
        )
    }

    /// 两轮扫描之间的等待时间
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.global.interval_minutes.saturating_mul(60))
    }
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证全局配置
    if config.global.interval_minutes == 0 {
        return Err("检测间隔不能为0".to_string());
    }

    if config.global.retry_count == 0 {
        return Err("重试次数不能为0".to_string());
    }

    if config.global.timeout_seconds == 0 {
        return Err("探测超时时间不能为0".to_string());
    }

    if config.global.interval_minutes > MAX_INTERVAL_MINUTES {
        return Err(format!("检测间隔不能超过{}分钟", MAX_INTERVAL_MINUTES));
    }

    if config.global.retry_count > MAX_RETRY_COUNT {
        return Err(format!("重试次数不能超过{}", MAX_RETRY_COUNT));
    }

    if config.global.retry_delay_seconds > MAX_WAIT_SECONDS {
        return Err(format!("重试间隔不能超过{}秒", MAX_WAIT_SECONDS));
    }

    if config.global.timeout_seconds > MAX_WAIT_SECONDS {
        return Err(format!("探测超时时间不能超过{}秒", MAX_WAIT_SECONDS));
    }

    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    // 验证监控目标
    if config.monitor.is_empty() {
        return Err("至少需要配置一个监控目标".to_string());
    }

    let mut seen = HashSet::new();
    for spec in &config.monitor {
        let endpoint: EndpointId = spec.parse().map_err(|e: ConfigError| e.to_string())?;
        if !seen.insert(endpoint.clone()) {
            return Err(format!("监控目标重复: {endpoint}"));
        }
    }

    // 验证通知配置
    if config.notification.subject.trim().is_empty() {
        return Err("通知标题不能为空".to_string());
    }

    if let Some(ref pushover) = config.notification.pushover {
        if pushover.api_token.trim().is_empty() || pushover.user_key.trim().is_empty() {
            return Err("Pushover的api_token和user_key不能为空".to_string());
        }
    }

    if let Some(ref feishu) = config.notification.feishu {
        if !feishu.webhook_url.starts_with("http://") && !feishu.webhook_url.starts_with("https://")
        {
            return Err("飞书webhook URL格式无效".to_string());
        }
    }

    if let Some(ref email) = config.notification.email {
        email.server_address()?;

        for (field, address) in [("发件人", &email.from), ("收件人", &email.to)] {
            address
                .parse::<Mailbox>()
                .map_err(|e| format!("邮件{}地址无效 {}: {}", field, address, e))?;
        }

        let has_user = email.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_pass = email.password.as_deref().is_some_and(|p| !p.is_empty());
        if has_user != has_pass {
            return Err("SMTP用户名和密码必须同时配置".to_string());
        }
    }

    Ok(())
}
