//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::{get_default_config_path, Config, EmailConfig, FeishuConfig, PushoverConfig};
use crate::health::UdpProbeKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::warn;

/// Host Vitals - TCP/UDP主机可达性监控工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "host-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "HOST_VITALS_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// 日志级别（未指定时使用配置文件中的设置）
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "HOST_VITALS_LOG_LEVEL",
        global = true
    )]
    pub log_level: Option<LogLevel>,

    /// 是否输出JSON格式日志
    #[arg(long, help = "输出JSON格式日志", env = "HOST_VITALS_JSON_LOGS", global = true)]
    pub json_logs: bool,

    /// 扫描间隔（分钟）
    #[arg(
        short = 'o',
        long,
        value_name = "MINUTES",
        help = "两轮扫描之间的间隔（分钟）",
        env = "HOST_VITALS_INTERVAL",
        global = true
    )]
    pub interval: Option<u64>,

    /// 最大尝试次数
    #[arg(
        short,
        long,
        value_name = "COUNT",
        help = "每次检测的最大尝试次数",
        env = "HOST_VITALS_RETRY",
        global = true
    )]
    pub retry: Option<u32>,

    /// 重试间隔（秒）
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "重试间隔（秒）",
        env = "HOST_VITALS_DELAY",
        global = true
    )]
    pub delay: Option<u64>,

    /// 单次探测超时（秒）
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "单次探测超时（秒）",
        env = "HOST_VITALS_TIMEOUT",
        global = true
    )]
    pub timeout: Option<u64>,

    /// 监控目标，替换配置文件中的列表
    #[arg(
        short,
        long,
        value_name = "ADDR:PORT[:PROTO]",
        num_args = 1..,
        value_delimiter = ',',
        help = "监控目标，格式 地址:端口[:tcp|udp]",
        env = "HOST_VITALS_MONITOR",
        global = true
    )]
    pub monitor: Vec<String>,

    /// UDP探测方式
    #[arg(
        long,
        value_enum,
        help = "UDP探测方式",
        env = "HOST_VITALS_UDP_PROBE",
        global = true
    )]
    pub udp_probe: Option<UdpProbeKind>,

    /// Pushover应用token
    #[arg(
        long,
        value_name = "TOKEN",
        env = "HOST_VITALS_PUSHOVER_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub pushover_token: Option<String>,

    /// Pushover用户key
    #[arg(
        long,
        value_name = "KEY",
        env = "HOST_VITALS_PUSHOVER_USER",
        hide_env_values = true,
        global = true
    )]
    pub pushover_user: Option<String>,

    /// 飞书webhook URL
    #[arg(
        long,
        value_name = "URL",
        env = "HOST_VITALS_FEISHU_WEBHOOK",
        hide_env_values = true,
        global = true
    )]
    pub feishu_webhook: Option<String>,

    /// 飞书签名密钥
    #[arg(
        long,
        value_name = "SECRET",
        env = "HOST_VITALS_FEISHU_SECRET",
        hide_env_values = true,
        global = true
    )]
    pub feishu_secret: Option<String>,

    /// SMTP服务器
    #[arg(
        short = 's',
        long,
        value_name = "HOST[:PORT]",
        help = "SMTP服务器，格式 主机[:端口]",
        env = "HOST_VITALS_SMTP_SERVER",
        global = true
    )]
    pub smtp_server: Option<String>,

    /// 发件人地址
    #[arg(
        short = 'f',
        long,
        value_name = "ADDRESS",
        help = "发件人地址",
        env = "HOST_VITALS_SMTP_FROM",
        global = true
    )]
    pub smtp_from: Option<String>,

    /// 收件人地址
    #[arg(
        short = 'k',
        long,
        value_name = "ADDRESS",
        help = "收件人地址",
        env = "HOST_VITALS_SMTP_TO",
        global = true
    )]
    pub smtp_to: Option<String>,

    /// SMTP用户名
    #[arg(
        short = 'u',
        long,
        value_name = "USER",
        env = "HOST_VITALS_SMTP_USER",
        global = true
    )]
    pub smtp_user: Option<String>,

    /// SMTP密码
    #[arg(
        short = 'p',
        long,
        value_name = "PASSWORD",
        env = "HOST_VITALS_SMTP_PASS",
        hide_env_values = true,
        global = true
    )]
    pub smtp_pass: Option<String>,

    /// 子命令，省略时为 run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// 持续扫描并在状态变化时发送通知
    Run,

    /// 执行一轮检测并输出结果
    Check {
        /// 输出格式
        #[arg(long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 验证配置文件
    Validate,

    /// 通过所有已配置的渠道发送测试通知
    TestNotification {
        /// 测试消息内容
        #[arg(
            long,
            value_name = "TEXT",
            default_value = "这是一条测试通知",
            help = "测试消息内容"
        )]
        message: String,
    },

    /// 生成示例配置文件
    Init {
        /// 配置文件路径（默认为当前目录下的 host-vitals.toml）
        #[arg(value_name = "PATH", help = "配置文件路径")]
        path: Option<PathBuf>,

        /// 覆盖已存在的文件
        #[arg(long, help = "覆盖已存在的文件")]
        force: bool,
    },
}

/// 输出格式
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 当前子命令，省略时为 `run`
    pub fn current_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }

    /// 配置文件路径
    pub fn resolve_config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(get_default_config_path)
    }

    /// 是否显式指定了配置文件
    pub fn has_explicit_config(&self) -> bool {
        self.config.is_some()
    }

    /// 用命令行参数覆盖配置
    ///
    /// # 参数
    /// * `config` - 从文件加载的配置
    pub fn apply_overrides(&self, config: &mut Config) {
        let global = &mut config.global;
        if let Some(interval) = self.interval {
            global.interval_minutes = interval;
        }
        if let Some(retry) = self.retry {
            global.retry_count = retry;
        }
        if let Some(delay) = self.delay {
            global.retry_delay_seconds = delay;
        }
        if let Some(timeout) = self.timeout {
            global.timeout_seconds = timeout;
        }
        if let Some(kind) = self.udp_probe {
            global.udp_probe = kind;
        }
        if let Some(level) = self.log_level {
            global.log_level = level.to_string();
        }

        if !self.monitor.is_empty() {
            config.monitor = self.monitor.clone();
        }

        let notification = &mut config.notification;
        if self.pushover_token.is_some() || self.pushover_user.is_some() {
            let pushover = notification
                .pushover
                .get_or_insert_with(|| PushoverConfig::new("", ""));
            if let Some(ref token) = self.pushover_token {
                pushover.api_token = token.clone();
            }
            if let Some(ref user) = self.pushover_user {
                pushover.user_key = user.clone();
            }
        }

        if let Some(ref webhook_url) = self.feishu_webhook {
            let feishu = notification.feishu.get_or_insert_with(|| FeishuConfig {
                webhook_url: String::new(),
                secret: None,
            });
            feishu.webhook_url = webhook_url.clone();
        }
        if let Some(ref secret) = self.feishu_secret {
            match notification.feishu.as_mut() {
                Some(feishu) => feishu.secret = Some(secret.clone()),
                None => warn!("未配置飞书webhook，忽略 --feishu-secret"),
            }
        }

        if self.smtp_server.is_some() || self.smtp_from.is_some() || self.smtp_to.is_some() {
            let email = notification
                .email
                .get_or_insert_with(|| EmailConfig::new("", "", ""));
            if let Some(ref server) = self.smtp_server {
                email.smtp_server = server.clone();
            }
            if let Some(ref from) = self.smtp_from {
                email.from = from.clone();
            }
            if let Some(ref to) = self.smtp_to {
                email.to = to.clone();
            }
        }
        if self.smtp_user.is_some() || self.smtp_pass.is_some() {
            match notification.email.as_mut() {
                Some(email) => {
                    if self.smtp_user.is_some() {
                        email.username = self.smtp_user.clone();
                    }
                    if self.smtp_pass.is_some() {
                        email.password = self.smtp_pass.clone();
                    }
                }
                None => warn!("未配置SMTP服务器，忽略 --smtp-user/--smtp-pass"),
            }
        }
    }
}
