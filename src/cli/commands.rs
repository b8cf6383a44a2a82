//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::loader::LOCAL_CONFIG_FILE;
use crate::config::{Config, ConfigLoader, TomlConfigLoader};
use crate::error::{ConfigError, HostVitalsError, Result};
use crate::health::{EndpointId, HostRegistry, HostStatus, ProbeRouter, ScanScheduler};
use crate::notification::{MessageType, NotificationDispatcher, NotificationMessage};
use crate::signal::setup_signal_handlers;
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// 示例配置文件内容
pub const SAMPLE_CONFIG: &str = include_str!("../../demos/host-vitals.toml");

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载配置并应用命令行覆盖，最后统一验证
///
/// 未显式指定配置文件且默认位置不存在时，只使用命令行参数
pub async fn load_config(args: &Args) -> Result<Config> {
    let path = args.resolve_config_path();
    let loader = TomlConfigLoader::new(true);

    let mut config = if path.exists() || args.has_explicit_config() {
        loader.load_from_file(&path).await?
    } else {
        info!("未找到配置文件 {}，仅使用命令行参数", path.display());
        Config::default()
    };

    args.apply_overrides(&mut config);
    loader.validate(&config)?;
    Ok(config)
}

/// 根据配置构建扫描调度器
///
/// 监控目标格式错误、缺少UDP探测工具或通知配置无效时返回错误，
/// 这些错误都发生在第一轮扫描之前
pub fn build_scheduler(config: &Config) -> Result<ScanScheduler> {
    let endpoints = config.endpoints()?;
    let probe = ProbeRouter::build(&endpoints, config.global.udp_probe)?;
    let notifier = NotificationDispatcher::from_config(&config.notification)?;

    Ok(ScanScheduler::new(
        HostRegistry::new(endpoints),
        Arc::new(probe),
        config.retry_policy(),
        config.scan_interval(),
        Arc::new(notifier),
    ))
}

/// 扫描命令
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let config = load_config(args).await?;
        let scheduler = build_scheduler(&config)?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        setup_signal_handlers(shutdown_tx)?;

        scheduler.run(shutdown_rx).await?;

        let status = scheduler.get_status().await;
        info!(
            "扫描已停止，共完成 {} 轮扫描，通知发送 {} 次（失败 {} 次）",
            status.cycles_completed,
            status.notification_stats.total_sent,
            status.notification_stats.failed_sent
        );
        Ok(())
    }
}

/// 单次检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let format = match args.current_command() {
            Commands::Check { format } => format,
            _ => OutputFormat::Text,
        };

        let config = load_config(args).await?;
        let results = Self::check_once(&config).await?;

        match format {
            OutputFormat::Json => {
                let json_results: Vec<_> = results
                    .iter()
                    .map(|(endpoint, status)| {
                        json!({
                            "endpoint": endpoint.to_string(),
                            "address": endpoint.address,
                            "port": endpoint.port,
                            "protocol": endpoint.protocol,
                            "status": status.as_str(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json_results)?);
            }
            OutputFormat::Text => {
                for (endpoint, status) in &results {
                    let mark = if status.is_up() { "✓" } else { "✗" };
                    println!("{} {} {}", mark, endpoint, status);
                }
            }
        }

        let down = results.iter().filter(|(_, status)| !status.is_up()).count();
        if down > 0 {
            return Err(HostVitalsError::Other(anyhow::anyhow!(
                "{}/{} 个监控目标不可达",
                down,
                results.len()
            )));
        }

        Ok(())
    }
}

impl CheckCommand {
    /// 执行一轮检测，按配置顺序返回每个目标的状态
    pub async fn check_once(config: &Config) -> Result<Vec<(EndpointId, HostStatus)>> {
        let scheduler = build_scheduler(config)?;
        scheduler.run_cycle().await;
        Ok(scheduler.registry().snapshot().await)
    }
}

/// 配置验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        println!("验证配置文件: {}", args.resolve_config_path().display());

        let config = load_config(args).await?;
        let endpoints = config.endpoints()?;
        let probe = ProbeRouter::build(&endpoints, config.global.udp_probe)?;
        let dispatcher = NotificationDispatcher::from_config(&config.notification)?;

        let global = &config.global;
        println!("✓ 配置验证通过");
        println!("全局配置:");
        println!("  扫描间隔: {}分钟", global.interval_minutes);
        println!("  尝试次数: {}", global.retry_count);
        println!("  重试间隔: {}秒", global.retry_delay_seconds);
        println!("  探测超时: {}秒", global.timeout_seconds);
        println!("  日志级别: {}", global.log_level);
        if probe.has_udp() {
            println!("  UDP探测: {:?}", global.udp_probe);
        }

        println!("监控目标:");
        for (i, endpoint) in endpoints.iter().enumerate() {
            println!("  {}. {}", i + 1, endpoint);
        }

        let channels = dispatcher.channel_names();
        if channels.is_empty() {
            println!("通知渠道: 未配置（状态变化只记录日志）");
        } else {
            println!("通知渠道: {}", channels.join(", "));
        }

        Ok(())
    }
}

/// 测试通知命令
pub struct TestNotificationCommand;

#[async_trait]
impl Command for TestNotificationCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let message = match args.current_command() {
            Commands::TestNotification { message } => message,
            _ => String::new(),
        };

        let config = load_config(args).await?;
        let dispatcher = NotificationDispatcher::from_config(&config.notification)?;

        let channels = dispatcher.channel_names();
        if channels.is_empty() {
            println!("未配置任何通知渠道");
            println!("请在配置文件的 [notification] 中添加 pushover、feishu 或 email");
            return Ok(());
        }

        let test_message = NotificationMessage {
            title: format!("{} (测试)", config.notification.subject),
            content: format!(
                "测试时间: {}\n测试消息: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                message
            ),
            message_type: MessageType::Info,
        };

        println!("发送测试消息到: {}", channels.join(", "));
        dispatcher.broadcast(&test_message).await?;
        println!("✓ 测试通知发送成功");
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { path, force } = args.current_command() {
            let path = path.unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
            Self::create_config_file(&path, force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 写入示例配置文件
    ///
    /// # 参数
    /// * `config_path` - 目标路径
    /// * `force` - 是否覆盖已存在的文件
    pub async fn create_config_file(config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            return Err(ConfigError::ValidationError(format!(
                "配置文件已存在: {}，使用 --force 参数覆盖",
                config_path.display()
            ))
            .into());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, SAMPLE_CONFIG).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件中的 monitor 列表和通知渠道");
        Ok(())
    }
}
