//! Host Vitals 主程序入口
//!
//! TCP/UDP主机可达性监控工具

use anyhow::{Context, Result};
use clap::Parser;
use host_vitals::cli::args::{Args, Commands, LogLevel};
use host_vitals::cli::commands::{
    CheckCommand, Command, InitCommand, RunCommand, TestNotificationCommand, ValidateCommand,
};
use host_vitals::config::{ConfigLoader, TomlConfigLoader};
use host_vitals::logging::{LogConfig, LoggingSystem};
use log::LevelFilter;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: resolve_log_level(&args).await,
        json_format: args.json_logs,
        ..Default::default()
    };
    LoggingSystem::setup_logging(&log_config).context("初始化日志系统失败")?;

    info!("Host Vitals v{} 启动", host_vitals::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> host_vitals::error::Result<()> {
    let command: Box<dyn Command> = match args.current_command() {
        Commands::Run => Box::new(RunCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Validate => Box::new(ValidateCommand),
        Commands::TestNotification { .. } => Box::new(TestNotificationCommand),
        Commands::Init { .. } => Box::new(InitCommand),
    };

    command.execute(args).await
}

/// 确定日志级别
///
/// 命令行参数优先，其次是配置文件中的 `global.log_level`，最后默认 info
async fn resolve_log_level(args: &Args) -> LevelFilter {
    if let Some(level) = args.log_level {
        return level.into();
    }

    let path = args.resolve_config_path();
    if !path.exists() {
        return LevelFilter::Info;
    }

    match TomlConfigLoader::new(true).load_from_file(&path).await {
        Ok(config) => config
            .global
            .log_level
            .parse::<LogLevel>()
            .map(LevelFilter::from)
            .unwrap_or(LevelFilter::Info),
        // 配置错误由具体命令报告
        Err(_) => LevelFilter::Info,
    }
}
