//! 日志系统模块
//!
//! 提供结构化日志配置和初始化功能

use log::LevelFilter;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化结果，整个进程只初始化一次
static LOGGING_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        // HTTP客户端内部日志默认只保留警告
        let module_levels = [("hyper", LevelFilter::Warn), ("reqwest", LevelFilter::Warn)]
            .into_iter()
            .map(|(module, level)| (module.to_string(), level))
            .collect();

        Self {
            level: LevelFilter::Info,
            console: true,
            json_format: false,
            module_levels,
        }
    }
}

impl LogConfig {
    /// 使用指定级别创建日志配置
    pub fn with_level(level: LevelFilter) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// 日志系统管理器
pub struct LoggingSystem;

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 重复调用时直接返回第一次初始化的结果
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `anyhow::Result<()>` - 初始化结果
    pub fn setup_logging(config: &LogConfig) -> anyhow::Result<()> {
        let result = LOGGING_INIT.get_or_init(|| Self::perform_initialization(config));

        result
            .as_ref()
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("日志系统初始化失败: {}", e))
    }

    /// 是否已初始化
    pub fn is_initialized() -> bool {
        LOGGING_INIT.get().is_some()
    }

    fn perform_initialization(config: &LogConfig) -> Result<(), String> {
        // log crate 到 tracing 的桥接
        tracing_log::LogTracer::init().map_err(|e| format!("LogTracer初始化失败: {}", e))?;

        let mut env_filter =
            EnvFilter::from_default_env().add_directive(Self::convert_level_to_directive(config.level));

        for (module, level) in &config.module_levels {
            match format!("{}={}", module, Self::level_to_string(*level)).parse::<Directive>() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => eprintln!("忽略无效的模块日志级别 {}: {}", module, e),
            }
        }

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_target(false)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(config.console)
                .with_target(false)
                .boxed()
        };

        registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| format!("tracing subscriber初始化失败: {}", e))?;

        tracing::debug!("日志配置: {:?}", config);
        Ok(())
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> Directive {
        match level {
            LevelFilter::Off => Directive::from(tracing::level_filters::LevelFilter::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    /// 将 log::LevelFilter 转换为字符串
    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LevelFilter::Info);
        assert!(!config.json_format);
        assert_eq!(config.module_levels.get("reqwest"), Some(&LevelFilter::Warn));
    }

    #[test]
    fn test_setup_logging_is_idempotent() {
        let config = LogConfig::with_level(LevelFilter::Debug);

        // 其他测试可能已经安装了全局subscriber，两次调用的结果必须一致
        let first = LoggingSystem::setup_logging(&config).is_ok();
        let second = LoggingSystem::setup_logging(&config).is_ok();
        assert_eq!(first, second);
        assert!(LoggingSystem::is_initialized());
    }

    #[test]
    fn test_level_conversion() {
        assert_eq!(LoggingSystem::level_to_string(LevelFilter::Warn), "warn");
        assert_eq!(LoggingSystem::level_to_string(LevelFilter::Off), "off");
    }
}
