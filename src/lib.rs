//! Host Vitals - TCP/UDP主机可达性监控工具
//!
//! 按固定间隔并发探测一组 `地址:端口[:协议]` 目标，支持：
//! - TCP连接探测与UDP探测（`nc -zu` 或内置套接字）
//! - 带间隔的重试策略
//! - 只在 Up/Down 翻转时汇总并发送通知
//! - Pushover、飞书与邮件通知渠道
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;
pub mod signal;

// 重新导出主要类型
pub use config::{Config, GlobalConfig, NotificationConfig};
pub use error::HostVitalsError;
pub use health::{EndpointId, HostStatus, Protocol, ScanScheduler, Transition};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
