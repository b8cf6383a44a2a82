//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Host Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum HostVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探测能力相关错误
    #[error("探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },

    /// 监控目标格式错误
    #[error("无效的监控目标 '{spec}': {reason}")]
    InvalidEndpoint { spec: String, reason: String },
}

/// 探测错误类型
///
/// 只在启动阶段出现，单次探测失败不会产生错误
#[derive(Error, Debug)]
pub enum ProbeError {
    /// 缺少外部探测工具
    #[error("缺少外部探测工具 `{utility}`，无法检测UDP目标")]
    MissingUtility { utility: String },
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 发送失败
    #[error("通知发送失败: {0}")]
    SendError(String),

    /// 模板渲染错误
    #[error("模板渲染失败: {0}")]
    TemplateError(String),

    /// 配置错误
    #[error("通知配置错误: {0}")]
    ConfigError(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, HostVitalsError>;
