//! 监控目标数据结构
//!
//! 定义监控目标的标识、协议和在线状态，以及 `地址:端口[:协议]` 格式的解析

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 探测协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP连接探测
    Tcp,
    /// UDP可达性探测
    Udp,
}

impl Protocol {
    /// 协议的小写名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(format!("不支持的协议 '{other}'，仅支持 tcp 和 udp")),
        }
    }
}

/// 主机在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    /// 尚未完成首次检测
    #[default]
    Unknown,
    /// 可达
    Up,
    /// 不可达
    Down,
}

impl HostStatus {
    /// 根据探测结果得到状态
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            HostStatus::Up
        } else {
            HostStatus::Down
        }
    }

    /// 判断是否在线
    pub fn is_up(&self) -> bool {
        matches!(self, HostStatus::Up)
    }

    /// 状态的小写名称，用于通知内容
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Unknown => "unknown",
            HostStatus::Up => "up",
            HostStatus::Down => "down",
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostStatus::Up => write!(f, "正常"),
            HostStatus::Down => write!(f, "异常"),
            HostStatus::Unknown => write!(f, "未知"),
        }
    }
}

/// 监控目标标识
///
/// 启动时由配置创建，运行期间不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId {
    /// 主机名或IP地址（IPv6不带方括号）
    pub address: String,
    /// 端口
    pub port: u16,
    /// 协议
    pub protocol: Protocol,
}

impl EndpointId {
    /// 创建新的监控目标标识
    pub fn new(address: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            address: address.into(),
            port,
            protocol,
        }
    }

    /// 用于建立连接的 `(host, port)` 形式
    pub fn host_port(&self) -> (&str, u16) {
        (self.address.as_str(), self.port)
    }

    fn invalid(spec: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidEndpoint {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.contains(':') {
            write!(f, "[{}]:{}:{}", self.address, self.port, self.protocol)
        } else {
            write!(f, "{}:{}:{}", self.address, self.port, self.protocol)
        }
    }
}

impl FromStr for EndpointId {
    type Err = ConfigError;

    /// 解析 `地址:端口[:协议]`，IPv6地址需用方括号包裹，例如 `[::1]:53:udp`
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let trimmed = spec.trim();

        let (address, rest) = if let Some(stripped) = trimmed.strip_prefix('[') {
            let end = stripped
                .find(']')
                .ok_or_else(|| Self::invalid(spec, "IPv6地址缺少 ']'"))?;
            let rest = stripped[end + 1..]
                .strip_prefix(':')
                .ok_or_else(|| Self::invalid(spec, "缺少端口"))?;
            (&stripped[..end], rest)
        } else {
            trimmed
                .split_once(':')
                .ok_or_else(|| Self::invalid(spec, "缺少端口"))?
        };

        if address.is_empty() {
            return Err(Self::invalid(spec, "地址不能为空"));
        }

        let mut parts = rest.split(':');
        let port_str = parts.next().unwrap_or_default();
        let port: u16 = port_str
            .parse()
            .map_err(|_| Self::invalid(spec, format!("无效的端口 '{port_str}'")))?;
        if port == 0 {
            return Err(Self::invalid(spec, "端口必须在 1-65535 之间"));
        }

        let protocol = match parts.next() {
            Some(p) => p.parse::<Protocol>().map_err(|e| Self::invalid(spec, e))?,
            None => Protocol::Tcp,
        };

        if parts.next().is_some() {
            return Err(Self::invalid(spec, "格式应为 地址:端口[:协议]"));
        }

        Ok(Self::new(address, port, protocol))
    }
}
