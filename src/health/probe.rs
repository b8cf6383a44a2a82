//! 可达性探测器实现
//!
//! 提供TCP连接探测和两种UDP探测方式（外部 `nc` 工具或原生套接字），
//! 所有探测器在任何错误下都返回 `false`，不会向上抛出错误

use crate::error::ProbeError;
use crate::health::endpoint::{EndpointId, Protocol};
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// `nc` 进程在探测超时之外额外允许的运行时间
const NETCAT_GRACE: Duration = Duration::from_secs(1);

/// 探测器trait，定义单次可达性检测接口
#[async_trait]
pub trait Probe: Send + Sync {
    /// 执行一次探测
    ///
    /// # 参数
    /// * `target` - 监控目标
    /// * `timeout` - 单次探测超时时间
    ///
    /// # 返回
    /// * `bool` - 是否可达；连接错误、超时、解析失败均返回 `false`
    async fn probe(&self, target: &EndpointId, timeout: Duration) -> bool;
}

/// UDP探测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UdpProbeKind {
    /// 调用外部 `nc -zu`
    #[default]
    Netcat,
    /// 原生UDP套接字
    Socket,
}

/// TCP连接探测器
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, target: &EndpointId, timeout_duration: Duration) -> bool {
        match timeout(timeout_duration, TcpStream::connect(target.host_port())).await {
            Ok(Ok(mut stream)) => {
                if let Err(e) = stream.shutdown().await {
                    debug!("关闭连接失败 {}: {}", target, e);
                }
                true
            }
            Ok(Err(e)) => {
                debug!("连接失败 {}: {}", target, e);
                false
            }
            Err(_) => {
                debug!("连接超时 {}", target);
                false
            }
        }
    }
}

/// 基于外部 `nc` 工具的UDP探测器
#[derive(Debug, Clone)]
pub struct NetcatUdpProbe {
    /// `nc` 可执行文件路径
    binary: PathBuf,
}

impl NetcatUdpProbe {
    /// 外部工具名称
    pub const UTILITY: &'static str = "nc";

    /// 在 `PATH` 中查找 `nc`
    ///
    /// # 返回
    /// * `Result<Self, ProbeError>` - 找不到时返回 `MissingUtility`
    pub fn locate() -> Result<Self, ProbeError> {
        locate_utility(Self::UTILITY)
            .map(Self::with_binary)
            .ok_or_else(|| ProbeError::MissingUtility {
                utility: Self::UTILITY.to_string(),
            })
    }

    /// 使用指定的可执行文件
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// 可执行文件路径
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl Probe for NetcatUdpProbe {
    async fn probe(&self, target: &EndpointId, timeout_duration: Duration) -> bool {
        let wait_secs = timeout_duration.as_secs().max(1);

        let mut command = Command::new(&self.binary);
        command
            .arg("-zu")
            .arg("-w")
            .arg(wait_secs.to_string())
            .arg("--")
            .arg(&target.address)
            .arg(target.port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let deadline = timeout_duration.saturating_add(NETCAT_GRACE);
        match timeout(deadline, command.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!("执行 {} 失败 {}: {}", self.binary.display(), target, e);
                false
            }
            Err(_) => {
                debug!("{} 探测超时 {}", Self::UTILITY, target);
                false
            }
        }
    }
}

/// 基于原生UDP套接字的探测器
///
/// 发送一个空数据报：收到回复视为可达，收到ICMP端口不可达视为不可达，
/// 超时无回复视为可达（与 `nc -zu` 相同的假设，可能误报）
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketUdpProbe;

impl SocketUdpProbe {
    async fn exchange(target: &EndpointId, timeout_duration: Duration) -> io::Result<bool> {
        let addr = timeout(timeout_duration, lookup_host(target.host_port()))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "地址解析超时"))??
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "没有可用的地址"))?;

        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(addr).await?;
        socket.send(&[]).await?;

        let mut buf = [0u8; 512];
        match timeout(timeout_duration, socket.recv(&mut buf)).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(true),
        }
    }
}

#[async_trait]
impl Probe for SocketUdpProbe {
    async fn probe(&self, target: &EndpointId, timeout_duration: Duration) -> bool {
        match Self::exchange(target, timeout_duration).await {
            Ok(reachable) => reachable,
            Err(e) => {
                debug!("UDP探测失败 {}: {}", target, e);
                false
            }
        }
    }
}

/// 按协议分发的探测器
///
/// 启动时构建一次；存在UDP目标而所选UDP探测方式不可用时构建失败
pub struct ProbeRouter {
    tcp: Arc<dyn Probe>,
    udp: Option<Arc<dyn Probe>>,
}

impl ProbeRouter {
    /// 根据监控目标构建探测器
    ///
    /// # 参数
    /// * `endpoints` - 全部监控目标
    /// * `udp_kind` - UDP探测方式
    ///
    /// # 返回
    /// * `Result<Self, ProbeError>` - 需要 `nc` 但找不到时返回错误
    pub fn build(endpoints: &[EndpointId], udp_kind: UdpProbeKind) -> Result<Self, ProbeError> {
        let needs_udp = endpoints.iter().any(|e| e.protocol == Protocol::Udp);

        let udp: Option<Arc<dyn Probe>> = if !needs_udp {
            None
        } else {
            match udp_kind {
                UdpProbeKind::Netcat => {
                    let probe = NetcatUdpProbe::locate()?;
                    debug!("使用 {} 进行UDP探测", probe.binary().display());
                    Some(Arc::new(probe))
                }
                UdpProbeKind::Socket => Some(Arc::new(SocketUdpProbe)),
            }
        };

        Ok(Self {
            tcp: Arc::new(TcpProbe),
            udp,
        })
    }

    /// 使用自定义探测器（主要用于测试）
    pub fn with_probes(tcp: Arc<dyn Probe>, udp: Option<Arc<dyn Probe>>) -> Self {
        Self { tcp, udp }
    }

    /// 是否配置了UDP探测器
    pub fn has_udp(&self) -> bool {
        self.udp.is_some()
    }
}

#[async_trait]
impl Probe for ProbeRouter {
    async fn probe(&self, target: &EndpointId, timeout_duration: Duration) -> bool {
        match target.protocol {
            Protocol::Tcp => self.tcp.probe(target, timeout_duration).await,
            Protocol::Udp => match &self.udp {
                Some(udp) => udp.probe(target, timeout_duration).await,
                None => {
                    warn!("未配置UDP探测器，视为不可达: {}", target);
                    false
                }
            },
        }
    }
}

/// 在 `PATH` 中查找可执行文件
pub fn locate_utility(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| candidates(&dir, name))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(not(unix))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(format!("{name}.exe")), dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
