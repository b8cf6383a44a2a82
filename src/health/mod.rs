//! 健康检测模块
//!
//! 提供监控目标定义、TCP/UDP探测、重试策略、状态注册表以及扫描调度功能

pub mod aggregator;
pub mod endpoint;
pub mod probe;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod transition;

// 重新导出主要类型
pub use aggregator::ChangeAggregator;
pub use endpoint::{EndpointId, HostStatus, Protocol};
pub use probe::{
    locate_utility, NetcatUdpProbe, Probe, ProbeRouter, SocketUdpProbe, TcpProbe, UdpProbeKind,
};
pub use registry::{EndpointSlot, HostRegistry};
pub use retry::RetryPolicy;
pub use scheduler::{NotificationStats, ScanScheduler, SchedulerState, SchedulerStatus};
pub use transition::Transition;
