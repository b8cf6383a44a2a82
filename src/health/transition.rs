//! 状态变化记录
//!
//! 描述单个监控目标在一轮扫描中发生的上下线变化

use crate::health::endpoint::{EndpointId, HostStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 一次状态变化
///
/// 创建后不可变，随本轮扫描的变化集合交给通知器后即被丢弃
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// 监控目标
    pub endpoint: EndpointId,
    /// 变化前状态
    pub previous: HostStatus,
    /// 变化后状态
    pub current: HostStatus,
    /// 观测时间
    pub observed_at: DateTime<Utc>,
}

impl Transition {
    /// 比较检测前后的状态，必要时生成状态变化
    ///
    /// 只有 `Up` 与 `Down` 之间的翻转才算变化，首次检测（`Unknown` 起始）不产生变化
    ///
    /// # 参数
    /// * `endpoint` - 监控目标
    /// * `previous` - 检测前状态
    /// * `current` - 检测后状态
    ///
    /// # 返回
    /// * `Option<Self>` - 状态发生翻转时返回变化记录
    pub fn between(
        endpoint: &EndpointId,
        previous: HostStatus,
        current: HostStatus,
    ) -> Option<Self> {
        if previous == HostStatus::Unknown || previous == current {
            return None;
        }

        Some(Self {
            endpoint: endpoint.clone(),
            previous,
            current,
            observed_at: Utc::now(),
        })
    }

    /// 是否为恢复（Down → Up）
    pub fn is_recovery(&self) -> bool {
        self.current.is_up()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.endpoint, self.current.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::endpoint::Protocol;

    fn endpoint() -> EndpointId {
        EndpointId::new("10.0.0.2", 53, Protocol::Udp)
    }

    #[test]
    fn test_first_check_is_not_a_transition() {
        assert!(Transition::between(&endpoint(), HostStatus::Unknown, HostStatus::Up).is_none());
        assert!(Transition::between(&endpoint(), HostStatus::Unknown, HostStatus::Down).is_none());
    }

    #[test]
    fn test_unchanged_status_is_not_a_transition() {
        assert!(Transition::between(&endpoint(), HostStatus::Up, HostStatus::Up).is_none());
        assert!(Transition::between(&endpoint(), HostStatus::Down, HostStatus::Down).is_none());
    }

    #[test]
    fn test_flip_produces_transition() {
        let down = Transition::between(&endpoint(), HostStatus::Up, HostStatus::Down).unwrap();
        assert_eq!(down.previous, HostStatus::Up);
        assert_eq!(down.current, HostStatus::Down);
        assert!(!down.is_recovery());
        assert_eq!(down.to_string(), "10.0.0.2:53:udp = down");

        let up = Transition::between(&endpoint(), HostStatus::Down, HostStatus::Up).unwrap();
        assert!(up.is_recovery());
        assert_eq!(up.to_string(), "10.0.0.2:53:udp = up");
    }
}
