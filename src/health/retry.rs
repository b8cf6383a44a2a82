//! 重试策略
//!
//! 对单个监控目标最多探测 N 次，失败后等待固定间隔再试，
//! 任意一次成功即立即返回在线

use crate::health::endpoint::EndpointId;
use crate::health::probe::Probe;
use std::time::Duration;
use tracing::{debug, info};

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（至少为1）
    attempts: u32,
    /// 失败后的等待间隔
    delay: Duration,
    /// 单次探测超时时间
    timeout: Duration,
}

impl RetryPolicy {
    /// 创建新的重试策略
    ///
    /// # 参数
    /// * `attempts` - 最大尝试次数，0 按 1 处理
    /// * `delay` - 两次尝试之间的等待间隔
    /// * `timeout` - 单次探测超时时间
    pub fn new(attempts: u32, delay: Duration, timeout: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
            timeout,
        }
    }

    /// 最大尝试次数
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 重试间隔
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 单次探测超时时间
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 单个目标一轮检测的最长耗时
    pub fn worst_case(&self) -> Duration {
        self.timeout
            .saturating_mul(self.attempts)
            .saturating_add(self.delay.saturating_mul(self.attempts - 1))
    }

    /// 按策略检测监控目标
    ///
    /// # 参数
    /// * `probe` - 探测器
    /// * `target` - 监控目标
    ///
    /// # 返回
    /// * `bool` - 任意一次探测成功即为 `true`
    pub async fn check(&self, probe: &dyn Probe, target: &EndpointId) -> bool {
        for attempt in 1..=self.attempts {
            if probe.probe(target, self.timeout).await {
                debug!("{} 第 {} 次探测成功", target, attempt);
                return true;
            }

            if attempt < self.attempts {
                info!(
                    "{} 无响应，{}秒后重试 ({}/{})...",
                    target,
                    self.delay.as_secs(),
                    attempt,
                    self.attempts
                );
                tokio::time::sleep(self.delay).await;
            } else {
                debug!("{} 全部 {} 次探测均失败", target, self.attempts);
            }
        }

        false
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(10), Duration::from_secs(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::endpoint::Protocol;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// 按预设结果依次返回的探测器
    struct ScriptedProbe {
        outcomes: Mutex<VecDeque<bool>>,
        calls: Mutex<u32>,
    }

    impl ScriptedProbe {
        fn new(outcomes: &[bool]) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, _target: &EndpointId, _timeout: Duration) -> bool {
            *self.calls.lock().unwrap() += 1;
            self.outcomes.lock().unwrap().pop_front().unwrap_or(false)
        }
    }

    fn target() -> EndpointId {
        EndpointId::new("10.0.0.1", 80, Protocol::Tcp)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_returns_immediately() {
        let probe = ScriptedProbe::new(&[true, true, true]);
        let policy = RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(3));

        let start = Instant::now();
        assert!(policy.check(&probe, &target()).await);
        assert_eq!(probe.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_failures_waits_between_attempts() {
        let probe = ScriptedProbe::new(&[false, false, true, true]);
        let policy = RetryPolicy::new(5, Duration::from_secs(10), Duration::from_secs(3));

        let start = Instant::now();
        assert!(policy.check(&probe, &target()).await);
        assert_eq!(probe.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failures_return_down_without_trailing_delay() {
        let probe = ScriptedProbe::new(&[false, false, false]);
        let policy = RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(3));

        let start = Instant::now();
        assert!(!policy.check(&probe, &target()).await);
        assert_eq!(probe.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_probes_once() {
        let probe = ScriptedProbe::new(&[false]);
        let policy = RetryPolicy::new(0, Duration::from_secs(10), Duration::from_secs(3));
        assert_eq!(policy.attempts(), 1);

        assert!(!policy.check(&probe, &target()).await);
        assert_eq!(probe.calls(), 1);
    }

    #[test]
    fn test_worst_case_duration() {
        let policy = RetryPolicy::new(5, Duration::from_secs(10), Duration::from_secs(3));
        assert_eq!(policy.worst_case(), Duration::from_secs(5 * 3 + 4 * 10));
        assert_eq!(RetryPolicy::default(), policy);
    }

    #[test]
    fn test_worst_case_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(u32::MAX, Duration::MAX, Duration::MAX);
        assert_eq!(policy.worst_case(), Duration::MAX);
    }
}
