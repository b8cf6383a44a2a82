//! 单轮扫描的变化汇总

use crate::health::transition::Transition;
use tokio::sync::Mutex;

/// 变化汇总器
///
/// 作用域为一轮扫描；多个检测任务并发追加，按完成顺序保存
#[derive(Debug, Default)]
pub struct ChangeAggregator {
    changes: Mutex<Vec<Transition>>,
}

impl ChangeAggregator {
    /// 创建空的汇总器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次状态变化
    pub async fn record(&self, transition: Transition) {
        self.changes.lock().await.push(transition);
    }

    /// 取出全部变化并清空
    pub async fn drain(&self) -> Vec<Transition> {
        std::mem::take(&mut *self.changes.lock().await)
    }

    /// 当前记录的变化数量
    pub async fn len(&self) -> usize {
        self.changes.lock().await.len()
    }

    /// 是否没有任何变化
    pub async fn is_empty(&self) -> bool {
        self.changes.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::endpoint::{EndpointId, HostStatus, Protocol};
    use std::sync::Arc;

    fn flip(port: u16) -> Transition {
        let endpoint = EndpointId::new("10.0.0.1", port, Protocol::Tcp);
        Transition::between(&endpoint, HostStatus::Up, HostStatus::Down).unwrap()
    }

    #[tokio::test]
    async fn test_drain_returns_insertion_order_and_empties() {
        let aggregator = ChangeAggregator::new();
        aggregator.record(flip(3)).await;
        aggregator.record(flip(1)).await;
        aggregator.record(flip(2)).await;
        assert_eq!(aggregator.len().await, 3);

        let drained = aggregator.drain().await;
        let ports: Vec<u16> = drained.iter().map(|t| t.endpoint.port).collect();
        assert_eq!(ports, vec![3, 1, 2]);

        assert!(aggregator.is_empty().await);
        assert!(aggregator.drain().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_all_kept() {
        let aggregator = Arc::new(ChangeAggregator::new());

        let handles: Vec<_> = (1..=64u16)
            .map(|port| {
                let aggregator = Arc::clone(&aggregator);
                tokio::spawn(async move { aggregator.record(flip(port)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut ports: Vec<u16> = aggregator
            .drain()
            .await
            .iter()
            .map(|t| t.endpoint.port)
            .collect();
        ports.sort_unstable();
        assert_eq!(ports, (1..=64).collect::<Vec<_>>());
    }
}
