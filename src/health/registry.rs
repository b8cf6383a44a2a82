//! 主机注册表
//!
//! 保存配置的监控目标（顺序固定）及其最近一次的状态。
//! 每个目标拥有独立的状态槽，只由该目标自己的检测任务写入。

use crate::health::endpoint::{EndpointId, HostStatus};
use crate::health::transition::Transition;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 单个监控目标的状态槽
#[derive(Debug)]
pub struct EndpointSlot {
    /// 监控目标
    id: EndpointId,
    /// 最近一次状态
    status: RwLock<HostStatus>,
}

impl EndpointSlot {
    fn new(id: EndpointId) -> Self {
        Self {
            id,
            status: RwLock::new(HostStatus::Unknown),
        }
    }

    /// 监控目标标识
    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    /// 当前状态
    pub async fn status(&self) -> HostStatus {
        *self.status.read().await
    }

    /// 写入本轮检测结果
    ///
    /// # 参数
    /// * `reachable` - 重试策略给出的最终结果
    ///
    /// # 返回
    /// * `Option<Transition>` - 状态从 Up/Down 翻转时返回变化记录
    pub async fn apply(&self, reachable: bool) -> Option<Transition> {
        let current = HostStatus::from_reachable(reachable);
        let mut status = self.status.write().await;
        let previous = std::mem::replace(&mut *status, current);
        Transition::between(&self.id, previous, current)
    }
}

/// 主机注册表
#[derive(Debug, Clone)]
pub struct HostRegistry {
    slots: Vec<Arc<EndpointSlot>>,
}

impl HostRegistry {
    /// 由配置的监控目标创建注册表，所有目标初始状态为 Unknown
    pub fn new(endpoints: impl IntoIterator<Item = EndpointId>) -> Self {
        Self {
            slots: endpoints
                .into_iter()
                .map(|id| Arc::new(EndpointSlot::new(id)))
                .collect(),
        }
    }

    /// 所有状态槽（配置顺序）
    pub fn slots(&self) -> &[Arc<EndpointSlot>] {
        &self.slots
    }

    /// 监控目标数量
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 按配置顺序获取所有目标的当前状态
    pub async fn snapshot(&self) -> Vec<(EndpointId, HostStatus)> {
        let mut snapshot = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            snapshot.push((slot.id.clone(), slot.status().await));
        }
        snapshot
    }

    /// 查询指定目标的状态
    pub async fn status_of(&self, endpoint: &EndpointId) -> Option<HostStatus> {
        for slot in &self.slots {
            if &slot.id == endpoint {
                return Some(slot.status().await);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::endpoint::Protocol;

    fn registry() -> HostRegistry {
        HostRegistry::new(vec![
            EndpointId::new("10.0.0.1", 80, Protocol::Tcp),
            EndpointId::new("10.0.0.2", 53, Protocol::Udp),
        ])
    }

    #[tokio::test]
    async fn test_new_registry_starts_unknown_in_config_order() {
        let registry = registry();
        assert_eq!(registry.len(), 2);

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot[0].0.port, 80);
        assert_eq!(snapshot[1].0.port, 53);
        assert!(snapshot.iter().all(|(_, s)| *s == HostStatus::Unknown));
    }

    #[tokio::test]
    async fn test_apply_updates_only_own_slot() {
        let registry = registry();
        let first = &registry.slots()[0];

        assert!(first.apply(true).await.is_none());
        assert_eq!(first.status().await, HostStatus::Up);
        assert_eq!(
            registry.status_of(registry.slots()[1].id()).await,
            Some(HostStatus::Unknown)
        );
    }

    #[tokio::test]
    async fn test_apply_reports_flips_after_first_check() {
        let registry = registry();
        let slot = &registry.slots()[1];

        assert!(slot.apply(false).await.is_none());
        assert!(slot.apply(false).await.is_none());

        let transition = slot.apply(true).await.expect("Down → Up 应产生变化");
        assert_eq!(transition.previous, HostStatus::Down);
        assert_eq!(transition.current, HostStatus::Up);
        assert_eq!(&transition.endpoint, slot.id());
    }

    #[tokio::test]
    async fn test_status_of_unknown_endpoint() {
        let registry = registry();
        let missing = EndpointId::new("10.0.0.9", 80, Protocol::Tcp);
        assert!(registry.status_of(&missing).await.is_none());
    }
}
