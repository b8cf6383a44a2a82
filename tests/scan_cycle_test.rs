//! 扫描流程集成测试
//!
//! 覆盖首轮不报告、状态翻转、幂等性、通知投递以及缺少 nc 时的启动失败

use async_trait::async_trait;
use host_vitals::config::{NotificationConfig, PushoverConfig};
use host_vitals::error::ProbeError;
use host_vitals::health::{
    EndpointId, HostRegistry, HostStatus, Probe, ProbeRouter, Protocol, RetryPolicy,
    ScanScheduler, UdpProbeKind,
};
use host_vitals::notification::NotificationDispatcher;
use mockito::Matcher;
use serial_test::serial;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 按地址返回预设结果的探测器
struct FixedProbe {
    reachable: HashMap<String, AtomicBool>,
}

impl FixedProbe {
    fn new(hosts: &[(&str, bool)]) -> Arc<Self> {
        Arc::new(Self {
            reachable: hosts
                .iter()
                .map(|(host, up)| (host.to_string(), AtomicBool::new(*up)))
                .collect(),
        })
    }

    fn set(&self, host: &str, up: bool) {
        self.reachable[host].store(up, Ordering::SeqCst);
    }
}

#[async_trait]
impl Probe for FixedProbe {
    async fn probe(&self, target: &EndpointId, _timeout: Duration) -> bool {
        self.reachable[&target.address].load(Ordering::SeqCst)
    }
}

fn endpoints() -> (EndpointId, EndpointId) {
    (
        "a:80:tcp".parse().unwrap(),
        "b:53:udp".parse().unwrap(),
    )
}

fn single_attempt() -> RetryPolicy {
    RetryPolicy::new(1, Duration::from_secs(10), Duration::from_secs(3))
}

#[tokio::test]
async fn test_end_to_end_recovery_is_reported_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/1/messages.json")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("title".into(), "Service status changed!".into()),
            Matcher::UrlEncoded("message".into(), "b:53:udp = up.\n".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"status":1}"#)
        .expect(1)
        .create_async()
        .await;

    let mut pushover = PushoverConfig::new("token", "user");
    pushover.api_url = server.url();
    let notification = NotificationConfig {
        pushover: Some(pushover),
        ..Default::default()
    };
    let dispatcher = NotificationDispatcher::from_config(&notification).unwrap();

    let (a, b) = endpoints();
    let probe = FixedProbe::new(&[("a", true), ("b", false)]);
    let router = ProbeRouter::with_probes(probe.clone(), Some(probe.clone() as Arc<dyn Probe>));
    let scheduler = ScanScheduler::new(
        HostRegistry::new([a.clone(), b.clone()]),
        Arc::new(router),
        single_attempt(),
        Duration::from_secs(300),
        Arc::new(dispatcher),
    );

    // 第一轮：Unknown -> 任意状态不产生变化
    let changes = scheduler.run_cycle().await;
    assert!(changes.is_empty());
    scheduler.dispatch_changes(&changes).await;
    assert_eq!(scheduler.registry().status_of(&a).await, Some(HostStatus::Up));
    assert_eq!(scheduler.registry().status_of(&b).await, Some(HostStatus::Down));

    // 第二轮：B 恢复
    probe.set("b", true);
    let changes = scheduler.run_cycle().await;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].endpoint, b);
    assert_eq!(changes[0].previous, HostStatus::Down);
    assert_eq!(changes[0].current, HostStatus::Up);
    scheduler.dispatch_changes(&changes).await;

    // 第三轮：没有变化，不再通知
    let changes = scheduler.run_cycle().await;
    assert!(changes.is_empty());
    scheduler.dispatch_changes(&changes).await;

    mock.assert_async().await;
    let status = scheduler.get_status().await;
    assert_eq!(status.cycles_completed, 3);
    assert_eq!(status.notification_stats.total_sent, 1);
    assert_eq!(status.notification_stats.successful_sent, 1);
}

#[tokio::test]
async fn test_simultaneous_flips_are_batched() {
    let (a, b) = endpoints();
    let probe = FixedProbe::new(&[("a", true), ("b", true)]);
    let scheduler = ScanScheduler::new(
        HostRegistry::new([a.clone(), b.clone()]),
        probe.clone(),
        single_attempt(),
        Duration::from_secs(300),
        Arc::new(NotificationDispatcher::from_config(&NotificationConfig::default()).unwrap()),
    );

    scheduler.run_cycle().await;
    probe.set("a", false);
    probe.set("b", false);

    let changes = scheduler.run_cycle().await;
    let mut flipped: Vec<_> = changes.iter().map(|t| t.endpoint.clone()).collect();
    flipped.sort_by_key(|e| e.to_string());
    assert_eq!(flipped, vec![a, b]);
    assert!(changes.iter().all(|t| t.current == HostStatus::Down));
}

#[test]
#[serial]
fn test_missing_netcat_fails_before_any_cycle() {
    let empty = tempfile::tempdir().unwrap();
    let original = std::env::var_os("PATH");
    std::env::set_var("PATH", empty.path());

    let udp = EndpointId::new("10.0.0.2", 53, Protocol::Udp);
    let tcp = EndpointId::new("10.0.0.1", 80, Protocol::Tcp);

    let missing = ProbeRouter::build(&[tcp.clone(), udp.clone()], UdpProbeKind::Netcat);
    let tcp_only = ProbeRouter::build(&[tcp.clone()], UdpProbeKind::Netcat);
    let socket = ProbeRouter::build(&[tcp, udp], UdpProbeKind::Socket);

    match original {
        Some(path) => std::env::set_var("PATH", path),
        None => std::env::remove_var("PATH"),
    }

    assert!(matches!(
        missing,
        Err(ProbeError::MissingUtility { ref utility }) if utility == "nc"
    ));
    assert!(!tcp_only.unwrap().has_udp());
    assert!(socket.unwrap().has_udp());
}
