//! 扫描调度器模块
//!
//! 按固定间隔对所有监控目标执行一轮并发检测，汇总状态变化并交给通知器

use crate::error::Result;
use crate::health::aggregator::ChangeAggregator;
use crate::health::probe::Probe;
use crate::health::registry::HostRegistry;
use crate::health::retry::RetryPolicy;
use crate::health::transition::Transition;
use crate::notification::Notifier;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// 调度器运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// 尚未开始
    Idle,
    /// 正在执行一轮扫描
    Scanning,
    /// 等待下一轮扫描
    Waiting,
    /// 已停止
    Stopped,
}

/// 通知统计信息
#[derive(Debug, Clone, Default)]
pub struct NotificationStats {
    /// 总通知发送次数
    pub total_sent: u32,
    /// 通知发送成功次数
    pub successful_sent: u32,
    /// 通知发送失败次数
    pub failed_sent: u32,
    /// 最后通知时间
    pub last_notification_time: Option<DateTime<Utc>>,
}

/// 调度器状态
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    /// 当前状态
    pub state: SchedulerState,
    /// 已完成的扫描轮数
    pub cycles_completed: u64,
    /// 监控目标数量
    pub total_endpoints: usize,
    /// 最近一轮扫描耗时
    pub last_cycle_duration: Option<Duration>,
    /// 通知统计
    pub notification_stats: NotificationStats,
}

/// 扫描调度器
///
/// 每轮为每个监控目标启动一个独立任务，全部结束后才汇总变化，
/// 因此相邻两轮扫描不会重叠
pub struct ScanScheduler {
    /// 主机注册表
    registry: HostRegistry,
    /// 探测器
    probe: Arc<dyn Probe>,
    /// 重试策略
    policy: RetryPolicy,
    /// 两轮扫描之间的等待时间
    interval: Duration,
    /// 通知器
    notifier: Arc<dyn Notifier>,
    /// 调度器状态
    status: Arc<RwLock<SchedulerStatus>>,
}

impl ScanScheduler {
    /// 创建新的扫描调度器
    ///
    /// # 参数
    /// * `registry` - 主机注册表
    /// * `probe` - 探测器
    /// * `policy` - 重试策略
    /// * `interval` - 两轮扫描之间的等待时间
    /// * `notifier` - 通知器
    ///
    /// # 返回
    /// * `Self` - 调度器实例
    pub fn new(
        registry: HostRegistry,
        probe: Arc<dyn Probe>,
        policy: RetryPolicy,
        interval: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let status = SchedulerStatus {
            state: SchedulerState::Idle,
            cycles_completed: 0,
            total_endpoints: registry.len(),
            last_cycle_duration: None,
            notification_stats: NotificationStats::default(),
        };

        Self {
            registry,
            probe,
            policy,
            interval,
            notifier,
            status: Arc::new(RwLock::new(status)),
        }
    }

    /// 主机注册表
    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    /// 获取调度器状态
    pub async fn get_status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    async fn set_state(&self, state: SchedulerState) {
        self.status.write().await.state = state;
    }

    /// 执行一轮扫描
    ///
    /// 所有目标并发检测，等待全部完成后返回本轮的状态变化，
    /// 顺序为各检测任务完成的先后顺序
    ///
    /// # 返回
    /// * `Vec<Transition>` - 本轮检测到的状态变化
    pub async fn run_cycle(&self) -> Vec<Transition> {
        let cycle = {
            let mut status = self.status.write().await;
            status.state = SchedulerState::Scanning;
            status.cycles_completed + 1
        };

        info!(
            "开始第 {} 轮扫描，监控目标数量: {}",
            cycle,
            self.registry.len()
        );
        let started = Instant::now();
        let aggregator = Arc::new(ChangeAggregator::new());

        let handles: Vec<_> = self
            .registry
            .slots()
            .iter()
            .map(|slot| {
                let slot = Arc::clone(slot);
                let probe = Arc::clone(&self.probe);
                let aggregator = Arc::clone(&aggregator);
                let policy = self.policy;

                tokio::spawn(async move {
                    let reachable = policy.check(probe.as_ref(), slot.id()).await;
                    let transition = slot.apply(reachable).await;
                    info!("[#{}] {} 状态: {}", cycle, slot.id(), slot.status().await);

                    if let Some(transition) = transition {
                        aggregator.record(transition).await;
                    }
                })
            })
            .collect();

        // 等待本轮全部检测任务结束
        let results = join_all(handles).await;
        for (slot, result) in self.registry.slots().iter().zip(results) {
            if let Err(e) = result {
                error!("检测任务异常退出，本轮不更新状态: {} - {}", slot.id(), e);
            }
        }

        let changes = aggregator.drain().await;
        let elapsed = started.elapsed();

        {
            let mut status = self.status.write().await;
            status.cycles_completed = cycle;
            status.last_cycle_duration = Some(elapsed);
        }

        info!(
            "第 {} 轮扫描完成，耗时 {:.1}秒，状态变化数量: {}",
            cycle,
            elapsed.as_secs_f64(),
            changes.len()
        );

        changes
    }

    /// 将本轮状态变化交给通知器
    ///
    /// 通知失败只记录日志和统计，不影响后续扫描
    pub async fn dispatch_changes(&self, changes: &[Transition]) {
        if changes.is_empty() {
            debug!("本轮无状态变化，跳过通知");
            return;
        }

        for change in changes {
            warn!("状态变化: {} ({} -> {})", change.endpoint, change.previous, change.current);
        }

        let success = match self.notifier.notify(changes).await {
            Ok(()) => true,
            Err(e) => {
                error!("发送状态变化通知失败: {}", e);
                false
            }
        };

        let mut status = self.status.write().await;
        let stats = &mut status.notification_stats;
        stats.total_sent += 1;
        if success {
            stats.successful_sent += 1;
        } else {
            stats.failed_sent += 1;
        }
        stats.last_notification_time = Some(Utc::now());
    }

    /// 运行扫描循环直到收到停止信号
    ///
    /// 停止信号只在两轮扫描之间的等待阶段生效，进行中的一轮总会完整结束
    ///
    /// # 参数
    /// * `shutdown` - 停止信号接收器
    ///
    /// # 返回
    /// * `Result<()>` - 正常停止时返回 `Ok`
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            "扫描调度器启动，监控目标数量: {}，扫描间隔: {}，单个目标最长检测耗时: {}",
            self.registry.len(),
            describe_interval(self.interval),
            describe_interval(self.policy.worst_case())
        );

        loop {
            let changes = self.run_cycle().await;
            self.dispatch_changes(&changes).await;

            self.set_state(SchedulerState::Waiting).await;
            info!("等待 {} 后开始下一轮扫描", describe_interval(self.interval));

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    info!("收到停止信号，扫描调度器退出");
                    self.set_state(SchedulerState::Stopped).await;
                    return Ok(());
                }
            }
        }
    }
}

/// 以分钟或秒描述等待时间
fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{}分钟", secs / 60)
    } else {
        format!("{}秒", secs)
    }
}
