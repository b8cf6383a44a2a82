//! 信号处理模块
//!
//! 将 SIGINT/SIGTERM（非Unix系统为 Ctrl+C）转换为广播的停止信号

use crate::error::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 强制退出时的进程退出码（128 + SIGINT）
const FORCE_EXIT_CODE: i32 = 130;

/// 收到停止信号后的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalAction {
    /// 等待当前一轮扫描结束后退出
    Shutdown,
    /// 立即退出进程
    ForceExit,
}

impl SignalAction {
    /// 根据已收到的停止信号次数决定处理方式
    fn for_count(received: u32) -> Self {
        if received <= 1 {
            SignalAction::Shutdown
        } else {
            SignalAction::ForceExit
        }
    }
}

/// 设置信号处理器
///
/// 收到第一个停止信号后向 `shutdown_tx` 广播一次；
/// 再次收到停止信号时不再等待当前扫描，直接退出进程
///
/// # 参数
/// * `shutdown_tx` - 停止信号发送端
///
/// # 返回
/// * `Result<()>` - 注册信号失败时返回错误
pub fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    #[cfg(unix)]
    {
        setup_unix_signals(shutdown_tx)
    }
    #[cfg(not(unix))]
    {
        setup_ctrl_c(shutdown_tx);
        Ok(())
    }
}

/// Unix/Linux系统信号处理
#[cfg(unix)]
fn setup_unix_signals(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    use futures::stream::StreamExt;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    tokio::spawn(async move {
        let mut received = 0;
        while let Some(signal) = signals.next().await {
            let name = match signal {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                _ => {
                    warn!("接收到未处理的信号: {signal}");
                    continue;
                }
            };

            received += 1;
            handle_stop_signal(name, received, &shutdown_tx);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_ctrl_c(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let mut received = 0;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("监听 Ctrl+C 失败: {e}");
                return;
            }
            received += 1;
            handle_stop_signal("Ctrl+C", received, &shutdown_tx);
        }
    });
}

fn handle_stop_signal(name: &str, received: u32, shutdown_tx: &broadcast::Sender<()>) {
    match SignalAction::for_count(received) {
        SignalAction::Shutdown => {
            info!("接收到 {name} 信号，当前一轮扫描结束后退出（再次发送将立即退出）...");
            broadcast_shutdown(shutdown_tx);
        }
        SignalAction::ForceExit => {
            warn!("再次接收到 {name} 信号，立即退出");
            std::process::exit(FORCE_EXIT_CODE);
        }
    }
}

fn broadcast_shutdown(shutdown_tx: &broadcast::Sender<()>) {
    if let Err(e) = shutdown_tx.send(()) {
        error!("发送停止信号失败: {e}");
    }
}
