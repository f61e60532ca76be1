//! 信号处理模块
//!
//! 将 SIGINT/SIGTERM 与 Ctrl+C 转换为广播的关闭信号

use crate::error::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 设置信号处理器
pub fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    #[cfg(unix)]
    {
        setup_unix_signals(shutdown_tx.clone())?;
    }

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("接收到 Ctrl+C，开始优雅关闭...");
                notify(&shutdown_tx);
            }
            Err(e) => error!("监听中断信号失败: {}", e),
        }
    });

    Ok(())
}

#[cfg(unix)]
fn setup_unix_signals(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    use futures::stream::StreamExt;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    tokio::spawn(async move {
        while let Some(signal) = signals.next().await {
            match signal {
                SIGINT | SIGTERM => {
                    info!("接收到信号 {}，开始优雅关闭...", signal);
                    notify(&shutdown_tx);
                    break;
                }
                _ => warn!("接收到未处理的信号: {}", signal),
            }
        }
    });

    Ok(())
}

fn notify(shutdown_tx: &broadcast::Sender<()>) {
    // 所有接收方都已退出时发送会失败，此时无需处理
    if shutdown_tx.send(()).is_err() {
        info!("关闭信号无接收方");
    }
}
