//! Web服务器实现
//!
//! 绑定监听地址并在收到关闭信号后优雅退出

use super::{router, WebAppState};
use crate::error::{ConfigError, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

/// Web服务器
pub struct WebServer {
    /// 监听地址
    addr: SocketAddr,
    /// 共享状态
    state: WebAppState,
}

impl WebServer {
    /// 创建新的Web服务器
    ///
    /// # 参数
    /// * `bind_address` - 绑定地址
    /// * `port` - 监听端口
    /// * `state` - 共享状态
    pub fn new(bind_address: &str, port: u16, state: WebAppState) -> Result<Self> {
        let addr = format!("{}:{}", bind_address, port)
            .parse::<SocketAddr>()
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "无效的监听地址 {}:{}: {}",
                    bind_address, port, e
                ))
            })?;

        Ok(Self { addr, state })
    }

    /// 监听地址
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// 启动Web服务器，直到收到关闭信号
    pub async fn start(self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        serve(listener, self.state, shutdown_rx).await
    }
}

/// 在已绑定的监听器上运行服务
pub async fn serve(
    listener: TcpListener,
    state: WebAppState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Web服务器已启动: http://{}", addr);
    info!("状态接口: http://{}/api/status", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("接收到关闭信号，正在关闭Web服务器...");
        })
        .await?;

    info!("Web服务器已关闭");
    Ok(())
}
