//! Uptime Dashboard 主程序入口

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    uptime_dashboard::core::app::main().await
}
