//! 应用程序核心逻辑
//!
//! 解析参数、初始化日志并分发子命令

use crate::cli::args::Args;
use crate::cli::commands::command_for;
use crate::logging::LoggingSystem;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

/// 应用程序主函数
pub async fn main() -> Result<()> {
    let args = Args::parse();

    let logging_system =
        LoggingSystem::setup_logging(args.log_config()).context("初始化日志系统失败")?;

    info!(
        "{} v{} 启动，日志级别: {}",
        crate::APP_NAME,
        crate::VERSION,
        logging_system.config().level
    );

    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
pub async fn execute_command(args: &Args) -> Result<()> {
    let command = args.command();
    command_for(&command)
        .execute(args)
        .await
        .with_context(|| format!("{:?} 命令执行失败", command))
}
