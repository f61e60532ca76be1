//! Uptime Dashboard - 服务可用性监控与唤醒面板
//!
//! 按固定间隔并发探测一组HTTP服务，并提供：
//! - 带并发上限和每轮全局超时的轮次调度
//! - 最新状态存储与 Web 仪表板
//! - 按需唤醒休眠服务并立即重新探测
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod health;
pub mod logging;
pub mod status;
pub mod web;

// 重新导出主要类型
pub use config::{ServiceDefinition, ServiceRegistry, Settings};
pub use error::UptimeError;
pub use health::{ProbeResult, ProbeStatus, Prober, RoundScheduler, WakeCoordinator};
pub use status::StatusStore;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
