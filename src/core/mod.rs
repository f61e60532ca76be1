//! 核心模块
//!
//! 包含组件装配、信号处理和应用程序生命周期管理

pub mod app;
pub mod service;
pub mod signal;

// 重新导出主要类型
pub use app::execute_command;
pub use service::{ServiceComponents, ServiceLauncher};
