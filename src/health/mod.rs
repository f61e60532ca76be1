//! 健康检测模块
//!
//! 提供HTTP探测、轮次调度和唤醒功能

pub mod prober;
pub mod result;
pub mod scheduler;
pub mod wake;

// 重新导出主要类型
pub use prober::{HttpProber, Prober};
pub use result::{ProbeResult, ProbeStatus};
pub use scheduler::{RoundReport, RoundScheduler, SchedulerSettings};
pub use wake::WakeCoordinator;
