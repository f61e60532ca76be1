//! 服务状态存储模块
//!
//! 保存每个服务最近一次完成的探测结果，供Web层读取、调度器与唤醒协调器写入

use crate::health::ProbeResult;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// 最新状态表
///
/// 写入按条目原子替换；较旧的结果（完成时间更早）不会覆盖较新的结果。
#[derive(Debug, Default)]
pub struct StatusStore {
    /// 服务名称 -> 最近完成的探测结果
    entries: RwLock<HashMap<String, ProbeResult>>,
}

impl StatusStore {
    /// 创建空的状态存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取所有服务的最新结果
    pub async fn get_all(&self) -> HashMap<String, ProbeResult> {
        self.entries.read().await.clone()
    }

    /// 获取特定服务的最新结果
    pub async fn get(&self, name: &str) -> Option<ProbeResult> {
        self.entries.read().await.get(name).cloned()
    }

    /// 写入探测结果
    ///
    /// # 返回
    /// * `bool` - 是否写入；已有结果的完成时间更晚时返回 false
    pub async fn set(&self, name: &str, result: ProbeResult) -> bool {
        let mut entries = self.entries.write().await;

        if let Some(current) = entries.get(name) {
            if current.timestamp > result.timestamp {
                debug!(
                    "丢弃过期结果: {} ({} < {})",
                    name, result.timestamp, current.timestamp
                );
                return false;
            }
        }

        entries.insert(name.to_string(), result);
        true
    }

    /// 已有结果的服务数量
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
