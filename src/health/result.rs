//! 探测结果数据结构
//!
//! 定义单次探测的结果类型和状态枚举

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// 探测状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeStatus {
    /// 可达且返回 2xx/3xx
    Up,
    /// 可达但返回其他状态码
    Down,
    /// 不可达、DNS失败或超时
    Error,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "UP"),
            ProbeStatus::Down => write!(f, "DOWN"),
            ProbeStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl ProbeStatus {
    /// 判断状态是否为健康
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeStatus::Up)
    }

    /// 按HTTP状态码分类
    pub fn from_status_code(code: u16) -> Self {
        if (200..400).contains(&code) {
            ProbeStatus::Up
        } else {
            ProbeStatus::Down
        }
    }
}

/// 探测结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 结果ID
    pub id: Uuid,
    /// 服务名称
    pub service_name: String,
    /// 检测URL
    pub url: String,
    /// 探测状态
    pub status: ProbeStatus,
    /// HTTP状态码（如果有响应）
    pub status_code: Option<u16>,
    /// 请求耗时
    #[serde(rename = "latency_ms", with = "duration_serde")]
    pub latency: Duration,
    /// 完成时间
    pub timestamp: DateTime<Utc>,
    /// 状态码描述或错误信息
    pub detail: Option<String>,
}

impl ProbeResult {
    /// 创建新的探测结果，时间戳取当前时间
    pub fn new(service_name: String, url: String, status: ProbeStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_name,
            url,
            status,
            status_code: None,
            latency: Duration::ZERO,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    /// 超时结果
    pub fn timed_out(service_name: String, url: String, after: Duration) -> Self {
        Self::new(service_name, url, ProbeStatus::Error)
            .with_latency(after)
            .with_detail(format!("timeout after {:.1}s", after.as_secs_f64()))
    }

    /// 设置HTTP状态码
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// 设置耗时
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 设置完成时间
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 获取耗时（毫秒）
    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}

/// Duration序列化模块
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
