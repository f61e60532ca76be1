//! 配置数据结构定义
//!
//! 定义服务配置文件结构、进程级调优参数以及验证逻辑

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// 配置文件结构（`services.yaml`）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesFile {
    /// 服务条目列表（`services:` 留空时为 None）
    #[serde(default)]
    pub services: Option<Vec<ServiceEntry>>,
}

impl ServicesFile {
    /// 应用默认值，转换为服务定义列表
    ///
    /// 含有不支持的检测选项的条目会被拒绝，而不是静默忽略。
    pub fn into_definitions(self) -> Result<Vec<ServiceDefinition>, String> {
        self.services
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                if let Some(key) = entry.unsupported_option() {
                    return Err(format!("服务 {} 使用了不支持的检测选项: {}", entry.url, key));
                }
                Ok(ServiceDefinition::from(entry))
            })
            .collect()
    }
}

/// 配置文件中的单个服务条目（尚未应用默认值）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceEntry {
    /// 服务名称，缺省时使用 url
    pub name: Option<String>,
    /// 检测URL
    pub url: String,
    /// 检测请求方法
    #[serde(default = "default_method")]
    pub method: String,
    /// 检测请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 单个服务的检测超时（秒），仍受轮次截止时间约束
    pub timeout: Option<f64>,
    /// 检测请求体（不支持）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// 期望状态码（不支持，2xx/3xx 一律视为 UP）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_status: Option<serde_json::Value>,
    /// 唤醒URL，缺省时使用 url
    pub wake_url: Option<String>,
    /// 唤醒请求方法
    #[serde(default = "default_wake_method")]
    pub wake_method: String,
    /// 唤醒请求头
    #[serde(default)]
    pub wake_headers: HashMap<String, String>,
    /// 唤醒请求体
    pub wake_body: Option<serde_json::Value>,
    /// 所属区域（仅用于展示）
    pub region: Option<String>,
    /// 标签（仅用于展示）
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ServiceEntry {
    /// 第一个不支持的检测选项
    pub fn unsupported_option(&self) -> Option<&'static str> {
        if self.body.is_some() {
            Some("body")
        } else if self.expect_status.is_some() {
            Some("expect_status")
        } else {
            None
        }
    }
}

/// 服务定义，加载后不可变
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceDefinition {
    /// 服务名称（唯一）
    pub name: String,
    /// 检测URL
    pub url: String,
    /// 检测请求方法（大写）
    pub method: String,
    /// 检测请求头
    pub headers: HashMap<String, String>,
    /// 检测超时（秒），缺省使用全局超时
    pub timeout: Option<f64>,
    /// 唤醒URL
    pub wake_url: String,
    /// 唤醒请求方法（大写）
    pub wake_method: String,
    /// 唤醒请求头
    pub wake_headers: HashMap<String, String>,
    /// 唤醒请求体：字符串原样发送，其他值按JSON发送
    pub wake_body: Option<serde_json::Value>,
    /// 所属区域
    pub region: Option<String>,
    /// 标签
    pub tags: Vec<String>,
}

impl ServiceDefinition {
    /// 以检测URL构造服务定义，其余字段取默认值
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            name: name.into(),
            wake_url: url.clone(),
            url,
            method: default_method(),
            headers: HashMap::new(),
            timeout: None,
            wake_method: default_wake_method(),
            wake_headers: HashMap::new(),
            wake_body: None,
            region: None,
            tags: Vec::new(),
        }
    }

    /// 本服务的检测超时：配置了单独超时则使用它，否则使用 `default`
    ///
    /// 无效的超时值在验证阶段被拒绝，这里只做兜底。
    pub fn probe_timeout(&self, default: Duration) -> Duration {
        self.timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|t| !t.is_zero())
            .unwrap_or(default)
    }
}

impl From<ServiceEntry> for ServiceDefinition {
    fn from(entry: ServiceEntry) -> Self {
        let name = entry
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| entry.url.clone());
        let wake_url = entry.wake_url.unwrap_or_else(|| entry.url.clone());

        Self {
            name,
            url: entry.url,
            method: entry.method.trim().to_uppercase(),
            headers: entry.headers,
            timeout: entry.timeout,
            wake_url,
            wake_method: entry.wake_method.trim().to_uppercase(),
            wake_headers: entry.wake_headers,
            wake_body: entry.wake_body,
            region: entry.region,
            tags: entry.tags,
        }
    }
}

/// 进程级调优参数
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// 服务配置文件路径
    pub services_config: PathBuf,
    /// 检测间隔
    pub check_interval: Duration,
    /// 每轮全局超时
    pub global_timeout: Duration,
    /// 最大并发检测数
    pub concurrency_limit: usize,
    /// Web 绑定地址
    pub bind_address: String,
    /// Web 监听端口
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            services_config: PathBuf::from(DEFAULT_SERVICES_CONFIG),
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECONDS),
            global_timeout: Duration::from_secs_f64(DEFAULT_GLOBAL_TIMEOUT_SECONDS),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// 验证调优参数
    pub fn validate(&self) -> Result<(), String> {
        if self.check_interval.is_zero() {
            return Err("检测间隔不能为0".to_string());
        }
        if self.global_timeout.is_zero() {
            return Err("全局超时时间不能为0".to_string());
        }
        if self.global_timeout > MAX_GLOBAL_TIMEOUT {
            return Err(format!(
                "全局超时时间不能超过 {} 秒",
                MAX_GLOBAL_TIMEOUT.as_secs()
            ));
        }
        if self.concurrency_limit == 0 {
            return Err("最大并发检测数不能为0".to_string());
        }
        if self.bind_address.trim().is_empty() {
            return Err("Web服务器绑定地址不能为空".to_string());
        }
        Ok(())
    }

    /// 单次探测的超时时间
    ///
    /// 每个探测最多可使用整个轮次预算，实际还会被轮次截止时间截断。
    pub fn probe_timeout(&self) -> Duration {
        self.global_timeout
    }
}

/// 默认服务配置文件路径
pub const DEFAULT_SERVICES_CONFIG: &str = "config/services.yaml";
/// 默认检测间隔（秒）
pub const DEFAULT_CHECK_INTERVAL_SECONDS: u64 = 60;
/// 默认全局超时（秒）
pub const DEFAULT_GLOBAL_TIMEOUT_SECONDS: f64 = 8.0;
/// 全局超时上限（一天）
pub const MAX_GLOBAL_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// 默认最大并发数
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;
/// 默认绑定地址
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
/// 默认端口
pub const DEFAULT_PORT: u16 = 8000;

fn default_method() -> String {
    "GET".to_string()
}

fn default_wake_method() -> String {
    "GET".to_string()
}

const VALID_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 服务定义验证函数
///
/// # 参数
/// * `services` - 已应用默认值的服务定义
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_services(services: &[ServiceDefinition]) -> Result<(), String> {
    let mut seen = HashSet::new();

    for service in services {
        if service.name.trim().is_empty() {
            return Err("服务名称不能为空".to_string());
        }

        if !seen.insert(service.name.as_str()) {
            return Err(format!("服务名称重复: {}", service.name));
        }

        if !is_http_url(&service.url) {
            return Err(format!("服务 {} 的URL格式无效", service.name));
        }

        if !VALID_METHODS.contains(&service.method.as_str()) {
            return Err(format!(
                "服务 {} 的检测方法 {} 无效，支持的方法: {:?}",
                service.name, service.method, VALID_METHODS
            ));
        }

        if let Some(secs) = service.timeout {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(format!("服务 {} 的检测超时无效: {}", service.name, secs));
            }
        }

        if !is_http_url(&service.wake_url) {
            return Err(format!("服务 {} 的唤醒URL格式无效", service.name));
        }

        if !VALID_METHODS.contains(&service.wake_method.as_str()) {
            return Err(format!(
                "服务 {} 的唤醒方法 {} 无效，支持的方法: {:?}",
                service.name, service.wake_method, VALID_METHODS
            ));
        }
    }

    Ok(())
}
