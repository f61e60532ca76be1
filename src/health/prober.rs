//! HTTP探测器实现
//!
//! 对单个服务发起一次带超时的HTTP请求（缺省为 GET，附带配置的检测请求头），
//! 并将结果分类为 UP/DOWN/ERROR

use crate::config::ServiceDefinition;
use crate::error::Result;
use crate::health::result::{ProbeResult, ProbeStatus};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 探测器trait，定义探测接口
///
/// 实现方不得返回错误：所有网络层失败都必须转换为 DOWN/ERROR 结果。
#[async_trait]
pub trait Prober: Send + Sync {
    /// 带超时的单次探测
    ///
    /// # 参数
    /// * `service` - 服务定义
    /// * `timeout_duration` - 超时时间
    ///
    /// # 返回
    /// * `ProbeResult` - 探测结果
    async fn probe_with_timeout(
        &self,
        service: &ServiceDefinition,
        timeout_duration: Duration,
    ) -> ProbeResult;

    /// 默认的单次探测超时
    fn default_timeout(&self) -> Duration;

    /// 使用服务自身的超时探测，未配置时使用默认超时
    async fn probe(&self, service: &ServiceDefinition) -> ProbeResult {
        let timeout_duration = service.probe_timeout(self.default_timeout());
        self.probe_with_timeout(service, timeout_duration).await
    }
}

/// HTTP探测器实现
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 默认超时时间
    default_timeout: Duration,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `default_timeout` - 默认超时时间（通常取全局超时预算）
    pub fn new(default_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            default_timeout,
        })
    }

    /// 底层HTTP客户端，唤醒调用复用同一个连接池
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// 构建检测请求
    fn build_request(&self, service: &ServiceDefinition) -> RequestBuilder {
        let method = Method::from_bytes(service.method.as_bytes()).unwrap_or(Method::GET);
        let mut request = self.client.request(method, &service.url);
        for (key, value) in &service.headers {
            request = request.header(key, value);
        }
        request
    }

    /// 处理收到的HTTP响应
    fn classify_response(
        &self,
        service: &ServiceDefinition,
        response: Response,
        latency: Duration,
    ) -> ProbeResult {
        let status_code = response.status().as_u16();
        let status = ProbeStatus::from_status_code(status_code);

        let mut result = ProbeResult::new(service.name.clone(), service.url.clone(), status)
            .with_status_code(status_code)
            .with_latency(latency);

        if !status.is_healthy() {
            result = result.with_detail(describe_status(response.status()));
        }

        result
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe_with_timeout(
        &self,
        service: &ServiceDefinition,
        timeout_duration: Duration,
    ) -> ProbeResult {
        let start_time = Instant::now();

        let response_result = timeout(timeout_duration, self.build_request(service).send()).await;

        let latency = start_time.elapsed();

        match response_result {
            Ok(Ok(response)) => self.classify_response(service, response, latency),
            Ok(Err(e)) => {
                ProbeResult::new(service.name.clone(), service.url.clone(), ProbeStatus::Error)
                    .with_latency(latency)
                    .with_detail(format_request_error(&e))
            }
            Err(_) => {
                ProbeResult::timed_out(service.name.clone(), service.url.clone(), timeout_duration)
            }
        }
    }

    fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

/// 状态码描述，如 `HTTP 503 Service Unavailable`
pub fn describe_status(status: StatusCode) -> String {
    format!(
        "HTTP {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

/// 格式化请求错误信息
pub fn format_request_error(error: &reqwest::Error) -> String {
    let chain = error_chain(error);
    let lowered = chain.to_lowercase();

    if error.is_timeout() {
        "timeout".to_string()
    } else if lowered.contains("dns") || lowered.contains("failed to lookup") {
        format!("DNS resolution failed: {}", chain)
    } else if error.is_connect() {
        format!("Connection failed: {}", chain)
    } else if lowered.contains("certificate") || lowered.contains("tls") {
        format!("SSL/TLS error: {}", chain)
    } else if error.is_builder() || error.is_request() {
        format!("Invalid request: {}", chain)
    } else {
        format!("Request failed: {}", chain)
    }
}

/// 拼接错误链，reqwest 的顶层信息往往不含根因
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
