//! 唤醒协调器
//!
//! 向休眠的服务发送唤醒请求，随后立即重新探测并更新状态存储

use crate::config::{ServiceDefinition, ServiceRegistry};
use crate::error::WakeError;
use crate::health::{ProbeResult, Prober};
use crate::status::StatusStore;
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// 唤醒协调器
///
/// 与调度循环并发运行；写入状态存储的方式与调度器相同。
pub struct WakeCoordinator {
    /// 发送唤醒请求的HTTP客户端
    client: Client,
    /// 探测器
    prober: Arc<dyn Prober>,
    /// 服务注册表
    registry: ServiceRegistry,
    /// 状态存储
    store: Arc<StatusStore>,
    /// 唤醒请求与重新探测各自的超时
    timeout: Duration,
}

impl WakeCoordinator {
    /// 创建新的唤醒协调器
    pub fn new(
        client: Client,
        prober: Arc<dyn Prober>,
        registry: ServiceRegistry,
        store: Arc<StatusStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            prober,
            registry,
            store,
            timeout,
        }
    }

    /// 按服务名称唤醒
    ///
    /// # 返回
    /// * `Ok(ProbeResult)` - 唤醒后重新探测的结果（已写入状态存储）
    /// * `Err(WakeError::TargetNotFound)` - 未知服务，不会写入任何内容
    pub async fn wake(&self, service_name: &str) -> Result<ProbeResult, WakeError> {
        let service = self
            .registry
            .get(service_name)
            .ok_or_else(|| WakeError::TargetNotFound(service_name.to_string()))?;

        self.wake_service(service).await
    }

    /// 按检测URL唤醒
    pub async fn wake_by_url(&self, url: &str) -> Result<ProbeResult, WakeError> {
        let service = self
            .registry
            .find_by_url(url)
            .ok_or_else(|| WakeError::TargetNotFound(url.to_string()))?;

        self.wake_service(service).await
    }

    async fn wake_service(&self, service: &ServiceDefinition) -> Result<ProbeResult, WakeError> {
        info!(
            "唤醒服务: {} ({} {})",
            service.name, service.wake_method, service.wake_url
        );

        match self.send_wake(service).await {
            Ok(status) => info!("唤醒请求已发送: {},HTTP {}", service.name, status),
            Err(e) => warn!("唤醒请求失败，继续重新探测: {},{}", service.name, e),
        }

        let result = self
            .prober
            .probe_with_timeout(service, service.probe_timeout(self.timeout))
            .await;
        info!(
            "唤醒后探测完成: {},状态: {}",
            service.name, result.status
        );

        self.store.set(&service.name, result.clone()).await;
        Ok(result)
    }

    /// 发送唤醒请求，只返回状态码；调用方仅记录结果
    async fn send_wake(&self, service: &ServiceDefinition) -> Result<u16, WakeError> {
        let method = Method::from_bytes(service.wake_method.as_bytes())
            .map_err(|e| WakeError::RequestFailed(format!("无效的请求方法: {}", e)))?;

        let mut request = self.client.request(method, &service.wake_url);
        for (key, value) in &service.wake_headers {
            request = request.header(key, value);
        }

        request = match &service.wake_body {
            Some(serde_json::Value::String(raw)) => request.body(raw.clone()),
            Some(value) => request.json(value),
            None => request,
        };

        match timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => Ok(response.status().as_u16()),
            Ok(Err(e)) => Err(WakeError::RequestFailed(e.to_string())),
            Err(_) => Err(WakeError::RequestFailed(format!(
                "timeout after {:.1}s",
                self.timeout.as_secs_f64()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HttpProber, ProbeStatus};
    use mockito::Matcher;
    use serde_json::json;

    fn coordinator(services: Vec<ServiceDefinition>) -> (WakeCoordinator, Arc<StatusStore>) {
        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();
        let client = prober.client().clone();
        let store = Arc::new(StatusStore::new());
        let coordinator = WakeCoordinator::new(
            client,
            Arc::new(prober),
            ServiceRegistry::new(services),
            store.clone(),
            Duration::from_secs(5),
        );
        (coordinator, store)
    }

    #[tokio::test]
    async fn test_wake_defaults_to_probe_url_then_updates_store() {
        let mut server = mockito::Server::new_async().await;
        // 一次唤醒 + 一次重新探测
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let service = ServiceDefinition::new("api", format!("{}/health", server.url()));
        let (coordinator, store) = coordinator(vec![service]);

        let result = coordinator.wake("api").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.status, ProbeStatus::Up);
        assert_eq!(store.get("api").await.unwrap().id, result.id);
    }

    #[tokio::test]
    async fn test_wake_sends_method_headers_and_json_body() {
        let mut server = mockito::Server::new_async().await;
        let wake_mock = server
            .mock("POST", "/wake")
            .match_header("authorization", "Bearer secret")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"action": "resume"})))
            .with_status(202)
            .create_async()
            .await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;

        let mut service = ServiceDefinition::new("api", format!("{}/health", server.url()));
        service.wake_url = format!("{}/wake", server.url());
        service.wake_method = "POST".to_string();
        service
            .wake_headers
            .insert("Authorization".to_string(), "Bearer secret".to_string());
        service.wake_body = Some(json!({"action": "resume"}));

        let (coordinator, _) = coordinator(vec![service]);
        coordinator.wake("api").await.unwrap();

        wake_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_wake_string_body_sent_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let wake_mock = server
            .mock("PUT", "/wake")
            .match_body("resume-now")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;

        let mut service = ServiceDefinition::new("api", format!("{}/health", server.url()));
        service.wake_url = format!("{}/wake", server.url());
        service.wake_method = "PUT".to_string();
        service.wake_body = Some(json!("resume-now"));

        let (coordinator, _) = coordinator(vec![service]);
        coordinator.wake("api").await.unwrap();

        wake_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_wake_unknown_service_writes_nothing() {
        let (coordinator, store) = coordinator(vec![ServiceDefinition::new(
            "api",
            "http://127.0.0.1:1/health",
        )]);

        let err = coordinator.wake("ghost").await.unwrap_err();

        assert!(matches!(err, WakeError::TargetNotFound(ref name) if name == "ghost"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_wake_still_probes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(503)
            .create_async()
            .await;

        let mut service = ServiceDefinition::new("api", format!("{}/health", server.url()));
        // 唤醒地址不可达
        service.wake_url = "http://127.0.0.1:1/wake".to_string();

        let (coordinator, store) = coordinator(vec![service]);
        let result = coordinator.wake("api").await.unwrap();

        assert_eq!(result.status, ProbeStatus::Down);
        assert_eq!(store.get("api").await.unwrap().status, ProbeStatus::Down);
    }

    #[tokio::test]
    async fn test_sequential_wakes_produce_independent_results() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .expect_at_least(4)
            .create_async()
            .await;

        let service = ServiceDefinition::new("api", format!("{}/health", server.url()));
        let (coordinator, store) = coordinator(vec![service]);

        let first = coordinator.wake("api").await.unwrap();
        let second = coordinator.wake("api").await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.get("api").await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_wake_by_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .expect_at_least(1)
            .create_async()
            .await;

        let url = format!("{}/health", server.url());
        let (coordinator, store) = coordinator(vec![ServiceDefinition::new("api", url.clone())]);

        let result = coordinator.wake_by_url(&url).await.unwrap();
        assert_eq!(result.service_name, "api");
        assert!(store.get("api").await.is_some());

        assert!(matches!(
            coordinator.wake_by_url("http://nowhere/").await,
            Err(WakeError::TargetNotFound(_))
        ));
    }
}
