//! Web 路由处理函数
//!
//! 实现仪表板页面和 JSON API 的处理逻辑

use super::{ApiResponse, ServiceView, StatusSnapshot, WebAppState};
use crate::error::WakeError;
use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{error, info};

/// 仪表板模板
#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    services: Vec<DashboardRow>,
    last_updated: String,
    total_count: usize,
    up_count: usize,
    down_count: usize,
    error_count: usize,
    unknown_count: usize,
    refresh_interval: u64,
}

/// 模板中的一行，所有字段预先格式化
struct DashboardRow {
    name: String,
    url: String,
    status: String,
    status_class: String,
    status_code: String,
    latency: String,
    checked_at: String,
    detail: String,
    region: String,
    tags: String,
}

impl From<ServiceView> for DashboardRow {
    fn from(view: ServiceView) -> Self {
        Self {
            status_class: view.status.to_lowercase(),
            status_code: view
                .status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            latency: view
                .latency_ms
                .map(|ms| format!("{} ms", ms))
                .unwrap_or_else(|| "-".to_string()),
            checked_at: view
                .checked_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string()),
            detail: view.detail.unwrap_or_default(),
            region: view.region.unwrap_or_default(),
            tags: view.tags.join(", "),
            name: view.name,
            url: view.url,
            status: view.status,
        }
    }
}

/// 唤醒请求：按名称或检测URL指定服务
#[derive(Debug, Default, Deserialize)]
pub struct WakeRequest {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// 仪表板页面处理函数
pub async fn dashboard(State(app_state): State<WebAppState>) -> Response {
    let StatusSnapshot {
        services,
        total,
        up,
        down,
        error: error_count,
        unknown,
        last_updated,
    } = app_state.snapshot().await;

    let template = DashboardTemplate {
        services: services.into_iter().map(DashboardRow::from).collect(),
        last_updated: last_updated
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "尚未检测".to_string()),
        total_count: total,
        up_count: up,
        down_count: down,
        error_count,
        unknown_count: unknown,
        refresh_interval: app_state.refresh_seconds,
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("模板渲染失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "模板渲染失败").into_response()
        }
    }
}

/// API 状态端点处理函数
pub async fn api_status(State(app_state): State<WebAppState>) -> Json<StatusSnapshot> {
    Json(app_state.snapshot().await)
}

/// API 唤醒端点处理函数
pub async fn api_wake(
    State(app_state): State<WebAppState>,
    Json(request): Json<WakeRequest>,
) -> Response {
    let outcome = match (request.name.as_deref(), request.url.as_deref()) {
        (Some(name), _) if !name.trim().is_empty() => app_state.wake.wake(name.trim()).await,
        (_, Some(url)) if !url.trim().is_empty() => app_state.wake.wake_by_url(url.trim()).await,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error("请求必须包含 name 或 url")),
            )
                .into_response();
        }
    };

    match outcome {
        Ok(result) => Json(result).into_response(),
        Err(e @ WakeError::TargetNotFound(_)) => {
            info!("唤醒请求指向未知服务: {}", e);
            (StatusCode::NOT_FOUND, Json(ApiResponse::<()>::error(e.to_string()))).into_response()
        }
        Err(e) => {
            error!("唤醒失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// API 手动刷新端点处理函数
///
/// 立即执行一轮探测；若后台轮次正在进行，则等待其结束后再执行。
pub async fn api_refresh(State(app_state): State<WebAppState>) -> Response {
    info!("收到手动刷新请求");
    let report = app_state.scheduler.run_round().await;
    Json(report).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServiceDefinition, ServiceRegistry};
    use crate::health::{
        HttpProber, ProbeResult, ProbeStatus, Prober, RoundScheduler, SchedulerSettings,
        WakeCoordinator,
    };
    use crate::status::StatusStore;
    use crate::web::router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_state(services: Vec<ServiceDefinition>) -> WebAppState {
        let prober = HttpProber::new(Duration::from_secs(2)).unwrap();
        let client = prober.client().clone();
        let prober: Arc<dyn Prober> = Arc::new(prober);
        let registry = ServiceRegistry::new(services);
        let store = Arc::new(StatusStore::new());

        let wake = Arc::new(WakeCoordinator::new(
            client,
            Arc::clone(&prober),
            registry.clone(),
            store.clone(),
            Duration::from_secs(2),
        ));
        let scheduler = Arc::new(RoundScheduler::new(
            prober,
            registry.clone(),
            store.clone(),
            SchedulerSettings {
                interval: Duration::from_secs(60),
                global_timeout: Duration::from_secs(2),
                concurrency_limit: 4,
                probe_timeout: Duration::from_secs(2),
            },
        ));

        WebAppState {
            registry,
            store,
            wake,
            scheduler,
            refresh_seconds: 30,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn wake_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/wake")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_status_sorted_with_unknown() {
        let state = app_state(vec![
            ServiceDefinition::new("zeta", "http://127.0.0.1:1/z"),
            ServiceDefinition::new("alpha", "http://127.0.0.1:1/a"),
        ]);
        state
            .store
            .set(
                "zeta",
                ProbeResult::new("zeta".to_string(), "http://127.0.0.1:1/z".to_string(), ProbeStatus::Down)
                    .with_status_code(503),
            )
            .await;

        let response = router(state)
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["services"][0]["name"], "alpha");
        assert_eq!(json["services"][0]["status"], "UNKNOWN");
        assert_eq!(json["services"][1]["status"], "DOWN");
        assert_eq!(json["services"][1]["status_code"], 503);
        assert_eq!(json["down"], 1);
        assert_eq!(json["unknown"], 1);
        assert!(!json["last_updated"].is_null());
    }

    #[tokio::test]
    async fn test_dashboard_renders_services() {
        let state = app_state(vec![ServiceDefinition::new(
            "billing-api",
            "http://127.0.0.1:1/health",
        )]);

        let response = router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("billing-api"));
        assert!(html.contains("UNKNOWN"));
    }

    #[tokio::test]
    async fn test_wake_unknown_service_is_404() {
        let state = app_state(vec![ServiceDefinition::new("api", "http://127.0.0.1:1/")]);
        let store = state.store.clone();

        let response = router(state)
            .oneshot(wake_request(r#"{"name":"ghost"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_wake_without_identifier_is_400() {
        let state = app_state(vec![]);

        let response = router(state).oneshot(wake_request("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wake_returns_probe_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .expect_at_least(1)
            .create_async()
            .await;

        let state = app_state(vec![ServiceDefinition::new(
            "api",
            format!("{}/health", server.url()),
        )]);
        let store = state.store.clone();

        let response = router(state)
            .oneshot(wake_request(r#"{"name":"api"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "UP");
        assert_eq!(json["service_name"], "api");
        assert_eq!(store.get("api").await.unwrap().status, ProbeStatus::Up);
    }

    #[tokio::test]
    async fn test_refresh_runs_a_round() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(500)
            .create_async()
            .await;

        let state = app_state(vec![ServiceDefinition::new(
            "api",
            format!("{}/health", server.url()),
        )]);
        let store = state.store.clone();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["probed"], 1);
        assert_eq!(json["down"], 1);
        assert_eq!(store.get("api").await.unwrap().status, ProbeStatus::Down);
    }
}
