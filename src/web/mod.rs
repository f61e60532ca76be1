//! Web界面和API模块
//!
//! 提供仪表板页面、状态查询、唤醒和手动刷新接口

use crate::config::ServiceRegistry;
use crate::health::{ProbeResult, RoundScheduler, WakeCoordinator};
use crate::status::StatusStore;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod server;

pub use server::WebServer;

/// Web 应用共享状态
#[derive(Clone)]
pub struct WebAppState {
    /// 服务注册表
    pub registry: ServiceRegistry,
    /// 状态存储（只读访问）
    pub store: Arc<StatusStore>,
    /// 唤醒协调器
    pub wake: Arc<WakeCoordinator>,
    /// 轮次调度器，用于手动刷新
    pub scheduler: Arc<RoundScheduler>,
    /// 页面自动刷新间隔（秒）
    pub refresh_seconds: u64,
}

/// 构建 Web 路由
pub fn router(state: WebAppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/api/status", get(handlers::api_status))
        .route("/api/wake", post(handlers::api_wake))
        .route("/api/refresh", post(handlers::api_refresh))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API错误响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 是否成功
    pub success: bool,
    /// 响应数据
    pub data: Option<T>,
    /// 错误信息
    pub error: Option<String>,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// 创建错误响应
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

/// 单个服务的展示视图
///
/// 尚未被探测过的服务显示为 `UNKNOWN`。
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub name: String,
    pub url: String,
    pub status: String,
    pub status_code: Option<u16>,
    pub latency_ms: Option<u64>,
    pub checked_at: Option<DateTime<Utc>>,
    pub detail: Option<String>,
    pub region: Option<String>,
    pub tags: Vec<String>,
}

/// 未探测状态
pub const STATUS_UNKNOWN: &str = "UNKNOWN";

impl ServiceView {
    fn new(
        service: &crate::config::ServiceDefinition,
        result: Option<&ProbeResult>,
    ) -> Self {
        Self {
            name: service.name.clone(),
            url: service.url.clone(),
            status: result
                .map(|r| r.status.to_string())
                .unwrap_or_else(|| STATUS_UNKNOWN.to_string()),
            status_code: result.and_then(|r| r.status_code),
            latency_ms: result.map(|r| r.latency_ms()),
            checked_at: result.map(|r| r.timestamp),
            detail: result.and_then(|r| r.detail.clone()),
            region: service.region.clone(),
            tags: service.tags.clone(),
        }
    }
}

/// 状态快照：按名称排序的服务视图与计数
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub services: Vec<ServiceView>,
    pub total: usize,
    pub up: usize,
    pub down: usize,
    pub error: usize,
    pub unknown: usize,
    /// 最近一次结果的完成时间
    pub last_updated: Option<DateTime<Utc>>,
}

impl WebAppState {
    /// 合并注册表和状态存储，生成状态快照
    pub async fn snapshot(&self) -> StatusSnapshot {
        let results = self.store.get_all().await;

        let mut services: Vec<ServiceView> = self
            .registry
            .services()
            .iter()
            .map(|service| ServiceView::new(service, results.get(&service.name)))
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));

        let count = |status: &str| services.iter().filter(|s| s.status == status).count();
        let up = count("UP");
        let down = count("DOWN");
        let error = count("ERROR");
        let unknown = count(STATUS_UNKNOWN);

        StatusSnapshot {
            total: services.len(),
            up,
            down,
            error,
            unknown,
            last_updated: results.values().map(|r| r.timestamp).max(),
            services,
        }
    }
}
