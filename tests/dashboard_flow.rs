//! 端到端流程测试
//!
//! 启动真实的 HTTP 服务，验证轮次检测、状态查询和唤醒的完整流程

use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uptime_dashboard::config::{ConfigLoader, ServiceRegistry, Settings, YamlConfigLoader};
use uptime_dashboard::core::ServiceComponents;
use uptime_dashboard::web::server::serve;

fn settings() -> Settings {
    Settings {
        global_timeout: Duration::from_secs(3),
        concurrency_limit: 4,
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    }
}

async fn registry(upstream: &str) -> ServiceRegistry {
    let yaml = format!(
        r#"
services:
  - name: healthy
    url: {upstream}/up
    region: eu-west
    tags: [prod]
  - name: broken
    url: {upstream}/down
    wake_url: {upstream}/wake
    wake_method: post
    wake_body: {{action: resume}}
"#
    );
    let services = YamlConfigLoader::default()
        .load_from_string(&yaml)
        .await
        .unwrap();
    ServiceRegistry::new(services)
}

#[tokio::test]
async fn test_round_status_and_wake_over_http() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("GET", "/up")
        .with_status(200)
        .expect_at_least(1)
        .create_async()
        .await;
    upstream
        .mock("GET", "/down")
        .with_status(503)
        .expect_at_least(2)
        .create_async()
        .await;
    let wake_mock = upstream
        .mock("POST", "/wake")
        .match_body(mockito::Matcher::Json(serde_json::json!({"action": "resume"})))
        .with_status(202)
        .create_async()
        .await;

    let components = ServiceComponents::build(&settings(), registry(&upstream.url()).await).unwrap();

    let report = components.scheduler.run_round().await;
    assert_eq!(report.probed, 2);
    assert_eq!(report.up, 1);
    assert_eq!(report.down, 1);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = tokio::spawn(serve(listener, components.web_state(60), shutdown_rx));

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let status: serde_json::Value = client
        .get(format!("{base}/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["total"], 2);
    assert_eq!(status["services"][0]["name"], "broken");
    assert_eq!(status["services"][0]["status"], "DOWN");
    assert_eq!(status["services"][1]["region"], "eu-west");

    let before = components.store.get("broken").await.unwrap();

    let response = client
        .post(format!("{base}/api/wake"))
        .json(&serde_json::json!({"name": "broken"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let woken: serde_json::Value = response.json().await.unwrap();
    assert_eq!(woken["status"], "DOWN");
    assert_eq!(woken["status_code"], 503);

    wake_mock.assert_async().await;
    let after = components.store.get("broken").await.unwrap();
    assert_ne!(before.id, after.id);

    let missing = client
        .post(format!("{base}/api/wake"))
        .json(&serde_json::json!({"name": "ghost"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let page = client.get(&base).send().await.unwrap().text().await.unwrap();
    assert!(page.contains("healthy"));
    assert!(page.contains("broken"));

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_round_bounded_when_upstream_hangs() {
    let hanging = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let hanging_addr = hanging.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = hanging.accept().await {
            held.push(socket);
        }
    });

    let yaml = format!(
        "services:\n  - name: stuck\n    url: http://{}/health\n",
        hanging_addr
    );
    let services = YamlConfigLoader::default()
        .load_from_string(&yaml)
        .await
        .unwrap();

    let settings = Settings {
        global_timeout: Duration::from_millis(500),
        ..settings()
    };
    let components = ServiceComponents::build(&settings, ServiceRegistry::new(services)).unwrap();

    let started = std::time::Instant::now();
    let report = components.scheduler.run_round().await;

    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(report.error, 1);
    let stuck = components.store.get("stuck").await.unwrap();
    assert!(stuck.detail.unwrap().contains("timeout"));
}
