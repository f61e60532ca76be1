//! 轮次调度器模块
//!
//! 按固定间隔对所有服务执行一轮探测，限制并发数和每轮总耗时

use crate::config::{ServiceRegistry, Settings};
use crate::health::{ProbeResult, ProbeStatus, Prober};
use crate::status::StatusStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// 全局超时无法表示为 Instant 时使用的截止时间
const FAR_DEADLINE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// 调度参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    /// 两轮开始之间的目标间隔
    pub interval: Duration,
    /// 每轮的硬性截止时间
    pub global_timeout: Duration,
    /// 同时进行的最大探测数
    pub concurrency_limit: usize,
    /// 单次探测的超时上限
    pub probe_timeout: Duration,
}

impl From<&Settings> for SchedulerSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            interval: settings.check_interval,
            global_timeout: settings.global_timeout,
            concurrency_limit: settings.concurrency_limit,
            probe_timeout: settings.probe_timeout(),
        }
    }
}

/// 单轮探测汇总
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    /// 开始时刻（单调时钟）
    #[serde(skip)]
    pub started: Instant,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 耗时（毫秒）
    pub duration_ms: u64,
    /// 探测服务数
    pub probed: usize,
    /// 正常数
    pub up: usize,
    /// 异常数
    pub down: usize,
    /// 错误数（含超时）
    pub error: usize,
    /// 因轮次截止而放弃的探测数
    pub timed_out: usize,
    /// 写入状态存储的结果数
    pub stored: usize,
}

/// 轮次调度器
///
/// 同一时间最多只有一轮在执行；后台循环与按需刷新共用同一把轮次锁。
pub struct RoundScheduler {
    /// 探测器
    prober: Arc<dyn Prober>,
    /// 服务注册表
    registry: ServiceRegistry,
    /// 状态存储
    store: Arc<StatusStore>,
    /// 调度参数
    settings: SchedulerSettings,
    /// 轮次互斥锁
    round_lock: Mutex<()>,
    /// 轮次汇总广播
    round_tx: broadcast::Sender<RoundReport>,
}

impl RoundScheduler {
    /// 创建新的轮次调度器
    ///
    /// # 参数
    /// * `prober` - 探测器
    /// * `registry` - 服务注册表
    /// * `store` - 状态存储
    /// * `settings` - 调度参数
    pub fn new(
        prober: Arc<dyn Prober>,
        registry: ServiceRegistry,
        store: Arc<StatusStore>,
        settings: SchedulerSettings,
    ) -> Self {
        let (round_tx, _) = broadcast::channel(16);
        Self {
            prober,
            registry,
            store,
            settings,
            round_lock: Mutex::new(()),
            round_tx,
        }
    }

    /// 订阅每轮结束后的汇总
    pub fn subscribe(&self) -> broadcast::Receiver<RoundReport> {
        self.round_tx.subscribe()
    }

    /// 执行一轮探测并写入状态存储
    ///
    /// 截止时间到达时仍未完成的探测会被中止并记为超时；它们之后不会再写入任何结果。
    pub async fn run_round(&self) -> RoundReport {
        let _round_guard = self.round_lock.lock().await;

        let started = Instant::now();
        let started_at = Utc::now();
        // 超大的全局超时在验证阶段被拒绝，这里仍避免 Instant 溢出
        let deadline = started
            .checked_add(self.settings.global_timeout)
            .unwrap_or_else(|| started + FAR_DEADLINE);
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency_limit));
        let services = self.registry.services();

        debug!("开始新一轮探测，服务数量: {}", services.len());

        let mut tasks = JoinSet::new();
        for service in services.iter().cloned() {
            let prober = Arc::clone(&self.prober);
            let semaphore = Arc::clone(&semaphore);
            let probe_timeout = self.settings.probe_timeout;

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("获取并发许可失败，跳过本次探测: {}", service.name);
                        return ProbeResult::new(service.name, service.url, ProbeStatus::Error)
                            .with_detail("concurrency permit unavailable");
                    }
                };

                let budget = service
                    .probe_timeout(probe_timeout)
                    .min(deadline.saturating_duration_since(Instant::now()));
                prober.probe_with_timeout(&service, budget).await
            });
        }

        let mut results: HashMap<String, ProbeResult> = HashMap::with_capacity(services.len());
        let mut deadline_hit = false;
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(result))) => {
                    results.insert(result.service_name.clone(), result);
                }
                Ok(Some(Err(e))) => {
                    error!("探测任务异常退出: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    tasks.abort_all();
                    break;
                }
            }
        }
        drop(tasks);

        let mut timed_out = 0;
        for service in services {
            if results.contains_key(&service.name) {
                continue;
            }
            let result = if deadline_hit {
                timed_out += 1;
                ProbeResult::timed_out(
                    service.name.clone(),
                    service.url.clone(),
                    self.settings.global_timeout,
                )
            } else {
                ProbeResult::new(service.name.clone(), service.url.clone(), ProbeStatus::Error)
                    .with_detail("probe task aborted")
            };
            results.insert(service.name.clone(), result);
        }

        if timed_out > 0 {
            warn!(
                "本轮达到全局超时 {:.1}s，放弃 {} 个未完成的探测",
                self.settings.global_timeout.as_secs_f64(),
                timed_out
            );
        }

        let mut report = RoundReport {
            started,
            started_at,
            duration_ms: 0,
            probed: results.len(),
            up: 0,
            down: 0,
            error: 0,
            timed_out,
            stored: 0,
        };

        for (name, result) in results {
            match result.status {
                ProbeStatus::Up => report.up += 1,
                ProbeStatus::Down => report.down += 1,
                ProbeStatus::Error => report.error += 1,
            }
            if !result.status.is_healthy() {
                debug!(
                    "服务探测失败: {},{}",
                    name,
                    result.detail.as_deref().unwrap_or("N/A")
                );
            }
            if self.store.set(&name, result).await {
                report.stored += 1;
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        let _ = self.round_tx.send(report.clone());
        report
    }

    /// 运行调度循环，直到收到停止信号
    ///
    /// 每轮结束后休眠 `interval - 本轮耗时`（最少为0），轮次之间不会重叠也不会积压。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "启动轮次调度器，服务数量: {}，间隔: {}s，全局超时: {:.1}s，并发上限: {}",
            self.registry.len(),
            self.settings.interval.as_secs(),
            self.settings.global_timeout.as_secs_f64(),
            self.settings.concurrency_limit
        );

        loop {
            let round_started = Instant::now();

            tokio::select! {
                report = self.run_round() => {
                    info!(
                        "本轮探测完成: {} 个服务，正常 {}，异常 {}，错误 {}，耗时 {}ms",
                        report.probed, report.up, report.down, report.error, report.duration_ms
                    );
                }
                _ = shutdown_rx.recv() => {
                    info!("收到停止信号，中止进行中的探测");
                    break;
                }
            }

            let wait = self.settings.interval.saturating_sub(round_started.elapsed());
            if wait.is_zero() {
                warn!("本轮耗时超过检测间隔，立即开始下一轮");
            }

            tokio::select! {
                _ = sleep(wait) => {}
                _ = shutdown_rx.recv() => {
                    info!("收到停止信号");
                    break;
                }
            }
        }

        info!("轮次调度器已停止");
    }

    /// 在后台任务中运行调度循环
    pub fn spawn(self: Arc<Self>, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown_rx).await })
    }
}
