//! 服务启动和组件装配
//!
//! 加载服务注册表，创建探测器、状态存储、调度器和唤醒协调器，
//! 并管理后台调度循环与 Web 服务器的生命周期

use crate::config::{ConfigLoader, ServiceRegistry, Settings, YamlConfigLoader};
use crate::core::signal::setup_signal_handlers;
use crate::error::Result;
use crate::health::{HttpProber, Prober, RoundScheduler, SchedulerSettings, WakeCoordinator};
use crate::status::StatusStore;
use crate::web::{WebAppState, WebServer};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// 服务组件集合
pub struct ServiceComponents {
    /// 服务注册表
    pub registry: ServiceRegistry,
    /// 状态存储
    pub store: Arc<StatusStore>,
    /// 轮次调度器
    pub scheduler: Arc<RoundScheduler>,
    /// 唤醒协调器
    pub wake: Arc<WakeCoordinator>,
}

impl ServiceComponents {
    /// 按调优参数装配核心组件
    ///
    /// 调度器与唤醒协调器共享同一个探测器、HTTP连接池和状态存储。
    pub fn build(settings: &Settings, registry: ServiceRegistry) -> Result<Self> {
        let http_prober = HttpProber::new(settings.probe_timeout())?;
        let client = http_prober.client().clone();
        let prober: Arc<dyn Prober> = Arc::new(http_prober);
        let store = Arc::new(StatusStore::new());

        let scheduler = Arc::new(RoundScheduler::new(
            Arc::clone(&prober),
            registry.clone(),
            Arc::clone(&store),
            SchedulerSettings::from(settings),
        ));

        let wake = Arc::new(WakeCoordinator::new(
            client,
            prober,
            registry.clone(),
            Arc::clone(&store),
            settings.probe_timeout(),
        ));

        Ok(Self {
            registry,
            store,
            scheduler,
            wake,
        })
    }

    /// Web 层共享状态
    pub fn web_state(&self, refresh_seconds: u64) -> WebAppState {
        WebAppState {
            registry: self.registry.clone(),
            store: Arc::clone(&self.store),
            wake: Arc::clone(&self.wake),
            scheduler: Arc::clone(&self.scheduler),
            refresh_seconds,
        }
    }
}

/// 服务启动器
pub struct ServiceLauncher {
    settings: Settings,
}

impl ServiceLauncher {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// 加载服务注册表
    pub async fn load_registry(&self) -> Result<ServiceRegistry> {
        let loader = YamlConfigLoader::default();
        let services = loader.load_from_file(&self.settings.services_config).await?;
        info!(
            "服务配置加载完成: {}，服务数量: {}",
            self.settings.services_config.display(),
            services.len()
        );
        Ok(ServiceRegistry::new(services))
    }

    /// 运行服务直到收到 SIGINT/SIGTERM
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, _) = broadcast::channel(4);
        setup_signal_handlers(shutdown_tx.clone())?;
        self.run_until(shutdown_tx).await
    }

    /// 运行服务直到 `shutdown_tx` 发出关闭信号
    pub async fn run_until(self, shutdown_tx: broadcast::Sender<()>) -> Result<()> {
        let registry = self.load_registry().await?;
        if registry.is_empty() {
            warn!("没有配置任何服务，仪表板将为空");
        }

        let components = ServiceComponents::build(&self.settings, registry)?;

        let scheduler_handle = Arc::clone(&components.scheduler).spawn(shutdown_tx.subscribe());

        let web_server = WebServer::new(
            &self.settings.bind_address,
            self.settings.port,
            components.web_state(self.settings.check_interval.as_secs()),
        )?;
        info!("启动 Web 面板，地址: {}", web_server.addr());

        let web_result = web_server.start(shutdown_tx.subscribe()).await;
        if let Err(e) = &web_result {
            error!("Web 服务器异常退出: {}", e);
            let _ = shutdown_tx.send(());
        }

        if let Err(e) = scheduler_handle.await {
            error!("调度器任务异常退出: {}", e);
        }

        info!("服务已停止");
        web_result
    }
}
