//! 日志系统模块
//!
//! 基于 tracing 的结构化日志配置，同时桥接 log crate 的输出

use log::LevelFilter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{filter::Directive, fmt, prelude::*, registry, EnvFilter, Layer};

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选，未设置时输出到控制台）
    pub file_path: Option<PathBuf>,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        let mut module_levels = HashMap::new();
        // 连接池与请求细节过于嘈杂
        module_levels.insert("hyper".to_string(), LevelFilter::Warn);
        module_levels.insert("reqwest".to_string(), LevelFilter::Warn);

        Self {
            level: LevelFilter::Info,
            file_path: None,
            json_format: false,
            module_levels,
        }
    }
}

/// 全局初始化结果，进程内只初始化一次
static LOGGING_INIT: OnceLock<Mutex<Option<Result<(), String>>>> = OnceLock::new();

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 重复调用是安全的：第一次调用安装全局订阅器，之后的调用返回第一次的结果。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let state = LOGGING_INIT.get_or_init(|| Mutex::new(None));
        let mut state = state
            .lock()
            .map_err(|e| anyhow::anyhow!("日志状态锁已损坏: {}", e))?;

        let result = match state.as_ref() {
            Some(previous) => previous.clone(),
            None => {
                let result = Self::perform_initialization(&config).map_err(|e| e.to_string());
                *state = Some(result.clone());
                result
            }
        };

        result.map_err(|e| anyhow::anyhow!("日志系统初始化失败: {}", e))?;
        Ok(Self { config })
    }

    /// 当前配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        // log crate 到 tracing 的桥接
        tracing_log::LogTracer::init().map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;

        let env_filter = Self::build_filter(config)?;

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(config.file_path.is_none())
                .with_target(true)
                .boxed()
        };

        let result = match &config.file_path {
            Some(file_path) => {
                let file = std::fs::File::create(file_path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_file(true)
                    .with_line_number(true);
                registry().with(env_filter).with(file_layer).try_init()
            }
            None => registry().with(env_filter).with(fmt_layer).try_init(),
        };

        result.map_err(|e| anyhow::anyhow!("tracing subscriber初始化失败: {}", e))?;

        tracing::debug!("日志配置: {:?}", config);
        Ok(())
    }

    /// RUST_LOG 优先，其次是配置中的级别和模块级别
    fn build_filter(config: &LogConfig) -> anyhow::Result<EnvFilter> {
        let mut env_filter = EnvFilter::builder()
            .with_default_directive(level_directive(config.level))
            .from_env_lossy();

        for (module, level) in &config.module_levels {
            let directive: Directive = format!("{}={}", module, level_to_string(*level))
                .parse()
                .map_err(|e| anyhow::anyhow!("无效的模块日志级别 {}: {}", module, e))?;
            env_filter = env_filter.add_directive(directive);
        }

        Ok(env_filter)
    }
}

/// 将 log::LevelFilter 转换为 tracing 的指令
fn level_directive(level: LevelFilter) -> Directive {
    match level {
        LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF.into(),
        LevelFilter::Error => Directive::from(tracing::Level::ERROR),
        LevelFilter::Warn => Directive::from(tracing::Level::WARN),
        LevelFilter::Info => Directive::from(tracing::Level::INFO),
        LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
        LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
    }
}

fn level_to_string(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quiets_http_stack() {
        let config = LogConfig::default();
        assert_eq!(config.module_levels.get("hyper"), Some(&LevelFilter::Warn));
        assert!(!config.json_format);
    }

    #[test]
    fn test_filter_accepts_module_levels() {
        let mut config = LogConfig::default();
        config
            .module_levels
            .insert("uptime_dashboard::health".to_string(), LevelFilter::Trace);
        assert!(LoggingSystem::build_filter(&config).is_ok());
    }

    #[test]
    fn test_setup_is_idempotent() {
        let first = LoggingSystem::setup_logging(LogConfig::default());
        let second = LoggingSystem::setup_logging(LogConfig {
            json_format: true,
            level: LevelFilter::Debug,
            ..Default::default()
        });

        assert_eq!(first.is_ok(), second.is_ok());
        if let Ok(system) = second {
            assert_eq!(system.config().level, LevelFilter::Debug);
        }
    }
}
