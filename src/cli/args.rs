//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口；所有调优参数也可以通过环境变量设置

use crate::config::types::{
    Settings, DEFAULT_BIND_ADDRESS, DEFAULT_CHECK_INTERVAL_SECONDS, DEFAULT_CONCURRENCY_LIMIT,
    DEFAULT_GLOBAL_TIMEOUT_SECONDS, DEFAULT_PORT, DEFAULT_SERVICES_CONFIG,
};
use crate::error::{ConfigError, Result};
use crate::logging::LogConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Uptime Dashboard - 服务可用性监控与唤醒面板
#[derive(Parser, Debug, Clone)]
#[command(
    name = "uptime-dashboard",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 服务配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "SERVICES_CONFIG",
        default_value = DEFAULT_SERVICES_CONFIG
    )]
    pub config: PathBuf,

    /// 检测间隔（秒）
    #[arg(
        long,
        value_name = "SECONDS",
        env = "CHECK_INTERVAL_SECONDS",
        default_value_t = DEFAULT_CHECK_INTERVAL_SECONDS
    )]
    pub interval: u64,

    /// 每轮全局超时（秒，可为小数）
    #[arg(
        long,
        value_name = "SECONDS",
        env = "GLOBAL_TIMEOUT_SECONDS",
        default_value_t = DEFAULT_GLOBAL_TIMEOUT_SECONDS
    )]
    pub global_timeout: f64,

    /// 最大并发检测数
    #[arg(
        long,
        value_name = "COUNT",
        env = "CONCURRENCY_LIMIT",
        default_value_t = DEFAULT_CONCURRENCY_LIMIT
    )]
    pub concurrency: usize,

    /// Web 绑定地址
    #[arg(long, value_name = "ADDR", env = "BIND_ADDRESS", default_value = DEFAULT_BIND_ADDRESS)]
    pub bind: String,

    /// Web 监听端口
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        ignore_case = true,
        default_value = "info",
        env = "LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 以JSON格式输出日志
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// 日志文件路径
    #[arg(long, value_name = "FILE", env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// 子命令，缺省为 serve
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// 启动调度器和Web面板
    Serve,

    /// 执行一次性检测并输出结果
    Check {
        /// 服务名称（可选，不指定则检测所有服务）
        #[arg(short, long, value_name = "SERVICE")]
        service: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// 验证服务配置文件
    Validate {
        /// 是否显示详细信息
        #[arg(short, long)]
        verbose: bool,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
    /// 表格格式
    Table,
}

impl Args {
    /// 实际执行的子命令
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }

    /// 构建并验证调优参数
    pub fn settings(&self) -> Result<Settings> {
        let global_timeout = Duration::try_from_secs_f64(self.global_timeout).map_err(|_| {
            ConfigError::ValidationError(format!(
                "全局超时时间无效: {}",
                self.global_timeout
            ))
        })?;

        let settings = Settings {
            services_config: self.config.clone(),
            check_interval: Duration::from_secs(self.interval),
            global_timeout,
            concurrency_limit: self.concurrency,
            bind_address: self.bind.clone(),
            port: self.port,
        };

        settings.validate().map_err(ConfigError::ValidationError)?;
        Ok(settings)
    }

    /// 日志配置
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.into(),
            json_format: self.log_json,
            file_path: self.log_file.clone(),
            ..Default::default()
        }
    }
}
