//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Uptime Dashboard 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum UptimeError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 唤醒相关错误
    #[error("唤醒错误: {0}")]
    Wake(#[from] WakeError),

    /// HTTP客户端构建错误
    #[error("HTTP客户端初始化失败: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 唤醒错误类型
#[derive(Error, Debug)]
pub enum WakeError {
    /// 未知的服务标识
    #[error("未找到服务: {0}")]
    TargetNotFound(String),

    /// 唤醒请求本身失败（仅记录日志，不中断流程）
    #[error("唤醒请求失败: {0}")]
    RequestFailed(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, UptimeError>;
