//! 配置管理模块
//!
//! 提供服务配置文件解析、验证和服务注册表

pub mod loader;
pub mod registry;
pub mod types;

// 重新导出主要类型
pub use loader::{ConfigLoader, YamlConfigLoader};
pub use registry::ServiceRegistry;
pub use types::{validate_services, ServiceDefinition, ServiceEntry, ServicesFile, Settings};
