//! 配置加载器实现
//!
//! 提供YAML服务配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_services, ServiceDefinition, ServicesFile};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载服务定义
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Vec<ServiceDefinition>>` - 已应用默认值并通过验证的服务定义
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Vec<ServiceDefinition>>;

    /// 从字符串加载服务定义
    async fn load_from_string(&self, content: &str) -> Result<Vec<ServiceDefinition>>;

    /// 验证服务定义
    fn validate(&self, services: &[ServiceDefinition]) -> Result<()>;
}

/// YAML配置加载器实现
#[derive(Debug, Clone)]
pub struct YamlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl YamlConfigLoader {
    /// 创建新的YAML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析YAML内容
    fn parse_yaml(&self, content: &str) -> Result<Vec<ServiceDefinition>> {
        let processed_content = self.substitute_env_vars(content)?;

        // 空文件视为没有配置任何服务
        if processed_content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: ServicesFile = serde_yaml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("YAML解析失败: {}", e)))?;

        file.into_definitions()
            .map_err(|e| ConfigError::ValidationError(e).into())
    }
}

impl Default for YamlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for YamlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Vec<ServiceDefinition>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let services = self.parse_yaml(&content)?;
        self.validate(&services)?;

        log::info!("成功加载配置文件: {}", path.display());
        log::debug!(
            "服务列表: {:?}",
            services.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
        );

        Ok(services)
    }

    async fn load_from_string(&self, content: &str) -> Result<Vec<ServiceDefinition>> {
        let services = self.parse_yaml(content)?;
        self.validate(&services)?;

        log::debug!("成功解析配置字符串");

        Ok(services)
    }

    fn validate(&self, services: &[ServiceDefinition]) -> Result<()> {
        if services.is_empty() {
            log::warn!("配置文件中没有任何服务");
        }
        validate_services(services).map_err(|e| ConfigError::ValidationError(e).into())
    }
}
