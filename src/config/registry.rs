//! 服务注册表
//!
//! 进程启动时加载一次，之后只读，无需同步

use crate::config::types::ServiceDefinition;
use std::collections::HashMap;
use std::sync::Arc;

/// 不可变的服务注册表
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Arc<[ServiceDefinition]>,
    by_name: Arc<HashMap<String, usize>>,
}

impl ServiceRegistry {
    /// 由已验证的服务定义创建注册表
    pub fn new(services: Vec<ServiceDefinition>) -> Self {
        let by_name = services
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.name.clone(), idx))
            .collect();

        Self {
            services: services.into(),
            by_name: Arc::new(by_name),
        }
    }

    /// 所有服务定义（按配置顺序）
    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    /// 按名称查找服务
    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.by_name.get(name).map(|&idx| &self.services[idx])
    }

    /// 按检测URL查找服务
    pub fn find_by_url(&self, url: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.url == url)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
