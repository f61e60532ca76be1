//! 命令处理逻辑
//!
//! 实现 serve / check / validate 三个子命令

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{ConfigLoader, ServiceDefinition, ServiceRegistry, YamlConfigLoader};
use crate::core::service::{ServiceComponents, ServiceLauncher};
use crate::error::{Result, WakeError};
use crate::health::ProbeResult;
use async_trait::async_trait;
use std::path::Path;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 启动服务命令
pub struct ServeCommand;

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let settings = args.settings()?;
        ServiceLauncher::new(settings).run().await
    }
}

/// 一次性检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check { service, format } = args.command() {
            self.perform_check(args, service.as_deref(), &format).await
        } else {
            Ok(())
        }
    }
}

impl CheckCommand {
    /// 对选中的服务执行一轮检测（同样受并发上限和全局超时约束）
    async fn perform_check(
        &self,
        args: &Args,
        service_name: Option<&str>,
        format: &OutputFormat,
    ) -> Result<()> {
        let settings = args.settings()?;
        let loader = YamlConfigLoader::default();
        let mut services = loader.load_from_file(&settings.services_config).await?;

        if let Some(name) = service_name {
            services.retain(|s| s.name == name);
            if services.is_empty() {
                return Err(WakeError::TargetNotFound(name.to_string()).into());
            }
        }

        if services.is_empty() {
            eprintln!("未找到任何服务配置");
            return Ok(());
        }

        let components = ServiceComponents::build(&settings, ServiceRegistry::new(services))?;
        let report = components.scheduler.run_round().await;

        let mut results: Vec<ProbeResult> = components.store.get_all().await.into_values().collect();
        results.sort_by(|a, b| a.service_name.cmp(&b.service_name));

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "report": report,
                    "results": results,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => print_table_results(&results),
            OutputFormat::Text => print_text_results(&results),
        }

        Ok(())
    }
}

/// 打印文本格式结果
fn print_text_results(results: &[ProbeResult]) {
    for result in results {
        let icon = if result.status.is_healthy() { "✓" } else { "✗" };
        println!(
            "{} {} ({}) - {} - {}ms",
            icon,
            result.service_name,
            result.url,
            result.status,
            result.latency_ms()
        );
        if let Some(detail) = &result.detail {
            println!("  详情: {detail}");
        }
    }
}

/// 打印表格格式结果
fn print_table_results(results: &[ProbeResult]) {
    println!(
        "{:<24} {:<8} {:<8} {:<10} {:<30}",
        "服务名称", "状态", "状态码", "延迟", "详情"
    );
    println!("{}", "-".repeat(84));

    for result in results {
        let status_code = result
            .status_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{:<24} {:<8} {:<8} {:<10} {:<30}",
            result.service_name,
            result.status.to_string(),
            status_code,
            format!("{}ms", result.latency_ms()),
            result.detail.as_deref().unwrap_or("")
        );
    }
}

/// 配置验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate { verbose } = args.command() {
            args.settings()?;
            self.validate_config_file(&args.config, verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = YamlConfigLoader::default();
        let services = loader.load_from_file(config_path).await?;

        println!("✓ 配置文件验证通过");
        println!("✓ 找到 {} 个服务配置", services.len());

        if verbose {
            for (i, service) in services.iter().enumerate() {
                print_service(i + 1, service);
            }
        }

        Ok(())
    }
}

fn print_service(index: usize, service: &ServiceDefinition) {
    println!("  {}. {} ({} {})", index, service.name, service.method, service.url);
    if !service.headers.is_empty() {
        let mut keys: Vec<_> = service.headers.keys().collect();
        keys.sort();
        println!("     检测请求头: {:?}", keys);
    }
    if let Some(secs) = service.timeout {
        println!("     检测超时: {}s", secs);
    }
    println!("     唤醒: {} {}", service.wake_method, service.wake_url);
    if !service.wake_headers.is_empty() {
        let mut keys: Vec<_> = service.wake_headers.keys().collect();
        keys.sort();
        println!("     唤醒请求头: {:?}", keys);
    }
    if let Some(region) = &service.region {
        println!("     区域: {}", region);
    }
    if !service.tags.is_empty() {
        println!("     标签: {}", service.tags.join(", "));
    }
}

/// 按子命令选择处理器
pub fn command_for(command: &Commands) -> Box<dyn Command> {
    match command {
        Commands::Serve => Box::new(ServeCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
    }
}
