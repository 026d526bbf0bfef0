//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, FileConfigLoader};
use crate::error::{LatencyMonitorError, Result};
use crate::probe::{execute, HttpProber, PollScheduler, Prober, RunSummary};
use crate::sink::{default_log_path, LogFile, ReportSink, ResultSink};
use async_trait::async_trait;
use chrono::Local;
use futures::future::join_all;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 按命令行参数创建配置加载器
fn config_loader(args: &Args) -> FileConfigLoader {
    FileConfigLoader::new(!args.no_env).with_timing_overrides(args.interval, args.duration_hours)
}

/// 加载并验证配置
async fn load_config(args: &Args, config_path: &Path) -> Result<Config> {
    config_loader(args).load_from_file(config_path).await
}

/// 监控命令
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        self.run(args, Box::new(std::io::stdout())).await.map(|_| ())
    }
}

impl RunCommand {
    /// 完整的监控生命周期
    ///
    /// 配置加载或验证失败、日志文件无法创建时直接返回错误，
    /// 此时不会启动任何定时器或探测。
    ///
    /// # 参数
    /// * `args` - 命令行参数
    /// * `console` - 控制台输出
    pub async fn run(&self, args: &Args, mut console: Box<dyn Write + Send>) -> Result<RunSummary> {
        let config_path = args.get_config_path();
        writeln!(console, "Reading config from {}", config_path.display())?;

        let config = load_config(args, &config_path).await?;

        let log_path = Self::log_path(args);
        let log_file = LogFile::create(&log_path, args.log_format.into())?;
        let sink = Arc::new(ReportSink::with_writer(console, Some(log_file)));
        sink.console_only(&format!("Logging to file - {}", log_path.display()));

        if config.endpoints.is_empty() {
            warn!("配置中没有端点，调度器不会发起任何探测");
        }

        for (i, endpoint) in config.endpoints.iter().enumerate() {
            sink.lifecycle(&format!(
                "Endpoint {} \"{}\"\t {}",
                i + 1,
                endpoint.name,
                endpoint.url
            ));
        }
        sink.lifecycle(&format!(
            "Using config as {} seconds interval and {} hour run duration",
            config.timings.interval_seconds, config.timings.run_duration_hours
        ));
        sink.lifecycle("Starting up ... ");

        let prober: Arc<dyn Prober> = Arc::new(HttpProber::new()?);
        let result_sink: Arc<dyn ResultSink> = sink.clone();
        let scheduler = PollScheduler::from_config(&config, prober, result_sink);

        sink.lifecycle(&format!(
            "Started up {} pollers ...",
            scheduler.endpoint_count()
        ));

        let summary = scheduler.run().await?;

        sink.lifecycle("Shutting down ... ");
        info!(
            "监控结束，共 {} 轮，{} 次探测",
            summary.ticks, summary.probes_launched
        );

        Ok(summary)
    }

    /// 结果日志文件路径
    fn log_path(args: &Args) -> PathBuf {
        args.log_file
            .clone()
            .unwrap_or_else(|| default_log_path(&args.log_dir, Local::now(), std::process::id()))
    }
}

/// 单次探测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check { endpoint } = args.command() {
            let sink = ReportSink::stdout(None);
            self.check_endpoints(args, endpoint.as_deref(), &sink)
                .await
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl CheckCommand {
    /// 并发探测一次，按配置顺序输出结果行
    pub async fn check_endpoints(
        &self,
        args: &Args,
        endpoint_name: Option<&str>,
        sink: &ReportSink,
    ) -> Result<Vec<String>> {
        let config = load_config(args, &args.get_config_path()).await?;

        let endpoints: Vec<_> = config
            .endpoints
            .iter()
            .filter(|endpoint| endpoint_name.is_none_or(|name| endpoint.name == name))
            .collect();

        if endpoints.is_empty() {
            return Err(LatencyMonitorError::Other(match endpoint_name {
                Some(name) => anyhow::anyhow!("未找到名为 '{name}' 的端点"),
                None => anyhow::anyhow!("配置中没有任何端点"),
            }));
        }

        let prober = HttpProber::new()?;
        let lines = join_all(
            endpoints
                .into_iter()
                .map(|endpoint| execute(&prober, sink, endpoint)),
        )
        .await;

        for line in &lines {
            sink.display(line);
        }

        Ok(lines)
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let config_path = args.get_config_path();
        println!("验证配置文件: {}", config_path.display());

        let config = load_config(args, &config_path).await?;

        println!("✓ 配置文件验证通过");
        println!(
            "  探测间隔: {}秒, 运行时长: {}小时",
            config.timings.interval_seconds, config.timings.run_duration_hours
        );
        println!("✓ 找到 {} 个端点", config.endpoints.len());
        for (i, endpoint) in config.endpoints.iter().enumerate() {
            println!(
                "  {}. {} {} ({})",
                i + 1,
                endpoint.name,
                endpoint.url,
                endpoint.method
            );
            if !endpoint.headers.is_empty() {
                println!("     请求头: {}", endpoint.headers.len());
            }
            if endpoint.credentials().is_some() {
                println!("     Basic认证: 是");
            }
        }

        Ok(())
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = args.command() {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    fn args_for(config: &Path, extra: &[&str]) -> Args {
        let mut argv = vec![
            "latency-monitor".to_string(),
            "--no-env".to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_run_fails_when_log_file_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(
            &config_path,
            r#"{"timings":{"intervalSeconds":1,"runDurationHours":1},
                "endpoints":[{"name":"a","url":"http://127.0.0.1:1/"}]}"#,
        )
        .unwrap();
        // 以已存在的普通文件作为父目录
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let log_path = blocker.join("out.log");

        let args = args_for(
            &config_path,
            &["--log-file", log_path.to_str().unwrap()],
        );
        let result = RunCommand.run(&args, Box::new(std::io::sink())).await;

        assert!(matches!(result, Err(LatencyMonitorError::Sink(_))));
    }

    #[tokio::test]
    async fn test_check_unknown_endpoint_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[timings]
intervalSeconds = 1
runDurationHours = 1

[[endpoints]]
name = "a"
url = "http://127.0.0.1:1/"
"#,
        )
        .unwrap();

        let args = args_for(&config_path, &[]);
        let sink = ReportSink::with_writer(Box::new(std::io::sink()), None);
        let result = CheckCommand
            .check_endpoints(&args, Some("missing"), &sink)
            .await;

        assert!(result.is_err());
    }
}
