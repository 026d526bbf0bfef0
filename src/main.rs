//! Latency Monitor 主程序入口
//!
//! HTTP端点延迟监控工具

use anyhow::{Context, Result};
use clap::Parser;
use latency_monitor::cli::args::{Args, Commands};
use latency_monitor::cli::commands::{
    CheckCommand, Command, RunCommand, ValidateCommand, VersionCommand,
};
use latency_monitor::logging::{LogConfig, LoggingSystem};
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化诊断日志
    let log_config = LogConfig {
        level: args.log_level.clone().into(),
        json_format: args.json_diagnostics,
        ansi: !args.no_color,
    };

    let logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    debug!(
        "Latency Monitor v{} 启动, 诊断日志配置: {:?}",
        latency_monitor::VERSION,
        logging_system.config()
    );

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match args.command() {
        Commands::Run => Box::new(RunCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Validate => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
