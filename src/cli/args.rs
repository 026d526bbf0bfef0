//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::sink::{LogFormat, DEFAULT_LOG_DIR};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Latency Monitor - HTTP端点延迟监控工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "latency-monitor",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "LATENCY_MONITOR_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 诊断日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "warn",
        help = "诊断日志级别",
        env = "LATENCY_MONITOR_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 诊断日志使用JSON格式
    #[arg(long, help = "诊断日志使用JSON格式")]
    pub json_diagnostics: bool,

    /// 诊断日志不输出ANSI颜色
    #[arg(long, help = "诊断日志不输出ANSI颜色")]
    pub no_color: bool,

    /// 结果日志目录
    #[arg(
        long,
        value_name = "DIR",
        default_value = DEFAULT_LOG_DIR,
        help = "结果日志目录",
        env = "LATENCY_MONITOR_LOG_DIR"
    )]
    pub log_dir: PathBuf,

    /// 结果日志文件路径，指定后忽略 --log-dir
    #[arg(long, value_name = "FILE", help = "结果日志文件路径")]
    pub log_file: Option<PathBuf>,

    /// 结果日志格式
    #[arg(long, value_enum, default_value = "text", help = "结果日志格式")]
    pub log_format: OutputFormat,

    /// 禁用配置文件中的环境变量替换
    #[arg(long, help = "禁用 ${VAR} 环境变量替换")]
    pub no_env: bool,

    /// 覆盖探测间隔（秒）
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "覆盖探测间隔（秒）",
        env = "LATENCY_MONITOR_INTERVAL"
    )]
    pub interval: Option<u64>,

    /// 覆盖运行时长（小时）
    #[arg(
        long,
        value_name = "HOURS",
        help = "覆盖运行时长（小时）",
        env = "LATENCY_MONITOR_DURATION_HOURS"
    )]
    pub duration_hours: Option<u64>,

    /// 子命令，缺省为 run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 按配置持续监控所有端点，运行时长结束后退出
    Run,

    /// 对端点执行一次探测
    Check {
        /// 端点名称（可选，不指定则探测所有端点）
        #[arg(short, long, value_name = "NAME", help = "端点名称")]
        endpoint: Option<String>,
    },

    /// 验证配置文件
    Validate,

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl From<OutputFormat> for LogFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => LogFormat::Text,
            OutputFormat::Json => LogFormat::Json,
        }
    }
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }

    /// 要执行的命令，未指定子命令时为 run
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["latency-monitor"]).unwrap();

        assert!(matches!(args.command(), Commands::Run));
        assert_eq!(args.log_level, LogLevel::Warn);
        assert_eq!(args.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
        assert_eq!(args.log_format, OutputFormat::Text);
        assert!(args.interval.is_none());
        assert!(!args.no_env);
        assert!(!args.no_color);

        let args = Args::try_parse_from(["latency-monitor", "--no-color", "--json-diagnostics"]).unwrap();
        assert!(args.no_color);
        assert!(args.json_diagnostics);
    }

    #[test]
    fn test_overrides_and_subcommand() {
        let args = Args::try_parse_from([
            "latency-monitor",
            "--config",
            "custom.toml",
            "--interval",
            "5",
            "--duration-hours",
            "2",
            "check",
            "--endpoint",
            "google",
        ])
        .unwrap();

        assert_eq!(args.get_config_path(), PathBuf::from("custom.toml"));
        assert_eq!(args.interval, Some(5));
        assert_eq!(args.duration_hours, Some(2));
        match args.command() {
            Commands::Check { endpoint } => assert_eq!(endpoint.as_deref(), Some("google")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(log::LevelFilter::from(LogLevel::Debug), log::LevelFilter::Debug);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }
}
