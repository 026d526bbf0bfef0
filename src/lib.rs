//! Latency Monitor - HTTP端点延迟监控工具
//!
//! 按固定间隔并发探测一组HTTP端点，支持：
//! - 每次探测的耗时测量
//! - 网络失败的分类与合成状态码
//! - 控制台列对齐输出与追加写入的结果日志
//! - JSON/TOML 配置与环境变量替换

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod sink;

// 重新导出主要类型
pub use config::{Config, EndpointSpec, Timings};
pub use error::LatencyMonitorError;
pub use probe::{classify, Classification, FailureCategory, HttpProber, PollScheduler, ProbeResult};
pub use sink::{ReportSink, ResultSink};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
