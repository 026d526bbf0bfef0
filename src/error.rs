//! 错误处理模块
//!
//! 定义应用程序的统一错误类型。探测过程中的网络错误不在此列，
//! 它们会被分类为探测结果数据（见 `probe::classifier`）。

use thiserror::Error;

/// Latency Monitor 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum LatencyMonitorError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 输出目标相关错误
    #[error("输出错误: {0}")]
    Sink(#[from] SinkError),

    /// TLS客户端配置错误
    #[error("TLS配置错误: {0}")]
    Tls(#[from] rustls::Error),

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
    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 配置文件读取失败
    #[error("读取配置文件失败: {path}: {reason}")]
    ReadError { path: String, reason: String },

    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 日志文件与控制台输出错误类型
#[derive(Error, Debug)]
pub enum SinkError {
    /// 日志文件创建失败
    #[error("无法创建日志文件 {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 写入失败
    #[error("写入失败: {0}")]
    Write(#[from] std::io::Error),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, LatencyMonitorError>;
