//! 结果输出模块
//!
//! 探测结果与生命周期消息的输出目标：控制台（列对齐）和日志文件。
//! 输出句柄在启动时创建一次，显式传给需要写结果的组件。

pub mod console;
pub mod log_file;

use crate::probe::ProbeResult;
use std::io::Write;
use tracing::warn;

// 重新导出主要类型
pub use console::ConsoleWriter;
pub use log_file::{default_log_path, LogFile, LogFormat, DEFAULT_LOG_DIR};

/// 结果输出目标trait
///
/// 实现必须保证行级原子：并发调用时各行不会互相穿插。
pub trait ResultSink: Send + Sync {
    /// 一次调度开始，在发起该轮探测之前调用
    fn tick_started(&self, tick: u64);

    /// 把一次探测结果写入日志
    fn log_result(&self, result: &ProbeResult);

    /// 在控制台输出一行探测摘要
    fn display(&self, line: &str);

    /// 记录生命周期消息（启动摘要、关闭通知等）
    fn lifecycle(&self, message: &str);
}

/// 控制台加日志文件的组合输出
pub struct ReportSink {
    console: ConsoleWriter<Box<dyn Write + Send>>,
    log: Option<LogFile>,
}

impl ReportSink {
    /// 创建输出到标准输出的实例
    pub fn stdout(log: Option<LogFile>) -> Self {
        Self::with_writer(Box::new(std::io::stdout()), log)
    }

    /// 使用指定的控制台写入器
    pub fn with_writer(console: Box<dyn Write + Send>, log: Option<LogFile>) -> Self {
        Self {
            console: ConsoleWriter::new(console),
            log,
        }
    }

    /// 只输出到控制台的消息
    pub fn console_only(&self, message: &str) {
        if let Err(e) = self.console.write_plain(message) {
            warn!("写入控制台失败: {}", e);
        }
    }

    fn write_log(&self, line: &str) {
        if let Some(log) = &self.log {
            if let Err(e) = log.write_line(line) {
                warn!("写入日志文件失败 {}: {}", log.path().display(), e);
            }
        }
    }
}

impl ResultSink for ReportSink {
    fn tick_started(&self, tick: u64) {
        tracing::debug!("第 {} 轮探测开始", tick);
        if let Err(e) = self.console.write_blank() {
            warn!("写入控制台失败: {}", e);
        }
    }

    fn log_result(&self, result: &ProbeResult) {
        match self.log.as_ref().map(LogFile::format) {
            Some(LogFormat::Json) => match result.to_json() {
                Ok(json) => self.write_log(&json),
                Err(e) => warn!("序列化探测结果失败: {}", e),
            },
            _ => self.write_log(&result.log_line()),
        }
    }

    fn display(&self, line: &str) {
        if let Err(e) = self.console.write_row(line) {
            warn!("写入控制台失败: {}", e);
        }
    }

    fn lifecycle(&self, message: &str) {
        if let Some(log) = &self.log {
            if let Err(e) = log.write_message(message) {
                warn!("写入日志文件失败 {}: {}", log.path().display(), e);
            }
        }
        self.console_only(message);
    }
}
