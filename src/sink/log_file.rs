//! 日志文件输出
//!
//! 启动时显式打开的追加写入文件，每行带本地时间前缀

use crate::error::SinkError;
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 默认日志目录
pub const DEFAULT_LOG_DIR: &str = "logs";

/// 日志行格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// `YYYY/MM/DD HH:MM:SS <line>`
    #[default]
    Text,
    /// 每行一个JSON对象
    Json,
}

/// 追加写入的日志文件
pub struct LogFile {
    path: PathBuf,
    format: LogFormat,
    file: Mutex<File>,
}

impl LogFile {
    /// 创建（或追加打开）日志文件，父目录不存在时一并创建
    pub fn create(path: impl AsRef<Path>, format: LogFormat) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let create_error = |source| SinkError::Create {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(create_error)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(create_error)?;

        Ok(Self {
            path,
            format,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// 写入一行，整行一次写入
    pub fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let entry = match self.format {
            LogFormat::Text => format!("{} {}\n", Local::now().format("%Y/%m/%d %H:%M:%S"), line),
            LogFormat::Json => format!("{line}\n"),
        };

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(entry.as_bytes())?;
        Ok(())
    }

    /// 写入一条生命周期消息
    pub fn write_message(&self, message: &str) -> Result<(), SinkError> {
        match self.format {
            LogFormat::Text => self.write_line(message),
            LogFormat::Json => {
                let entry = serde_json::json!({
                    "timestamp": Local::now().to_rfc3339(),
                    "type": "lifecycle",
                    "message": message,
                });
                self.write_line(&entry.to_string())
            }
        }
    }
}

/// 默认日志文件路径：`<dir>/latencies-<日>-<月份>-PID_<pid>.log`
pub fn default_log_path(dir: impl AsRef<Path>, now: DateTime<Local>, pid: u32) -> PathBuf {
    dir.as_ref().join(format!(
        "latencies-{}-{}-PID_{}.log",
        now.format("%-d"),
        now.format("%B"),
        pid
    ))
}
