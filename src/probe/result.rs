//! 探测结果数据结构
//!
//! 定义单次探测的结果以及日志行、控制台行的格式

use crate::probe::classifier::Classification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 成功结果在控制台上显示的标签
pub const SUCCESS_LABEL: &str = "HTTP";

/// 探测结果：成功（任意HTTP状态码）或已分类的传输失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// 收到了服务器响应，4xx/5xx 也属于成功的探测
    Success { status_code: u16 },
    /// 请求构造或传输失败
    Failure(Classification),
}

/// 单次探测结果，交给输出目标后即丢弃
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 端点名称
    pub endpoint_name: String,
    /// 探测时间戳
    pub timestamp: DateTime<Utc>,
    /// 从构造请求前到调用返回后的耗时
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// 探测结果
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    /// 创建成功结果
    pub fn success(endpoint_name: impl Into<String>, status_code: u16, elapsed: Duration) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            timestamp: Utc::now(),
            elapsed,
            outcome: ProbeOutcome::Success { status_code },
        }
    }

    /// 创建失败结果
    pub fn failure(
        endpoint_name: impl Into<String>,
        classification: Classification,
        elapsed: Duration,
    ) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            timestamp: Utc::now(),
            elapsed,
            outcome: ProbeOutcome::Failure(classification),
        }
    }

    /// 耗时（毫秒）
    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Success { .. })
    }

    /// 真实HTTP状态码或合成码
    pub fn code(&self) -> u16 {
        match &self.outcome {
            ProbeOutcome::Success { status_code } => *status_code,
            ProbeOutcome::Failure(classification) => classification.synthetic_code,
        }
    }

    /// 结果标签：成功时为 `HTTP`，失败时为类别标签
    pub fn label(&self) -> &str {
        match &self.outcome {
            ProbeOutcome::Success { .. } => SUCCESS_LABEL,
            ProbeOutcome::Failure(classification) => &classification.label,
        }
    }

    /// 写入日志文件的行
    pub fn log_line(&self) -> String {
        format!(
            "System: {}, HTTP Status {}, Time Taken : {} ms",
            self.endpoint_name,
            self.code(),
            self.elapsed_millis()
        )
    }

    /// 控制台显示行，单元格之间以制表符分隔
    pub fn display_line(&self) -> String {
        format!(
            "System: {} \t {} Status {} \t {}",
            self.endpoint_name,
            self.label(),
            self.code(),
            format_elapsed(self.elapsed_millis())
        )
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// 格式化耗时：1000毫秒以下显示整数毫秒，否则显示两位小数的秒数
pub fn format_elapsed(millis: u64) -> String {
    if millis < 1000 {
        format!("{millis} ms")
    } else {
        format!("{:.2} seconds", millis as f64 / 1000.0)
    }
}

/// Duration序列化模块
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
