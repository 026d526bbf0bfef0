//! 探测失败分类器
//!
//! 将底层传输错误归约为固定的 `(类别, 合成状态码)`，使不同端点、
//! 不同时间的失败结果可以直接比较。分类是纯函数，没有任何全局状态。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 超时后缀加到合成码上的偏移量
pub const TIMEOUT_CODE_OFFSET: u16 = 5;

/// 等待响应头超时的错误描述
pub const RESPONSE_HEADER_TIMEOUT: &str = "timeout awaiting response headers";

/// TLS握手超时的错误描述
pub const TLS_HANDSHAKE_TIMEOUT: &str = "TLS handshake timeout";

/// 传输错误的底层原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// 解析器配置错误
    DnsConfig,
    /// 域名解析失败
    DnsResolution,
    /// 网络地址错误
    Address,
    /// 非法网络地址
    InvalidAddress,
    /// 网络操作错误（连接被拒绝、被重置等）
    Operation,
    /// 响应/头部解析错误
    Parse,
    /// 未知网络类型
    UnknownNetwork,
    /// 其他无法识别的错误
    Other,
}

/// 一次探测失败的描述，由执行器从具体错误构造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault {
    pub kind: FaultKind,
    pub timeout: bool,
    pub message: String,
}

impl TransportFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            timeout: false,
            message: message.into(),
        }
    }

    /// 标记为超时
    pub fn timed_out(mut self) -> Self {
        self.timeout = true;
        self
    }
}

/// 失败类别，固定的封闭集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    DnsConfig,
    Dns,
    NetworkAddress,
    NetworkInvalidAddress,
    HttpOperation,
    HttpParse,
    NetworkUnknown,
    Unhandled,
}

impl FailureCategory {
    /// 全部类别，按分类优先级排列
    pub const ALL: [FailureCategory; 8] = [
        FailureCategory::DnsConfig,
        FailureCategory::Dns,
        FailureCategory::NetworkAddress,
        FailureCategory::NetworkInvalidAddress,
        FailureCategory::HttpOperation,
        FailureCategory::HttpParse,
        FailureCategory::NetworkUnknown,
        FailureCategory::Unhandled,
    ];

    /// 类别的基础合成码
    pub fn base_code(self) -> u16 {
        match self {
            FailureCategory::DnsConfig => 10,
            FailureCategory::Dns => 20,
            FailureCategory::NetworkAddress => 30,
            FailureCategory::NetworkInvalidAddress => 40,
            FailureCategory::HttpOperation => 50,
            FailureCategory::HttpParse => 60,
            FailureCategory::NetworkUnknown => 70,
            FailureCategory::Unhandled => 80,
        }
    }

    /// 非超时情况下的类别标签
    pub fn label(self) -> &'static str {
        match self {
            FailureCategory::DnsConfig => "DNS-Config-Error",
            FailureCategory::Dns => "DNS-Error",
            FailureCategory::NetworkAddress => "Network-Address-Error",
            FailureCategory::NetworkInvalidAddress => "Network-InvalidAddress-Error",
            FailureCategory::HttpOperation => "HTTP-Operation-Error",
            FailureCategory::HttpParse => "HTTP-Parse-Error",
            FailureCategory::NetworkUnknown => "Network-Unknown-Error",
            FailureCategory::Unhandled => "Unhandled-Error",
        }
    }
}

impl From<FaultKind> for FailureCategory {
    fn from(kind: FaultKind) -> Self {
        match kind {
            FaultKind::DnsConfig => FailureCategory::DnsConfig,
            FaultKind::DnsResolution => FailureCategory::Dns,
            FaultKind::Address => FailureCategory::NetworkAddress,
            FaultKind::InvalidAddress => FailureCategory::NetworkInvalidAddress,
            FaultKind::Operation => FailureCategory::HttpOperation,
            FaultKind::Parse => FailureCategory::HttpParse,
            FaultKind::UnknownNetwork => FailureCategory::NetworkUnknown,
            FaultKind::Other => FailureCategory::Unhandled,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// 失败类别
    pub category: FailureCategory,
    /// 展示用标签，超时时后缀由 Error 变为 Timeout
    pub label: String,
    /// 替代HTTP状态码的合成码
    pub synthetic_code: u16,
    /// 是否超时
    pub is_timeout: bool,
}

/// 对一次传输失败分类
///
/// 超时会在基础码上加5，并把标签中的 "Error" 替换为 "Timeout"。
/// 等待响应头超时与TLS握手超时只细化兜底类别的标签，
/// 对其他类别不做额外处理。
pub fn classify(fault: &TransportFault) -> Classification {
    let category = FailureCategory::from(fault.kind);
    let mut label = category.label().to_string();
    let mut synthetic_code = category.base_code();

    if fault.timeout {
        synthetic_code += TIMEOUT_CODE_OFFSET;
        label = label.replacen("Error", "Timeout", 1);

        if fault.message.contains(RESPONSE_HEADER_TIMEOUT) {
            label = label.replacen("Unhandled", "Response", 1);
        } else if fault.message.contains(TLS_HANDSHAKE_TIMEOUT) {
            label = label.replacen("Unhandled", "TLSHandshake", 1);
        }
    }

    Classification {
        category,
        label,
        synthetic_code,
        is_timeout: fault.timeout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [FaultKind; 8] = [
        FaultKind::DnsConfig,
        FaultKind::DnsResolution,
        FaultKind::Address,
        FaultKind::InvalidAddress,
        FaultKind::Operation,
        FaultKind::Parse,
        FaultKind::UnknownNetwork,
        FaultKind::Other,
    ];

    #[test]
    fn test_base_codes() {
        let codes: Vec<u16> = FailureCategory::ALL.iter().map(|c| c.base_code()).collect();
        assert_eq!(codes, vec![10, 20, 30, 40, 50, 60, 70, 80]);
    }

    #[test]
    fn test_each_kind_maps_to_distinct_category() {
        for (kind, category) in ALL_KINDS.iter().zip(FailureCategory::ALL.iter()) {
            let result = classify(&TransportFault::new(*kind, "boom"));
            assert_eq!(result.category, *category);
            assert_eq!(result.label, category.label());
            assert_eq!(result.synthetic_code, category.base_code());
            assert!(!result.is_timeout);
        }
    }

    #[test]
    fn test_timeout_adds_five_and_renames() {
        let result = classify(&TransportFault::new(FaultKind::Operation, "dial tcp: i/o timeout").timed_out());
        assert_eq!(result.category, FailureCategory::HttpOperation);
        assert_eq!(result.label, "HTTP-Operation-Timeout");
        assert_eq!(result.synthetic_code, 55);
        assert!(result.is_timeout);
    }

    #[test]
    fn test_code_is_base_or_base_plus_five() {
        for kind in ALL_KINDS {
            for timeout in [false, true] {
                let mut fault = TransportFault::new(kind, "x");
                fault.timeout = timeout;
                let result = classify(&fault);
                let base = result.category.base_code();
                let expected = if timeout { base + 5 } else { base };
                assert_eq!(result.synthetic_code, expected);
            }
        }
    }

    #[test]
    fn test_response_header_timeout_refines_unhandled() {
        let fault = TransportFault::new(FaultKind::Other, RESPONSE_HEADER_TIMEOUT).timed_out();
        let result = classify(&fault);
        assert_eq!(result.label, "Response-Timeout");
        assert_eq!(result.synthetic_code, 85);
    }

    #[test]
    fn test_tls_handshake_timeout_refines_unhandled() {
        let fault = TransportFault::new(FaultKind::Other, TLS_HANDSHAKE_TIMEOUT).timed_out();
        let result = classify(&fault);
        assert_eq!(result.label, "TLSHandshake-Timeout");
        assert_eq!(result.synthetic_code, 85);
    }

    #[test]
    fn test_refinement_only_applies_to_unhandled() {
        let fault = TransportFault::new(FaultKind::Operation, "net/http: TLS handshake timeout").timed_out();
        let result = classify(&fault);
        assert_eq!(result.label, "HTTP-Operation-Timeout");
        assert_eq!(result.synthetic_code, 55);
    }

    #[test]
    fn test_refinement_markers_ignored_without_timeout() {
        let fault = TransportFault::new(FaultKind::Other, RESPONSE_HEADER_TIMEOUT);
        let result = classify(&fault);
        assert_eq!(result.label, "Unhandled-Error");
        assert_eq!(result.synthetic_code, 80);
    }

    #[test]
    fn test_dns_config_timeout_label() {
        let result = classify(&TransportFault::new(FaultKind::DnsConfig, "x").timed_out());
        assert_eq!(result.label, "DNS-Config-Timeout");
        assert_eq!(result.synthetic_code, 15);
    }
}
