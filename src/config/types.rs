//! 配置数据结构定义
//!
//! 定义探测端点、时间策略以及配置验证逻辑

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 主配置结构，包含时间策略和端点列表
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 时间策略
    #[serde(default)]
    pub timings: Timings,
    /// 端点配置列表
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

/// 时间策略：探测间隔与总运行时长
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    /// 探测间隔（秒）
    #[serde(default)]
    pub interval_seconds: u64,
    /// 总运行时长（小时）
    #[serde(default)]
    pub run_duration_hours: u64,
}

impl Timings {
    /// 探测间隔
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// 总运行时长
    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_duration_hours.saturating_mul(3600))
    }

    /// 两项是否都为正数
    pub fn is_valid(&self) -> bool {
        self.interval_seconds > 0 && self.run_duration_hours > 0
    }
}

/// 单个探测端点，启动后只读
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    /// 显示名称
    pub name: String,
    /// HTTP方法
    #[serde(default = "default_method")]
    pub method: String,
    /// 目标URL
    pub url: String,
    /// Basic 认证信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// 请求头，按顺序全部附加，允许重名
    #[serde(default)]
    pub headers: Vec<Header>,
}

impl EndpointSpec {
    /// 创建只有名称、方法和URL的端点
    pub fn new(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            url: url.into(),
            basic_auth: None,
            headers: Vec::new(),
        }
    }

    /// 设置 Basic 认证
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// 追加请求头
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// 生效的认证信息，用户名和密码都为空时视为未配置
    pub fn credentials(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref().filter(|auth| !auth.is_empty())
    }
}

/// Basic 认证
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BasicAuth {
    /// 用户名
    #[serde(rename = "userName", alias = "username", default)]
    pub username: String,
    /// 密码
    #[serde(default)]
    pub password: String,
}

impl BasicAuth {
    /// 用户名和密码是否都为空
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

/// 请求头
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

fn default_method() -> String {
    "GET".to_string()
}

/// 配置验证函数
///
/// 方法和URL不在这里检查：格式错误会在探测时被计时并分类。
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.endpoints.is_empty() && !config.timings.is_valid() {
        return Err("Unable to parse config file or no endpoints present".to_string());
    }

    if config.timings.interval_seconds == 0 {
        return Err("intervalSeconds 必须为正整数".to_string());
    }

    if config.timings.run_duration_hours == 0 {
        return Err("runDurationHours 必须为正整数".to_string());
    }

    for (index, endpoint) in config.endpoints.iter().enumerate() {
        if endpoint.name.trim().is_empty() {
            return Err(format!("第 {} 个端点的名称不能为空", index + 1));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            timings: Timings {
                interval_seconds: 10,
                run_duration_hours: 1,
            },
            endpoints: vec![EndpointSpec::new("Test Endpoint", "GET", "https://example.com/health")],
        }
    }

    #[test]
    fn test_config_validation() {
        let config = create_test_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_no_endpoints_and_zero_timings_is_fatal() {
        let config = Config {
            timings: Timings::default(),
            endpoints: Vec::new(),
        };

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("no endpoints present"));
    }

    #[test]
    fn test_no_endpoints_with_valid_timings_is_accepted() {
        let mut config = create_test_config();
        config.endpoints.clear();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_interval_with_endpoints_is_rejected() {
        let mut config = create_test_config();
        config.timings.interval_seconds = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("intervalSeconds"));
    }

    #[test]
    fn test_zero_duration_with_endpoints_is_rejected() {
        let mut config = create_test_config();
        config.timings.run_duration_hours = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("runDurationHours"));
    }

    #[test]
    fn test_blank_endpoint_name_is_rejected() {
        let mut config = create_test_config();
        config.endpoints[0].name = "  ".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("名称不能为空"));
    }

    #[test]
    fn test_malformed_method_and_url_pass_validation() {
        let mut config = create_test_config();
        config.endpoints[0].method = "NOT A METHOD".to_string();
        config.endpoints[0].url = "not a url".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_credentials_absent_when_both_empty() {
        let endpoint = EndpointSpec::new("a", "GET", "http://localhost").with_basic_auth("", "");
        assert!(endpoint.credentials().is_none());

        let endpoint = EndpointSpec::new("a", "GET", "http://localhost").with_basic_auth("", "secret");
        assert_eq!(endpoint.credentials().map(|c| c.password.as_str()), Some("secret"));
    }

    #[test]
    fn test_json_schema_matches_camel_case() {
        let json = r#"{
            "timings": { "intervalSeconds": 5, "runDurationHours": 2 },
            "endpoints": [{
                "name": "api",
                "method": "POST",
                "url": "https://example.com",
                "basicAuth": { "userName": "admin", "password": "pw" },
                "headers": [
                    { "name": "X-Trace-Id", "value": "1" },
                    { "name": "X-Trace-Id", "value": "2" }
                ]
            }]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.timings.interval(), Duration::from_secs(5));
        assert_eq!(config.timings.run_duration(), Duration::from_secs(7200));
        assert_eq!(config.endpoints[0].credentials().unwrap().username, "admin");
        assert_eq!(config.endpoints[0].headers.len(), 2);
    }

    #[test]
    fn test_default_method_is_get() {
        let json = r#"{ "name": "api", "url": "https://example.com" }"#;
        let endpoint: EndpointSpec = serde_json::from_str(json).unwrap();
        assert_eq!(endpoint.method, "GET");
        assert!(endpoint.headers.is_empty());
        assert!(endpoint.basic_auth.is_none());
    }
}
