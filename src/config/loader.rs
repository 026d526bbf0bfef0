//! 配置加载器实现
//!
//! 提供JSON/TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// 默认配置文件相对路径
pub const DEFAULT_CONFIG_FILE: &str = "config/config.json";

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// 根据文件扩展名判断格式，`.toml` 以外一律按JSON处理
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载并验证后的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    /// * `format` - 内容格式
    ///
    /// # 返回
    /// * `Result<Config>` - 加载并验证后的配置或错误
    async fn load_from_string(&self, content: &str, format: ConfigFormat) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// 基于文件的配置加载器
#[derive(Debug, Clone, Default)]
pub struct FileConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
    /// 命令行覆盖的探测间隔
    interval_override: Option<u64>,
    /// 命令行覆盖的运行时长
    duration_override: Option<u64>,
}

impl FileConfigLoader {
    /// 创建新的配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
            interval_override: None,
            duration_override: None,
        }
    }

    /// 设置时间策略覆盖值，在验证之前生效
    pub fn with_timing_overrides(mut self, interval: Option<u64>, duration_hours: Option<u64>) -> Self {
        self.interval_override = interval;
        self.duration_override = duration_hours;
        self
    }

    /// 替换字符串中的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {e}")))?;

        let mut missing = None;
        let result = env_var_regex.replace_all(content, |captures: &regex::Captures| {
            let var_name = &captures[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });

        if let Some(var) = missing {
            return Err(ConfigError::EnvVarError { var }.into());
        }

        Ok(result.into_owned())
    }

    /// 解析配置内容
    fn parse(&self, content: &str, format: ConfigFormat) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let mut config: Config = match format {
            ConfigFormat::Json => serde_json::from_str(&processed_content)
                .map_err(|e| ConfigError::ParseError(format!("JSON解析失败: {e}")))?,
            ConfigFormat::Toml => toml::from_str(&processed_content)
                .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {e}")))?,
        };

        if let Some(interval) = self.interval_override {
            config.timings.interval_seconds = interval;
        }
        if let Some(hours) = self.duration_override {
            config.timings.run_duration_hours = hours;
        }

        Ok(config)
    }
}

#[async_trait]
impl ConfigLoader for FileConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ReadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let config = self.parse(&content, ConfigFormat::from_path(path))?;
        self.validate(&config)?;

        tracing::info!("成功加载配置文件: {}", path.display());
        tracing::debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str, format: ConfigFormat) -> Result<Config> {
        let config = self.parse(content, format)?;
        self.validate(&config)?;

        tracing::debug!("成功解析配置字符串");

        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 优先使用当前目录下的 `config/config.json`，不存在时退回到
/// 用户配置目录下的 `latency-monitor/config.json`。
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join(crate::APP_NAME).join("config.json"))
        .unwrap_or(local)
}
