//! 日志系统模块
//!
//! 诊断日志配置：tracing subscriber 输出到标准错误，`log` 记录通过
//! `tracing-log` 桥接。探测结果本身不走这里，而是写入 `sink` 中显式
//! 创建的日志文件。

use log::LevelFilter;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化失败时的错误信息
    init_error: Option<String>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 是否输出ANSI颜色
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Warn,
            json_format: false,
            ansi: true,
        }
    }
}

/// 日志系统管理器
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 重复调用不会重复安装 subscriber，之前的初始化失败会被返回。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        let state_mutex =
            GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));

        {
            let state = state_mutex.lock().unwrap_or_else(|e| e.into_inner());
            if state.initialized && !force_reinit {
                if let Some(e) = &state.init_error {
                    return Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e));
                }
                return Ok(Self { config });
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = state_mutex.lock().unwrap_or_else(|e| e.into_inner());
            state.initialized = true;
            state.init_error = init_result.as_ref().err().map(|e| e.to_string());
        }

        init_result?;
        Ok(Self { config })
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        // RUST_LOG 中的模块级指令优先于默认级别
        let env_filter = EnvFilter::builder()
            .with_default_directive(Self::convert_level_to_directive(config.level))
            .from_env_lossy();

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(config.ansi)
                .with_target(false)
                .boxed()
        };

        // LogTracer 已单独安装，这里只设置全局 subscriber
        let subscriber = registry().with(env_filter).with(fmt_layer);
        match tracing::subscriber::set_global_default(subscriber) {
            Ok(()) => {
                tracing::debug!("日志系统初始化完成: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("already been set") {
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", error_msg))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        let level = match level {
            LevelFilter::Off => TracingLevel::OFF,
            LevelFilter::Error => TracingLevel::ERROR,
            LevelFilter::Warn => TracingLevel::WARN,
            LevelFilter::Info => TracingLevel::INFO,
            LevelFilter::Debug => TracingLevel::DEBUG,
            LevelFilter::Trace => TracingLevel::TRACE,
        };
        Directive::from(level)
    }

    /// 当前实例的配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state_mutex) = GLOBAL_LOGGING_STATE.get() {
            let mut state = state_mutex.lock().unwrap();
            state.initialized = false;
            state.init_error = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            ansi: false,
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        let first = LoggingSystem::setup_logging(config.clone()).unwrap();
        assert!(!first.config().ansi);

        // 第二次初始化不会重复安装
        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_force_reinit() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        let _first = LoggingSystem::setup_logging(config.clone()).unwrap();

        let result = LoggingSystem::setup_logging_with_options(config, true);
        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn test_json_format() {
        LoggingSystem::reset_for_testing();

        let config = LogConfig {
            json_format: true,
            ..create_test_config()
        };
        let system = LoggingSystem::setup_logging(config).unwrap();
        assert!(system.config().json_format);
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LevelFilter::Warn);
        assert!(config.ansi);
        assert!(!config.json_format);
    }
}
