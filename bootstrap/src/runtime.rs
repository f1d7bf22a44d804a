//! 日志运行时

use std::io::{self, Write};
use std::sync::Arc;

use rpclog_config::{ConfigError, LoggingConfig};
use rpclog_diagnostics::{DiagnosticAdapter, set_diagnostic_logger};
use rpclog_interceptor::UnaryInterceptor;
use rpclog_telemetry::{JsonLogger, Level, StructuredLogger, TelemetryError, try_init_tracing};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// 运行时配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub config_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_dir: "config".to_string(),
        }
    }
}

/// 取 `log_level` 中的默认级别
///
/// 兼容 `info,tonic=warn` 这类 EnvFilter 写法，无法识别时为 info
pub fn logger_level(log_level: &str) -> Level {
    log_level
        .split(',')
        .map(str::trim)
        .find(|directive| !directive.contains('='))
        .and_then(|directive| directive.parse().ok())
        .unwrap_or(Level::Info)
}

/// 按配置的级别构造 JSON 记录器
pub fn build_logger<W: Write + Send>(config: &LoggingConfig, writer: W) -> Arc<JsonLogger<W>> {
    Arc::new(JsonLogger::new(writer).with_level(logger_level(&config.telemetry.log_level)))
}

/// 用给定的记录器和配置中的日志选项构造拦截器
pub fn build_interceptor(
    config: &LoggingConfig,
    logger: Arc<dyn StructuredLogger>,
) -> UnaryInterceptor {
    UnaryInterceptor::new(logger, Arc::new(config.options.clone()))
}

/// 初始化日志运行时
///
/// 安装 tracing subscriber，调用日志与诊断日志都写到标准输出的 JSON 记录器。
/// 每个进程只能成功调用一次。
pub fn init_runtime(config: &LoggingConfig) -> Result<UnaryInterceptor, BootstrapError> {
    try_init_tracing(&config.telemetry.log_level, config.telemetry.json)?;

    let logger: Arc<dyn StructuredLogger> = build_logger(config, io::stdout());
    set_diagnostic_logger(Arc::new(DiagnosticAdapter::new(logger.clone())));

    info!(
        app_name = %config.app_name,
        log_level = %config.telemetry.log_level,
        json = config.telemetry.json,
        "Runtime initialized"
    );

    Ok(build_interceptor(config, logger))
}

/// 加载配置并初始化日志运行时
pub fn start(runtime: &RuntimeConfig) -> Result<(LoggingConfig, UnaryInterceptor), BootstrapError> {
    let config = LoggingConfig::load(&runtime.config_dir)?;
    let interceptor = init_runtime(&config)?;
    Ok((config, interceptor))
}
