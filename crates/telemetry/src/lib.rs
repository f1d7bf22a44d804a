//! telemetry - 结构化日志库

pub mod entry;
pub mod level;
pub mod logger;
pub mod writer;

pub use entry::*;
pub use level::*;
pub use logger::*;
pub use writer::*;

use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to init tracing: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// 初始化 tracing，`json` 为 true 时输出 JSON 格式
///
/// 每个进程只能成功一次，再次调用返回 [`TelemetryError::Init`]
pub fn try_init_tracing(log_level: &str, json: bool) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    }

    Ok(())
}
