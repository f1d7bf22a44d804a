//! 结构化日志记录器
//!
//! 调用日志和诊断日志都通过 [`StructuredLogger`] 输出。
//! - [`JsonLogger`]：每个条目写一行 JSON，字段平铺在顶层（默认）
//! - [`TracingLogger`]：转发为 tracing 事件，条目放在 `entry` 字段

use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::level_filters::LevelFilter;
use tracing::warn;

use crate::entry::LogEntry;
use crate::level::Level;

/// tracing 事件的 target
pub const TARGET: &str = "rpclog";

/// 级别字段名
pub const LEVEL_FIELD: &str = "level";

/// 消息字段名
pub const MESSAGE_FIELD: &str = "message";

/// 结构化日志记录器
///
/// 实现必须可以被多个调用并发使用
pub trait StructuredLogger: Send + Sync {
    /// 当前最低输出级别
    fn min_level(&self) -> Level;

    fn enabled(&self, level: Level) -> bool {
        level.passes(self.min_level())
    }

    /// 输出一个条目，未启用的级别直接丢弃
    fn log(&self, level: Level, entry: LogEntry, message: &str);
}

static DEFAULT_LOGGER: Lazy<Arc<dyn StructuredLogger>> = Lazy::new(|| {
    let logger: Arc<dyn StructuredLogger> = stdout_logger(Level::Info);
    logger
});

/// 进程级默认记录器：标准输出上的 [`JsonLogger`]，最低级别 info
pub fn default_logger() -> Arc<dyn StructuredLogger> {
    DEFAULT_LOGGER.clone()
}

/// 写标准输出的 JSON 记录器
pub fn stdout_logger(level: Level) -> Arc<JsonLogger<Stdout>> {
    Arc::new(JsonLogger::new(io::stdout()).with_level(level))
}

/// 一行 JSON 记录：level、条目字段、message
struct Record<'a> {
    level: Level,
    entry: &'a LogEntry,
    message: &'a str,
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entry.len() + 2))?;
        map.serialize_entry(LEVEL_FIELD, self.level.as_str())?;
        for (key, value) in self.entry.iter() {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(MESSAGE_FIELD, self.message)?;
        map.end()
    }
}

/// 写 JSON 行的记录器
pub struct JsonLogger<W> {
    writer: Mutex<W>,
    level: AtomicU8,
}

impl<W: Write + Send> JsonLogger<W> {
    /// 创建记录器，默认输出所有级别
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            level: AtomicU8::new(Level::Trace as u8),
        }
    }

    pub fn with_level(self, level: Level) -> Self {
        self.set_level(level);
        self
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> StructuredLogger for JsonLogger<W> {
    fn min_level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn log(&self, level: Level, entry: LogEntry, message: &str) {
        if !self.enabled(level) {
            return;
        }

        let record = Record {
            level,
            entry: &entry,
            message,
        };
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to encode log entry");
                return;
            }
        };
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.write_all(&line) {
            warn!(error = %e, "Failed to write log entry");
        }
    }
}

/// 转发到 tracing 的记录器
///
/// tracing 没有 fatal 级别，fatal 以 error 输出并带上 `fatal = true`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl StructuredLogger for TracingLogger {
    fn min_level(&self) -> Level {
        Level::from_filter(LevelFilter::current())
    }

    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Trace => tracing::enabled!(target: TARGET, tracing::Level::TRACE),
            Level::Debug => tracing::enabled!(target: TARGET, tracing::Level::DEBUG),
            Level::Info => tracing::enabled!(target: TARGET, tracing::Level::INFO),
            Level::Warn => tracing::enabled!(target: TARGET, tracing::Level::WARN),
            Level::Error | Level::Fatal => {
                tracing::enabled!(target: TARGET, tracing::Level::ERROR)
            }
            Level::Disabled => false,
        }
    }

    fn log(&self, level: Level, entry: LogEntry, message: &str) {
        let fields = entry.to_json_string();
        match level {
            Level::Trace => tracing::trace!(target: TARGET, entry = %fields, "{}", message),
            Level::Debug => tracing::debug!(target: TARGET, entry = %fields, "{}", message),
            Level::Info => tracing::info!(target: TARGET, entry = %fields, "{}", message),
            Level::Warn => tracing::warn!(target: TARGET, entry = %fields, "{}", message),
            Level::Error => tracing::error!(target: TARGET, entry = %fields, "{}", message),
            Level::Fatal => {
                tracing::error!(target: TARGET, entry = %fields, fatal = true, "{}", message)
            }
            Level::Disabled => {}
        }
    }
}
