//! 日志级别

use std::fmt;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;

/// 日志级别，从低到高排列
///
/// `Disabled` 只作为阈值使用，表示所有级别都关闭
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
    Disabled = 6,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Disabled => "disabled",
        }
    }

    /// 以 `threshold` 为最低级别时，该级别是否输出
    pub fn passes(self, threshold: Level) -> bool {
        self != Level::Disabled && self >= threshold
    }

    pub(crate) fn from_u8(value: u8) -> Level {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            5 => Level::Fatal,
            _ => Level::Disabled,
        }
    }

    /// 由 tracing 的最大级别换算出最低输出级别
    pub fn from_filter(filter: LevelFilter) -> Level {
        let Some(level) = filter.into_level() else {
            return Level::Disabled;
        };

        if level == tracing::Level::TRACE {
            Level::Trace
        } else if level == tracing::Level::DEBUG {
            Level::Debug
        } else if level == tracing::Level::INFO {
            Level::Info
        } else if level == tracing::Level::WARN {
            Level::Warn
        } else {
            Level::Error
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "disabled" | "off" => Ok(Level::Disabled),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}
