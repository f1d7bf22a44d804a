//! rpclog-config - 日志选项与配置加载
//!
//! `LogOptions` 决定每次调用记录哪些字段、以什么键名记录。
//! 选项在构造拦截器时传入，之后不可变。

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 请求/响应体记录的默认上限（字节）
pub const DEFAULT_MAX_SIZE: usize = 2_048_000;

/// 调用日志的默认消息
pub const DEFAULT_UNARY_MESSAGE: &str = "unary";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 可记录的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aspect {
    Timestamp,
    Service,
    Method,
    Duration,
    Ip,
    Metadata,
    UserAgent,
    Request,
    Response,
    Error,
    Code,
    Message,
    Details,
}

impl Aspect {
    pub const ALL: [Aspect; 13] = [
        Aspect::Timestamp,
        Aspect::Service,
        Aspect::Method,
        Aspect::Duration,
        Aspect::Ip,
        Aspect::Metadata,
        Aspect::UserAgent,
        Aspect::Request,
        Aspect::Response,
        Aspect::Error,
        Aspect::Code,
        Aspect::Message,
        Aspect::Details,
    ];
}

/// 单个字段的开关与键名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub enabled: bool,
    pub key: String,
}

impl FieldOption {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            key: key.into(),
        }
    }

    /// 启用时返回键名
    pub fn key(&self) -> Option<&str> {
        self.enabled.then_some(self.key.as_str())
    }
}

/// 日志选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    /// 调用开始时间
    pub timestamp: FieldOption,
    /// gRPC 服务名
    pub service: FieldOption,
    /// gRPC 方法名
    pub method: FieldOption,
    /// 调用耗时
    pub duration: FieldOption,
    /// 客户端 IP
    pub ip: FieldOption,
    /// 请求 metadata
    pub metadata: FieldOption,
    /// 客户端 User-Agent，仅在 metadata 关闭时记录
    pub user_agent: FieldOption,
    /// 请求体
    pub request: FieldOption,
    /// 响应体
    pub response: FieldOption,
    /// 错误描述
    pub error: FieldOption,
    /// 状态码
    pub code: FieldOption,
    /// 状态消息
    pub message: FieldOption,
    /// 状态详情
    pub details: FieldOption,
    /// 请求/响应体序列化后必须小于该值才会记录
    pub max_size: usize,
    /// 调用日志的消息
    pub unary_message: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            timestamp: FieldOption::new("time"),
            service: FieldOption::new("service"),
            method: FieldOption::new("method"),
            duration: FieldOption::new("dur"),
            ip: FieldOption::new("ip"),
            metadata: FieldOption::new("md"),
            user_agent: FieldOption::new("ua"),
            request: FieldOption::new("req"),
            response: FieldOption::new("resp"),
            error: FieldOption::new("error"),
            code: FieldOption::new("code"),
            message: FieldOption::new("msg"),
            details: FieldOption::new("details"),
            max_size: DEFAULT_MAX_SIZE,
            unary_message: DEFAULT_UNARY_MESSAGE.to_string(),
        }
    }
}

static GLOBAL: Lazy<LogOptions> = Lazy::new(LogOptions::default);

impl LogOptions {
    /// 进程级默认选项
    ///
    /// 仅作为便利入口；需要不同配置时构造新的 `LogOptions` 传给拦截器
    pub fn global() -> &'static LogOptions {
        &GLOBAL
    }

    pub fn field(&self, aspect: Aspect) -> &FieldOption {
        match aspect {
            Aspect::Timestamp => &self.timestamp,
            Aspect::Service => &self.service,
            Aspect::Method => &self.method,
            Aspect::Duration => &self.duration,
            Aspect::Ip => &self.ip,
            Aspect::Metadata => &self.metadata,
            Aspect::UserAgent => &self.user_agent,
            Aspect::Request => &self.request,
            Aspect::Response => &self.response,
            Aspect::Error => &self.error,
            Aspect::Code => &self.code,
            Aspect::Message => &self.message,
            Aspect::Details => &self.details,
        }
    }

    pub fn field_mut(&mut self, aspect: Aspect) -> &mut FieldOption {
        match aspect {
            Aspect::Timestamp => &mut self.timestamp,
            Aspect::Service => &mut self.service,
            Aspect::Method => &mut self.method,
            Aspect::Duration => &mut self.duration,
            Aspect::Ip => &mut self.ip,
            Aspect::Metadata => &mut self.metadata,
            Aspect::UserAgent => &mut self.user_agent,
            Aspect::Request => &mut self.request,
            Aspect::Response => &mut self.response,
            Aspect::Error => &mut self.error,
            Aspect::Code => &mut self.code,
            Aspect::Message => &mut self.message,
            Aspect::Details => &mut self.details,
        }
    }

    /// 开启或关闭字段
    pub fn enable(mut self, aspect: Aspect, enabled: bool) -> Self {
        self.field_mut(aspect).enabled = enabled;
        self
    }

    /// 修改字段键名
    pub fn rename(mut self, aspect: Aspect, key: impl Into<String>) -> Self {
        self.field_mut(aspect).key = key.into();
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_unary_message(mut self, message: impl Into<String>) -> Self {
        self.unary_message = message.into();
        self
    }

    /// 仅加载日志选项，见 [`LoggingConfig::load`]
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        Ok(LoggingConfig::load(config_dir)?.options)
    }
}

/// 遥测配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 以 JSON 格式输出
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub options: LogOptions,
}

fn default_app_name() -> String {
    "rpclog".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            telemetry: TelemetryConfig::default(),
            options: LogOptions::default(),
        }
    }
}

impl LoggingConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 依次合并：默认值、`{dir}/default.toml`、`{dir}/{RPCLOG_ENV}.toml`、
    /// `RPCLOG_` 前缀的环境变量（以 `__` 分隔层级）
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RPCLOG_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::from(Serialized::defaults(LoggingConfig::default()))
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("RPCLOG_").split("__"))
            .extract()?;

        Ok(config)
    }
}
