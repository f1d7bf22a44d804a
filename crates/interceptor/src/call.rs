//! 调用字段记录
//!
//! 每个函数只在对应字段启用时写入条目，缺少上下文时直接跳过。
//!
//! ```text
//! {
//!     "time": "2024-05-01T12:30:00Z",
//!     "service": "pkg.ExampleService",
//!     "method": "ExampleMethod",
//!     "dur": 1.0,
//!     "ip": "127.0.0.1",
//!     "req": {},
//!     "md": {"key": "value"}
//! }
//! ```

use std::borrow::Cow;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use rpclog_config::LogOptions;
use rpclog_telemetry::LogEntry;
use serde::Serialize;
use serde_json::value::RawValue;
use tonic::Request;
use tonic::metadata::{KeyRef, MetadataMap};

use crate::context::CallContext;
use crate::json::to_json;

/// 拆分完整方法路径 `/pkg.Service/Method` 为服务名与方法名
pub fn split_method(full_method: &str) -> (&str, &str) {
    match full_method.rsplit_once('/') {
        Some((dir, base)) => (dir.strip_prefix('/').unwrap_or(dir), base),
        None => ("", full_method),
    }
}

/// 记录一次调用的请求侧字段
pub fn log_incoming_call<Req: Serialize + ?Sized>(
    options: &LogOptions,
    entry: &mut LogEntry,
    context: &CallContext,
    full_method: &str,
    start: DateTime<Utc>,
    request: &Req,
) {
    let request_json = if options.request.enabled {
        to_json(request, options.max_size)
    } else {
        None
    };
    log_call_fields(options, entry, context, full_method, start, request_json);
}

fn log_call_fields(
    options: &LogOptions,
    entry: &mut LogEntry,
    context: &CallContext,
    full_method: &str,
    start: DateTime<Utc>,
    request_json: Option<Box<RawValue>>,
) {
    log_timestamp(options, entry, start);
    log_service(options, entry, full_method);
    log_method(options, entry, full_method);
    log_duration(options, entry, start);
    log_ip(options, entry, context);
    if let (Some(key), Some(raw)) = (options.request.key(), request_json) {
        entry.raw_json(key, raw);
    }
    log_incoming_metadata(options, entry, context);
}

pub fn log_timestamp(options: &LogOptions, entry: &mut LogEntry, start: DateTime<Utc>) {
    if let Some(key) = options.timestamp.key() {
        entry.time(key, start);
    }
}

pub fn log_service(options: &LogOptions, entry: &mut LogEntry, full_method: &str) {
    if let Some(key) = options.service.key() {
        entry.str(key, split_method(full_method).0);
    }
}

pub fn log_method(options: &LogOptions, entry: &mut LogEntry, full_method: &str) {
    if let Some(key) = options.method.key() {
        entry.str(key, split_method(full_method).1);
    }
}

/// 记录从 `start` 到现在的耗时
pub fn log_duration(options: &LogOptions, entry: &mut LogEntry, start: DateTime<Utc>) {
    if let Some(key) = options.duration.key() {
        let elapsed = (Utc::now() - start).to_std().unwrap_or_default();
        entry.dur(key, elapsed);
    }
}

pub fn log_ip(options: &LogOptions, entry: &mut LogEntry, context: &CallContext) {
    if let (Some(key), Some(addr)) = (options.ip.key(), context.remote_addr()) {
        entry.str(key, addr.ip().to_string());
    }
}

/// 请求体小于 `max_size` 时以原始 JSON 记录
pub fn log_request<Req: Serialize + ?Sized>(options: &LogOptions, entry: &mut LogEntry, request: &Req) {
    if let Some(key) = options.request.key() {
        if let Some(raw) = to_json(request, options.max_size) {
            entry.raw_json(key, raw);
        }
    }
}

/// 响应体小于 `max_size` 时以原始 JSON 记录
pub fn log_response<Resp: Serialize + ?Sized>(
    options: &LogOptions,
    entry: &mut LogEntry,
    response: &Resp,
) {
    if let Some(key) = options.response.key() {
        if let Some(raw) = to_json(response, options.max_size) {
            entry.raw_json(key, raw);
        }
    }
}

/// 记录完整 metadata；metadata 关闭时只记录 User-Agent
pub fn log_incoming_metadata(options: &LogOptions, entry: &mut LogEntry, context: &CallContext) {
    let Some(md) = context.metadata() else {
        return;
    };

    if let Some(key) = options.metadata.key() {
        entry.dict(key, log_metadata(md));
    } else if options.user_agent.enabled {
        log_user_agent(options, entry, md);
    }
}

/// metadata 转为嵌套条目，多值以逗号连接，二进制值以 base64 表示
///
/// 非可见 ASCII 的文本值按 UTF-8 宽松解码
pub fn log_metadata(md: &MetadataMap) -> LogEntry {
    let mut dict = LogEntry::new();
    for key in md.keys() {
        match key {
            KeyRef::Ascii(key) => {
                let values: Vec<Cow<'_, str>> = md
                    .get_all(key.as_str())
                    .iter()
                    .map(|value| String::from_utf8_lossy(value.as_encoded_bytes()))
                    .collect();
                dict.str(key.as_str(), values.join(","));
            }
            KeyRef::Binary(key) => {
                let values: Vec<String> = md
                    .get_all_bin(key.as_str())
                    .iter()
                    .filter_map(|value| value.to_bytes().ok())
                    .map(|bytes| STANDARD.encode(bytes))
                    .collect();
                dict.str(key.as_str(), values.join(","));
            }
        }
    }
    dict
}

pub fn log_user_agent(options: &LogOptions, entry: &mut LogEntry, md: &MetadataMap) {
    let Some(key) = options.user_agent.key() else {
        return;
    };

    let ua: String = md
        .get_all("user-agent")
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_encoded_bytes()))
        .collect();
    if !ua.is_empty() {
        entry.str(key, ua);
    }
}

/// 调用前采集的请求侧状态
///
/// handler 会消费请求，因此上下文与请求体在调用前取出
#[derive(Debug)]
pub struct CallSnapshot {
    context: CallContext,
    request: Option<Box<RawValue>>,
}

impl CallSnapshot {
    pub fn capture<Req: Serialize>(options: &LogOptions, request: &Request<Req>) -> Self {
        let mut context = CallContext::new();
        if let Some(addr) = request.remote_addr() {
            context = context.with_remote_addr(addr);
        }
        if options.metadata.enabled || options.user_agent.enabled {
            context = context.with_metadata(request.metadata().clone());
        }

        let request = if options.request.enabled {
            to_json(request.get_ref(), options.max_size)
        } else {
            None
        };

        Self { context, request }
    }

    /// 生成调用条目，耗时在此刻计算
    pub fn into_entry(self, options: &LogOptions, full_method: &str, start: DateTime<Utc>) -> LogEntry {
        let mut entry = LogEntry::new();
        log_call_fields(options, &mut entry, &self.context, full_method, start, self.request);
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestMessage, capture};
    use rpclog_config::Aspect;
    use rpclog_telemetry::{Level, StructuredLogger};
    use serde_json::{Value, json};
    use tonic::metadata::MetadataValue;

    const MSG: &str = "PhilipB";

    fn emit(entry: LogEntry) -> Value {
        let (buffer, logger) = capture();
        logger.log(Level::Debug, entry, MSG);
        serde_json::from_str(buffer.contents().trim()).unwrap()
    }

    fn msg_def() -> Value {
        json!({"level": "debug", "message": MSG})
    }

    fn user_agent_context() -> CallContext {
        let mut md = MetadataMap::new();
        md.insert("user-agent", MetadataValue::from_static("test"));
        CallContext::new().with_metadata(md)
    }

    #[test]
    fn test_split_method() {
        assert_eq!(split_method("/Service/Method"), ("Service", "Method"));
        assert_eq!(
            split_method("/test.TestService/TestUnary"),
            ("test.TestService", "TestUnary")
        );
        assert_eq!(split_method("Method"), ("", "Method"));
    }

    #[test]
    fn test_log_service_and_method() {
        let options = LogOptions::default();
        let mut entry = LogEntry::new();
        log_service(&options, &mut entry, "/Service/Method");
        log_method(&options, &mut entry, "/Service/Method");

        assert_eq!(
            emit(entry),
            json!({"level": "debug", "service": "Service", "method": "Method", "message": MSG})
        );
    }

    #[test]
    fn test_log_ip() {
        let options = LogOptions::default();
        let context = CallContext::new().with_remote_addr("127.0.0.1:7070".parse().unwrap());
        let mut entry = LogEntry::new();
        log_ip(&options, &mut entry, &context);

        assert_eq!(
            emit(entry),
            json!({"level": "debug", "ip": "127.0.0.1", "message": MSG})
        );
    }

    #[test]
    fn test_log_ip_invalid() {
        let mut entry = LogEntry::new();
        log_ip(&LogOptions::default(), &mut entry, &CallContext::new());
        assert_eq!(emit(entry), msg_def());
    }

    #[test]
    fn test_log_ip_disabled() {
        let options = LogOptions::default().enable(Aspect::Ip, false);
        let context = CallContext::new().with_remote_addr("127.0.0.1:7070".parse().unwrap());
        let mut entry = LogEntry::new();
        log_ip(&options, &mut entry, &context);
        assert_eq!(emit(entry), msg_def());
    }

    #[test]
    fn test_log_request() {
        let mut entry = LogEntry::new();
        log_request(&LogOptions::default(), &mut entry, &TestMessage::new("req"));
        assert_eq!(
            emit(entry),
            json!({"level": "debug", "req": {"test": "req"}, "message": MSG})
        );
    }

    #[test]
    fn test_log_request_disabled() {
        let options = LogOptions::default().enable(Aspect::Request, false);
        let mut entry = LogEntry::new();
        log_request(&options, &mut entry, &TestMessage::new("req"));
        assert_eq!(emit(entry), msg_def());
    }

    #[test]
    fn test_log_request_field() {
        let options = LogOptions::default().rename(Aspect::Request, "philip");
        let mut entry = LogEntry::new();
        log_request(&options, &mut entry, &TestMessage::new("req"));
        assert_eq!(
            emit(entry),
            json!({"level": "debug", "philip": {"test": "req"}, "message": MSG})
        );
    }

    #[test]
    fn test_log_request_too_large() {
        let options = LogOptions::default().with_max_size(8);
        let mut entry = LogEntry::new();
        log_request(&options, &mut entry, &TestMessage::new("a long request"));
        assert_eq!(emit(entry), msg_def());
    }

    #[test]
    fn test_log_response() {
        let mut entry = LogEntry::new();
        log_response(&LogOptions::default(), &mut entry, &TestMessage::new("req"));
        assert_eq!(
            emit(entry),
            json!({"level": "debug", "resp": {"test": "req"}, "message": MSG})
        );
    }

    #[test]
    fn test_log_response_disabled() {
        let options = LogOptions::default().enable(Aspect::Response, false);
        let mut entry = LogEntry::new();
        log_response(&options, &mut entry, &TestMessage::new("resp"));
        assert_eq!(emit(entry), msg_def());
    }

    #[test]
    fn test_log_response_field() {
        let options = LogOptions::default().rename(Aspect::Response, "philip");
        let mut entry = LogEntry::new();
        log_response(&options, &mut entry, &TestMessage::new("resp"));
        assert_eq!(
            emit(entry),
            json!({"level": "debug", "philip": {"test": "resp"}, "message": MSG})
        );
    }

    #[test]
    fn test_log_incoming_metadata() {
        let mut md = MetadataMap::new();
        md.insert("philip", MetadataValue::from_static("WasHere"));
        let context = CallContext::new().with_metadata(md);

        let mut entry = LogEntry::new();
        log_incoming_metadata(&LogOptions::default(), &mut entry, &context);
        assert_eq!(
            emit(entry),
            json!({"level": "debug", "md": {"philip": "WasHere"}, "message": MSG})
        );
    }

    #[test]
    fn test_log_incoming_metadata_field() {
        let mut md = MetadataMap::new();
        md.insert("philip", MetadataValue::from_static("WasHere"));
        let context = CallContext::new().with_metadata(md);
        let options = LogOptions::default().rename(Aspect::Metadata, "metadata");

        let mut entry = LogEntry::new();
        log_incoming_metadata(&options, &mut entry, &context);
        assert_eq!(
            emit(entry),
            json!({"level": "debug", "metadata": {"philip": "WasHere"}, "message": MSG})
        );
    }

    #[test]
    fn test_log_incoming_metadata_multi_value_and_binary() {
        let mut md = MetadataMap::new();
        md.append("x-tag", MetadataValue::from_static("a"));
        md.append("x-tag", MetadataValue::from_static("b"));
        md.insert_bin("trace-bin", MetadataValue::from_bytes(&[1, 2, 3]));

        let dict = log_metadata(&md);
        let value = serde_json::to_value(&dict).unwrap();
        assert_eq!(value, json!({"x-tag": "a,b", "trace-bin": "AQID"}));
    }

    #[test]
    fn test_log_incoming_metadata_keeps_non_visible_ascii() {
        let raw: &[u8] = b"caf\xc3\xa9";
        let mut md = MetadataMap::new();
        md.insert("x-name", MetadataValue::try_from(raw).unwrap());
        md.insert("user-agent", MetadataValue::try_from(raw).unwrap());

        let value = serde_json::to_value(log_metadata(&md)).unwrap();
        assert_eq!(value, json!({"x-name": "caf\u{e9}", "user-agent": "caf\u{e9}"}));

        let options = LogOptions::default().enable(Aspect::Metadata, false);
        let mut entry = LogEntry::new();
        log_user_agent(&options, &mut entry, &md);
        assert_eq!(serde_json::to_value(&entry).unwrap(), json!({"ua": "caf\u{e9}"}));
    }

    #[test]
    fn test_log_incoming_metadata_invalid() {
        let mut entry = LogEntry::new();
        log_incoming_metadata(&LogOptions::default(), &mut entry, &CallContext::new());
        assert_eq!(emit(entry), msg_def());
    }

    #[test]
    fn test_log_incoming_metadata_disabled_for_user_agent() {
        let options = LogOptions::default().enable(Aspect::Metadata, false);
        let mut entry = LogEntry::new();
        log_incoming_metadata(&options, &mut entry, &user_agent_context());
        assert_eq!(
            emit(entry),
            json!({"level": "debug", "ua": "test", "message": MSG})
        );
    }

    #[test]
    fn test_log_incoming_metadata_disabled_for_user_agent_field() {
        let options = LogOptions::default()
            .enable(Aspect::Metadata, false)
            .rename(Aspect::UserAgent, "user-agent");
        let mut entry = LogEntry::new();
        log_incoming_metadata(&options, &mut entry, &user_agent_context());
        assert_eq!(
            emit(entry),
            json!({"level": "debug", "user-agent": "test", "message": MSG})
        );
    }

    #[test]
    fn test_log_incoming_metadata_disabled_for_user_agent_invalid() {
        let options = LogOptions::default().enable(Aspect::Metadata, false);
        let mut entry = LogEntry::new();
        log_incoming_metadata(&options, &mut entry, &CallContext::new());
        assert_eq!(emit(entry), msg_def());
    }

    #[test]
    fn test_log_incoming_metadata_all_disabled() {
        let options = LogOptions::default()
            .enable(Aspect::Metadata, false)
            .enable(Aspect::UserAgent, false);
        let mut entry = LogEntry::new();
        log_incoming_metadata(&options, &mut entry, &user_agent_context());
        assert_eq!(emit(entry), msg_def());
    }

    #[test]
    fn test_log_incoming_call_field_order() {
        let options = LogOptions::default();
        let context = user_agent_context().with_remote_addr("10.0.0.1:5000".parse().unwrap());
        let mut entry = LogEntry::new();
        log_incoming_call(
            &options,
            &mut entry,
            &context,
            "/test.TestService/TestUnary",
            Utc::now(),
            &TestMessage::new("Hi"),
        );

        assert_eq!(
            entry.keys().collect::<Vec<_>>(),
            vec!["time", "service", "method", "dur", "ip", "req", "md"]
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["service"], "test.TestService");
        assert_eq!(value["method"], "TestUnary");
        assert_eq!(value["ip"], "10.0.0.1");
        assert_eq!(value["req"], json!({"test": "Hi"}));
        assert!(value["dur"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_log_incoming_call_all_disabled() {
        let options = Aspect::ALL
            .iter()
            .fold(LogOptions::default(), |options, aspect| options.enable(*aspect, false));
        let mut entry = LogEntry::new();
        log_incoming_call(
            &options,
            &mut entry,
            &user_agent_context(),
            "/Service/Method",
            Utc::now(),
            &TestMessage::new("Hi"),
        );
        assert!(entry.is_empty());
    }

    #[test]
    fn test_snapshot_skips_metadata_when_unused() {
        let options = LogOptions::default()
            .enable(Aspect::Metadata, false)
            .enable(Aspect::UserAgent, false);
        let mut request = Request::new(TestMessage::new("Hi"));
        request
            .metadata_mut()
            .insert("user-agent", MetadataValue::from_static("test"));

        let snapshot = CallSnapshot::capture(&options, &request);
        assert!(snapshot.context.metadata().is_none());

        let entry = snapshot.into_entry(&options, "/Service/Method", Utc::now());
        assert!(entry.contains_key("req"));
        assert!(!entry.contains_key("ua"));
    }
}
