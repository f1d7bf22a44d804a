//! 结构化日志条目
//!
//! 条目按写入顺序保存键值对，键名在运行时决定，因此不直接映射为 tracing 字段。

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use serde_json::value::RawValue;

/// 字段值
#[derive(Debug, Clone)]
pub enum FieldValue {
    Str(String),
    /// RFC 3339 时间
    Time(DateTime<Utc>),
    /// 以毫秒浮点数输出
    Duration(Duration),
    Dict(LogEntry),
    /// 原样输出的 JSON
    Raw(Box<RawValue>),
    List(Vec<Value>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::Time(t) => {
                serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            FieldValue::Duration(d) => serializer.serialize_f64(d.as_nanos() as f64 / 1_000_000.0),
            FieldValue::Dict(entry) => entry.serialize(serializer),
            FieldValue::Raw(raw) => raw.serialize(serializer),
            FieldValue::List(values) => values.serialize(serializer),
        }
    }
}

/// 日志条目
#[derive(Debug, Clone, Default)]
pub struct LogEntry {
    fields: Vec<(String, FieldValue)>,
}

impl LogEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) -> &mut Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn str(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.insert(key, FieldValue::Str(value.into()))
    }

    pub fn time(&mut self, key: impl Into<String>, value: DateTime<Utc>) -> &mut Self {
        self.insert(key, FieldValue::Time(value))
    }

    pub fn dur(&mut self, key: impl Into<String>, value: Duration) -> &mut Self {
        self.insert(key, FieldValue::Duration(value))
    }

    pub fn dict(&mut self, key: impl Into<String>, value: LogEntry) -> &mut Self {
        self.insert(key, FieldValue::Dict(value))
    }

    pub fn raw_json(&mut self, key: impl Into<String>, value: Box<RawValue>) -> &mut Self {
        self.insert(key, FieldValue::Raw(value))
    }

    pub fn list(&mut self, key: impl Into<String>, value: Vec<Value>) -> &mut Self {
        self.insert(key, FieldValue::List(value))
    }

    /// 按键查找第一个值
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 序列化为 JSON 文本
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
