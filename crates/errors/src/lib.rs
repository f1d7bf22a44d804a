//! rpclog-errors - 统一错误处理
//!
//! 负责错误到 gRPC Status 的转换，以及 Status 的字段化表示

use std::error::Error as StdError;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use prost::Message;
use serde_json::{Value, json};
use thiserror::Error;
use tonic::{Code, Status};

/// 请求/响应体无法写入日志的原因
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Payload too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

impl PayloadError {
    pub fn too_large(size: usize, max: usize) -> Self {
        Self::TooLarge { size, max }
    }

    /// 是否因为超出大小限制而被丢弃
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::TooLarge { .. })
    }
}

/// `google.rpc.Status`，tonic 以编码形式存放在 `Status::details()` 中
#[derive(Clone, PartialEq, Message)]
pub struct RpcStatus {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<prost_types::Any>,
}

/// 将任意错误转换为 gRPC Status
///
/// 沿 source 链查找 `tonic::Status`，找不到时返回 `Code::Unknown`
pub fn status_from_error(err: &(dyn StdError + 'static)) -> Status {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(status) = e.downcast_ref::<Status>() {
            return status.clone();
        }
        current = e.source();
    }
    Status::unknown(err.to_string())
}

/// 错误的文字描述
pub fn describe_error(err: &(dyn StdError + 'static)) -> String {
    match err.downcast_ref::<Status>() {
        Some(status) => format!(
            "rpc error: code = {} desc = {}",
            code_name(status.code()),
            status.message()
        ),
        None => err.to_string(),
    }
}

/// gRPC 状态码名称
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "Canceled",
        Code::Unknown => "Unknown",
        Code::InvalidArgument => "InvalidArgument",
        Code::DeadlineExceeded => "DeadlineExceeded",
        Code::NotFound => "NotFound",
        Code::AlreadyExists => "AlreadyExists",
        Code::PermissionDenied => "PermissionDenied",
        Code::ResourceExhausted => "ResourceExhausted",
        Code::FailedPrecondition => "FailedPrecondition",
        Code::Aborted => "Aborted",
        Code::OutOfRange => "OutOfRange",
        Code::Unimplemented => "Unimplemented",
        Code::Internal => "Internal",
        Code::Unavailable => "Unavailable",
        Code::DataLoss => "DataLoss",
        Code::Unauthenticated => "Unauthenticated",
    }
}

/// 解码 Status 携带的详情
///
/// 每个详情表示为 `{"@type": type_url, "value": base64}`，无法解码时返回空列表
pub fn status_details(status: &Status) -> Vec<Value> {
    let bytes = status.details();
    if bytes.is_empty() {
        return Vec::new();
    }

    match RpcStatus::decode(bytes) {
        Ok(decoded) => decoded
            .details
            .iter()
            .map(|any| {
                json!({
                    "@type": any.type_url,
                    "value": STANDARD.encode(&any.value),
                })
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}
