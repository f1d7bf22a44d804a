//! 请求/响应体的 JSON 表示

use rpclog_errors::PayloadError;
use serde::Serialize;
use serde_json::value::RawValue;

/// 序列化消息，长度必须严格小于 `max_size`
pub fn try_to_json<M: Serialize + ?Sized>(
    message: &M,
    max_size: usize,
) -> Result<Box<RawValue>, PayloadError> {
    let encoded = serde_json::to_string(message)?;
    if encoded.len() >= max_size {
        return Err(PayloadError::too_large(encoded.len(), max_size));
    }
    Ok(RawValue::from_string(encoded)?)
}

/// 同 [`try_to_json`]，失败原因不区分，直接丢弃
pub fn to_json<M: Serialize + ?Sized>(message: &M, max_size: usize) -> Option<Box<RawValue>> {
    try_to_json(message, max_size).ok()
}
