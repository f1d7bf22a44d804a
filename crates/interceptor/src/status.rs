//! 错误状态记录
//!
//! ```text
//! {
//!     "error": "rpc error: code = Unknown desc = An unexpected error occurred",
//!     "code": "Unknown",
//!     "msg": "An unexpected error occurred",
//!     "details": []
//! }
//! ```

use std::error::Error as StdError;

use rpclog_config::LogOptions;
use rpclog_errors::{code_name, describe_error, status_details, status_from_error};
use rpclog_telemetry::LogEntry;

/// 记录错误描述、状态码、消息与详情
///
/// 非 `tonic::Status` 的错误按 `Code::Unknown` 记录
pub fn log_status_error(
    options: &LogOptions,
    entry: &mut LogEntry,
    error: &(dyn StdError + 'static),
) {
    let status = status_from_error(error);

    if let Some(key) = options.error.key() {
        entry.str(key, describe_error(error));
    }
    if let Some(key) = options.code.key() {
        entry.str(key, code_name(status.code()));
    }
    if let Some(key) = options.message.key() {
        entry.str(key, status.message());
    }
    if let Some(key) = options.details.key() {
        entry.list(key, status_details(&status));
    }
}
