//! rpclog-diagnostics - 框架诊断日志适配
//!
//! 把 gRPC 框架内部的诊断日志（fatal/error/warning/info 以及 verbosity 判断）
//! 转发到结构化日志记录器。

pub mod adapter;
pub mod global;

pub use adapter::*;
pub use global::*;
