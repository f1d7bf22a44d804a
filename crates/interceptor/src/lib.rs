//! rpclog-interceptor - gRPC 一元调用日志
//!
//! 每次调用输出一条结构化日志：服务、方法、耗时、调用方、metadata、
//! 请求/响应体以及失败时的状态。

pub mod call;
pub mod context;
pub mod interceptor;
pub mod json;
pub mod layer;
pub mod status;

pub use call::*;
pub use context::*;
pub use interceptor::*;
pub use json::*;
pub use layer::*;
pub use status::*;
