//! rpclog-bootstrap - 日志运行时启动
//!
//! 加载配置、初始化 tracing、安装诊断日志，并返回可直接使用的拦截器

mod runtime;

pub use runtime::*;
