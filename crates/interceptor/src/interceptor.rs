//! 一元调用日志拦截器

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use rpclog_config::LogOptions;
use rpclog_telemetry::{Level, StructuredLogger, default_logger};
use serde::Serialize;
use tonic::{Request, Response, Status};

use crate::call::{CallSnapshot, log_response};
use crate::layer::UnaryLoggingLayer;
use crate::status::log_status_error;

/// 为每次一元调用输出一条结构化日志
///
/// 失败时以 error 级别记录状态，成功时以 info 级别记录响应；
/// handler 的返回值原样传回调用方。
///
/// ```ignore
/// let interceptor = UnaryInterceptor::new(logger, Arc::new(LogOptions::default()));
///
/// async fn test_unary(&self, request: Request<TestMessage>) -> Result<Response<TestMessage>, Status> {
///     self.interceptor
///         .intercept("/test.TestService/TestUnary", request, |request| self.handle(request))
///         .await
/// }
/// ```
#[derive(Clone)]
pub struct UnaryInterceptor {
    logger: Arc<dyn StructuredLogger>,
    options: Arc<LogOptions>,
}

impl UnaryInterceptor {
    pub fn new(logger: Arc<dyn StructuredLogger>, options: Arc<LogOptions>) -> Self {
        Self { logger, options }
    }

    /// 使用进程级默认选项
    pub fn with_logger(logger: Arc<dyn StructuredLogger>) -> Self {
        Self::new(logger, Arc::new(LogOptions::global().clone()))
    }

    pub fn logger(&self) -> &Arc<dyn StructuredLogger> {
        &self.logger
    }

    pub fn options(&self) -> &LogOptions {
        &self.options
    }

    /// 为指定方法生成 tower layer
    pub fn layer(&self, full_method: impl Into<String>) -> UnaryLoggingLayer {
        UnaryLoggingLayer::new(self.clone(), full_method)
    }

    /// 包装一次一元调用
    pub async fn intercept<Req, Resp, F, Fut>(
        &self,
        full_method: &str,
        request: Request<Req>,
        handler: F,
    ) -> Result<Response<Resp>, Status>
    where
        Req: Serialize,
        Resp: Serialize,
        F: FnOnce(Request<Req>) -> Fut,
        Fut: Future<Output = Result<Response<Resp>, Status>>,
    {
        let start = Utc::now();

        if !self.logger.enabled(Level::Error) && !self.logger.enabled(Level::Info) {
            return handler(request).await;
        }

        let snapshot = CallSnapshot::capture(&self.options, &request);
        let result = handler(request).await;

        match &result {
            Err(status) => {
                if self.logger.enabled(Level::Error) {
                    let mut entry = snapshot.into_entry(&self.options, full_method, start);
                    log_status_error(&self.options, &mut entry, status);
                    self.logger
                        .log(Level::Error, entry, &self.options.unary_message);
                }
            }
            Ok(response) => {
                if self.logger.enabled(Level::Info) {
                    let mut entry = snapshot.into_entry(&self.options, full_method, start);
                    log_response(&self.options, &mut entry, response.get_ref());
                    self.logger
                        .log(Level::Info, entry, &self.options.unary_message);
                }
            }
        }

        result
    }
}

impl Default for UnaryInterceptor {
    fn default() -> Self {
        Self::with_logger(default_logger())
    }
}

impl fmt::Debug for UnaryInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryInterceptor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
