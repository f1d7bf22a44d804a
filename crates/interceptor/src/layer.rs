//! tower 集成
//!
//! 将 [`UnaryInterceptor`] 套在任意 `Service<tonic::Request<Req>>` 外层

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use serde::Serialize;
use tonic::{Request, Response, Status};
use tower::{Layer, Service};

use crate::interceptor::UnaryInterceptor;

/// 单个方法的日志 layer
#[derive(Debug, Clone)]
pub struct UnaryLoggingLayer {
    interceptor: UnaryInterceptor,
    full_method: Arc<str>,
}

impl UnaryLoggingLayer {
    pub fn new(interceptor: UnaryInterceptor, full_method: impl Into<String>) -> Self {
        Self {
            interceptor,
            full_method: Arc::from(full_method.into()),
        }
    }

    pub fn full_method(&self) -> &str {
        &self.full_method
    }
}

impl<S> Layer<S> for UnaryLoggingLayer {
    type Service = UnaryLogging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UnaryLogging {
            inner,
            interceptor: self.interceptor.clone(),
            full_method: self.full_method.clone(),
        }
    }
}

/// 由 [`UnaryLoggingLayer`] 生成的服务
#[derive(Debug, Clone)]
pub struct UnaryLogging<S> {
    inner: S,
    interceptor: UnaryInterceptor,
    full_method: Arc<str>,
}

impl<S, Req, Resp> Service<Request<Req>> for UnaryLogging<S>
where
    S: Service<Request<Req>, Response = Response<Resp>, Error = Status> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Serialize + Send + 'static,
    Resp: Serialize + Send + 'static,
{
    type Response = Response<Resp>;
    type Error = Status;
    type Future = BoxFuture<'static, Result<Response<Resp>, Status>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Req>) -> Self::Future {
        // 取走已 ready 的实例，留下克隆
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let interceptor = self.interceptor.clone();
        let full_method = self.full_method.clone();

        Box::pin(async move {
            interceptor
                .intercept(&full_method, request, |request| inner.call(request))
                .await
        })
    }
}
