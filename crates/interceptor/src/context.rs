//! 调用上下文

use std::net::SocketAddr;

use tonic::Request;
use tonic::metadata::MetadataMap;

/// 调用方地址与请求 metadata，只读
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    remote_addr: Option<SocketAddr>,
    metadata: Option<MetadataMap>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 tonic 请求中提取上下文
    pub fn from_request<T>(request: &Request<T>) -> Self {
        Self {
            remote_addr: request.remote_addr(),
            metadata: Some(request.metadata().clone()),
        }
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn metadata(&self) -> Option<&MetadataMap> {
        self.metadata.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_request_copies_metadata() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert("user-agent", "test".parse().unwrap());

        let context = CallContext::from_request(&request);
        assert_eq!(context.remote_addr(), None);
        let ua = context.metadata().and_then(|md| md.get("user-agent")).unwrap();
        assert_eq!(ua.to_str().unwrap(), "test");
    }

    #[test]
    fn test_empty_context() {
        let context = CallContext::new();
        assert!(context.metadata().is_none());
        assert!(context.remote_addr().is_none());
    }
}
