//! The HTTP client surface being intercepted.
//!
//! A [`Transport`] is the client's dispatch hook: it takes a request and
//! resolves to the response delivered to the caller. Failures at the
//! transport level are reported through [`HttpResponse::error`] rather
//! than a separate error channel.

use crate::response::HttpResponse;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header. Appends, so repeated names keep every value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Request dispatch hook of an async HTTP client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request and resolve to its response.
    async fn fetch(&self, request: HttpRequest) -> HttpResponse;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn fetch(&self, request: HttpRequest) -> HttpResponse {
        (**self).fetch(request).await
    }
}
