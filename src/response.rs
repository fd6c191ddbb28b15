//! Response values delivered to the client's callers.
//!
//! [`build_response`] is the entry point for custom producers; the
//! adapter uses [`not_found_response`] for requests no stub matches.

use crate::transport::HttpRequest;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Status code of the synthetic response for unmatched requests.
pub const NOT_FOUND_CODE: u16 = 599;

/// Request time reported by stub responses unless one is given.
pub const DEFAULT_REQUEST_TIME: Duration = Duration::from_secs(1);

/// Marks a response as a failure while keeping it a normal response value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP {code}: {message}")]
pub struct ResponseError {
    pub code: u16,
    pub message: String,
}

impl ResponseError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A response, real or synthesized.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The request this response answers
    pub request: HttpRequest,
    pub code: StatusCode,
    pub headers: HeaderMap,
    /// `None` when the response carries no body
    pub body: Option<Bytes>,
    pub effective_url: String,
    /// Simulated or measured time the request took
    pub request_time: Duration,
    pub error: Option<ResponseError>,
}

impl HttpResponse {
    /// Body bytes, empty when there is no body.
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(self.body_bytes()).into_owned()
    }

    /// First value of a header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Return the attached error, if any.
    pub fn rethrow(&self) -> Result<(), ResponseError> {
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Start building a response to `request`.
///
/// Defaults: status 200, no headers, no body, the request URL as the
/// effective URL and [`DEFAULT_REQUEST_TIME`].
pub fn build_response(request: &HttpRequest) -> ResponseBuilder {
    ResponseBuilder::new(request.clone())
}

/// The 599 response delivered when no stub matches `request`.
pub fn not_found_response(request: &HttpRequest) -> HttpResponse {
    failure_response(request, format!("Mock for url {} is not found", request.url))
}

/// A bodiless 599 response carrying `message` as its error.
pub(crate) fn failure_response(request: &HttpRequest, message: String) -> HttpResponse {
    // 599 is inside the range StatusCode accepts
    let code = StatusCode::from_u16(NOT_FOUND_CODE).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
    build_response(request)
        .code(code)
        .error(ResponseError::new(NOT_FOUND_CODE, message))
        .build()
}

/// Builder for [`HttpResponse`].
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    request: HttpRequest,
    code: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    effective_url: Option<String>,
    request_time: Duration,
    error: Option<ResponseError>,
}

impl ResponseBuilder {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            code: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
            effective_url: None,
            request_time: DEFAULT_REQUEST_TIME,
            error: None,
        }
    }

    pub fn code(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge headers, replacing existing values for the same names.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set the body. An empty body is the same as no body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() { None } else { Some(body) };
        self
    }

    pub fn effective_url(mut self, url: impl Into<String>) -> Self {
        self.effective_url = Some(url.into());
        self
    }

    pub fn request_time(mut self, request_time: Duration) -> Self {
        self.request_time = request_time;
        self
    }

    pub fn error(mut self, error: ResponseError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn build(self) -> HttpResponse {
        let effective_url = self
            .effective_url
            .unwrap_or_else(|| self.request.url.clone());
        HttpResponse {
            request: self.request,
            code: self.code,
            headers: self.headers,
            body: self.body,
            effective_url,
            request_time: self.request_time,
            error: self.error,
        }
    }
}
