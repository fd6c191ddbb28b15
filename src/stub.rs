//! Stub definitions and their resolution into producers.
//!
//! A stub is either a custom producer or a static response. Static
//! responses are resolved once, at registration: the body is loaded and
//! processed, headers are settled, and the resulting producer returns the
//! same response for every matching request.

use crate::error::{MockError, Result};
use crate::registry::Producer;
use crate::response::build_response;
use crate::template::{safe_template, safe_template_processor, BodyProcessor, TemplateArgs};
use crate::transport::HttpRequest;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a static response body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    Inline(Bytes),
    /// Read once, when the stub is registered
    File(PathBuf),
}

/// A fixed response returned for every matching request.
#[derive(Clone)]
pub struct StaticResponse {
    pub code: u16,
    /// Applied over the headers guessed from a body file
    pub headers: HeaderMap,
    pub body: BodySource,
    /// Applied to the body with the stub's template args
    pub body_processor: Option<BodyProcessor>,
}

impl Default for StaticResponse {
    fn default() -> Self {
        Self {
            code: 200,
            headers: HeaderMap::new(),
            body: BodySource::Inline(Bytes::new()),
            body_processor: Some(safe_template_processor()),
        }
    }
}

impl fmt::Debug for StaticResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResponse")
            .field("code", &self.code)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("body_processor", &self.body_processor.is_some())
            .finish()
    }
}

/// How a stub produces its response.
#[derive(Clone)]
pub enum StubDefinition {
    /// Called with each matching request
    Custom(Producer),
    Static(StaticResponse),
}

impl fmt::Debug for StubDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubDefinition::Custom(_) => f.write_str("Custom(..)"),
            StubDefinition::Static(response) => f.debug_tuple("Static").field(response).finish(),
        }
    }
}

/// A stub to register on a [`MockClient`](crate::MockClient).
///
/// Defaults to `GET`, status 200, an empty body and safe templating of
/// the body. Setting a custom producer with [`Stub::respond_with`] makes
/// every response setting irrelevant.
#[derive(Clone)]
pub struct Stub {
    url: String,
    method: Method,
    producer: Option<Producer>,
    response: StaticResponse,
    template_args: TemplateArgs,
}

impl Stub {
    /// Stub requests to `url`.
    ///
    /// The url may contain `$name` placeholders, filled from the template
    /// args. Its query string is a constraint: requests must carry every
    /// parameter it names, with the same values.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            producer: None,
            response: StaticResponse::default(),
            template_args: TemplateArgs::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Produce responses with `f` instead of a static response.
    pub fn respond_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest) -> crate::HttpResponse + Send + Sync + 'static,
    {
        self.producer = Some(Arc::new(f));
        self
    }

    pub fn code(mut self, code: u16) -> Self {
        self.response.code = code;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.response.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.response.headers.extend(headers);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = BodySource::Inline(body.into());
        self
    }

    /// Load the body from a file. Takes precedence over any inline body.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.response.body = BodySource::File(path.into());
        self
    }

    pub fn body_processor(mut self, processor: BodyProcessor) -> Self {
        self.response.body_processor = Some(processor);
        self
    }

    /// Deliver the body exactly as given, placeholders included.
    pub fn no_body_processor(mut self) -> Self {
        self.response.body_processor = None;
        self
    }

    pub fn template_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.template_args.insert(name.into(), value.into());
        self
    }

    pub fn template_args<I, K, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.template_args
            .extend(args.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn request_method(&self) -> &Method {
        &self.method
    }

    /// The tagged form of this stub's response.
    pub fn definition(&self) -> StubDefinition {
        match &self.producer {
            Some(producer) => StubDefinition::Custom(Arc::clone(producer)),
            None => StubDefinition::Static(self.response.clone()),
        }
    }

    /// Settle the url and the producer.
    ///
    /// File bodies are read here, so a missing file fails registration.
    pub(crate) fn resolve(self) -> Result<ResolvedStub> {
        let url = safe_template(&self.url, &self.template_args);
        let producer = match self.definition() {
            StubDefinition::Custom(producer) => producer,
            StubDefinition::Static(response) => {
                static_producer(response, &self.template_args, url.clone())?
            }
        };
        Ok(ResolvedStub {
            url,
            method: self.method,
            producer,
        })
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("definition", &self.definition())
            .field("template_args", &self.template_args)
            .finish()
    }
}

/// A stub ready to be stored in a registry.
pub(crate) struct ResolvedStub {
    pub url: String,
    pub method: Method,
    pub producer: Producer,
}

fn static_producer(
    response: StaticResponse,
    args: &TemplateArgs,
    effective_url: String,
) -> Result<Producer> {
    if !(100..=599).contains(&response.code) {
        return Err(MockError::InvalidStatus(response.code));
    }
    let code =
        StatusCode::from_u16(response.code).map_err(|_| MockError::InvalidStatus(response.code))?;

    let (mut headers, mut content) = match response.body {
        BodySource::Inline(body) => (HeaderMap::new(), body),
        BodySource::File(path) => (guess_headers(&path), read_stub_file(&path)?),
    };

    if let Some(processor) = &response.body_processor {
        content = processor(content, args)?;
    }

    headers.extend(response.headers);

    Ok(Arc::new(move |request: &HttpRequest| {
        build_response(request)
            .code(code)
            .headers(headers.clone())
            .body(content.clone())
            .effective_url(effective_url.clone())
            .build()
    }))
}

/// Default headers for a body file, by file name suffix.
///
/// Dot-files such as `.json` count as having the suffix.
pub fn guess_headers(path: &Path) -> HeaderMap {
    const CONTENT_TYPES: [(&str, &str); 4] = [
        (".json", "application/json"),
        (".xml", "application/xml"),
        (".txt", "text/plain"),
        (".proto", "application/x-protobuf"),
    ];

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let Some((_, content_type)) = CONTENT_TYPES
        .iter()
        .find(|(suffix, _)| file_name.ends_with(suffix))
    else {
        return HeaderMap::new();
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(*content_type));
    headers
}

fn read_stub_file(path: &Path) -> Result<Bytes> {
    std::fs::read(path)
        .map(Bytes::from)
        .map_err(|source| MockError::StubFile {
            path: path.to_path_buf(),
            source,
        })
}
