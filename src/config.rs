//! Configuration for a mock client.
//!
//! Stubs can be declared in YAML instead of code. Each entry becomes a
//! [`Stub`] and is registered in file order, so a later entry wins over an
//! earlier one for the same route and method.

use crate::error::MockError;
use crate::stub::{BodySource, Stub};
use crate::template::{handlebars_processor, safe_template_processor};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main configuration for a mock client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    /// Adapter settings
    #[serde(default)]
    pub settings: MockSettings,

    /// Stub definitions, registered in order
    #[serde(default)]
    pub stubs: Vec<StubConfig>,

    /// Directory relative file bodies are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl MockConfig {
    /// Load configuration from a YAML file.
    ///
    /// Relative `file` bodies are resolved against the file's directory.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, stub) in self.stubs.iter().enumerate() {
            stub.validate()
                .map_err(|e| anyhow::anyhow!("Stub {} ({}): {}", i, stub.url, e))?;
        }
        Ok(())
    }

    /// Build the stubs, in registration order.
    pub fn to_stubs(&self) -> crate::Result<Vec<Stub>> {
        self.stubs
            .iter()
            .map(|stub| stub.to_stub(self.base_dir.as_deref()))
            .collect()
    }
}

/// Adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockSettings {
    /// Answer unmatched requests with a 599 instead of the real transport
    #[serde(default = "default_true")]
    pub fail_on_unknown: bool,

    /// Log all matched stubs
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched requests
    #[serde(default = "default_true")]
    pub log_unmatched: bool,
}

impl MockSettings {
    pub fn new(fail_on_unknown: bool) -> Self {
        Self {
            fail_on_unknown,
            ..Self::default()
        }
    }
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            fail_on_unknown: true,
            log_matches: true,
            log_unmatched: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A single stub definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StubConfig {
    /// Url to stub, query string included; may contain `$name` placeholders
    pub url: String,

    /// Request method
    #[serde(default = "default_method")]
    pub method: String,

    /// Response to return
    #[serde(default)]
    pub response: ResponseConfig,

    /// Values for url and body placeholders
    #[serde(default)]
    pub template_args: HashMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl StubConfig {
    /// Validate the stub definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            anyhow::bail!("Stub url cannot be empty");
        }
        parse_method(&self.method)?;
        self.response.validate()?;
        Ok(())
    }

    /// Turn this entry into a [`Stub`].
    pub fn to_stub(&self, base_dir: Option<&Path>) -> crate::Result<Stub> {
        let response = &self.response;
        let mut stub = Stub::new(self.url.clone())
            .method(parse_method(&self.method)?)
            .code(response.status)
            .template_args(self.template_args.clone());

        if let Some(body) = &response.body {
            if let Some(content_type) = body.content_type() {
                stub = stub.header(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
            stub = match body.to_source(base_dir)? {
                BodySource::Inline(bytes) => stub.body(bytes),
                BodySource::File(path) => stub.file(path),
            };
        }

        stub = stub.headers(response.header_map()?);

        stub = match response.processor {
            ProcessorKind::None => stub.no_body_processor(),
            ProcessorKind::SafeTemplate => stub.body_processor(safe_template_processor()),
            ProcessorKind::Handlebars => stub.body_processor(handlebars_processor()),
        };

        Ok(stub)
    }
}

fn parse_method(method: &str) -> crate::Result<Method> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| MockError::InvalidMethod(method.to_string()))
}

/// Response definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseConfig {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Response headers, applied over any guessed from a body file
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Response body
    #[serde(default)]
    pub body: Option<ResponseBody>,

    /// Processing applied to the body at registration
    #[serde(default)]
    pub processor: ProcessorKind,
}

fn default_status() -> u16 {
    200
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: HashMap::new(),
            body: None,
            processor: ProcessorKind::default(),
        }
    }
}

impl ResponseConfig {
    /// Validate the response definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.status < 100 || self.status > 599 {
            anyhow::bail!("Invalid status code: {}", self.status);
        }
        self.header_map()?;
        Ok(())
    }

    fn header_map(&self) -> crate::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| MockError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| MockError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

/// Body processing selected in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    /// Deliver the body as written
    None,
    /// `$name` placeholders
    #[default]
    SafeTemplate,
    /// `{{name}}` placeholders
    Handlebars,
}

/// Response body configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Plain text body
    Text { content: String },
    /// JSON body
    Json { content: serde_json::Value },
    /// Base64 encoded binary
    Base64 { content: String },
    /// Load from file when the stub is registered
    File { path: PathBuf },
}

impl ResponseBody {
    /// Resolve into a body source.
    pub fn to_source(&self, base_dir: Option<&Path>) -> crate::Result<BodySource> {
        match self {
            ResponseBody::Text { content } => Ok(BodySource::Inline(Bytes::from(content.clone()))),
            ResponseBody::Json { content } => serde_json::to_vec(content)
                .map(|bytes| BodySource::Inline(Bytes::from(bytes)))
                .map_err(|e| MockError::Body(e.to_string())),
            ResponseBody::Base64 { content } => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(content)
                    .map(|bytes| BodySource::Inline(Bytes::from(bytes)))
                    .map_err(|e| MockError::Body(format!("invalid base64: {}", e)))
            }
            ResponseBody::File { path } => Ok(BodySource::File(match base_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.clone(),
            })),
        }
    }

    /// Content type implied by the body kind, if any.
    ///
    /// File bodies get theirs from the file extension at registration.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            ResponseBody::Json { .. } => Some("application/json"),
            ResponseBody::Base64 { .. } => Some("application/octet-stream"),
            ResponseBody::Text { .. } | ResponseBody::File { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubDefinition;

    #[test]
    fn test_parse_simple_stub() {
        let yaml = r#"
stubs:
  - url: http://example.com/hello?lang=en
    method: post
    response:
      status: 201
      body:
        type: text
        content: "Hello, $name!"
    template_args:
      name: World
"#;
        let config = MockConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.stubs.len(), 1);
        assert!(config.settings.fail_on_unknown);
        assert_eq!(config.stubs[0].url, "http://example.com/hello?lang=en");

        let stub = config.stubs[0].to_stub(None).unwrap();
        assert_eq!(stub.request_method(), &Method::POST);
        match stub.definition() {
            StubDefinition::Static(response) => {
                assert_eq!(response.code, 201);
                assert_eq!(
                    response.body,
                    BodySource::Inline(Bytes::from_static(b"Hello, $name!"))
                );
                assert!(response.body_processor.is_some());
            }
            other => panic!("Expected static response, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = MockConfig::from_yaml("stubs:\n  - url: http://h/a\n").unwrap();
        let stub = &config.stubs[0];
        assert_eq!(stub.method, "GET");
        assert_eq!(stub.response.status, 200);
        assert_eq!(stub.response.processor, ProcessorKind::SafeTemplate);
        assert!(stub.response.body.is_none());
    }

    #[test]
    fn test_parse_settings() {
        let yaml = r#"
settings:
  fail_on_unknown: false
  log_matches: false
"#;
        let config = MockConfig::from_yaml(yaml).unwrap();
        assert!(!config.settings.fail_on_unknown);
        assert!(!config.settings.log_matches);
        assert!(config.settings.log_unmatched);
        assert!(config.stubs.is_empty());
    }

    #[test]
    fn test_parse_json_response() {
        let yaml = r#"
stubs:
  - url: http://example.com/api
    response:
      body:
        type: json
        content:
          message: "success"
          code: 0
"#;
        let config = MockConfig::from_yaml(yaml).unwrap();
        let stub = config.stubs[0].to_stub(None).unwrap();
        match stub.definition() {
            StubDefinition::Static(response) => {
                assert_eq!(response.headers.get(CONTENT_TYPE).unwrap(), "application/json");
                let BodySource::Inline(bytes) = response.body else {
                    panic!("Expected inline body");
                };
                let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(value["message"], "success");
            }
            other => panic!("Expected static response, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_header_overrides_body_content_type() {
        let yaml = r#"
stubs:
  - url: http://example.com/api
    response:
      headers:
        Content-Type: application/vnd.api+json
      body:
        type: json
        content: {}
"#;
        let config = MockConfig::from_yaml(yaml).unwrap();
        let stub = config.stubs[0].to_stub(None).unwrap();
        let StubDefinition::Static(response) = stub.definition() else {
            panic!("Expected static response");
        };
        assert_eq!(
            response.headers.get(CONTENT_TYPE).unwrap(),
            "application/vnd.api+json"
        );
    }

    #[test]
    fn test_relative_file_path_uses_base_dir() {
        let yaml = r#"
stubs:
  - url: http://example.com/feed
    response:
      processor: none
      body:
        type: file
        path: fixtures/feed.xml
"#;
        let mut config = MockConfig::from_yaml(yaml).unwrap();
        config.base_dir = Some(PathBuf::from("/srv/mocks"));

        let stubs = config.to_stubs().unwrap();
        let StubDefinition::Static(response) = stubs[0].definition() else {
            panic!("Expected static response");
        };
        assert_eq!(
            response.body,
            BodySource::File(PathBuf::from("/srv/mocks/fixtures/feed.xml"))
        );
        assert!(response.body_processor.is_none());
    }

    #[test]
    fn test_base64_body() {
        let body = ResponseBody::Base64 {
            content: "aGVsbG8=".to_string(),
        };
        assert_eq!(
            body.to_source(None).unwrap(),
            BodySource::Inline(Bytes::from_static(b"hello"))
        );

        let bad = ResponseBody::Base64 {
            content: "not base64!".to_string(),
        };
        assert!(matches!(bad.to_source(None), Err(MockError::Body(_))));
    }

    #[test]
    fn test_invalid_status_rejected() {
        let yaml = r#"
stubs:
  - url: http://example.com/a
    response:
      status: 700
"#;
        let err = MockConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Invalid status code: 700"));
    }

    #[test]
    fn test_invalid_method_rejected() {
        let yaml = r#"
stubs:
  - url: http://example.com/a
    method: "GE T"
"#;
        assert!(MockConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let yaml = r#"
stubs:
  - url: http://example.com/a
    response:
      headers:
        "bad header": x
"#;
        let err = MockConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
stubs:
  - url: http://example.com/a
    priority: 10
"#;
        assert!(MockConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mocks.yaml");
        std::fs::write(&path, "stubs:\n  - url: http://h/a\n").unwrap();

        let config = MockConfig::from_file(&path).unwrap();
        assert_eq!(config.stubs.len(), 1);
        assert_eq!(config.base_dir.as_deref(), Some(dir.path()));
    }
}
