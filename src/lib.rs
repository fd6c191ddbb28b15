//! HTTP Client Mock
//!
//! Intercepts the dispatch hook of an async HTTP client and answers
//! requests from registered stubs, so tests can run without touching the
//! network.
//!
//! # Features
//!
//! - **Route Matching**: Stubs are keyed by scheme, host and path; trailing
//!   slashes, query and fragment do not change the route
//! - **Query Constraints**: A stub's query must be a subset of the request's
//! - **Last Registered Wins**: Newer stubs shadow older ones for the same route
//! - **Static or Custom Responses**: Fixed status/headers/body, or a function
//!   of the request
//! - **Templates**: `$name` placeholders in stub urls and bodies
//! - **Fallthrough**: Unmatched requests get a 599 response, or reach the
//!   real transport
//!
//! # Example
//!
//! ```no_run
//! use http_client_mock::{patch, HttpRequest, HttpResponse, Stub, Transport};
//!
//! struct Network;
//!
//! #[async_trait::async_trait]
//! impl Transport for Network {
//!     async fn fetch(&self, request: HttpRequest) -> HttpResponse {
//!         unimplemented!("real network I/O")
//!     }
//! }
//!
//! # async fn run() -> http_client_mock::Result<()> {
//! let client = patch(Network, true);
//! client.register_stub(
//!     Stub::new("http://api.example.com/users?page=$page")
//!         .body(r#"{"users": []}"#)
//!         .template_arg("page", "1"),
//! )?;
//!
//! let response = client
//!     .fetch(HttpRequest::get("http://api.example.com/users/?page=1&sort=asc"))
//!     .await;
//! assert_eq!(response.body_text(), r#"{"users": []}"#);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod response;
pub mod stub;
pub mod template;
pub mod transport;

pub use client::{patch, MockClient};
pub use config::{MockConfig, MockSettings};
pub use error::{MockError, Result};
pub use matcher::{queries_match, route_key_and_query};
pub use registry::{Producer, StubRegistry};
pub use response::{build_response, not_found_response, HttpResponse, ResponseError};
pub use stub::{Stub, StubDefinition};
pub use template::{safe_template, BodyProcessor, TemplateArgs};
pub use transport::{HttpRequest, Transport};
