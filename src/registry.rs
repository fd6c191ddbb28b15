//! Stub storage.
//!
//! Rules are grouped by route key. Within a route the most recently
//! registered rule comes first, and older rules are never removed, so a
//! later registration shadows an earlier one without erasing it.

use crate::matcher::{route_key_and_query, QuerySpec};
use crate::response::HttpResponse;
use crate::transport::HttpRequest;
use http::Method;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Produces the response for a matched request.
pub type Producer = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// A registered (method, query constraint, producer) entry.
pub struct StubRule {
    pub method: Method,
    /// Raw query string the rule was registered with
    pub query: String,
    spec: QuerySpec,
    producer: Producer,
}

impl StubRule {
    fn new(method: Method, query: String, producer: Producer) -> Self {
        let spec = QuerySpec::parse(&query);
        Self {
            method,
            query,
            spec,
            producer,
        }
    }

    /// Check the request method and query against this rule.
    pub fn matches(&self, method: &Method, request_query: &QuerySpec) -> bool {
        self.method == *method && self.spec.is_satisfied_by(request_query)
    }

    pub fn producer(&self) -> Producer {
        Arc::clone(&self.producer)
    }
}

impl fmt::Debug for StubRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubRule")
            .field("method", &self.method)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

/// Per-client mapping from route key to its rules, newest first.
///
/// Nothing is ever evicted; the registry grows with every registration
/// until it is dropped.
#[derive(Debug, Default)]
pub struct StubRegistry {
    routes: HashMap<String, VecDeque<StubRule>>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a producer for `url` and `method`.
    ///
    /// The query part of `url` becomes the rule's query constraint.
    /// Returns the route key the rule was stored under.
    pub fn register(&mut self, url: &str, method: Method, producer: Producer) -> String {
        let (route, query) = route_key_and_query(url);
        self.routes
            .entry(route.clone())
            .or_default()
            .push_front(StubRule::new(method, query, producer));
        route
    }

    /// Find the newest rule matching the request url and method.
    pub fn lookup(&self, url: &str, method: &Method) -> Option<Producer> {
        let (route, query) = route_key_and_query(url);
        let rules = self.routes.get(&route)?;
        let request_query = QuerySpec::parse(&query);
        rules
            .iter()
            .find(|rule| rule.matches(method, &request_query))
            .map(StubRule::producer)
    }

    /// Rules stored under a route key, newest first.
    pub fn rules(&self, route: &str) -> impl Iterator<Item = &StubRule> {
        self.routes.get(route).into_iter().flatten()
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Total number of rules across all routes.
    pub fn len(&self) -> usize {
        self.routes.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::build_response;

    fn body_producer(body: &'static str) -> Producer {
        Arc::new(move |request: &HttpRequest| build_response(request).body(body).build())
    }

    fn produce(registry: &StubRegistry, method: Method, url: &str) -> Option<String> {
        let producer = registry.lookup(url, &method)?;
        let request = HttpRequest::new(method, url);
        Some(producer(&request).body_text())
    }

    #[test]
    fn test_empty_registry() {
        let registry = StubRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup("http://h/a", &Method::GET).is_none());
    }

    #[test]
    fn test_last_registered_wins() {
        let mut registry = StubRegistry::new();
        registry.register("http://h/simple_fetch", Method::POST, body_producer("FIRST"));
        registry.register("http://h/simple_fetch", Method::POST, body_producer("SECOND"));

        assert_eq!(
            produce(&registry, Method::POST, "http://h/simple_fetch").as_deref(),
            Some("SECOND")
        );
        assert_eq!(registry.len(), 2);
        let queries: Vec<_> = registry.rules("http://h/simple_fetch").collect();
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn test_method_must_match() {
        let mut registry = StubRegistry::new();
        registry.register("http://h/a?x=1", Method::POST, body_producer("POST"));

        assert!(registry.lookup("http://h/a?x=1", &Method::GET).is_none());
        assert_eq!(
            produce(&registry, Method::POST, "http://h/a?x=1").as_deref(),
            Some("POST")
        );
    }

    #[test]
    fn test_older_rule_still_reachable() {
        let mut registry = StubRegistry::new();
        registry.register("http://h/a?arg1=val1", Method::GET, body_producer("GENERAL"));
        registry.register("http://h/a?arg1=val1&arg2=val2", Method::GET, body_producer("SPECIFIC"));

        assert_eq!(
            produce(&registry, Method::GET, "http://h/a?arg2=val2&arg1=val1&arg3=x").as_deref(),
            Some("SPECIFIC")
        );
        assert_eq!(
            produce(&registry, Method::GET, "http://h/a?arg1=val1").as_deref(),
            Some("GENERAL")
        );
        assert!(registry.lookup("http://h/a?arg2=val2", &Method::GET).is_none());
    }

    #[test]
    fn test_general_rule_registered_last_shadows_specific() {
        let mut registry = StubRegistry::new();
        registry.register("http://h/a?arg1=val1", Method::GET, body_producer("SPECIFIC"));
        registry.register("http://h/a", Method::GET, body_producer("ANY"));

        assert_eq!(
            produce(&registry, Method::GET, "http://h/a?arg1=val1").as_deref(),
            Some("ANY")
        );
    }

    #[test]
    fn test_route_normalization_on_both_sides() {
        let mut registry = StubRegistry::new();
        let route = registry.register("http://h/a/b/?q=1", Method::GET, body_producer("OK"));
        assert_eq!(route, "http://h/a/b");

        assert_eq!(
            produce(&registry, Method::GET, "http://h/a/b?q=1#top").as_deref(),
            Some("OK")
        );
        assert!(registry.lookup("http://h/a/b/c?q=1", &Method::GET).is_none());
        assert_eq!(registry.routes().collect::<Vec<_>>(), vec!["http://h/a/b"]);
    }
}
