//! Request matching logic.
//!
//! Splits URLs into a route key and a query string, and compares query
//! strings with subset semantics: every parameter a stub names must be
//! present in the request with the same values, anything else in the
//! request is ignored.

use std::collections::HashMap;
use url::{form_urlencoded, Position, Url};

/// Parsed query string: parameter name to every value it was given.
///
/// Blank values are kept as empty strings, and a bare `flag` parses the
/// same as `flag=`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    params: HashMap<String, Vec<String>>,
}

impl QuerySpec {
    /// Parse a raw query string (without the leading `?`).
    ///
    /// Parsing never fails: malformed escapes are decoded lossily and empty
    /// pairs are skipped.
    pub fn parse(query: &str) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        Self { params }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Values for a parameter, in the order they appeared.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.params.get(name).map(Vec::as_slice)
    }

    /// Check whether `request` satisfies every constraint in `self`.
    pub fn is_satisfied_by(&self, request: &QuerySpec) -> bool {
        self.params
            .iter()
            .all(|(name, values)| request.params.get(name) == Some(values))
    }
}

/// Check whether a request query satisfies a stub query.
///
/// An empty stub query matches anything.
pub fn queries_match(stub_query: &str, request_query: &str) -> bool {
    let stub = QuerySpec::parse(stub_query);
    if stub.is_empty() {
        return true;
    }
    stub.is_satisfied_by(&QuerySpec::parse(request_query))
}

/// Split a URL into its route key and its raw query string.
///
/// The route key is scheme, authority and path with surrounding slashes
/// removed from the path. Query and fragment never take part in it.
/// Parsed URLs are normalized first: default ports are dropped, scheme and
/// host are lowercased, and `.`/`..` segments are resolved.
pub fn route_key_and_query(url: &str) -> (String, String) {
    match Url::parse(url) {
        Ok(parsed) if !parsed.cannot_be_a_base() => {
            let authority = &parsed[Position::BeforeUsername..Position::AfterPort];
            let route = join_route(parsed.scheme(), authority, parsed.path().trim_matches('/'));
            let query = parsed.query().unwrap_or_default().to_string();
            (route, query)
        }
        _ => split_raw(url),
    }
}

/// Fallback for URLs `Url` refuses, such as bare paths.
fn split_raw(url: &str) -> (String, String) {
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    let (location, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    let (scheme, rest) = match location.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("", location),
    };
    let (authority, path) = if scheme.is_empty() {
        ("", rest)
    } else {
        rest.split_once('/').unwrap_or((rest, ""))
    };

    (
        join_route(scheme, authority, path.trim_matches('/')),
        query.to_string(),
    )
}

fn join_route(scheme: &str, authority: &str, path: &str) -> String {
    let mut route = String::with_capacity(scheme.len() + authority.len() + path.len() + 4);
    if !scheme.is_empty() {
        route.push_str(scheme);
        route.push_str("://");
        route.push_str(authority);
        if !path.is_empty() {
            route.push('/');
        }
    }
    route.push_str(path);
    route
}
