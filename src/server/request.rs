use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::ids::RequestId;
use crate::router::{params_to_map, ParamVec};

/// Maximum inline headers/cookies before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header/cookie storage (lowercase names)
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// The request as supplied by the caller, before dispatch.
///
/// Only `method` and `path` take part in routing. Headers, cookies and query
/// parameters ride along so handlers can read them from the context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRequest {
    /// HTTP method, compared case-insensitively against routes
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// Parsed query string parameters
    pub query_params: ParamVec,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
    /// Cookies parsed from the Cookie header
    pub cookies: HeaderVec,
}

impl RawRequest {
    /// Build a request from a method and a path that may carry a query string.
    #[must_use]
    pub fn new(method: impl Into<String>, path: &str) -> Self {
        let (path, query) = split_query(path);
        Self {
            method: method.into(),
            path: path.to_string(),
            query_params: parse_query_params(query),
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
        }
    }

    /// Add a header, lowercasing its name.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("cookie") {
            self.cookies.extend(parse_cookies(&value));
        }
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value));
        self
    }

    /// Extract method, path, query, headers and cookies from an `http::Request`.
    ///
    /// Header values that are not valid visible ASCII are skipped.
    #[must_use]
    pub fn from_http<B>(req: &http::Request<B>) -> Self {
        let mut raw = Self::new(req.method().as_str(), req.uri().path());
        if let Some(query) = req.uri().query() {
            raw.query_params = parse_query_params(query);
        }
        for (name, value) in req.headers() {
            if let Ok(value) = value.to_str() {
                raw = raw.with_header(name.as_str(), value);
            }
        }
        raw
    }
}

fn split_query(path: &str) -> (&str, &str) {
    match path.split_once('?') {
        Some((path, query)) => (path, query),
        None => (path, ""),
    }
}

/// Parse a query string (without the leading `?`) into URL-decoded pairs.
#[must_use]
pub fn parse_query_params(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

/// Parse a Cookie header value into name/value pairs.
#[must_use]
pub fn parse_cookies(header: &str) -> HeaderVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((Arc::from(name), value))
        })
        .collect()
}

/// Per-dispatch view of a request, shared by every handler it reaches.
///
/// `params` is unset until the dispatcher selects the terminal route, and is
/// never changed after that.
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    method: String,
    path: String,
    query_params: ParamVec,
    headers: HeaderVec,
    cookies: HeaderVec,
    params: OnceLock<ParamVec>,
    additional_data: Arc<Value>,
}

impl RequestContext {
    /// Wrap a raw request together with the caller's additional data.
    ///
    /// An `x-request-id` header carrying a valid ULID is reused as the request id.
    #[must_use]
    pub fn new(raw: RawRequest, additional_data: Value) -> Self {
        let request_id = RequestId::from_header_or_new(
            raw.headers
                .iter()
                .find(|(k, _)| k.as_ref() == "x-request-id")
                .map(|(_, v)| v.as_str()),
        );
        Self {
            request_id,
            method: raw.method,
            path: raw.path,
            query_params: raw.query_params,
            headers: raw.headers,
            cookies: raw.cookies,
            params: OnceLock::new(),
            additional_data: Arc::new(additional_data),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Caller-supplied data, passed through unchanged to every handler
    #[must_use]
    pub fn additional_data(&self) -> &Arc<Value> {
        &self.additional_data
    }

    /// Captured path parameters, or `None` before a terminal route is chosen
    #[must_use]
    pub fn params(&self) -> Option<&ParamVec> {
        self.params.get()
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics if a name appears more than once.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get()?
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path parameters as an owned map. Allocates.
    #[must_use]
    pub fn params_map(&self) -> HashMap<String, String> {
        self.params.get().map(params_to_map).unwrap_or_default()
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Bind the chosen route's params. Fails if they were already bound.
    pub(crate) fn bind_params(&self, params: ParamVec) -> Result<(), ParamVec> {
        self.params.set(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_request_splits_query() {
        let raw = RawRequest::new("GET", "/users?limit=10&name=a%20b");
        assert_eq!(raw.path, "/users");
        assert_eq!(raw.query_params.len(), 2);
        let ctx = RequestContext::new(raw, Value::Null);
        assert_eq!(ctx.query_param("limit"), Some("10"));
        assert_eq!(ctx.query_param("name"), Some("a b"));
    }

    #[test]
    fn test_headers_and_cookies() {
        let raw = RawRequest::new("get", "/")
            .with_header("X-Api-Key", "secret")
            .with_header("Cookie", "session=abc; theme=dark");
        let ctx = RequestContext::new(raw, Value::Null);
        assert_eq!(ctx.header("x-api-key"), Some("secret"));
        assert_eq!(ctx.cookie("session"), Some("abc"));
        assert_eq!(ctx.cookie("theme"), Some("dark"));
    }

    #[test]
    fn test_request_id_header_is_reused() {
        let id = RequestId::new();
        let raw = RawRequest::new("GET", "/").with_header("X-Request-Id", id.to_string());
        let ctx = RequestContext::new(raw, Value::Null);
        assert_eq!(ctx.request_id(), id);
    }

    #[test]
    fn test_from_http_request() {
        let req = http::Request::builder()
            .method("PATCH")
            .uri("http://example.com/items/7?verbose=true")
            .header("Content-Type", "application/json")
            .body(())
            .unwrap();
        let raw = RawRequest::from_http(&req);
        assert_eq!(raw.method, "PATCH");
        assert_eq!(raw.path, "/items/7");
        let ctx = RequestContext::new(raw, Value::Null);
        assert_eq!(ctx.query_param("verbose"), Some("true"));
        assert_eq!(ctx.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_params_bind_once() {
        let ctx = RequestContext::new(RawRequest::new("GET", "/"), Value::Null);
        assert!(ctx.params().is_none());
        assert_eq!(ctx.param("id"), None);

        let mut params = ParamVec::new();
        params.push((Arc::from("id"), "1".to_string()));
        assert!(ctx.bind_params(params.clone()).is_ok());
        assert!(ctx.bind_params(params).is_err());
        assert_eq!(ctx.param("id"), Some("1"));
    }
}
