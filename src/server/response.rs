use parking_lot::Mutex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

use super::request::HeaderVec;
use crate::router::Route;

/// Response payload accumulated by handlers during one dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// HTTP status code (200 unless a handler sets another)
    pub status: u16,
    /// Response headers, serialized as a name → value map
    #[serde(serialize_with = "serialize_headers")]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }
}

impl Response {
    /// Create a JSON response with a content-type header.
    ///
    /// Handlers install one wholesale with [`ResponseBuilder::with_payload`].
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

fn serialize_headers<S: Serializer>(headers: &HeaderVec, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(headers.len()))?;
    for (k, v) in headers {
        map.serialize_entry(k.as_ref(), v)?;
    }
    map.end()
}

/// Shared, mutable response state for one dispatch.
///
/// Handlers write through `&self`; concurrent middleware is expected to touch
/// disjoint parts of the payload. The route that produced the response is
/// recorded exactly once.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    payload: Mutex<Response>,
    matched_route: OnceLock<Arc<Route>>,
}

impl ResponseBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.payload.lock().status
    }

    pub fn set_status(&self, status: u16) {
        self.payload.lock().status = status;
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.payload.lock().get_header(name).map(str::to_string)
    }

    pub fn set_header(&self, name: &str, value: impl Into<String>) {
        self.payload.lock().set_header(name, value.into());
    }

    /// Replace the whole body
    pub fn set_body(&self, body: Value) {
        self.payload.lock().body = body;
    }

    #[must_use]
    pub fn body(&self) -> Value {
        self.payload.lock().body.clone()
    }

    /// Set one field of an object body, turning a non-object body into `{}` first.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        let mut payload = self.payload.lock();
        if !payload.body.is_object() {
            payload.body = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut payload.body {
            map.insert(key.into(), value);
        }
    }

    /// Read one field of an object body
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.payload.lock().body.get(key).cloned()
    }

    /// Run `f` with exclusive access to the payload
    pub fn with_payload<R>(&self, f: impl FnOnce(&mut Response) -> R) -> R {
        f(&mut self.payload.lock())
    }

    /// Copy of the payload as it stands
    #[must_use]
    pub fn snapshot(&self) -> Response {
        self.payload.lock().clone()
    }

    /// The terminal route chosen for this dispatch, once selected
    #[must_use]
    pub fn matched_route(&self) -> Option<&Arc<Route>> {
        self.matched_route.get()
    }

    pub(crate) fn record_route(&self, route: Arc<Route>) -> Result<(), Arc<Route>> {
        self.matched_route.set(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_promotes_body_to_object() {
        let res = ResponseBuilder::new();
        res.set_body(json!("text"));
        res.insert("a", json!(1));
        res.insert("b", json!(true));
        assert_eq!(res.body(), json!({ "a": 1, "b": true }));
        assert_eq!(res.get("a"), Some(json!(1)));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let res = ResponseBuilder::new();
        res.set_header("Content-Type", "text/plain");
        res.set_header("content-type", "application/json");
        assert_eq!(res.header("CONTENT-TYPE").as_deref(), Some("application/json"));
        assert_eq!(res.snapshot().headers.len(), 1);
    }

    #[test]
    fn test_response_serializes_headers_as_map() {
        let resp = Response::json(201, json!({ "id": 1 }));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["status"], 201);
        assert_eq!(value["headers"]["content-type"], "application/json");
        assert_eq!(value["body"]["id"], 1);
    }
}
