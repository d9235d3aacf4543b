//! Request and response types shared by every handler of a dispatch.
//!
//! - [`RawRequest`] - what the caller supplies (method, path, headers, ...)
//! - [`RequestContext`] - the wrapped request handed to handlers
//! - [`ResponseBuilder`] - the response state handlers write into
//! - [`Response`] - the accumulated payload

pub mod request;
pub mod response;

pub use request::{parse_cookies, parse_query_params, HeaderVec, RawRequest, RequestContext};
pub use response::{Response, ResponseBuilder};
