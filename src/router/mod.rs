//! # Router Module
//!
//! Path matching, route registration and dispatch for cascade-router.
//!
//! ## Overview
//!
//! A [`Router`] owns an ordered list of [`Route`]s under a base path. Each
//! route pairs a method and a compiled [`PathPattern`] with a handler, which
//! is either a function (terminal or middleware) or another router mounted
//! beneath this one.
//!
//! ## Architecture
//!
//! 1. **Compilation**: at registration the route path is normalized against
//!    the router's base path (`/api/` + `users/:id` → `/api/users/:id/`) and
//!    compiled into an anchored regex capturing each parameter segment.
//!
//! 2. **Discovery**: for each request every route is tested in registration
//!    order. Mounted routers are searched recursively and their matches are
//!    spliced in where the router was mounted.
//!
//! 3. **Dispatch**: the first terminal match is selected, its params bound to
//!    the request context, middleware matches run (sequentially or
//!    concurrently) and finally the terminal handler runs.
//!
//! ## Example
//!
//! ```rust
//! use cascade_router::router::Router;
//! use cascade_router::server::RawRequest;
//! use serde_json::Value;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::new();
//! router.get("/users/:id", |ctx, res, _data| async move {
//!     res.insert("id", ctx.param("id").unwrap_or_default().into());
//!     Ok(())
//! })?;
//!
//! let out = router.serve(RawRequest::new("GET", "/users/42"), Value::Null).await?;
//! assert_eq!(out["body"]["id"], "42");
//! # Ok(())
//! # }
//! ```

mod core;
mod pattern;
mod route;

pub use self::core::{ResponseTransform, Router, RouterOptions};
pub use pattern::{
    normalize, normalize_base_path, params_to_map, ParamVec, PathPattern, MAX_INLINE_PARAMS,
    SEPARATOR,
};
pub use route::{
    HandlerKind, MatchOutcome, Route, RouteMatch, RouteMethod, RouteOptions, UnknownMethod,
};
