//! # cascade-router
//!
//! **cascade-router** is a nestable async request router. Given a method and a
//! path it finds the matching handler, runs every matching middleware first
//! (one after another, or all at once), then runs the handler and emits the
//! response it built.
//!
//! ## Overview
//!
//! Routers nest: a route's handler may itself be a [`Router`](router::Router),
//! mounted under the route's path. Discovery flattens the whole tree before
//! anything runs, so middleware registered in a sub-router applies to every
//! request its patterns match, in the position where the sub-router was mounted.
//!
//! ## Architecture
//!
//! - **[`router`]** - path normalization, pattern compilation, routes, routers,
//!   discovery and `serve`
//! - **[`dispatcher`]** - handler types and sequential/concurrent middleware execution
//! - **[`server`]** - raw requests, the per-dispatch request context and response builder
//! - **[`runtime_config`]** - router settings from YAML or the environment
//! - **[`logging`]** - tracing subscriber setup
//! - **[`error`]** - registration and dispatch errors
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Router
//!     participant Mounted as Mounted Router
//!     participant MW as Middleware
//!     participant Handler
//!
//!     Caller->>Router: serve(RawRequest, data)
//!     Router->>Router: wrap into RequestContext + ResponseBuilder
//!     Router->>Mounted: find_matching_routes (recursive)
//!     Mounted-->>Router: matches spliced in place
//!     Router->>Router: partition middleware / terminal
//!
//!     alt No terminal match
//!         Router-->>Caller: Err(NoHandlerFound)
//!     end
//!
//!     Router->>Router: bind params, record matched route
//!     Router->>MW: run (sequential or concurrent join)
//!     MW-->>Router: done
//!     Router->>Handler: invoke
//!     Handler-->>Router: done
//!     Router-->>Caller: Ok(response or transform(response))
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use cascade_router::{RawRequest, Router};
//! use serde_json::{json, Value};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut api = Router::new();
//! api.middleware("/pets/:id", |_ctx, res, _data| async move {
//!     res.set_header("x-served-by", "cascade");
//!     Ok(())
//! })?;
//! api.get("/pets/:id", |ctx, res, _data| async move {
//!     res.set_body(json!({ "id": ctx.param("id") }));
//!     Ok(())
//! })?;
//!
//! let mut root = Router::new();
//! root.mount("/api", api)?;
//!
//! let out = root.serve(RawRequest::new("GET", "/api/pets/7"), Value::Null).await?;
//! assert_eq!(out["body"]["id"], "7");
//! assert_eq!(out["headers"]["x-served-by"], "cascade");
//! # Ok(())
//! # }
//! ```
//!
//! ## Runtime Considerations
//!
//! The crate does not spawn tasks or depend on a specific executor; `serve`
//! is an ordinary future. There are no timeouts: a handler that never
//! completes stalls its dispatch.

pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use dispatcher::{handler, HandlerFn, MiddlewareMode, RouteHandler};
pub use error::{DispatchError, RouteError};
pub use router::{Route, RouteMatch, RouteMethod, RouteOptions, Router, RouterOptions};
pub use runtime_config::RouterConfig;
pub use server::{RawRequest, RequestContext, Response, ResponseBuilder};
