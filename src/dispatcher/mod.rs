//! # Dispatcher Module
//!
//! Handler types and middleware execution for cascade-router.
//!
//! ## Overview
//!
//! Every route's handler is one of three tagged variants ([`RouteHandler`]):
//!
//! - **Terminal** - produces the response when its route is selected
//! - **Middleware** - runs before the terminal handler, never selected itself
//! - **Mounted** - a nested [`Router`](crate::router::Router) whose routes are
//!   searched in place of the mounting route
//!
//! Terminal and middleware handlers share one signature ([`HandlerFn`]):
//! an async function of the request context, the shared response builder and
//! the caller's additional data.
//!
//! ## Middleware Modes
//!
//! - [`MiddlewareMode::Sequential`] (default, "waterfall"): each middleware
//!   completes before the next starts, in discovery order.
//! - [`MiddlewareMode::Concurrent`]: all middleware futures are created and
//!   joined; the terminal handler starts only after every one has finished.
//!
//! There is no timeout. A middleware that never completes stalls its dispatch.

mod core;

pub use self::core::{handler, HandlerFn, MiddlewareMode, RouteHandler};
pub(crate) use self::core::{invoke, run_middleware};
