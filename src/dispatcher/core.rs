use futures::future::{try_join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::router::{Route, Router};
use crate::server::{RequestContext, ResponseBuilder};

/// Boxed async handler shared by middleware and terminal routes
///
/// Receives the per-dispatch context, the shared response builder and the
/// caller's additional data. A returned error aborts the dispatch and is
/// surfaced to the caller unmodified.
pub type HandlerFn = Arc<
    dyn Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// Box an async closure into a [`HandlerFn`].
///
/// ```rust
/// use cascade_router::dispatcher::handler;
///
/// let h = handler(|ctx, res, _data| async move {
///     res.insert("path", ctx.path().into());
///     Ok(())
/// });
/// # let _ = h;
/// ```
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(
        move |ctx: Arc<RequestContext>,
              res: Arc<ResponseBuilder>,
              data: Arc<Value>|
              -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(f(ctx, res, data)) },
    )
}

/// What a route hands the request to
///
/// A mounted router is never middleware and never matched itself; its own
/// routes are searched in its place.
#[derive(Clone)]
pub enum RouteHandler {
    /// Produces the response when selected
    Terminal(HandlerFn),
    /// Runs before the terminal handler
    Middleware(HandlerFn),
    /// A nested router searched recursively
    Mounted(Arc<Router>),
}

impl RouteHandler {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RouteHandler::Terminal(_) => "handler",
            RouteHandler::Middleware(_) => "middleware",
            RouteHandler::Mounted(_) => "router",
        }
    }

    /// The callable for terminal and middleware routes
    #[must_use]
    pub fn function(&self) -> Option<&HandlerFn> {
        match self {
            RouteHandler::Terminal(f) | RouteHandler::Middleware(f) => Some(f),
            RouteHandler::Mounted(_) => None,
        }
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteHandler::Mounted(router) => f
                .debug_tuple("Mounted")
                .field(&router.base_path())
                .finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// How matched middleware is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiddlewareMode {
    /// One at a time in discovery order ("waterfall")
    #[default]
    #[serde(alias = "waterfall")]
    Sequential,
    /// All started together, joined before the terminal handler
    #[serde(alias = "parallel")]
    Concurrent,
}

impl MiddlewareMode {
    /// Parse a mode name, case-insensitively
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "waterfall" => Some(MiddlewareMode::Sequential),
            "concurrent" | "parallel" => Some(MiddlewareMode::Concurrent),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MiddlewareMode::Sequential => "sequential",
            MiddlewareMode::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for MiddlewareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoke one route's handler with the shared dispatch state
pub(crate) fn invoke(
    route: &Route,
    ctx: &Arc<RequestContext>,
    res: &Arc<ResponseBuilder>,
) -> BoxFuture<'static, anyhow::Result<()>> {
    match route.handler().function() {
        Some(f) => (**f)(
            Arc::clone(ctx),
            Arc::clone(res),
            Arc::clone(ctx.additional_data()),
        ),
        // Mounted routes are flattened away during discovery
        None => Box::pin(async { Ok(()) }),
    }
}

/// Run the matched middleware according to `mode`.
///
/// Sequential mode awaits each middleware before starting the next.
/// Concurrent mode creates every future up front and joins them; the first
/// failure is returned and the remaining futures are dropped.
pub(crate) async fn run_middleware(
    mode: MiddlewareMode,
    middleware: &[Arc<Route>],
    ctx: &Arc<RequestContext>,
    res: &Arc<ResponseBuilder>,
) -> anyhow::Result<()> {
    if middleware.is_empty() {
        return Ok(());
    }

    let request_id = ctx.request_id();
    debug!(
        request_id = %request_id,
        middleware_count = middleware.len(),
        mode = %mode,
        "Middleware execution start"
    );

    match mode {
        MiddlewareMode::Sequential => {
            for (idx, route) in middleware.iter().enumerate() {
                let start = Instant::now();
                if let Err(e) = invoke(route, ctx, res).await {
                    warn!(
                        request_id = %request_id,
                        middleware_idx = idx,
                        route = %route.normalized_path(),
                        error = %e,
                        "Middleware failed"
                    );
                    return Err(e);
                }
                debug!(
                    request_id = %request_id,
                    middleware_idx = idx,
                    route = %route.normalized_path(),
                    duration_us = start.elapsed().as_micros() as u64,
                    "Middleware complete"
                );
            }
        }
        MiddlewareMode::Concurrent => {
            let start = Instant::now();
            let futures: Vec<_> = middleware
                .iter()
                .map(|route| invoke(route, ctx, res))
                .collect();
            if let Err(e) = try_join_all(futures).await {
                warn!(
                    request_id = %request_id,
                    error = %e,
                    "Concurrent middleware failed"
                );
                return Err(e);
            }
            debug!(
                request_id = %request_id,
                middleware_count = middleware.len(),
                duration_us = start.elapsed().as_micros() as u64,
                "Concurrent middleware joined"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middleware_mode_parse() {
        assert_eq!(MiddlewareMode::parse("Sequential"), Some(MiddlewareMode::Sequential));
        assert_eq!(MiddlewareMode::parse(" waterfall "), Some(MiddlewareMode::Sequential));
        assert_eq!(MiddlewareMode::parse("CONCURRENT"), Some(MiddlewareMode::Concurrent));
        assert_eq!(MiddlewareMode::parse("fast"), None);
    }

    #[test]
    fn test_middleware_mode_defaults_to_sequential() {
        assert_eq!(MiddlewareMode::default(), MiddlewareMode::Sequential);
    }
}
