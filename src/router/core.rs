//! Router core: registration, discovery and dispatch.

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::pattern::normalize_base_path;
use super::route::{HandlerKind, Route, RouteMatch, RouteMethod, RouteOptions};
use crate::dispatcher::{handler, invoke, run_middleware, MiddlewareMode};
use crate::error::{DispatchError, RouteError};
use crate::ids::RouterId;
use crate::runtime_config::RouterConfig;
use crate::server::{RawRequest, RequestContext, Response, ResponseBuilder};

/// Maps the accumulated response to the value emitted by [`Router::serve`]
pub type ResponseTransform = Arc<dyn Fn(Response) -> Value + Send + Sync>;

/// Construction-time router settings
#[derive(Clone, Default)]
pub struct RouterOptions {
    /// Prefix for every route; normalized to `/.../`
    pub base_path: String,
    /// `None` leaves the mode unspecified, which means sequential
    pub middleware_mode: Option<MiddlewareMode>,
    /// Replaces the default JSON serialization of the response
    pub response_transform: Option<ResponseTransform>,
}

impl From<RouterConfig> for RouterOptions {
    fn from(config: RouterConfig) -> Self {
        Self {
            base_path: config.base_path,
            middleware_mode: config.middleware_mode,
            response_transform: None,
        }
    }
}

/// Ordered collection of routes under a base path
///
/// Registration order is dispatch order: discovery walks routes in the order
/// they were added, splicing in the matches of mounted routers where they were
/// mounted.
#[derive(Clone)]
pub struct Router {
    id: RouterId,
    base_path: String,
    middleware_mode: MiddlewareMode,
    routes: Vec<Arc<Route>>,
    response_transform: Option<ResponseTransform>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("id", &self.id)
            .field("base_path", &self.base_path)
            .field("middleware_mode", &self.middleware_mode)
            .field("routes", &self.routes.len())
            .field("response_transform", &self.response_transform.is_some())
            .finish()
    }
}

impl Router {
    /// Router at `/` with sequential middleware and no transform
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    #[must_use]
    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            id: RouterId::new(),
            base_path: normalize_base_path(&options.base_path),
            middleware_mode: options.middleware_mode.unwrap_or_default(),
            routes: Vec::new(),
            response_transform: options.response_transform,
        }
    }

    #[must_use]
    pub fn id(&self) -> RouterId {
        self.id
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn middleware_mode(&self) -> MiddlewareMode {
        self.middleware_mode
    }

    /// Routes in registration order
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Change the base path and rebuild every route under it.
    ///
    /// Routes are rebuilt from their registration inputs; mounted routers are
    /// cloned and re-based. On error the router is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first [`RouteError`] raised while rebuilding.
    pub fn set_base_path(&mut self, base_path: &str) -> Result<(), RouteError> {
        let base_path = normalize_base_path(base_path);
        let rebuilt = self
            .routes
            .iter()
            .map(|route| route.rebuild(&base_path).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            router_id = %self.id,
            old_base_path = %self.base_path,
            new_base_path = %base_path,
            routes_count = rebuilt.len(),
            "Router base path changed, routes rebuilt"
        );

        for (idx, route) in rebuilt.iter().enumerate() {
            if let Some(earlier) = shadowing_route(&rebuilt[..idx], route) {
                warn_shadowed(self.id, route, earlier);
            }
        }

        self.base_path = base_path;
        self.routes = rebuilt;
        Ok(())
    }

    /// Register a route and return it.
    ///
    /// Because [`normalize`](super::normalize) does not re-prefix a path that
    /// already lies under the base path, two different input paths can end up
    /// with the same normalized path (`/api` and `/` under base `/api/`). A
    /// terminal route that repeats the method and normalized path of an earlier
    /// terminal route in this router is still registered, but it can never be
    /// selected; a warning is logged and [`Router::shadowed_routes`] lists it.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidRouteDefinition`] when a router is registered with a
    /// method other than ANY; [`RouteError::PatternCompilation`] for a
    /// malformed path. Existing routes are unaffected by a failed call.
    pub fn add_route(&mut self, options: RouteOptions) -> Result<&Route, RouteError> {
        let route = Route::new(self.id, &self.base_path, options).inspect_err(|e| {
            warn!(router_id = %self.id, error = %e, "Route registration rejected");
        })?;

        debug!(
            router_id = %self.id,
            method = %route.method(),
            path = %route.normalized_path(),
            kind = route.handler().kind(),
            "Route registered"
        );

        if let Some(earlier) = shadowing_route(&self.routes, &route) {
            warn_shadowed(self.id, &route, earlier);
        }

        self.routes.push(Arc::new(route));
        Ok(self.routes[self.routes.len() - 1].as_ref())
    }

    /// Terminal routes that can never be selected because an earlier terminal
    /// route of the same router has the same method and normalized path.
    ///
    /// Mounted routers are searched too.
    #[must_use]
    pub fn shadowed_routes(&self) -> Vec<Arc<Route>> {
        let mut shadowed = Vec::new();
        for (idx, route) in self.routes.iter().enumerate() {
            if let Some(router) = route.mounted_router() {
                shadowed.extend(router.shadowed_routes());
            } else if shadowing_route(&self.routes[..idx], route).is_some() {
                shadowed.push(Arc::clone(route));
            }
        }
        shadowed
    }

    fn add_function<F, Fut>(
        &mut self,
        method: RouteMethod,
        path: &str,
        is_middleware: bool,
        f: F,
    ) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_route(
            RouteOptions::new(path, HandlerKind::Function(handler(f)))
                .method(method)
                .middleware(is_middleware),
        )
    }

    /// Register a GET handler
    pub fn get<F, Fut>(&mut self, path: &str, f: F) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_function(RouteMethod::Get, path, false, f)
    }

    /// Register a POST handler
    pub fn post<F, Fut>(&mut self, path: &str, f: F) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_function(RouteMethod::Post, path, false, f)
    }

    /// Register a PUT handler
    pub fn put<F, Fut>(&mut self, path: &str, f: F) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_function(RouteMethod::Put, path, false, f)
    }

    /// Register a PATCH handler
    pub fn patch<F, Fut>(&mut self, path: &str, f: F) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_function(RouteMethod::Patch, path, false, f)
    }

    /// Register a DELETE handler
    pub fn delete<F, Fut>(&mut self, path: &str, f: F) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_function(RouteMethod::Delete, path, false, f)
    }

    /// Register a handler for every method
    pub fn any<F, Fut>(&mut self, path: &str, f: F) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_function(RouteMethod::Any, path, false, f)
    }

    /// Register middleware for every method on `path`
    pub fn middleware<F, Fut>(&mut self, path: &str, f: F) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_function(RouteMethod::Any, path, true, f)
    }

    /// Register middleware for one method on `path`
    pub fn middleware_for<F, Fut>(
        &mut self,
        method: RouteMethod,
        path: &str,
        f: F,
    ) -> Result<&Route, RouteError>
    where
        F: Fn(Arc<RequestContext>, Arc<ResponseBuilder>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_function(method, path, true, f)
    }

    /// Mount `router` under `path`; its routes are re-based beneath this router.
    pub fn mount(&mut self, path: &str, router: Router) -> Result<&Route, RouteError> {
        self.add_route(RouteOptions::new(path, router).method(RouteMethod::Any))
    }

    /// All routes matching `method` and `path`, in discovery order.
    ///
    /// Mounted routers are searched recursively and their matches spliced in
    /// at the position of the mounting route.
    #[must_use]
    pub fn find_matching_routes(&self, method: &str, path: &str) -> Vec<RouteMatch> {
        let mut matches = Vec::new();
        self.collect_matches(method, path, &mut matches);
        matches
    }

    fn collect_matches(&self, method: &str, path: &str, out: &mut Vec<RouteMatch>) {
        for route in &self.routes {
            if let Some(router) = route.mounted_router() {
                router.collect_matches(method, path, out);
                continue;
            }
            let outcome = route.matches(method, path);
            if let (true, Some(params)) = (outcome.is_match, outcome.params) {
                out.push(RouteMatch {
                    route: Arc::clone(route),
                    params,
                });
            }
        }
    }

    /// Flattened `METHOD /path/ [kind]` listing across mounted routers
    #[must_use]
    pub fn route_table(&self) -> Vec<String> {
        let mut table = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            match route.mounted_router() {
                Some(router) => {
                    table.push(format!("{} {} [router]", route.method(), route.normalized_path()));
                    table.extend(router.route_table().into_iter().map(|line| format!("  {line}")));
                }
                None => table.push(format!(
                    "{} {} [{}]",
                    route.method(),
                    route.normalized_path(),
                    route.handler().kind()
                )),
            }
        }
        table
    }

    /// Dispatch a raw request.
    ///
    /// Wraps the request in a fresh [`RequestContext`] and [`ResponseBuilder`]
    /// and runs [`Router::serve_with`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoHandlerFound`] when no terminal route matches, or
    /// [`DispatchError::Handler`] with the first handler failure.
    pub async fn serve(&self, request: RawRequest, additional_data: Value) -> Result<Value, DispatchError> {
        let ctx = Arc::new(RequestContext::new(request, additional_data));
        let res = Arc::new(ResponseBuilder::new());
        self.serve_with(ctx, res).await
    }

    /// Dispatch an already-wrapped request into a shared response builder.
    ///
    /// 1. Discover all matching routes (recursively).
    /// 2. Select the first terminal match; bind its params and record its route.
    /// 3. Run middleware per [`MiddlewareMode`], then the terminal handler.
    /// 4. Emit the response, through the transform if one is configured.
    ///
    /// # Errors
    ///
    /// As [`Router::serve`], plus [`DispatchError::ContextAlreadyDispatched`]
    /// if `ctx` already had its params bound or `res` already recorded a
    /// route. In that case neither `ctx` nor `res` is modified.
    pub async fn serve_with(
        &self,
        ctx: Arc<RequestContext>,
        res: Arc<ResponseBuilder>,
    ) -> Result<Value, DispatchError> {
        let start = Instant::now();
        let request_id = ctx.request_id();

        debug!(
            request_id = %request_id,
            router_id = %self.id,
            method = %ctx.method(),
            path = %ctx.path(),
            "Dispatch start"
        );

        let (middleware, terminals): (Vec<RouteMatch>, Vec<RouteMatch>) = self
            .find_matching_routes(ctx.method(), ctx.path())
            .into_iter()
            .partition(|m| m.route.is_middleware());

        let Some(selected) = terminals.into_iter().next() else {
            warn!(
                request_id = %request_id,
                method = %ctx.method(),
                path = %ctx.path(),
                middleware_matches = middleware.len(),
                "No handler found"
            );
            return Err(DispatchError::NoHandlerFound {
                method: ctx.method().to_string(),
                path: ctx.path().to_string(),
            });
        };

        // Neither side is written when either one was already used
        if ctx.params().is_some() || res.matched_route().is_some() {
            warn!(request_id = %request_id, "Request context reused for a second dispatch");
            return Err(DispatchError::ContextAlreadyDispatched);
        }

        let RouteMatch { route, params } = selected;
        if ctx.bind_params(params).is_err() || res.record_route(Arc::clone(&route)).is_err() {
            warn!(request_id = %request_id, "Request context reused for a second dispatch");
            return Err(DispatchError::ContextAlreadyDispatched);
        }

        debug!(
            request_id = %request_id,
            route = %route.normalized_path(),
            method = %route.method(),
            path_params = ?ctx.params(),
            "Terminal handler selected"
        );

        let middleware: Vec<Arc<Route>> = middleware.into_iter().map(|m| m.route).collect();
        run_middleware(self.middleware_mode, &middleware, &ctx, &res).await?;

        invoke(&route, &ctx, &res).await.inspect_err(|e| {
            warn!(
                request_id = %request_id,
                route = %route.normalized_path(),
                error = %e,
                "Handler failed"
            );
        })?;

        let response = res.snapshot();
        let status = response.status;
        let emitted = match &self.response_transform {
            Some(transform) => (**transform)(response),
            None => serde_json::to_value(&response)
                .map_err(|e| DispatchError::Handler(anyhow::Error::new(e)))?,
        };

        info!(
            request_id = %request_id,
            method = %ctx.method(),
            path = %ctx.path(),
            route = %route.normalized_path(),
            status = status,
            middleware_count = middleware.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "Request dispatched"
        );

        Ok(emitted)
    }
}

/// The earlier terminal route in `routes` that makes `route` unreachable
fn shadowing_route<'a>(routes: &'a [Arc<Route>], route: &Route) -> Option<&'a Route> {
    if route.is_middleware() || route.is_router_handler() {
        return None;
    }
    routes
        .iter()
        .map(Arc::as_ref)
        .find(|earlier| {
            !earlier.is_middleware()
                && !earlier.is_router_handler()
                && earlier.method() == route.method()
                && earlier.normalized_path() == route.normalized_path()
        })
}

fn warn_shadowed(router_id: RouterId, route: &Route, earlier: &Route) {
    warn!(
        router_id = %router_id,
        method = %route.method(),
        path = %route.normalized_path(),
        input_path = %route.input_path(),
        shadowed_by = %earlier.input_path(),
        "Route duplicates an earlier route and will never be selected"
    );
}
