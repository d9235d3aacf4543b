use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::core::Router;
use super::pattern::{normalize, ParamVec, PathPattern};
use crate::dispatcher::{HandlerFn, RouteHandler};
use crate::error::RouteError;
use crate::ids::RouterId;
use crate::server::RequestContext;

/// Method a route answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Matches every request method
    Any,
}

impl RouteMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Any => "ANY",
        }
    }

    /// True if a request with `method` is accepted, comparing case-insensitively
    #[must_use]
    pub fn accepts(&self, method: &str) -> bool {
        *self == RouteMethod::Any || self.as_str().eq_ignore_ascii_case(method)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a method name outside GET/POST/PUT/PATCH/DELETE/ANY
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported route method '{}'", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for RouteMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(RouteMethod::Get),
            "POST" => Ok(RouteMethod::Post),
            "PUT" => Ok(RouteMethod::Put),
            "PATCH" => Ok(RouteMethod::Patch),
            "DELETE" => Ok(RouteMethod::Delete),
            "ANY" | "*" => Ok(RouteMethod::Any),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl TryFrom<&http::Method> for RouteMethod {
    type Error = UnknownMethod;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Handler supplied at registration, before it is tagged
#[derive(Clone)]
pub enum HandlerKind {
    Function(HandlerFn),
    Router(Router),
}

impl From<HandlerFn> for HandlerKind {
    fn from(f: HandlerFn) -> Self {
        HandlerKind::Function(f)
    }
}

impl From<Router> for HandlerKind {
    fn from(router: Router) -> Self {
        HandlerKind::Router(router)
    }
}

/// Registration options for [`Router::add_route`]
#[derive(Clone)]
pub struct RouteOptions {
    pub path: String,
    pub handler: HandlerKind,
    /// Defaults to GET for functions and ANY for routers
    pub method: Option<RouteMethod>,
    /// Ignored for routers, which are never middleware
    pub is_middleware: bool,
}

impl RouteOptions {
    #[must_use]
    pub fn new(path: impl Into<String>, handler: impl Into<HandlerKind>) -> Self {
        Self {
            path: path.into(),
            handler: handler.into(),
            method: None,
            is_middleware: false,
        }
    }

    #[must_use]
    pub fn method(mut self, method: RouteMethod) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn middleware(mut self, is_middleware: bool) -> Self {
        self.is_middleware = is_middleware;
        self
    }
}

/// Result of testing one route against a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Captured params when the path matched
    pub params: Option<ParamVec>,
    /// Path matched and method accepted
    pub is_match: bool,
}

/// A route matched during discovery, with its captured params
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: ParamVec,
}

impl RouteMatch {
    /// Get a captured param by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One registration: method, compiled path and handler.
///
/// Routes are immutable. When the owning router's base path changes it builds
/// replacement routes from [`Route::input_path`], [`Route::method`] and the
/// handler; the compiled pattern is never edited in place.
#[derive(Debug, Clone)]
pub struct Route {
    owner: RouterId,
    method: RouteMethod,
    handler: RouteHandler,
    input_path: String,
    pattern: PathPattern,
}

impl Route {
    /// Build a route for the router identified by `owner` with base path `base_path`.
    ///
    /// A router handler is mounted: it must use [`RouteMethod::Any`] and is
    /// never middleware. It is re-based under this route's normalized path.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidRouteDefinition`] for a router with another method,
    /// [`RouteError::PatternCompilation`] for a malformed path.
    pub fn new(owner: RouterId, base_path: &str, options: RouteOptions) -> Result<Self, RouteError> {
        let RouteOptions {
            path,
            handler,
            method,
            is_middleware,
        } = options;

        let normalized = normalize(base_path, &path);
        let pattern = PathPattern::compile(&normalized)?;

        let (method, handler) = match handler {
            HandlerKind::Router(mut router) => {
                let method = method.unwrap_or(RouteMethod::Any);
                if method != RouteMethod::Any {
                    return Err(RouteError::InvalidRouteDefinition { method });
                }
                router.set_base_path(&normalized)?;
                (method, RouteHandler::Mounted(Arc::new(router)))
            }
            HandlerKind::Function(f) if is_middleware => {
                (method.unwrap_or_default(), RouteHandler::Middleware(f))
            }
            HandlerKind::Function(f) => (method.unwrap_or_default(), RouteHandler::Terminal(f)),
        };

        Ok(Self {
            owner,
            method,
            handler,
            input_path: path,
            pattern,
        })
    }

    /// Rebuild this route's definition under a new base path
    pub(crate) fn rebuild(&self, base_path: &str) -> Result<Self, RouteError> {
        let (handler, is_middleware) = match &self.handler {
            RouteHandler::Terminal(f) => (HandlerKind::Function(Arc::clone(f)), false),
            RouteHandler::Middleware(f) => (HandlerKind::Function(Arc::clone(f)), true),
            RouteHandler::Mounted(router) => (HandlerKind::Router(Router::clone(router)), false),
        };
        Self::new(
            self.owner,
            base_path,
            RouteOptions {
                path: self.input_path.clone(),
                handler,
                method: Some(self.method),
                is_middleware,
            },
        )
    }

    /// Id of the router that registered this route
    #[must_use]
    pub fn owner(&self) -> RouterId {
        self.owner
    }

    #[must_use]
    pub fn method(&self) -> RouteMethod {
        self.method
    }

    #[must_use]
    pub fn handler(&self) -> &RouteHandler {
        &self.handler
    }

    /// The path as given at registration
    #[must_use]
    pub fn input_path(&self) -> &str {
        &self.input_path
    }

    /// The base-prefixed path with a single trailing `/`
    #[must_use]
    pub fn normalized_path(&self) -> &str {
        self.pattern.source()
    }

    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    #[must_use]
    pub fn is_middleware(&self) -> bool {
        matches!(self.handler, RouteHandler::Middleware(_))
    }

    #[must_use]
    pub fn is_router_handler(&self) -> bool {
        matches!(self.handler, RouteHandler::Mounted(_))
    }

    /// The mounted router, if this route mounts one
    #[must_use]
    pub fn mounted_router(&self) -> Option<&Arc<Router>> {
        match &self.handler {
            RouteHandler::Mounted(router) => Some(router),
            _ => None,
        }
    }

    /// Match the path only
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<ParamVec> {
        self.pattern.match_path(path)
    }

    /// Match path and method.
    ///
    /// A mounted route never matches itself; discovery searches its router instead.
    #[must_use]
    pub fn matches(&self, method: &str, path: &str) -> MatchOutcome {
        if self.is_router_handler() {
            return MatchOutcome::default();
        }
        let params = self.match_path(path);
        let is_match = params.is_some() && self.method.accepts(method);
        MatchOutcome { params, is_match }
    }

    /// [`Route::matches`] against a wrapped request
    #[must_use]
    pub fn matches_context(&self, ctx: &RequestContext) -> MatchOutcome {
        self.matches(ctx.method(), ctx.path())
    }
}
