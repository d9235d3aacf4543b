//! Error types for route registration and request dispatch.

use std::fmt;

use crate::router::RouteMethod;

/// Registration-time error
///
/// Returned by [`Router::add_route`](crate::router::Router::add_route) and the
/// method helpers. A failed registration leaves the router's existing routes
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A nested router was registered with a method other than `ANY`
    InvalidRouteDefinition {
        /// The method the caller asked for
        method: RouteMethod,
    },
    /// The route path could not be compiled into a matcher
    PatternCompilation {
        /// The normalized path that failed to compile
        path: String,
        /// Why compilation failed
        reason: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidRouteDefinition { method } => {
                write!(
                    f,
                    "Invalid route definition: a mounted router must use method ANY, got {}",
                    method
                )
            }
            RouteError::PatternCompilation { path, reason } => {
                write!(f, "Invalid path pattern '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// Dispatch-time error
///
/// Every variant means no response was built for the request.
#[derive(Debug)]
pub enum DispatchError {
    /// The flattened match list held no terminal handler
    NoHandlerFound {
        /// Request method as supplied by the caller
        method: String,
        /// Request path as supplied by the caller
        path: String,
    },
    /// A middleware or terminal handler failed; the error is passed through unmodified
    Handler(anyhow::Error),
    /// The request context already had its params bound by an earlier dispatch
    ContextAlreadyDispatched,
}

impl DispatchError {
    /// True for [`DispatchError::NoHandlerFound`]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DispatchError::NoHandlerFound { .. })
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoHandlerFound { method, path } => {
                write!(f, "No handler found for {} {}", method, path)
            }
            DispatchError::Handler(err) => write!(f, "Handler failed: {}", err),
            DispatchError::ContextAlreadyDispatched => {
                write!(f, "Request context has already been dispatched")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Handler(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        DispatchError::Handler(err)
    }
}
