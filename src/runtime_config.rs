//! # Runtime Configuration Module
//!
//! Router settings loaded from YAML or from environment variables.
//!
//! ## Environment Variables
//!
//! ### `CASCADE_BASE_PATH`
//!
//! Base path for the router. Normalized to start and end with `/`.
//!
//! Default: `/`
//!
//! ### `CASCADE_MIDDLEWARE_MODE`
//!
//! `sequential` (alias `waterfall`) or `concurrent` (alias `parallel`).
//! Unset leaves the mode unspecified, which the router treats as sequential.
//! An unrecognised value is ignored with a warning.
//!
//! ## YAML
//!
//! ```yaml
//! base_path: /api
//! middleware_mode: concurrent
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use cascade_router::runtime_config::RouterConfig;
//! use cascade_router::router::{Router, RouterOptions};
//!
//! let config = RouterConfig::from_env();
//! let router = Router::with_options(RouterOptions::from(config));
//! # let _ = router;
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::warn;

use crate::dispatcher::MiddlewareMode;

/// Router settings that can live outside code.
///
/// `middleware_mode` is three-state: `None` means "not
/// configured" and resolves to sequential, distinct from an explicit choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub base_path: String,
    pub middleware_mode: Option<MiddlewareMode>,
}

impl RouterConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let base_path = env::var("CASCADE_BASE_PATH").unwrap_or_default();
        let middleware_mode = match env::var("CASCADE_MIDDLEWARE_MODE") {
            Ok(val) => {
                let parsed = MiddlewareMode::parse(&val);
                if parsed.is_none() {
                    warn!(value = %val, "Unknown CASCADE_MIDDLEWARE_MODE, using default");
                }
                parsed
            }
            Err(_) => None,
        };
        RouterConfig {
            base_path,
            middleware_mode,
        }
    }

    /// Parse configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this shape.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse router config YAML")
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read router config {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid router config {}", path.display()))
    }

    /// The mode the router will actually use
    #[must_use]
    pub fn effective_middleware_mode(&self) -> MiddlewareMode {
        self.middleware_mode.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_config() {
        let config = RouterConfig::from_yaml_str("base_path: /api\nmiddleware_mode: concurrent\n").unwrap();
        assert_eq!(config.base_path, "/api");
        assert_eq!(config.middleware_mode, Some(MiddlewareMode::Concurrent));
    }

    #[test]
    fn test_empty_yaml_leaves_mode_unspecified() {
        let config = RouterConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.middleware_mode, None);
        assert_eq!(config.effective_middleware_mode(), MiddlewareMode::Sequential);
    }

    #[test]
    fn test_explicit_sequential_is_kept() {
        let config = RouterConfig::from_yaml_str("middleware_mode: sequential").unwrap();
        assert_eq!(config.middleware_mode, Some(MiddlewareMode::Sequential));
    }

    #[test]
    fn test_invalid_yaml_mode_is_an_error() {
        assert!(RouterConfig::from_yaml_str("middleware_mode: sideways").is_err());
    }
}
