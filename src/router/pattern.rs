//! Path normalization and pattern compilation.
//!
//! Route paths are normalized against their router's base path before they
//! are compiled, so every pattern starts with `/`, carries the base prefix and
//! ends with exactly one trailing `/`. Compilation turns the normalized path
//! into an anchored regex with one capture group per parameter segment.
//!
//! Two parameter spellings are accepted and may be mixed:
//!
//! - `:id` (colon marker)
//! - `{id}` (brace marker)

use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RouteError;

/// The path separator
pub const SEPARATOR: char = '/';

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured parameters, in pattern order.
///
/// Param names use `Arc<str>` because they come from the compiled pattern and
/// are shared by every match; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Normalize a router base path so it starts and ends with `/`.
///
/// `""` and `"/"` both become `"/"`; `"api"` becomes `"/api/"`.
#[must_use]
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        return SEPARATOR.to_string();
    }
    let mut out = String::with_capacity(trimmed.len() + 2);
    out.push(SEPARATOR);
    out.push_str(trimmed);
    out.push(SEPARATOR);
    out
}

/// Prefix `input_path` with `base_path` and force a single trailing `/`.
///
/// Leading separators on `input_path` are dropped before joining so the base
/// and the input never produce `//`. An input that already lies under the base
/// path is not prefixed a second time, which makes the operation idempotent:
/// `normalize(b, &normalize(b, p)) == normalize(b, p)`.
///
/// The price is that distinct inputs can collide: under base `/api/` both
/// `/api` and `/` normalize to `/api/`.
#[must_use]
pub fn normalize(base_path: &str, input_path: &str) -> String {
    let base = normalize_base_path(base_path);
    let relative = input_path.trim_start_matches(SEPARATOR);

    let mut rooted = String::with_capacity(relative.len() + 2);
    rooted.push(SEPARATOR);
    rooted.push_str(relative);
    let rooted = with_trailing_separator(&rooted);

    if rooted.starts_with(&base) {
        return rooted;
    }

    let mut joined = String::with_capacity(base.len() + relative.len() + 1);
    joined.push_str(&base);
    joined.push_str(relative);
    with_trailing_separator(&joined)
}

fn with_trailing_separator(path: &str) -> String {
    let mut out = path.trim_end_matches(SEPARATOR).to_string();
    out.push(SEPARATOR);
    out
}

/// A compiled path matcher
///
/// Immutable once built. Matching is purely structural: segment count, literal
/// segment equality and parameter capture. Methods are not considered here.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl PathPattern {
    /// Compile a normalized path into a matcher.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::PatternCompilation`] for an empty or invalid
    /// parameter name, unbalanced braces, or a parameter name used twice.
    pub fn compile(normalized_path: &str) -> Result<Self, RouteError> {
        let fail = |reason: String| RouteError::PatternCompilation {
            path: normalized_path.to_string(),
            reason,
        };

        let mut pattern = String::with_capacity(normalized_path.len() + 8);
        pattern.push('^');
        let mut param_names: Vec<Arc<str>> = Vec::new();

        for segment in normalized_path.split(SEPARATOR).filter(|s| !s.is_empty()) {
            pattern.push(SEPARATOR);
            match parse_segment(segment).map_err(&fail)? {
                Segment::Literal(lit) => pattern.push_str(&regex::escape(lit)),
                Segment::Param(name) => {
                    if param_names.iter().any(|n| n.as_ref() == name) {
                        return Err(fail(format!("duplicate parameter name '{}'", name)));
                    }
                    pattern.push_str("([^/]+)");
                    param_names.push(Arc::from(name));
                }
            }
        }

        if param_names.is_empty() && pattern.len() == 1 {
            pattern.push(SEPARATOR);
        } else {
            pattern.push_str("/?");
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| fail(e.to_string()))?;

        Ok(Self {
            source: normalized_path.to_string(),
            regex,
            param_names,
        })
    }

    /// The normalized path this pattern was compiled from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameter names in the order they appear in the path
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Match a concrete path.
    ///
    /// Returns the captured parameters (percent-decoded) or `None` when the
    /// path does not match.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<ParamVec> {
        let captures = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(raw) = captures.get(i + 1) {
                let value = match urlencoding::decode(raw.as_str()) {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => raw.as_str().to_string(),
                };
                params.push((Arc::clone(name), value));
            }
        }
        Some(params)
    }

    /// True if `path` matches, without collecting parameters
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Convert captured params into an owned map. Allocates.
#[must_use]
pub fn params_to_map(params: &ParamVec) -> HashMap<String, String> {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
}

fn parse_segment(segment: &str) -> Result<Segment<'_>, String> {
    if let Some(name) = segment.strip_prefix(':') {
        validate_param_name(name)?;
        return Ok(Segment::Param(name));
    }
    if let Some(inner) = segment.strip_prefix('{') {
        let name = inner
            .strip_suffix('}')
            .ok_or_else(|| format!("unbalanced braces in segment '{}'", segment))?;
        validate_param_name(name)?;
        return Ok(Segment::Param(name));
    }
    if segment.contains('{') || segment.contains('}') {
        return Err(format!("unbalanced braces in segment '{}'", segment));
    }
    Ok(Segment::Literal(segment))
}

fn validate_param_name(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err("empty parameter name".to_string()),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            Err(format!("invalid parameter name '{}'", name))
        }
        Some(_) if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => Ok(()),
        Some(_) => Err(format!("invalid parameter name '{}'", name)),
    }
}
