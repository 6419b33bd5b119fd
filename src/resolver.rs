//! # Path Resolution
//!
//! Matches a path against a [`RuleRegistry`] and rewrites its prefix.
//!
//! ## Algorithm
//!
//! 1. The first explicit rule (in registry order) whose source prefix is a literal
//!    prefix of the path wins.
//! 2. Otherwise, the first default rule whose `scheme://` source prefix is a literal
//!    prefix of the path wins.
//! 3. The first occurrence of the winning source prefix is replaced by its
//!    destination prefix. Later repeats are left alone.
//!
//! Matching is case-sensitive plain string comparison. Prefixes are never
//! interpreted as patterns, so `.`, `*`, `$` and friends match only themselves.
//!
//! ## Usage
//!
//! ```rust
//! use routerfs::{DefaultMapping, PathResolver, RuleParser, RuleRegistry};
//!
//! let parser = RuleParser::new("routerfs")?;
//! let fragments = parser.parse([
//!     ("routerfs.mapping.s3.1.replace", "s3://bucket/"),
//!     ("routerfs.mapping.s3.1.with", "gcs://bar/"),
//! ])?;
//! let registry = RuleRegistry::new(fragments, [DefaultMapping::new("s3", "s3-default")])?;
//!
//! let resolved = registry.resolve("s3://bucket/foo/a")?;
//! assert_eq!(resolved.target_path, "gcs://bar/foo/a");
//!
//! let fallback = registry.resolve("s3://other/x.txt")?;
//! assert_eq!(fallback.target_path, "s3-default://other/x.txt");
//! # Ok::<(), routerfs::RouterError>(())
//! ```

use crate::{MappingRule, ResolvedPath, RouterError, RuleRegistry};

// ============================================================================
// Trait Definition
// ============================================================================

/// Strategy trait for turning a caller path into a backing-store path.
///
/// [`RuleRegistry`] is the standard implementation. The router filesystem holds
/// its resolver as `Arc<dyn PathResolver>`, so tests and hosts can substitute
/// their own.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; `resolve` is called concurrently from
/// every operation the router serves.
pub trait PathResolver: Send + Sync {
    /// Resolve `path` to its target in a backing store.
    ///
    /// # Errors
    ///
    /// - [`RouterError::PathUnresolved`] if no explicit or default rule matches
    fn resolve(&self, path: &str) -> Result<ResolvedPath, RouterError>;
}

impl PathResolver for RuleRegistry {
    fn resolve(&self, path: &str) -> Result<ResolvedPath, RouterError> {
        let rule = self
            .rules()
            .iter()
            .find(|rule| path.starts_with(&rule.source_prefix))
            .or_else(|| self.defaults().iter().find(|rule| default_matches(rule, path)))
            .ok_or_else(|| {
                tracing::trace!(path, "no path mapping nor default mapping matches");
                RouterError::PathUnresolved {
                    path: path.to_string(),
                }
            })?;

        let target_path = replace_first(path, &rule.source_prefix, &rule.dest_prefix)
            .ok_or_else(|| RouterError::PathUnresolved {
                path: path.to_string(),
            })?;
        tracing::trace!(path, target = %target_path, %rule, "converted path");

        Ok(ResolvedPath {
            target_path,
            matched_source_prefix: rule.source_prefix.clone(),
            matched_dest_prefix: rule.dest_prefix.clone(),
        })
    }
}

/// Resolve `path` against `registry`.
///
/// Free-function form of [`PathResolver::resolve`].
pub fn resolve(registry: &RuleRegistry, path: &str) -> Result<ResolvedPath, RouterError> {
    registry.resolve(path)
}

// The whole `scheme://` must lead the path: `s3a://x` starts with `s3` but is not
// an `s3` path, and a `scheme://` further in must never be rewritten.
fn default_matches(rule: &MappingRule, path: &str) -> bool {
    path.starts_with(&rule.source_prefix)
}

/// Replace the first occurrence of `from` in `haystack` with `to`.
///
/// Returns `None` if `from` does not occur.
pub(crate) fn replace_first(haystack: &str, from: &str, to: &str) -> Option<String> {
    let idx = haystack.find(from)?;
    let mut out = String::with_capacity(haystack.len() - from.len() + to.len());
    out.push_str(&haystack[..idx]);
    out.push_str(to);
    out.push_str(&haystack[idx + from.len()..]);
    Some(out)
}

// ============================================================================
// Tests
// ============================================================================
