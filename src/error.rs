//! Error types for the path router.

use std::io;

/// Router error type covering configuration, resolution, and store failures.
///
/// Construction errors ([`ConfigFormat`](RouterError::ConfigFormat),
/// [`ConfigArgument`](RouterError::ConfigArgument)) mean the router must refuse to
/// start. Every other variant fails a single operation only.
///
/// # Examples
///
/// ```rust
/// use routerfs::RouterError;
///
/// let err = RouterError::PathUnresolved { path: "s3://other/x.txt".into() };
/// assert_eq!(err.to_string(), "no mapping matches path: s3://other/x.txt");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    // Construction errors
    /// A mapping key or value is malformed.
    #[error("invalid mapping config {key}: {reason}")]
    ConfigFormat {
        /// The offending configuration key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Default mappings are missing or incomplete.
    #[error("invalid router arguments: {0}")]
    ConfigArgument(String),

    /// JSON configuration could not be parsed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    // Per-path errors
    /// Neither an explicit nor a default mapping matches the path.
    #[error("no mapping matches path: {path}")]
    PathUnresolved {
        /// The path that could not be resolved.
        path: String,
    },

    /// A store returned a path outside the expected destination prefix.
    #[error("path {path} doesn't start with prefix \"{prefix}\"")]
    InvalidPath {
        /// The path returned by the store.
        path: String,
        /// The destination prefix it was expected to start with.
        prefix: String,
    },

    /// No store is registered for the scheme of a resolved path.
    #[error("no store registered for scheme: {scheme}")]
    NoStore {
        /// The scheme without a store.
        scheme: String,
    },

    // Store errors
    /// Path does not exist in the backing store.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: String,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: String,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Generic backing store error.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl RouterError {
    pub(crate) fn format(key: impl Into<String>, reason: impl Into<String>) -> Self {
        RouterError::ConfigFormat {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that must abort router construction.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            RouterError::ConfigFormat { .. }
                | RouterError::ConfigArgument(_)
                | RouterError::Deserialization(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_format_display() {
        let err =
            RouterError::format("routerfs.mapping.s3.x.replace", "priority is not an integer");
        assert_eq!(
            err.to_string(),
            "invalid mapping config routerfs.mapping.s3.x.replace: priority is not an integer"
        );
    }

    #[test]
    fn invalid_path_display() {
        let err = RouterError::InvalidPath {
            path: "other://unexpected/f".into(),
            prefix: "lakefs://repo/b1/".into(),
        };
        assert!(err.to_string().contains("other://unexpected/f"));
        assert!(err.to_string().contains("lakefs://repo/b1/"));
    }

    #[test]
    fn config_errors_are_classified() {
        assert!(RouterError::ConfigArgument("x".into()).is_config());
        assert!(RouterError::format("k", "r").is_config());
        assert!(!RouterError::PathUnresolved { path: "p".into() }.is_config());
        assert!(!RouterError::Backend("b".into()).is_config());
    }

    #[test]
    fn io_error_keeps_context_and_source() {
        use std::error::Error as _;

        let err = RouterError::Io {
            operation: "open",
            path: "lakefs://repo/main/a.txt".into(),
            source: io::Error::other("connection reset"),
        };
        assert_eq!(
            err.to_string(),
            "open failed for lakefs://repo/main/a.txt: connection reset"
        );
        assert!(err.source().is_some());
    }
}
