//! Prefix reversal for paths returned by backing stores.
//!
//! Listings and stat results come back addressed to the destination namespace.
//! Callers must only ever see their own namespace, otherwise a recursive walk
//! would feed store paths back into the router.

use crate::resolver::replace_first;
use crate::{ResolvedPath, RouterError};

/// Re-express `result_path` under `source_prefix`.
///
/// # Errors
///
/// - [`RouterError::InvalidPath`] if `result_path` does not start with `dest_prefix`.
///   That means the store answered with a path outside the mapped subtree.
///
/// # Example
///
/// ```rust
/// use routerfs::reverse;
///
/// let path = reverse("lakefs://repo/b1/sub/f", "s3://bucket/", "lakefs://repo/b1/")?;
/// assert_eq!(path, "s3://bucket/sub/f");
/// # Ok::<(), routerfs::RouterError>(())
/// ```
pub fn reverse(
    result_path: &str,
    source_prefix: &str,
    dest_prefix: &str,
) -> Result<String, RouterError> {
    let invalid = || RouterError::InvalidPath {
        path: result_path.to_string(),
        prefix: dest_prefix.to_string(),
    };
    if !result_path.starts_with(dest_prefix) {
        return Err(invalid());
    }
    let reversed = replace_first(result_path, dest_prefix, source_prefix).ok_or_else(invalid)?;
    tracing::trace!(from = result_path, to = %reversed, "reversed path prefix");
    Ok(reversed)
}

impl ResolvedPath {
    /// Reverse a path returned by the store this path was resolved to.
    ///
    /// # Errors
    ///
    /// See [`reverse`].
    pub fn reverse(&self, result_path: &str) -> Result<String, RouterError> {
        reverse(
            result_path,
            &self.matched_source_prefix,
            &self.matched_dest_prefix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultMapping, PathResolver, RuleFragment, RuleKind, RuleRegistry};

    #[test]
    fn restores_source_prefix() {
        assert_eq!(
            reverse("lakefs://repo/b1/sub/f", "s3://bucket/", "lakefs://repo/b1/").unwrap(),
            "s3://bucket/sub/f"
        );
    }

    #[test]
    fn rejects_path_outside_dest_prefix() {
        let err = reverse("other://unexpected/f", "s3://bucket/", "lakefs://repo/b1/").unwrap_err();
        match err {
            RouterError::InvalidPath { path, prefix } => {
                assert_eq!(path, "other://unexpected/f");
                assert_eq!(prefix, "lakefs://repo/b1/");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn dest_prefix_later_in_path_does_not_count() {
        let err = reverse("x://a/lakefs://repo/b1/f", "s3://bucket/", "lakefs://repo/b1/");
        assert!(matches!(err, Err(RouterError::InvalidPath { .. })));
    }

    #[test]
    fn only_first_occurrence_is_reversed() {
        assert_eq!(
            reverse("x://y/x://y/", "a://b/", "x://y/").unwrap(),
            "a://b/x://y/"
        );
    }

    #[test]
    fn reverse_undoes_resolve() {
        let registry = RuleRegistry::new(
            [
                RuleFragment {
                    group: "s3".into(),
                    priority: 1,
                    kind: RuleKind::Source,
                    value: "s3://bucket/".into(),
                },
                RuleFragment {
                    group: "s3".into(),
                    priority: 1,
                    kind: RuleKind::Dest,
                    value: "lakefs://repo/b1/".into(),
                },
            ],
            [DefaultMapping::new("s3", "s3-default")],
        )
        .unwrap();

        for path in [
            "s3://bucket/a.txt",
            "s3://bucket/deep/nested/dir/",
            "s3://other/x",
            "s3://bucket/s3://bucket/twice",
        ] {
            let resolved = registry.resolve(path).unwrap();
            assert_eq!(resolved.reverse(&resolved.target_path).unwrap(), path);
        }
    }
}
