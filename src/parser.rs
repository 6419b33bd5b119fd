//! # Rule Parser
//!
//! Turns raw key/value configuration into [`RuleFragment`]s.
//!
//! ## Key Format
//!
//! ```text
//! <namespace>.mapping.<group>.<priority>.replace = <source prefix>
//! <namespace>.mapping.<group>.<priority>.with    = <destination prefix>
//! ```
//!
//! `<group>` is restricted to `[-a-z0-9_]*` and `<priority>` to a non-negative
//! integer. Keys outside `<namespace>.mapping.` are ignored; keys inside it that
//! don't fit the pattern fail the whole parse, since a half-understood rule could
//! silently misroute data.

use regex::Regex;

use crate::{RouterError, RuleFragment, RuleKind};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "routerfs";

const GROUP: &str = "group";
const PRIORITY: &str = "priority";
const KIND: &str = "kind";

/// Parser for mapping rule keys under one configuration namespace.
///
/// # Example
///
/// ```rust
/// use routerfs::{RuleKind, RuleParser};
///
/// let parser = RuleParser::new("routerfs")?;
/// let fragments = parser.parse([
///     ("routerfs.mapping.s3.1.replace", "s3://bucket/"),
///     ("routerfs.mapping.s3.1.with", "gcs://bar/"),
///     ("spark.executor.memory", "4g"),
/// ])?;
/// assert_eq!(fragments.len(), 2);
/// assert_eq!(fragments[0].kind, RuleKind::Source);
/// # Ok::<(), routerfs::RouterError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RuleParser {
    mapping_prefix: String,
    pattern: Regex,
}

impl RuleParser {
    /// Create a parser for keys under `<namespace>.mapping.`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ConfigArgument`] if the key pattern cannot be built
    pub fn new(namespace: &str) -> Result<Self, RouterError> {
        // The priority is captured loosely so a non-numeric value gets its own error.
        let pattern = format!(
            r"^{}\.mapping\.(?<{GROUP}>[-a-z0-9_]*)\.(?<{PRIORITY}>[^.]*)\.(?<{KIND}>replace|with)$",
            regex::escape(namespace)
        );
        let pattern = Regex::new(&pattern).map_err(|e| {
            RouterError::ConfigArgument(format!("invalid mapping namespace {namespace:?}: {e}"))
        })?;
        Ok(Self {
            mapping_prefix: format!("{namespace}.mapping."),
            pattern,
        })
    }

    /// Prefix shared by every key this parser owns (e.g. `routerfs.mapping.`).
    pub fn mapping_prefix(&self) -> &str {
        &self.mapping_prefix
    }

    /// Parse every mapping key in `entries`, skipping unrelated keys.
    ///
    /// Fragments are returned in input order.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ConfigFormat`] on the first malformed mapping key
    pub fn parse<I, K, V>(&self, entries: I) -> Result<Vec<RuleFragment>, RouterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fragments = Vec::new();
        for (key, value) in entries {
            let (key, value) = (key.as_ref(), value.as_ref());
            if let Some(fragment) = self.parse_entry(key, value)? {
                tracing::trace!(key, value, "parsed mapping config");
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }

    /// Parse a single key/value pair.
    ///
    /// Returns `Ok(None)` for keys outside the mapping namespace.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ConfigFormat`] if the key doesn't match the pattern, the
    ///   priority is not an integer, or a `replace` value doesn't begin with its group
    pub fn parse_entry(&self, key: &str, value: &str) -> Result<Option<RuleFragment>, RouterError> {
        if !key.starts_with(&self.mapping_prefix) {
            return Ok(None);
        }

        let caps = self.pattern.captures(key).ok_or_else(|| {
            RouterError::format(
                key,
                "expected <namespace>.mapping.<group>.<priority>.<replace|with>",
            )
        })?;

        let group = &caps[GROUP];
        let priority = caps[PRIORITY]
            .parse::<u32>()
            .map_err(|_| RouterError::format(key, "priority is not an integer"))?;
        let kind = RuleKind::from_key_suffix(&caps[KIND])
            .ok_or_else(|| RouterError::format(key, "mapping type must be replace or with"))?;

        if kind == RuleKind::Source && !value.starts_with(group) {
            return Err(RouterError::format(
                key,
                format!("source value {value:?} should start with its group {group:?}"),
            ));
        }

        Ok(Some(RuleFragment {
            group: group.to_string(),
            priority,
            kind,
            value: value.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> RuleParser {
        RuleParser::new(DEFAULT_NAMESPACE).unwrap()
    }

    #[test]
    fn parses_replace_and_with() {
        let fragments = parser()
            .parse([
                ("routerfs.mapping.s3a.1.replace", "s3a://bucket/"),
                ("routerfs.mapping.s3a.1.with", "gcs://bar/"),
            ])
            .unwrap();
        assert_eq!(
            fragments,
            vec![
                RuleFragment {
                    group: "s3a".into(),
                    priority: 1,
                    kind: RuleKind::Source,
                    value: "s3a://bucket/".into(),
                },
                RuleFragment {
                    group: "s3a".into(),
                    priority: 1,
                    kind: RuleKind::Dest,
                    value: "gcs://bar/".into(),
                },
            ]
        );
    }

    #[test]
    fn ignores_keys_outside_namespace() {
        let fragments = parser()
            .parse([
                ("fs.s3a.impl", "routerfs"),
                ("routerfs.default.fs.s3a", "S3AFileSystem"),
                ("spark.master", "local"),
            ])
            .unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn non_numeric_priority_is_format_error() {
        let err = parser()
            .parse([("routerfs.mapping.s3a.notAnInt.replace", "s3a://bucket")])
            .unwrap_err();
        match err {
            RouterError::ConfigFormat { key, reason } => {
                assert_eq!(key, "routerfs.mapping.s3a.notAnInt.replace");
                assert!(reason.contains("integer"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_or_empty_priority_is_format_error() {
        assert!(
            parser()
                .parse_entry("routerfs.mapping.s3a.-1.with", "x://")
                .is_err()
        );
        assert!(
            parser()
                .parse_entry("routerfs.mapping.s3a..with", "x://")
                .is_err()
        );
    }

    #[test]
    fn unknown_mapping_type_is_format_error() {
        let err = parser()
            .parse_entry("routerfs.mapping.s3a.1.notAMappingConfType", "s3a://bucket")
            .unwrap_err();
        assert!(matches!(err, RouterError::ConfigFormat { .. }));
    }

    #[test]
    fn trailing_garbage_after_type_is_format_error() {
        let err = parser()
            .parse_entry("routerfs.mapping.s3a.1.replace.extra", "s3a://bucket")
            .unwrap_err();
        assert!(matches!(err, RouterError::ConfigFormat { .. }));
    }

    #[test]
    fn unsafe_group_characters_are_format_error() {
        let err = parser()
            .parse_entry("routerfs.mapping.#@.1.replace", "#@://bucket")
            .unwrap_err();
        assert!(matches!(err, RouterError::ConfigFormat { .. }));

        let err = parser()
            .parse_entry("routerfs.mapping.S3A.1.with", "gcs://")
            .unwrap_err();
        assert!(matches!(err, RouterError::ConfigFormat { .. }));
    }

    #[test]
    fn source_value_must_start_with_group() {
        let err = parser()
            .parse_entry("routerfs.mapping.s3a.1.replace", "gcs://bucket/")
            .unwrap_err();
        assert!(matches!(err, RouterError::ConfigFormat { .. }));
    }

    #[test]
    fn dest_value_is_not_checked_against_group() {
        let fragment = parser()
            .parse_entry("routerfs.mapping.s3a.1.with", "lakefs://repo/main/")
            .unwrap()
            .unwrap();
        assert_eq!(fragment.kind, RuleKind::Dest);
        assert_eq!(fragment.value, "lakefs://repo/main/");
    }

    #[test]
    fn group_with_dash_and_underscore() {
        let fragment = parser()
            .parse_entry("routerfs.mapping.s3-a_1.7.replace", "s3-a_1://b/")
            .unwrap()
            .unwrap();
        assert_eq!(fragment.group, "s3-a_1");
        assert_eq!(fragment.priority, 7);
    }

    #[test]
    fn custom_namespace_is_escaped() {
        let parser = RuleParser::new("my.router").unwrap();
        assert_eq!(parser.mapping_prefix(), "my.router.mapping.");
        assert!(
            parser
                .parse_entry("my.router.mapping.s3.1.with", "gcs://")
                .unwrap()
                .is_some()
        );
        // `.` in the namespace must not act as a wildcard.
        assert!(
            parser
                .parse_entry("myXrouter.mapping.s3.1.with", "gcs://")
                .unwrap()
                .is_none()
        );
    }
}
