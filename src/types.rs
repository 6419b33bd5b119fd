//! Core types for the path router.

use std::fmt;

/// Separator between a URI scheme and the rest of the path.
pub const URI_SCHEME_SEPARATOR: &str = "://";

/// Which half of a mapping rule a fragment describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuleKind {
    /// The prefix to replace (`.replace` keys).
    Source,
    /// The prefix to replace it with (`.with` keys).
    Dest,
}

impl RuleKind {
    /// Parse the trailing component of a mapping key.
    pub fn from_key_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "replace" => Some(RuleKind::Source),
            "with" => Some(RuleKind::Dest),
            _ => None,
        }
    }
}

/// One half of a mapping rule, as parsed from a single configuration key.
///
/// Fragments only live long enough to be paired into [`MappingRule`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleFragment {
    /// Grouping label used for pairing and ordering. Not necessarily a URI scheme.
    pub group: String,
    /// Ordering key within the group.
    pub priority: u32,
    /// Source or destination half.
    pub kind: RuleKind,
    /// Literal path prefix.
    pub value: String,
}

/// A `(from_scheme, to_scheme)` pair describing where unmapped paths of a scheme go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultMapping {
    /// Scheme the router intercepts (e.g. `s3a`).
    pub from_scheme: String,
    /// Scheme of the fallback store (e.g. `s3a-default`).
    pub to_scheme: String,
}

impl DefaultMapping {
    /// Create a default mapping pair.
    pub fn new(from_scheme: impl Into<String>, to_scheme: impl Into<String>) -> Self {
        Self {
            from_scheme: from_scheme.into(),
            to_scheme: to_scheme.into(),
        }
    }
}

/// A complete, validated prefix rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MappingRule {
    /// Prefix matched against input paths.
    pub source_prefix: String,
    /// Prefix substituted for the source prefix.
    pub dest_prefix: String,
    /// Grouping label. For default rules this is the intercepted scheme.
    pub group: String,
    /// Ordering key within the group; `None` for default rules.
    pub priority: Option<u32>,
    /// Whether this rule is a scheme fallback.
    pub is_default: bool,
}

impl MappingRule {
    /// Build a default rule from a scheme pair.
    pub fn from_default(mapping: &DefaultMapping) -> Self {
        Self {
            source_prefix: format!("{}{URI_SCHEME_SEPARATOR}", mapping.from_scheme),
            dest_prefix: format!("{}{URI_SCHEME_SEPARATOR}", mapping.to_scheme),
            group: mapping.from_scheme.clone(),
            priority: None,
            is_default: true,
        }
    }

    /// The scheme a default rule falls back for.
    #[inline]
    pub fn scheme(&self) -> &str {
        &self.group
    }
}

impl fmt::Display for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.priority {
            Some(priority) => write!(
                f,
                "{}.{} {} -> {}",
                self.group, priority, self.source_prefix, self.dest_prefix
            ),
            None => write!(
                f,
                "default {} -> {}",
                self.source_prefix, self.dest_prefix
            ),
        }
    }
}

/// The outcome of resolving one path.
///
/// Carries the prefixes that were swapped so results coming back from the
/// backing store can be translated into the caller's namespace again.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedPath {
    /// The rewritten path, addressed to the backing store.
    pub target_path: String,
    /// Source prefix of the matching rule.
    pub matched_source_prefix: String,
    /// Destination prefix of the matching rule.
    pub matched_dest_prefix: String,
}

impl ResolvedPath {
    /// Scheme of the target path, used to pick a backing store.
    ///
    /// Returns `None` when the target has no `scheme://` part.
    pub fn target_scheme(&self) -> Option<&str> {
        scheme_of(&self.target_path)
    }
}

/// Extract the scheme of a URI string (everything before `://`).
pub fn scheme_of(path: &str) -> Option<&str> {
    path.find(URI_SCHEME_SEPARATOR).map(|idx| &path[..idx])
}

/// Type of an entry returned by a backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Status of a file or directory, as reported by a backing store.
///
/// `path` is a full URI. The router rewrites it back into the caller's
/// namespace before returning it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileStatus {
    /// Full path of the entry.
    pub path: String,
    /// Type of the entry.
    pub file_type: FileType,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

impl FileStatus {
    /// Status of a regular file.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            file_type: FileType::File,
            size,
        }
    }

    /// Status of a directory.
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_type: FileType::Directory,
            size: 0,
        }
    }

    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_kind_from_key_suffix() {
        assert_eq!(RuleKind::from_key_suffix("replace"), Some(RuleKind::Source));
        assert_eq!(RuleKind::from_key_suffix("with"), Some(RuleKind::Dest));
        assert_eq!(RuleKind::from_key_suffix("notAMappingConfType"), None);
    }

    #[test]
    fn default_rule_appends_separator() {
        let rule = MappingRule::from_default(&DefaultMapping::new("s3", "s3-default"));
        assert_eq!(rule.source_prefix, "s3://");
        assert_eq!(rule.dest_prefix, "s3-default://");
        assert_eq!(rule.scheme(), "s3");
        assert!(rule.is_default);
        assert_eq!(rule.priority, None);
    }

    #[test]
    fn mapping_rule_display() {
        let rule = MappingRule {
            source_prefix: "s3://bucket/".into(),
            dest_prefix: "gcs://bar/".into(),
            group: "s3".into(),
            priority: Some(1),
            is_default: false,
        };
        assert_eq!(rule.to_string(), "s3.1 s3://bucket/ -> gcs://bar/");

        let default = MappingRule::from_default(&DefaultMapping::new("s3", "s3-default"));
        assert_eq!(default.to_string(), "default s3:// -> s3-default://");
    }

    #[test]
    fn scheme_of_uri() {
        assert_eq!(scheme_of("lakefs://repo/main/a"), Some("lakefs"));
        assert_eq!(scheme_of("s3a-default://bucket"), Some("s3a-default"));
        assert_eq!(scheme_of("/no/scheme"), None);
    }

    #[test]
    fn file_status_helpers() {
        let file = FileStatus::file("gcs://bar/a", 10);
        assert!(file.is_file());
        assert!(!file.is_dir());
        assert_eq!(file.size, 10);

        let dir = FileStatus::dir("gcs://bar/");
        assert!(dir.is_dir());
        assert_eq!(dir.size, 0);
    }
}
