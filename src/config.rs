//! # Router Configuration
//!
//! Raw key/value configuration and everything the router derives from it.
//!
//! ## Recognized Keys
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `<ns>.mapping.<group>.<priority>.replace` | source prefix of a rule |
//! | `<ns>.mapping.<group>.<priority>.with` | destination prefix of a rule |
//! | `<ns>.default.fs.<scheme>` | store implementation that served `<scheme>` before routing |
//! | `fs.<scheme>.impl` | when equal to the router's impl name, `<scheme>` is intercepted |
//!
//! `<ns>` defaults to `routerfs`. Every other key is ignored.
//!
//! Each `<ns>.default.fs.<scheme>` entry produces a default mapping from `<scheme>`
//! to `<scheme>-default`, plus a [`DefaultStore`] telling the host which store
//! implementation to register under `<scheme>-default`.
//!
//! ## Example
//!
//! ```rust
//! use routerfs::{PathResolver, RouterConfig};
//!
//! let config = RouterConfig::from_pairs([
//!     ("fs.s3a.impl", "routerfs"),
//!     ("routerfs.default.fs.s3a", "S3AFileSystem"),
//!     ("routerfs.mapping.s3a.1.replace", "s3a://bucket/"),
//!     ("routerfs.mapping.s3a.1.with", "lakefs://repo/main/"),
//! ]);
//!
//! let registry = config.build_registry()?;
//! assert_eq!(
//!     registry.resolve("s3a://bucket/a.csv")?.target_path,
//!     "lakefs://repo/main/a.csv"
//! );
//! assert_eq!(
//!     registry.resolve("s3a://logs/b.csv")?.target_path,
//!     "s3a-default://logs/b.csv"
//! );
//! # Ok::<(), routerfs::RouterError>(())
//! ```

use std::collections::BTreeMap;

use regex::Regex;

use crate::parser::DEFAULT_NAMESPACE;
use crate::{DefaultMapping, RouterError, RuleFragment, RuleParser, RuleRegistry};

/// Value of `fs.<scheme>.impl` that marks a scheme as routed through this crate.
pub const DEFAULT_IMPL_NAME: &str = "routerfs";

/// Suffix appended to an intercepted scheme to name its fallback store.
pub const DEFAULT_SCHEME_SUFFIX: &str = "-default";

const SCHEME: &str = "scheme";

/// The store that should serve unmapped paths of an intercepted scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultStore {
    /// The intercepted scheme (e.g. `s3a`).
    pub from_scheme: String,
    /// Scheme the fallback store is registered under (e.g. `s3a-default`).
    pub scheme: String,
    /// Store implementation name taken from the configuration value.
    pub implementation: String,
}

impl DefaultStore {
    /// The default mapping this store backs.
    pub fn mapping(&self) -> DefaultMapping {
        DefaultMapping::new(self.from_scheme.clone(), self.scheme.clone())
    }
}

/// Raw router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    entries: BTreeMap<String, String>,
    namespace: String,
    impl_name: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Empty configuration with the `routerfs` namespace.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            impl_name: DEFAULT_IMPL_NAME.to_string(),
        }
    }

    /// Configuration holding the given key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::new();
        config.entries = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        config
    }

    /// Load configuration from a flat JSON object of string values.
    ///
    /// # Errors
    ///
    /// - [`RouterError::Deserialization`] if the input is not such an object
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, RouterError> {
        let entries: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|e| RouterError::Deserialization(e.to_string()))?;
        Ok(Self::from_pairs(entries))
    }

    /// Use a namespace other than `routerfs` for router keys.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Use a different `fs.<scheme>.impl` value to detect intercepted schemes.
    pub fn with_impl_name(mut self, impl_name: impl Into<String>) -> Self {
        self.impl_name = impl_name.into();
        self
    }

    /// Set a key, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// All entries, sorted by key.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The configured namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Parse every mapping rule fragment.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ConfigFormat`] for any malformed mapping key
    pub fn fragments(&self) -> Result<Vec<RuleFragment>, RouterError> {
        RuleParser::new(&self.namespace)?.parse(self.entries())
    }

    /// Fallback stores declared with `<ns>.default.fs.<scheme>`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ConfigFormat`] for a key under `<ns>.default.fs.` whose
    ///   scheme is not made of `[-a-z0-9_]`
    pub fn default_stores(&self) -> Result<Vec<DefaultStore>, RouterError> {
        let prefix = format!("{}.default.fs.", self.namespace);
        let pattern = compile(&format!(
            r"^{}(?<{SCHEME}>[-a-z0-9_]*)$",
            regex::escape(&prefix)
        ))?;

        let mut stores = Vec::new();
        for (key, value) in self.entries() {
            if !key.starts_with(&prefix) {
                continue;
            }
            let caps = pattern.captures(key).ok_or_else(|| {
                RouterError::format(key, "expected <namespace>.default.fs.<scheme>")
            })?;
            let from_scheme = caps[SCHEME].to_string();
            let scheme = format!("{from_scheme}{DEFAULT_SCHEME_SUFFIX}");
            tracing::debug!(
                key,
                fallback_scheme = %scheme,
                implementation = value,
                "registering default filesystem mapping"
            );
            stores.push(DefaultStore {
                from_scheme,
                scheme,
                implementation: value.to_string(),
            });
        }
        Ok(stores)
    }

    /// Schemes whose `fs.<scheme>.impl` names the router.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ConfigArgument`] if the key pattern cannot be built
    pub fn intercepted_schemes(&self) -> Result<Vec<String>, RouterError> {
        let pattern = compile(&format!(r"^fs\.(?<{SCHEME}>[-a-z0-9_]*)\.impl$"))?;
        Ok(self
            .entries()
            .filter(|(_, value)| *value == self.impl_name)
            .filter_map(|(key, _)| pattern.captures(key).map(|caps| caps[SCHEME].to_string()))
            .collect())
    }

    /// Parse, pair, and validate everything into a registry.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ConfigArgument`] if no default stores are configured or an
    ///   intercepted scheme lacks one
    /// - [`RouterError::ConfigFormat`] for malformed or unpaired mapping keys
    pub fn build_registry(&self) -> Result<RuleRegistry, RouterError> {
        let stores = self.default_stores()?;
        if stores.is_empty() {
            return Err(RouterError::ConfigArgument(
                "no default filesystem configurations were specified".into(),
            ));
        }

        RuleRegistry::builder()
            .fragments(self.fragments()?)
            .defaults(stores.iter().map(DefaultStore::mapping))
            .intercepts(self.intercepted_schemes()?)
            .build()
    }
}

fn compile(pattern: &str) -> Result<Regex, RouterError> {
    Regex::new(pattern)
        .map_err(|e| RouterError::ConfigArgument(format!("invalid config key pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathResolver;

    fn base() -> RouterConfig {
        RouterConfig::from_pairs([
            ("fs.s3a.impl", "routerfs"),
            ("fs.gs.impl", "GoogleHadoopFileSystem"),
            ("routerfs.default.fs.s3a", "S3AFileSystem"),
        ])
    }

    #[test]
    fn derives_default_stores() {
        let stores = base().default_stores().unwrap();
        assert_eq!(
            stores,
            vec![DefaultStore {
                from_scheme: "s3a".into(),
                scheme: "s3a-default".into(),
                implementation: "S3AFileSystem".into(),
            }]
        );
        assert_eq!(stores[0].mapping(), DefaultMapping::new("s3a", "s3a-default"));
    }

    #[test]
    fn detects_intercepted_schemes() {
        assert_eq!(base().intercepted_schemes().unwrap(), vec!["s3a".to_string()]);
    }

    #[test]
    fn custom_impl_name() {
        let config = base().with_impl_name("GoogleHadoopFileSystem");
        assert_eq!(config.intercepted_schemes().unwrap(), vec!["gs".to_string()]);
    }

    #[test]
    fn builds_registry() {
        let mut config = base();
        config.set("routerfs.mapping.s3a.1.replace", "s3a://bucket/");
        config.set("routerfs.mapping.s3a.1.with", "gcs://bar/");

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.rules().len(), 1);
        assert_eq!(
            registry.resolve("s3a://bucket/x").unwrap().target_path,
            "gcs://bar/x"
        );
        assert_eq!(
            registry.resolve("s3a://elsewhere/x").unwrap().target_path,
            "s3a-default://elsewhere/x"
        );
    }

    #[test]
    fn no_default_stores_fails() {
        let config = RouterConfig::from_pairs([("fs.s3a.impl", "routerfs")]);
        let err = config.build_registry().unwrap_err();
        assert!(matches!(err, RouterError::ConfigArgument(_)));
    }

    #[test]
    fn intercepted_scheme_without_default_fails() {
        let mut config = base();
        config.set("fs.s3b.impl", "routerfs");
        let err = config.build_registry().unwrap_err();
        match err {
            RouterError::ConfigArgument(msg) => assert!(msg.contains("s3b")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_default_key_fails() {
        let mut config = base();
        config.set("routerfs.default.fs.S3A", "S3AFileSystem");
        assert!(matches!(
            config.default_stores(),
            Err(RouterError::ConfigFormat { .. })
        ));
    }

    #[test]
    fn malformed_mapping_key_fails_build() {
        let mut config = base();
        config.set("routerfs.mapping.s3a.first.replace", "s3a://bucket/");
        assert!(matches!(
            config.build_registry(),
            Err(RouterError::ConfigFormat { .. })
        ));
    }

    #[test]
    fn custom_namespace() {
        let config = RouterConfig::from_pairs([
            ("router.default.fs.s3", "S3"),
            ("router.mapping.s3.1.replace", "s3://a/"),
            ("router.mapping.s3.1.with", "b://"),
            // Ignored under the custom namespace.
            ("routerfs.mapping.s3.1.replace", "not-s3"),
        ])
        .with_namespace("router");
        assert_eq!(config.namespace(), "router");

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.resolve("s3://a/f").unwrap().target_path, "b://f");
    }

    #[test]
    fn set_and_get() {
        let mut config = RouterConfig::new();
        assert_eq!(config.set("k", "v1"), None);
        assert_eq!(config.set("k", "v2"), Some("v1".to_string()));
        assert_eq!(config.get("k"), Some("v2"));
        assert_eq!(config.get("missing"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_from_json() {
        let config = RouterConfig::from_json_str(
            r#"{
                "fs.s3a.impl": "routerfs",
                "routerfs.default.fs.s3a": "S3AFileSystem",
                "routerfs.mapping.s3a.1.replace": "s3a://bucket/",
                "routerfs.mapping.s3a.1.with": "lakefs://repo/main/"
            }"#,
        )
        .unwrap();
        let registry = config.build_registry().unwrap();
        assert_eq!(
            registry.resolve("s3a://bucket/t").unwrap().target_path,
            "lakefs://repo/main/t"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_with_non_string_values_fails() {
        let err = RouterConfig::from_json_str(r#"{"routerfs.default.fs.s3a": 3}"#).unwrap_err();
        assert!(matches!(err, RouterError::Deserialization(_)));
    }
}
