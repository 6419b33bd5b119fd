//! # Rule Registry
//!
//! Pairs [`RuleFragment`]s into [`MappingRule`]s, validates them together with the
//! default scheme mappings, and freezes the result.
//!
//! ## Responsibility
//! - Pair one `Source` and one `Dest` fragment per `(group, priority)`
//! - Build one default rule per intercepted scheme
//! - Order explicit rules by `(group, priority)`
//!
//! ## Lookup Order
//!
//! Explicit rules live in a single flat list sorted by group name, then priority.
//! Resolution scans the whole list and never filters by group, so two overlapping
//! prefixes from different groups are disambiguated purely by that order:
//!
//! ```text
//! alpha.5  s3://bucket/       -> x://
//! beta.1   s3://bucket/deep/  -> y://     (never reached for s3://bucket/deep/...)
//! ```
//!
//! The registry is immutable once built. Share it with `Arc<RuleRegistry>`; lookups
//! need no locking.

use std::collections::{BTreeMap, HashSet};

use crate::{DefaultMapping, MappingRule, RouterError, RuleFragment, RuleKind};

/// Immutable, validated set of mapping rules.
///
/// # Example
///
/// ```rust
/// use routerfs::{DefaultMapping, RuleFragment, RuleKind, RuleRegistry};
///
/// let registry = RuleRegistry::builder()
///     .fragment(RuleFragment {
///         group: "s3".into(),
///         priority: 1,
///         kind: RuleKind::Source,
///         value: "s3://bucket/".into(),
///     })
///     .fragment(RuleFragment {
///         group: "s3".into(),
///         priority: 1,
///         kind: RuleKind::Dest,
///         value: "gcs://bar/".into(),
///     })
///     .default_mapping(DefaultMapping::new("s3", "s3-default"))
///     .intercept("s3")
///     .build()?;
///
/// assert_eq!(registry.rules().len(), 1);
/// assert_eq!(registry.defaults().len(), 1);
/// # Ok::<(), routerfs::RouterError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<MappingRule>,
    defaults: Vec<MappingRule>,
}

impl RuleRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build a registry from fragments and default pairs, with no intercepted-scheme check.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::build`].
    pub fn new<F, D>(fragments: F, defaults: D) -> Result<Self, RouterError>
    where
        F: IntoIterator<Item = RuleFragment>,
        D: IntoIterator<Item = DefaultMapping>,
    {
        Self::builder().fragments(fragments).defaults(defaults).build()
    }

    /// Explicit rules in lookup order.
    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    /// Default rules, one per scheme, in the order they were supplied.
    pub fn defaults(&self) -> &[MappingRule] {
        &self.defaults
    }
}

/// Builder for [`RuleRegistry`].
#[derive(Debug, Default, Clone)]
pub struct RegistryBuilder {
    fragments: Vec<RuleFragment>,
    defaults: Vec<DefaultMapping>,
    intercepted: Vec<String>,
}

#[derive(Default)]
struct FragmentPair {
    source: Option<String>,
    dest: Option<String>,
}

impl RegistryBuilder {
    /// Add one rule fragment.
    pub fn fragment(mut self, fragment: RuleFragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Add rule fragments.
    pub fn fragments(mut self, fragments: impl IntoIterator<Item = RuleFragment>) -> Self {
        self.fragments.extend(fragments);
        self
    }

    /// Add one default scheme mapping.
    pub fn default_mapping(mut self, mapping: DefaultMapping) -> Self {
        self.defaults.push(mapping);
        self
    }

    /// Add default scheme mappings.
    pub fn defaults(mut self, defaults: impl IntoIterator<Item = DefaultMapping>) -> Self {
        self.defaults.extend(defaults);
        self
    }

    /// Declare a scheme the host routes through this registry.
    ///
    /// Every intercepted scheme must have a default mapping.
    pub fn intercept(mut self, scheme: impl Into<String>) -> Self {
        self.intercepted.push(scheme.into());
        self
    }

    /// Declare several intercepted schemes.
    pub fn intercepts<S: Into<String>>(mut self, schemes: impl IntoIterator<Item = S>) -> Self {
        self.intercepted.extend(schemes.into_iter().map(Into::into));
        self
    }

    /// Validate and freeze the registry.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ConfigArgument`] if no defaults were given, a default has an
    ///   empty scheme, a scheme has two defaults, or an intercepted scheme has none
    /// - [`RouterError::ConfigFormat`] if a `(group, priority)` pair is missing its
    ///   source or destination, or has two of either
    pub fn build(self) -> Result<RuleRegistry, RouterError> {
        let defaults = build_defaults(&self.defaults)?;
        validate_intercepted(&defaults, &self.intercepted)?;
        let rules = pair_fragments(self.fragments)?;

        let registry = RuleRegistry { rules, defaults };
        for rule in &registry.rules {
            tracing::debug!(%rule, "loaded path mapping");
        }
        for rule in &registry.defaults {
            tracing::debug!(%rule, "loaded default mapping");
        }
        Ok(registry)
    }
}

fn build_defaults(defaults: &[DefaultMapping]) -> Result<Vec<MappingRule>, RouterError> {
    if defaults.is_empty() {
        return Err(RouterError::ConfigArgument(
            "provided default filesystems mapping is empty".into(),
        ));
    }

    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(defaults.len());
    for mapping in defaults {
        if mapping.from_scheme.is_empty() || mapping.to_scheme.is_empty() {
            return Err(RouterError::ConfigArgument(format!(
                "default mapping {:?} -> {:?} has an empty scheme",
                mapping.from_scheme, mapping.to_scheme
            )));
        }
        if !seen.insert(mapping.from_scheme.as_str()) {
            return Err(RouterError::ConfigArgument(format!(
                "duplicate default mapping for scheme {}",
                mapping.from_scheme
            )));
        }
        rules.push(MappingRule::from_default(mapping));
    }
    Ok(rules)
}

fn validate_intercepted(
    defaults: &[MappingRule],
    intercepted: &[String],
) -> Result<(), RouterError> {
    for scheme in intercepted {
        if !defaults.iter().any(|rule| rule.scheme() == scheme) {
            return Err(RouterError::ConfigArgument(format!(
                "missing default mapping configuration for scheme {scheme}"
            )));
        }
    }
    Ok(())
}

/// Pair fragments by `(group, priority)`.
///
/// The map is keyed by `(group, priority)`, so iterating it yields the rules
/// already in lookup order.
fn pair_fragments(fragments: Vec<RuleFragment>) -> Result<Vec<MappingRule>, RouterError> {
    let mut pairs: BTreeMap<(String, u32), FragmentPair> = BTreeMap::new();

    for fragment in fragments {
        let key = format!("{}.{}", fragment.group, fragment.priority);
        let pair = pairs
            .entry((fragment.group, fragment.priority))
            .or_default();
        let slot = match fragment.kind {
            RuleKind::Source => &mut pair.source,
            RuleKind::Dest => &mut pair.dest,
        };
        if slot.is_some() {
            return Err(RouterError::format(
                key,
                format!("duplicate {:?} fragment", fragment.kind),
            ));
        }
        *slot = Some(fragment.value);
    }

    let mut rules = Vec::with_capacity(pairs.len());
    for ((group, priority), pair) in pairs {
        let (source_prefix, dest_prefix) = match (pair.source, pair.dest) {
            (Some(source), Some(dest)) => (source, dest),
            (None, _) => {
                return Err(RouterError::format(
                    format!("{group}.{priority}"),
                    "mapping has no replace prefix",
                ));
            }
            (_, None) => {
                return Err(RouterError::format(
                    format!("{group}.{priority}"),
                    "mapping has no with prefix",
                ));
            }
        };
        rules.push(MappingRule {
            source_prefix,
            dest_prefix,
            group,
            priority: Some(priority),
            is_default: false,
        });
    }
    Ok(rules)
}
