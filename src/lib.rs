//! # routerfs
//!
//! A **path-translation router** for storage URIs.
//!
//! Jobs keep addressing one logical scheme (`s3a://bucket/...`). The router
//! rewrites each path with operator-supplied prefix rules, hands the rewritten
//! path to the backing store that owns it, and rewrites any paths the store
//! returns back into the caller's namespace. Anything no rule covers falls
//! through to a per-scheme default store.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use routerfs::{PathResolver, RouterConfig};
//!
//! let config = RouterConfig::from_pairs([
//!     ("fs.s3a.impl", "routerfs"),
//!     ("routerfs.default.fs.s3a", "S3AFileSystem"),
//!     ("routerfs.mapping.s3a.1.replace", "s3a://bucket/"),
//!     ("routerfs.mapping.s3a.1.with", "lakefs://example-repo/b1/"),
//!     ("routerfs.mapping.s3a.2.replace", "s3a://bucket/foo/"),
//!     ("routerfs.mapping.s3a.2.with", "lakefs://example-repo/b2/"),
//! ]);
//! let registry = config.build_registry()?;
//!
//! // Priority 1 is scanned first, so it wins over the longer prefix.
//! let resolved = registry.resolve("s3a://bucket/foo/a.txt")?;
//! assert_eq!(resolved.target_path, "lakefs://example-repo/b1/foo/a.txt");
//!
//! // Paths coming back from the store are mapped home again.
//! assert_eq!(
//!     resolved.reverse("lakefs://example-repo/b1/foo/b.txt")?,
//!     "s3a://bucket/foo/b.txt"
//! );
//! # Ok::<(), routerfs::RouterError>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`RuleParser`] | Raw configuration keys → [`RuleFragment`]s |
//! | [`RuleRegistry`] | Paired, validated, ordered [`MappingRule`]s |
//! | [`PathResolver`] | Path → [`ResolvedPath`] |
//! | [`reverse`] | Store result path → caller path |
//! | [`RouterConfig`] | Key/value configuration and derived defaults |
//! | [`Store`] | Backing store boundary |
//! | [`RouterFs`] | Forwards operations to stores |
//! | [`RouterError`] | Error type with context |
//!
//! ---
//!
//! ## Rule Ordering
//!
//! Explicit rules are sorted by group name, then priority, into one flat list.
//! The first rule whose source prefix starts the path wins, regardless of group.
//! Default rules are consulted only when no explicit rule matches.
//!
//! ---
//!
//! ## Thread Safety
//!
//! [`RuleRegistry`] is immutable after construction. Wrap it in `Arc` and resolve
//! from as many threads as needed; resolution takes no locks.
//!
//! ---
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` for loaded rules, `trace` for each
//! path conversion, `warn` for refused cross-store renames. Install a subscriber
//! in the host to see them.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for the data types, and [`RouterConfig::from_json_str`] |

// Private modules
mod config;
mod error;
mod parser;
mod registry;
mod resolver;
mod reverse;
mod router;
mod store;
mod types;

// Public re-exports - error types
pub use error::RouterError;

// Public re-exports - core types
pub use types::{
    DefaultMapping, FileStatus, FileType, MappingRule, ResolvedPath, RuleFragment, RuleKind,
    URI_SCHEME_SEPARATOR, scheme_of,
};

// Public re-exports - resolution engine
pub use parser::{DEFAULT_NAMESPACE, RuleParser};
pub use registry::{RegistryBuilder, RuleRegistry};
pub use resolver::{PathResolver, resolve};
pub use reverse::reverse;

// Public re-exports - configuration
pub use config::{DEFAULT_IMPL_NAME, DEFAULT_SCHEME_SUFFIX, DefaultStore, RouterConfig};

// Public re-exports - store boundary
pub use router::RouterFs;
pub use store::{Store, StoreSet};
