//! # Router Filesystem
//!
//! Forwards filesystem operations to whichever backing store a path resolves to.
//!
//! ```text
//! caller path ──▶ qualify (working dir) ──▶ resolve ──▶ StoreSet[target scheme]
//!                                                            │
//! caller-visible results ◀── reverse prefixes ◀── store results
//! ```
//!
//! ## Known Limitation
//!
//! `delete(path, true)` is forwarded to the single store owning `path`. If a nested
//! prefix under `path` is mapped to another store, that subtree is not visited.

use std::io::{Read, Write};
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::{URI_SCHEME_SEPARATOR, scheme_of};
use crate::{
    FileStatus, PathResolver, ResolvedPath, RouterConfig, RouterError, Store, StoreSet,
};

/// A filesystem that rewrites every path and delegates to backing stores.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use std::io::{Cursor, Read, Write};
/// use std::sync::{Arc, Mutex};
///
/// use routerfs::{FileStatus, RouterConfig, RouterError, RouterFs, Store, StoreSet};
///
/// // A flat map of path to shared buffer: writers land their bytes immediately.
/// type Buf = Arc<Mutex<Vec<u8>>>;
///
/// #[derive(Default)]
/// struct MemStore(Mutex<BTreeMap<String, Buf>>);
///
/// struct MemWriter(Buf);
///
/// impl Write for MemWriter {
///     fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
///         self.0.lock().unwrap().extend_from_slice(data);
///         Ok(data.len())
///     }
///     fn flush(&mut self) -> std::io::Result<()> {
///         Ok(())
///     }
/// }
///
/// impl MemStore {
///     fn get(&self, path: &str) -> Result<Buf, RouterError> {
///         let files = self.0.lock().unwrap();
///         files
///             .get(path)
///             .cloned()
///             .ok_or_else(|| RouterError::NotFound { path: path.into() })
///     }
/// }
///
/// impl Store for MemStore {
///     fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, RouterError> {
///         let data = self.get(path)?.lock().unwrap().clone();
///         Ok(Box::new(Cursor::new(data)))
///     }
///     fn create(
///         &self,
///         path: &str,
///         overwrite: bool,
///     ) -> Result<Box<dyn Write + Send>, RouterError> {
///         let mut files = self.0.lock().unwrap();
///         if files.contains_key(path) && !overwrite {
///             let path = path.to_string();
///             return Err(RouterError::AlreadyExists { path, operation: "create" });
///         }
///         let buf = Buf::default();
///         files.insert(path.to_string(), Arc::clone(&buf));
///         Ok(Box::new(MemWriter(buf)))
///     }
///     fn append(&self, path: &str) -> Result<Box<dyn Write + Send>, RouterError> {
///         Ok(Box::new(MemWriter(self.get(path)?)))
///     }
///     fn rename(&self, from: &str, to: &str) -> Result<bool, RouterError> {
///         let mut files = self.0.lock().unwrap();
///         let Some(buf) = files.remove(from) else {
///             return Ok(false);
///         };
///         files.insert(to.to_string(), buf);
///         Ok(true)
///     }
///     fn delete(&self, path: &str, recursive: bool) -> Result<bool, RouterError> {
///         let mut files = self.0.lock().unwrap();
///         let before = files.len();
///         files.retain(|key, _| key != path && !(recursive && key.starts_with(path)));
///         Ok(files.len() < before)
///     }
///     fn list_status(&self, path: &str) -> Result<Vec<FileStatus>, RouterError> {
///         let files = self.0.lock().unwrap();
///         Ok(files
///             .iter()
///             .filter(|(key, _)| key.starts_with(path))
///             .map(|(key, buf)| {
///                 let size = buf.lock().unwrap().len() as u64;
///                 FileStatus::file(key.clone(), size)
///             })
///             .collect())
///     }
///     fn mkdirs(&self, _: &str) -> Result<bool, RouterError> {
///         Ok(true)
///     }
///     fn file_status(&self, path: &str) -> Result<FileStatus, RouterError> {
///         let size = self.get(path)?.lock().unwrap().len() as u64;
///         Ok(FileStatus::file(path, size))
///     }
/// }
///
/// let config = RouterConfig::from_pairs([
///     ("fs.s3a.impl", "routerfs"),
///     ("routerfs.default.fs.s3a", "S3AFileSystem"),
///     ("routerfs.mapping.s3a.1.replace", "s3a://bucket/tables/"),
///     ("routerfs.mapping.s3a.1.with", "lakefs://repo/main/tables/"),
/// ]);
/// let lakefs = Arc::new(MemStore::default());
/// let fallback = Arc::new(MemStore::default());
/// let stores = StoreSet::new()
///     .with("lakefs", lakefs.clone())
///     .with("s3a-default", fallback.clone());
/// let fs = RouterFs::from_config(&config, stores, "s3a://bucket/")?;
///
/// fs.create("s3a://bucket/tables/t1/part-0", false)?.write_all(b"rows")?;
///
/// // The bytes live in the lakefs store, under the rewritten path...
/// assert!(lakefs.file_status("lakefs://repo/main/tables/t1/part-0").is_ok());
///
/// // ...but listings come back in the caller's namespace.
/// let listed: Vec<String> = fs
///     .list_status("s3a://bucket/tables/")?
///     .into_iter()
///     .map(|status| status.path)
///     .collect();
/// assert_eq!(listed, ["s3a://bucket/tables/t1/part-0"]);
///
/// let mut contents = String::new();
/// fs.open("s3a://bucket/tables/t1/part-0")?.read_to_string(&mut contents)?;
/// assert_eq!(contents, "rows");
///
/// // Unmapped paths, relative ones included, fall through to the default store.
/// fs.create("logs/run.log", false)?.write_all(b"ok")?;
/// assert!(fallback.file_status("s3a-default://bucket/logs/run.log").is_ok());
///
/// // Renames never cross stores.
/// assert!(!fs.rename("s3a://bucket/tables/t1/part-0", "s3a://bucket/logs/p")?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RouterFs {
    resolver: Arc<dyn PathResolver>,
    stores: StoreSet,
    working_dir: RwLock<String>,
}

struct Routed<'a> {
    store: &'a Arc<dyn Store>,
    scheme: &'a str,
    resolved: ResolvedPath,
}

impl RouterFs {
    /// Create a router over an already-built resolver.
    pub fn new(
        resolver: Arc<dyn PathResolver>,
        stores: StoreSet,
        working_dir: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            stores,
            working_dir: RwLock::new(working_dir.into()),
        }
    }

    /// Build the rule registry from `config` and create a router over it.
    ///
    /// # Errors
    ///
    /// Any construction error from [`RouterConfig::build_registry`].
    pub fn from_config(
        config: &RouterConfig,
        stores: StoreSet,
        working_dir: impl Into<String>,
    ) -> Result<Self, RouterError> {
        let registry = config.build_registry()?;
        Ok(Self::new(Arc::new(registry), stores, working_dir))
    }

    /// The current working directory, in the caller's namespace.
    pub fn working_directory(&self) -> String {
        self.working_dir
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the working directory used to qualify scheme-less paths.
    ///
    /// # Errors
    ///
    /// - [`RouterError::PathUnresolved`] if the directory itself does not resolve
    pub fn set_working_directory(&self, path: &str) -> Result<(), RouterError> {
        let qualified = self.qualify(path);
        let resolved = self.resolver.resolve(&qualified)?;
        tracing::trace!(
            path = %qualified,
            target = %resolved.target_path,
            "setWorkingDirectory"
        );
        *self
            .working_dir
            .write()
            .unwrap_or_else(PoisonError::into_inner) = qualified;
        Ok(())
    }

    /// Open a file for reading.
    pub fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, RouterError> {
        let routed = self.route("open", path)?;
        routed.store.open(&routed.resolved.target_path)
    }

    /// Create a file for writing.
    pub fn create(
        &self,
        path: &str,
        overwrite: bool,
    ) -> Result<Box<dyn Write + Send>, RouterError> {
        let routed = self.route("create", path)?;
        routed.store.create(&routed.resolved.target_path, overwrite)
    }

    /// Open a file for appending.
    pub fn append(&self, path: &str) -> Result<Box<dyn Write + Send>, RouterError> {
        let routed = self.route("append", path)?;
        routed.store.append(&routed.resolved.target_path)
    }

    /// Rename within one backing store.
    ///
    /// Returns `Ok(false)` without touching either store when `from` and `to`
    /// resolve to different stores.
    pub fn rename(&self, from: &str, to: &str) -> Result<bool, RouterError> {
        let src = self.route("rename", from)?;
        let dst = self.route("rename", to)?;
        if src.scheme != dst.scheme {
            tracing::warn!(
                from,
                to,
                src_store = src.scheme,
                dst_store = dst.scheme,
                "cannot rename between different backing stores"
            );
            return Ok(false);
        }
        src.store
            .rename(&src.resolved.target_path, &dst.resolved.target_path)
    }

    /// Delete a path.
    pub fn delete(&self, path: &str, recursive: bool) -> Result<bool, RouterError> {
        let routed = self.route("delete", path)?;
        routed.store.delete(&routed.resolved.target_path, recursive)
    }

    /// List a directory. Returned paths are in the caller's namespace.
    ///
    /// # Errors
    ///
    /// - [`RouterError::InvalidPath`] if the store returns a path outside the
    ///   mapped destination prefix
    pub fn list_status(&self, path: &str) -> Result<Vec<FileStatus>, RouterError> {
        let routed = self.route("listStatus", path)?;
        let statuses = routed.store.list_status(&routed.resolved.target_path)?;
        tracing::trace!(count = statuses.len(), "listStatus: retrieved file statuses");
        statuses
            .into_iter()
            .map(|status| reverse_status(status, &routed.resolved))
            .collect()
    }

    /// Create a directory and its parents.
    pub fn mkdirs(&self, path: &str) -> Result<bool, RouterError> {
        let routed = self.route("mkdirs", path)?;
        routed.store.mkdirs(&routed.resolved.target_path)
    }

    /// Status of a path, in the caller's namespace.
    ///
    /// # Errors
    ///
    /// - [`RouterError::InvalidPath`] if the store reports a path outside the
    ///   mapped destination prefix
    pub fn file_status(&self, path: &str) -> Result<FileStatus, RouterError> {
        let routed = self.route("getFileStatus", path)?;
        let status = routed.store.file_status(&routed.resolved.target_path)?;
        reverse_status(status, &routed.resolved)
    }

    fn route(&self, operation: &'static str, path: &str) -> Result<Routed<'_>, RouterError> {
        let qualified = self.qualify(path);
        let resolved = self.resolver.resolve(&qualified)?;
        tracing::trace!(
            operation,
            path = %qualified,
            target = %resolved.target_path,
            "path converted"
        );

        let scheme = resolved.target_scheme().ok_or_else(|| {
            RouterError::Backend(format!(
                "resolved path {} has no scheme",
                resolved.target_path
            ))
        })?;
        let (scheme, store) = self.stores.get_key_value(scheme)?;
        Ok(Routed {
            store,
            scheme,
            resolved,
        })
    }

    // Scheme-less paths are taken relative to the working directory; `/x` keeps only
    // the working directory's `scheme://authority`.
    fn qualify(&self, path: &str) -> String {
        if has_scheme(path) {
            return path.to_string();
        }
        let wd = self.working_directory();
        if path.starts_with('/') {
            let authority_start = wd
                .find(URI_SCHEME_SEPARATOR)
                .map_or(0, |idx| idx + URI_SCHEME_SEPARATOR.len());
            let root_end = wd[authority_start..]
                .find('/')
                .map_or(wd.len(), |idx| authority_start + idx);
            format!("{}{path}", &wd[..root_end])
        } else {
            format!("{}/{path}", wd.trim_end_matches('/'))
        }
    }
}

impl std::fmt::Debug for RouterFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterFs")
            .field("stores", &self.stores)
            .field("working_dir", &self.working_directory())
            .finish_non_exhaustive()
    }
}

fn has_scheme(path: &str) -> bool {
    scheme_of(path).is_some_and(|scheme| !scheme.is_empty() && !scheme.contains('/'))
}

fn reverse_status(
    mut status: FileStatus,
    resolved: &ResolvedPath,
) -> Result<FileStatus, RouterError> {
    status.path = resolved.reverse(&status.path)?;
    Ok(status)
}
