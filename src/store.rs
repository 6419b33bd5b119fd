//! # Backing Store Boundary
//!
//! The trait every backing store client implements, and the scheme lookup the
//! router uses to pick one.
//!
//! Stores receive paths that have already been rewritten, so a store only ever
//! sees its own namespace. Paths are full URI strings (`lakefs://repo/main/a`).

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::{FileStatus, RouterError};

/// Operations the router forwards to a backing store.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self`; stores manage
/// their own synchronization.
///
/// # Object Safety
///
/// This trait is object-safe and is held as `Arc<dyn Store>`.
pub trait Store: Send + Sync {
    /// Open a file for reading.
    ///
    /// # Errors
    ///
    /// - [`RouterError::NotFound`] if the path does not exist
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, RouterError>;

    /// Create a file and open it for writing.
    ///
    /// # Errors
    ///
    /// - [`RouterError::AlreadyExists`] if the file exists and `overwrite` is false
    fn create(&self, path: &str, overwrite: bool) -> Result<Box<dyn Write + Send>, RouterError>;

    /// Open an existing file for appending.
    ///
    /// # Errors
    ///
    /// - [`RouterError::NotFound`] if the path does not exist
    fn append(&self, path: &str) -> Result<Box<dyn Write + Send>, RouterError>;

    /// Rename `from` to `to` within this store. Returns `false` if nothing was renamed.
    fn rename(&self, from: &str, to: &str) -> Result<bool, RouterError>;

    /// Delete a file, or a directory when `recursive` is set. Returns `false` if
    /// nothing was deleted.
    fn delete(&self, path: &str, recursive: bool) -> Result<bool, RouterError>;

    /// List the entries of a directory, or the file itself for a file path.
    ///
    /// # Errors
    ///
    /// - [`RouterError::NotFound`] if the path does not exist
    fn list_status(&self, path: &str) -> Result<Vec<FileStatus>, RouterError>;

    /// Create a directory and all missing parents.
    fn mkdirs(&self, path: &str) -> Result<bool, RouterError>;

    /// Status of a single path.
    ///
    /// # Errors
    ///
    /// - [`RouterError::NotFound`] if the path does not exist
    fn file_status(&self, path: &str) -> Result<FileStatus, RouterError>;
}

/// Backing stores keyed by the scheme they serve.
#[derive(Clone, Default)]
pub struct StoreSet {
    stores: HashMap<String, Arc<dyn Store>>,
}

impl StoreSet {
    /// Empty store set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` for `scheme`, replacing any previous registration.
    pub fn register(&mut self, scheme: impl Into<String>, store: Arc<dyn Store>) -> &mut Self {
        self.stores.insert(scheme.into(), store);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, scheme: impl Into<String>, store: Arc<dyn Store>) -> Self {
        self.register(scheme, store);
        self
    }

    /// Store serving `scheme`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::NoStore`] if nothing is registered for `scheme`
    pub fn get(&self, scheme: &str) -> Result<&Arc<dyn Store>, RouterError> {
        self.get_key_value(scheme).map(|(_, store)| store)
    }

    /// Like [`get`](Self::get), also returning the registered scheme.
    ///
    /// # Errors
    ///
    /// - [`RouterError::NoStore`] if nothing is registered for `scheme`
    pub fn get_key_value(&self, scheme: &str) -> Result<(&str, &Arc<dyn Store>), RouterError> {
        self.stores
            .get_key_value(scheme)
            .map(|(key, store)| (key.as_str(), store))
            .ok_or_else(|| RouterError::NoStore {
                scheme: scheme.to_string(),
            })
    }

    /// Returns `true` if a store is registered for `scheme`.
    pub fn contains(&self, scheme: &str) -> bool {
        self.stores.contains_key(scheme)
    }
}

impl fmt::Debug for StoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<_> = self.stores.keys().collect();
        schemes.sort();
        f.debug_struct("StoreSet").field("schemes", &schemes).finish()
    }
}
