//! In-memory [`TagCatalog`] backed by a read-mostly map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use super::TagCatalog;
use crate::error::LookupError;
use crate::model::Tag;

/// Tag catalog held in memory.
///
/// Edits take a short write lock; lookups take a read lock and never wait on
/// evaluation. An availability switch lets callers simulate a backend outage.
pub struct MemoryCatalog {
    tags: RwLock<HashMap<String, bool>>,
    available: AtomicBool,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tags: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Builder-style helper: defines every given tag as forbidden.
    #[must_use]
    pub fn with_forbidden<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.set_forbidden(name, true);
        }
        self
    }

    /// Defines (or redefines) a tag with the given `forbidden` attribute.
    pub fn set_forbidden(&self, name: impl Into<String>, forbidden: bool) {
        self.tags
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), forbidden);
    }

    /// Removes a tag definition. Returns true if it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.tags
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Sorted names of all forbidden tags.
    #[must_use]
    pub fn forbidden_tags(&self) -> Vec<String> {
        let tags = self.tags.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = tags
            .iter()
            .filter(|(_, forbidden)| **forbidden)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Switches the catalog into (or out of) a failing state.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TagCatalog for MemoryCatalog {
    fn lookup(&self, name: &str) -> Result<Option<Tag>, LookupError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(LookupError::unavailable(name, "catalog offline"));
        }
        let tags = self.tags.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tags.get(name).map(|forbidden| Tag::new(name, *forbidden)))
    }
}
