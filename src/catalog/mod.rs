//! # Tag catalog collaborator.
//!
//! The catalog maps a tag name to its `forbidden` attribute. The engine only
//! ever reads it; definitions are loaded and persisted elsewhere.
//!
//! ## Contract
//! - `Ok(Some(tag))`: the tag is defined; `tag.is_forbidden()` says whether it is forbidden
//! - `Ok(None)`: the tag is not defined (treated as not forbidden)
//! - `Err(LookupError)`: the catalog could not answer (treated as not forbidden, logged)
//!
//! Lookups must be cheap and non-blocking: they run inside evaluation, which may
//! be on the pre-admission path. Implementations must support concurrent reads
//! while an administrator edits definitions.

mod memory;

pub use memory::MemoryCatalog;

use crate::error::LookupError;
use crate::model::Tag;

/// Read-only view of tag definitions.
pub trait TagCatalog: Send + Sync + 'static {
    /// Looks up a tag by name.
    fn lookup(&self, name: &str) -> Result<Option<Tag>, LookupError>;
}
