use std::fmt;
use std::sync::Arc;

/// A capability label as known by the tag catalog.
///
/// Cheap to clone; the name is shared.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    name: Arc<str>,
    forbidden: bool,
}

impl Tag {
    /// Creates a tag with an explicit `forbidden` attribute.
    pub fn new(name: impl Into<Arc<str>>, forbidden: bool) -> Self {
        Self {
            name: name.into(),
            forbidden,
        }
    }

    /// Shorthand for a tag marked forbidden.
    pub fn forbidden(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, true)
    }

    /// Tag name (also used as display name in causes).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if the catalog marks this tag forbidden.
    pub fn is_forbidden(&self) -> bool {
        self.forbidden
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
