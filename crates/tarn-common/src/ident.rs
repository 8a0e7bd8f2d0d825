use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::span::SourceRange;

/// A name appearing in source, with the range it was written at.
///
/// Two identifiers compare equal when their names are equal; the range is
/// metadata for diagnostics and never participates in equality, hashing,
/// or ordering. AST nodes themselves have no structural equality -- when a
/// pass needs to ask "is this the same declaration", it compares arena
/// handles, not nodes.
#[derive(Debug, Clone, Serialize)]
pub struct Identifier {
    pub name: String,
    pub range: Option<SourceRange>,
}

impl Identifier {
    /// An identifier with no source range (synthesized names, builtins).
    pub fn new(name: impl Into<String>) -> Self {
        Identifier { name: name.into(), range: None }
    }

    /// An identifier carrying the range it was written at.
    pub fn with_range(name: impl Into<String>, range: SourceRange) -> Self {
        Identifier { name: name.into(), range: Some(range) }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name // range intentionally excluded
    }
}

impl Eq for Identifier {}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state); // range intentionally excluded
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}
