#![forbid(unsafe_code)]

use super::LocationAttributes;

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub id: String,
    pub parent_id: Option<String>,
    pub attributes: LocationAttributes,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Location {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A location with its direct neighbours in the hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationDetail {
    pub location: Location,
    pub parent: Option<Location>,
    pub children: Vec<Location>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DescendantRow {
    pub location: Location,
    pub depth: u32,
}

/// Materialized `(ancestor, descendant, depth)` fact. Depth is always >= 1.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClosureEntry {
    pub ancestor_id: String,
    pub descendant_id: String,
    pub depth: u32,
}

/// Requested parent for an update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ParentChange {
    #[default]
    Keep,
    Detach,
    Set(String),
}

impl ParentChange {
    pub fn from_optional(parent_id: Option<String>) -> Self {
        match parent_id {
            Some(id) => Self::Set(id),
            None => Self::Detach,
        }
    }
}
