#![forbid(unsafe_code)]

//! Pure closure math over parent pointers.
//!
//! Parent pointers are the source of truth for the hierarchy; the closure rows kept by the
//! storage layer are a cache that must always equal [`derive_closure`] of those pointers.

use crate::location::ClosureEntry;
use std::collections::{BTreeMap, BTreeSet};

/// `id -> parent_id` for every node in the forest.
pub type ParentMap = BTreeMap<String, Option<String>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HierarchyFault {
    /// Following parent pointers from `id` never reaches a root.
    Cycle { id: String },
    /// `id` points at a parent that is not part of the forest.
    DanglingParent { id: String, parent_id: String },
}

impl HierarchyFault {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Cycle { .. } => "parent pointers contain a cycle",
            Self::DanglingParent { .. } => "parent pointer references a missing location",
        }
    }
}

/// Proper ancestors of `id`, nearest first, with their depth.
pub fn ancestor_path(parents: &ParentMap, id: &str) -> Result<Vec<(String, u32)>, HierarchyFault> {
    let mut out = Vec::new();
    let mut current = id;
    let mut depth = 0u32;
    while let Some(Some(parent_id)) = parents.get(current) {
        if !parents.contains_key(parent_id.as_str()) {
            return Err(HierarchyFault::DanglingParent {
                id: current.to_string(),
                parent_id: parent_id.clone(),
            });
        }
        depth = depth.saturating_add(1);
        if depth as usize > parents.len() || parent_id == id {
            return Err(HierarchyFault::Cycle { id: id.to_string() });
        }
        out.push((parent_id.clone(), depth));
        current = parent_id.as_str();
    }
    Ok(out)
}

/// Every `(ancestor, descendant, depth)` fact implied by `parents`.
pub fn derive_closure(parents: &ParentMap) -> Result<BTreeSet<ClosureEntry>, HierarchyFault> {
    let mut out = BTreeSet::new();
    for id in parents.keys() {
        for (ancestor_id, depth) in ancestor_path(parents, id)? {
            out.insert(ClosureEntry {
                ancestor_id,
                descendant_id: id.clone(),
                depth,
            });
        }
    }
    Ok(out)
}

/// Difference between an expected and a stored closure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClosureDrift {
    /// Expected rows absent from the stored closure.
    pub missing: Vec<ClosureEntry>,
    /// Stored rows that the parent pointers do not imply.
    pub stale: Vec<ClosureEntry>,
}

impl ClosureDrift {
    pub fn between(expected: &BTreeSet<ClosureEntry>, stored: &BTreeSet<ClosureEntry>) -> Self {
        Self {
            missing: expected.difference(stored).cloned().collect(),
            stale: stored.difference(expected).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}
