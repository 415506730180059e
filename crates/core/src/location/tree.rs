#![forbid(unsafe_code)]

use super::Location;
use std::collections::HashMap;

/// A location with its nested children.
///
/// Hierarchies can be arbitrarily deep, so every walk over a tree (including drop) uses an
/// explicit stack instead of recursion.
#[derive(Debug)]
pub struct LocationTree {
    pub location: Location,
    pub children: Vec<LocationTree>,
}

impl Drop for LocationTree {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl LocationTree {
    pub fn id(&self) -> &str {
        &self.location.id
    }

    /// Number of locations in this tree, root included.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Pre-order ids, root first.
    pub fn flatten_ids(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.size());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.location.id.clone());
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn find(&self, id: &str) -> Option<&LocationTree> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.location.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }
}

/// Orders siblings by location number, then id.
pub fn sibling_order(a: &Location, b: &Location) -> std::cmp::Ordering {
    a.attributes
        .number
        .cmp(&b.attributes.number)
        .then_with(|| a.id.cmp(&b.id))
}

/// Nests `members` under `roots` following parent pointers.
///
/// Members whose parent is neither a root nor another member are dropped. Each member is
/// attached at most once, so malformed input cannot recurse forever.
pub fn assemble_trees(mut roots: Vec<Location>, members: Vec<Location>) -> Vec<LocationTree> {
    let mut by_parent: HashMap<String, Vec<Location>> = HashMap::new();
    for member in members {
        if let Some(parent_id) = member.parent_id.clone() {
            by_parent.entry(parent_id).or_default().push(member);
        }
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(sibling_order);
    }

    roots.sort_by(sibling_order);
    roots
        .into_iter()
        .filter_map(|root| build_tree(root, &mut by_parent))
        .collect()
}

/// Builds the whole forest from an unordered set of locations.
pub fn assemble_forest(locations: Vec<Location>) -> Vec<LocationTree> {
    let (roots, members): (Vec<_>, Vec<_>) =
        locations.into_iter().partition(Location::is_root);
    assemble_trees(roots, members)
}

struct Frame {
    location: Location,
    pending: std::vec::IntoIter<Location>,
    built: Vec<LocationTree>,
}

impl Frame {
    fn open(location: Location, by_parent: &mut HashMap<String, Vec<Location>>) -> Self {
        let pending = by_parent.remove(&location.id).unwrap_or_default();
        Self {
            built: Vec::with_capacity(pending.len()),
            pending: pending.into_iter(),
            location,
        }
    }
}

/// Post-order build: a node is closed once all of its children are built.
/// Returns `None` only if the stack unwinds without closing the root, which cannot happen.
fn build_tree(
    root: Location,
    by_parent: &mut HashMap<String, Vec<Location>>,
) -> Option<LocationTree> {
    let mut stack = vec![Frame::open(root, by_parent)];
    while let Some(frame) = stack.last_mut() {
        if let Some(child) = frame.pending.next() {
            let next = Frame::open(child, by_parent);
            stack.push(next);
            continue;
        }

        let done = stack.pop()?;
        let tree = LocationTree {
            location: done.location,
            children: done.built,
        };
        match stack.last_mut() {
            Some(parent) => parent.built.push(tree),
            None => return Some(tree),
        }
    }
    None
}
