#![forbid(unsafe_code)]

use super::closure::{ancestors_of_tx, descendants_of_tx, is_ancestor_tx};
use super::nodes::{
    LOCATION_COLUMNS, all_locations_tx, children_tx, location_exists_tx, location_from_row,
    location_get_tx, require_location_tx,
};
use super::{SqliteStore, StoreError, canonicalize_id};
use loc_core::location::{
    DescendantRow, Location, LocationDetail, LocationTree, assemble_forest, assemble_trees,
};
use rusqlite::{Transaction, params};

impl SqliteStore {
    pub fn location_get(&self, id: &str) -> Result<LocationDetail, StoreError> {
        let id = canonicalize_id(id)?;
        let tx = self.read_tx()?;
        let location = require_location_tx(&tx, &id, || StoreError::NodeNotFound)?;
        let parent = match location.parent_id.as_deref() {
            Some(parent_id) => location_get_tx(&tx, parent_id)?,
            None => None,
        };
        let children = children_tx(&tx, &id)?;
        Ok(LocationDetail {
            location,
            parent,
            children,
        })
    }

    /// Every root with its nested children.
    pub fn forest(&self) -> Result<Vec<LocationTree>, StoreError> {
        let tx = self.read_tx()?;
        Ok(assemble_forest(all_locations_tx(&tx)?))
    }

    pub fn subtree(&self, root_id: &str) -> Result<LocationTree, StoreError> {
        let root_id = canonicalize_id(root_id)?;
        let tx = self.read_tx()?;
        let root = require_location_tx(&tx, &root_id, || StoreError::NodeNotFound)?;
        let members = descendant_rows_tx(&tx, &root_id)?
            .into_iter()
            .map(|row| row.location)
            .collect();
        assemble_trees(vec![root], members)
            .into_iter()
            .next()
            .ok_or(StoreError::NodeNotFound)
    }

    /// Ancestors of `id` from the immediate parent up to the forest root.
    pub fn ancestor_chain(&self, id: &str) -> Result<Vec<Location>, StoreError> {
        let id = canonicalize_id(id)?;
        let tx = self.read_tx()?;
        require_exists_tx(&tx, &id)?;
        let mut stmt = tx.prepare(&format!(
            "SELECT {LOCATION_COLUMNS} FROM location_closure c \
             JOIN locations l ON l.id = c.ancestor_id \
             WHERE c.descendant_id=?1 ORDER BY c.depth ASC"
        ))?;
        let rows = stmt.query_map(params![id], location_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Flat descendant listing, shallowest first.
    pub fn descendants(&self, id: &str) -> Result<Vec<DescendantRow>, StoreError> {
        let id = canonicalize_id(id)?;
        let tx = self.read_tx()?;
        require_exists_tx(&tx, &id)?;
        descendant_rows_tx(&tx, &id)
    }

    /// Closure view: proper ancestors of `id` with depth, nearest first.
    pub fn ancestors_of(&self, id: &str) -> Result<Vec<(String, u32)>, StoreError> {
        let id = canonicalize_id(id)?;
        let tx = self.read_tx()?;
        require_exists_tx(&tx, &id)?;
        ancestors_of_tx(&tx, &id)
    }

    /// Closure view: proper descendants of `id` with depth.
    pub fn descendants_of(&self, id: &str) -> Result<Vec<(String, u32)>, StoreError> {
        let id = canonicalize_id(id)?;
        let tx = self.read_tx()?;
        require_exists_tx(&tx, &id)?;
        descendants_of_tx(&tx, &id)
    }

    /// Fails `NodeNotFound` when either location is missing; `is_ancestor(n, n)` is false.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, StoreError> {
        let ancestor = canonicalize_id(ancestor)?;
        let descendant = canonicalize_id(descendant)?;
        let tx = self.read_tx()?;
        require_exists_tx(&tx, &ancestor)?;
        require_exists_tx(&tx, &descendant)?;
        is_ancestor_tx(&tx, &ancestor, &descendant)
    }
}

fn require_exists_tx(tx: &Transaction<'_>, id: &str) -> Result<(), StoreError> {
    if location_exists_tx(tx, id)? {
        Ok(())
    } else {
        Err(StoreError::NodeNotFound)
    }
}

fn descendant_rows_tx(tx: &Transaction<'_>, id: &str) -> Result<Vec<DescendantRow>, StoreError> {
    let mut stmt = tx.prepare(&format!(
        "SELECT {LOCATION_COLUMNS}, c.depth FROM location_closure c \
         JOIN locations l ON l.id = c.descendant_id \
         WHERE c.ancestor_id=?1 ORDER BY c.depth ASC, l.number ASC, l.id ASC"
    ))?;
    let rows = stmt.query_map(params![id], |row| {
        Ok(DescendantRow {
            location: location_from_row(row)?,
            depth: row.get(8)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
