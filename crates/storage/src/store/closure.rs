#![forbid(unsafe_code)]

//! Closure index over `location_closure`.
//!
//! Rows hold proper ancestry only (depth >= 1). They are derived from the parent pointers in
//! `locations` and rewritten whenever a pointer changes.

use super::StoreError;
use super::nodes::child_ids_tx;
use loc_core::location::ClosureEntry;
use rusqlite::{OptionalExtension, Transaction, params};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// Proper ancestors of `id`, nearest first.
pub(in crate::store) fn ancestors_of_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<Vec<(String, u32)>, StoreError> {
    let mut stmt = tx.prepare_cached(
        "SELECT ancestor_id, depth FROM location_closure WHERE descendant_id=?1 ORDER BY depth ASC",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Proper descendants of `id`, shallowest first.
pub(in crate::store) fn descendants_of_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<Vec<(String, u32)>, StoreError> {
    let mut stmt = tx.prepare_cached(
        "SELECT descendant_id, depth FROM location_closure WHERE ancestor_id=?1 \
         ORDER BY depth ASC, descendant_id ASC",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// True when `ancestor` is a proper ancestor of `descendant`. Never true for `a == b`.
pub(in crate::store) fn is_ancestor_tx(
    tx: &Transaction<'_>,
    ancestor: &str,
    descendant: &str,
) -> Result<bool, StoreError> {
    if ancestor == descendant {
        return Ok(false);
    }
    Ok(tx
        .query_row(
            "SELECT 1 FROM location_closure WHERE ancestor_id=?1 AND descendant_id=?2",
            params![ancestor, descendant],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

pub(in crate::store) fn has_children_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM location_closure WHERE ancestor_id=?1 AND depth=1 LIMIT 1",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

/// Replaces the ancestor rows of `id` with those implied by `parent_id`.
///
/// The parent's own rows must already be correct. Returns the number of rows written.
pub(in crate::store) fn link_node_tx(
    tx: &Transaction<'_>,
    id: &str,
    parent_id: Option<&str>,
) -> Result<usize, StoreError> {
    tx.prepare_cached("DELETE FROM location_closure WHERE descendant_id=?1")?
        .execute(params![id])?;

    let Some(parent_id) = parent_id else {
        return Ok(0);
    };

    let direct = tx
        .prepare_cached(
            "INSERT INTO location_closure(ancestor_id, descendant_id, depth) VALUES (?1, ?2, 1)",
        )?
        .execute(params![parent_id, id])?;
    let inherited = tx
        .prepare_cached(
            "INSERT INTO location_closure(ancestor_id, descendant_id, depth) \
             SELECT ancestor_id, ?2, depth + 1 FROM location_closure WHERE descendant_id=?1",
        )?
        .execute(params![parent_id, id])?;

    Ok(direct + inherited)
}

/// Recomputes closure rows for `root_id` and every transitive descendant.
///
/// Walks the subtree breadth-first over parent pointers so each node is relinked after its
/// parent. `on_relinked` runs after each node; `cancel` is checked before the next one, and a
/// cancelled rebuild returns [`StoreError::Cancelled`] so the caller's transaction is dropped.
pub(in crate::store) fn rebuild_subtree_tx(
    tx: &Transaction<'_>,
    root_id: &str,
    root_parent_id: Option<&str>,
    cancel: Option<&AtomicBool>,
    on_relinked: &mut dyn FnMut(),
) -> Result<SubtreeRebuild, StoreError> {
    let mut queue = VecDeque::from([(root_id.to_string(), root_parent_id.map(str::to_string))]);
    let mut seen = HashSet::new();
    let mut out = SubtreeRebuild::default();

    while let Some((node_id, parent_id)) = queue.pop_front() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(StoreError::Cancelled);
        }
        if !seen.insert(node_id.clone()) {
            tracing::warn!(node_id = %node_id, "parent pointer cycle found during closure rebuild");
            return Err(StoreError::CorruptHierarchy("parent pointers contain a cycle"));
        }

        out.entries += link_node_tx(tx, &node_id, parent_id.as_deref())?;
        out.nodes += 1;
        on_relinked();

        for child_id in child_ids_tx(tx, &node_id)? {
            queue.push_back((child_id, Some(node_id.clone())));
        }
    }

    Ok(out)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::store) struct SubtreeRebuild {
    pub(in crate::store) nodes: usize,
    pub(in crate::store) entries: usize,
}

/// Deletes every row where `id` is ancestor or descendant.
pub(in crate::store) fn remove_node_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<usize, StoreError> {
    Ok(tx.execute(
        "DELETE FROM location_closure WHERE ancestor_id=?1 OR descendant_id=?1",
        params![id],
    )?)
}

pub(in crate::store) fn clear_closure_tx(tx: &Transaction<'_>) -> Result<usize, StoreError> {
    Ok(tx.execute("DELETE FROM location_closure", [])?)
}

pub(in crate::store) fn closure_entries_tx(
    tx: &Transaction<'_>,
) -> Result<BTreeSet<ClosureEntry>, StoreError> {
    let mut stmt =
        tx.prepare("SELECT ancestor_id, descendant_id, depth FROM location_closure")?;
    let rows = stmt.query_map([], |row| {
        Ok(ClosureEntry {
            ancestor_id: row.get(0)?,
            descendant_id: row.get(1)?,
            depth: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<BTreeSet<_>, _>>()?)
}
