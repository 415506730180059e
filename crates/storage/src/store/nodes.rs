#![forbid(unsafe_code)]

//! Node records: `get` / `put` / `delete` over the `locations` table.
//!
//! Nothing here touches closure rows; the engine composes these helpers with the closure
//! index inside one transaction.

use super::{StoreError, map_write_conflict};
use loc_core::closure::ParentMap;
use loc_core::location::{Location, LocationAttributes};
use rusqlite::{OptionalExtension, Row, Transaction, params};

pub(in crate::store) const LOCATION_COLUMNS: &str =
    "l.id, l.parent_id, l.building, l.name, l.number, l.area, l.created_at_ms, l.updated_at_ms";

pub(in crate::store) fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        attributes: LocationAttributes {
            building: row.get(2)?,
            name: row.get(3)?,
            number: row.get(4)?,
            area: row.get(5)?,
        },
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

pub(in crate::store) fn location_get_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<Option<Location>, StoreError> {
    Ok(tx
        .query_row(
            &format!("SELECT {LOCATION_COLUMNS} FROM locations l WHERE l.id=?1"),
            params![id],
            location_from_row,
        )
        .optional()?)
}

/// Fetches `id`, failing with `missing` when it does not exist.
pub(in crate::store) fn require_location_tx(
    tx: &Transaction<'_>,
    id: &str,
    missing: fn() -> StoreError,
) -> Result<Location, StoreError> {
    location_get_tx(tx, id)?.ok_or_else(missing)
}

pub(in crate::store) fn location_exists_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM locations WHERE id=?1",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

pub(in crate::store) fn location_insert_tx(
    tx: &Transaction<'_>,
    location: &Location,
) -> Result<(), StoreError> {
    let insert = tx.execute(
        "INSERT INTO locations(id, parent_id, building, name, number, area, created_at_ms, updated_at_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            location.id,
            location.parent_id,
            location.attributes.building,
            location.attributes.name,
            location.attributes.number,
            location.attributes.area,
            location.created_at_ms,
            location.updated_at_ms,
        ],
    );

    if let Err(err) = insert {
        return Err(map_write_conflict(err));
    }
    Ok(())
}

pub(in crate::store) fn location_update_tx(
    tx: &Transaction<'_>,
    location: &Location,
) -> Result<(), StoreError> {
    let updated = tx
        .execute(
            "UPDATE locations \
             SET parent_id=?2, building=?3, name=?4, number=?5, area=?6, updated_at_ms=?7 \
             WHERE id=?1",
            params![
                location.id,
                location.parent_id,
                location.attributes.building,
                location.attributes.name,
                location.attributes.number,
                location.attributes.area,
                location.updated_at_ms,
            ],
        )
        .map_err(map_write_conflict)?;

    if updated == 0 {
        return Err(StoreError::NodeNotFound);
    }
    Ok(())
}

pub(in crate::store) fn location_delete_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<(), StoreError> {
    let deleted = tx.execute("DELETE FROM locations WHERE id=?1", params![id])?;
    if deleted == 0 {
        return Err(StoreError::NodeNotFound);
    }
    Ok(())
}

pub(in crate::store) fn child_ids_tx(
    tx: &Transaction<'_>,
    parent_id: &str,
) -> Result<Vec<String>, StoreError> {
    let mut stmt =
        tx.prepare_cached("SELECT id FROM locations WHERE parent_id=?1 ORDER BY number, id")?;
    let mut rows = stmt.query(params![parent_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get::<_, String>(0)?);
    }
    Ok(out)
}

pub(in crate::store) fn children_tx(
    tx: &Transaction<'_>,
    parent_id: &str,
) -> Result<Vec<Location>, StoreError> {
    let mut stmt = tx.prepare_cached(&format!(
        "SELECT {LOCATION_COLUMNS} FROM locations l WHERE l.parent_id=?1 ORDER BY l.number, l.id"
    ))?;
    let rows = stmt.query_map(params![parent_id], location_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(in crate::store) fn root_ids_tx(tx: &Transaction<'_>) -> Result<Vec<String>, StoreError> {
    let mut stmt =
        tx.prepare("SELECT id FROM locations WHERE parent_id IS NULL ORDER BY number, id")?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get::<_, String>(0)?);
    }
    Ok(out)
}

pub(in crate::store) fn all_locations_tx(
    tx: &Transaction<'_>,
) -> Result<Vec<Location>, StoreError> {
    let mut stmt = tx.prepare(&format!(
        "SELECT {LOCATION_COLUMNS} FROM locations l ORDER BY l.number, l.id"
    ))?;
    let rows = stmt.query_map([], location_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(in crate::store) fn parent_pointers_tx(tx: &Transaction<'_>) -> Result<ParentMap, StoreError> {
    let mut stmt = tx.prepare("SELECT id, parent_id FROM locations")?;
    let mut rows = stmt.query([])?;
    let mut out = ParentMap::new();
    while let Some(row) = rows.next()? {
        out.insert(row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?);
    }
    Ok(out)
}

pub(in crate::store) fn location_count_tx(tx: &Transaction<'_>) -> Result<usize, StoreError> {
    let count = tx.query_row("SELECT COUNT(1) FROM locations", [], |row| row.get::<_, i64>(0))?;
    usize::try_from(count).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}
