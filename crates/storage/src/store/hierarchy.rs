#![forbid(unsafe_code)]

use super::closure::{has_children_tx, is_ancestor_tx, link_node_tx, rebuild_subtree_tx, remove_node_tx};
use super::nodes::{
    location_delete_tx, location_exists_tx, location_insert_tx, location_update_tx,
    require_location_tx,
};
use super::{
    CreateLocationRequest, DeleteLocationRequest, MoveLocationRequest, SqliteStore, StoreError,
    UpdateLocationRequest, canonicalize_id, now_ms,
};
use loc_core::location::{Location, LocationAttributes, LocationPatch, ParentChange};
use rusqlite::Transaction;

impl SqliteStore {
    pub fn create_location(
        &mut self,
        request: CreateLocationRequest,
    ) -> Result<Location, StoreError> {
        let attributes = LocationAttributes::try_new(
            request.building,
            request.name,
            request.number,
            request.area,
        )
        .map_err(|err| StoreError::InvalidInput(err.message()))?;
        let parent_id = request
            .parent_id
            .as_deref()
            .map(canonicalize_id)
            .transpose()?;

        let tx = self.write_tx()?;
        if let Some(parent_id) = parent_id.as_deref()
            && !location_exists_tx(&tx, parent_id)?
        {
            return Err(StoreError::ParentNotFound);
        }

        let now_ms = now_ms();
        let location = Location {
            id: uuid::Uuid::new_v4().hyphenated().to_string(),
            parent_id,
            attributes,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        location_insert_tx(&tx, &location)?;
        let entries = link_node_tx(&tx, &location.id, location.parent_id.as_deref())?;

        tx.commit()?;
        tracing::debug!(
            id = %location.id,
            parent_id = ?location.parent_id,
            closure_entries = entries,
            "location created"
        );
        Ok(location)
    }

    pub fn move_location(&mut self, request: MoveLocationRequest) -> Result<Location, StoreError> {
        let id = canonicalize_id(&request.id)?;
        let new_parent_id = request
            .new_parent_id
            .as_deref()
            .map(canonicalize_id)
            .transpose()?;
        if new_parent_id.as_deref() == Some(id.as_str()) {
            return Err(StoreError::SelfParent);
        }

        let tx = self.write_tx()?;
        let mut location = require_location_tx(&tx, &id, || StoreError::NodeNotFound)?;
        reparent_tx(&tx, &mut location, new_parent_id)?;

        tx.commit()?;
        Ok(location)
    }

    /// Applies an attribute patch and an optional parent change as one unit.
    pub fn update_location(
        &mut self,
        request: UpdateLocationRequest,
    ) -> Result<Location, StoreError> {
        let id = canonicalize_id(&request.id)?;
        let parent_change = match request.parent {
            ParentChange::Keep => None,
            ParentChange::Detach => Some(None),
            ParentChange::Set(parent_id) => Some(Some(canonicalize_id(&parent_id)?)),
        };
        if let Some(Some(parent_id)) = parent_change.as_ref()
            && parent_id == &id
        {
            return Err(StoreError::SelfParent);
        }
        let patch = LocationPatch {
            building: request.building,
            name: request.name,
            number: request.number,
            area: request.area,
        };

        let tx = self.write_tx()?;
        let mut location = require_location_tx(&tx, &id, || StoreError::NodeNotFound)?;
        location.attributes = patch
            .apply(&location.attributes)
            .map_err(|err| StoreError::InvalidInput(err.message()))?;

        match parent_change {
            Some(new_parent_id) => reparent_tx(&tx, &mut location, new_parent_id)?,
            None => {
                location.updated_at_ms = location.updated_at_ms.max(now_ms());
                location_update_tx(&tx, &location)?;
            }
        }

        tx.commit()?;
        tracing::debug!(id = %location.id, "location updated");
        Ok(location)
    }

    /// Deletes a leaf location. Locations with children are refused.
    pub fn delete_location(&mut self, request: DeleteLocationRequest) -> Result<(), StoreError> {
        let id = canonicalize_id(&request.id)?;

        let tx = self.write_tx()?;
        if !location_exists_tx(&tx, &id)? {
            return Err(StoreError::NodeNotFound);
        }
        if has_children_tx(&tx, &id)? {
            return Err(StoreError::HasChildren);
        }

        let removed = remove_node_tx(&tx, &id)?;
        location_delete_tx(&tx, &id)?;

        tx.commit()?;
        tracing::debug!(id = %id, closure_entries = removed, "location deleted");
        Ok(())
    }
}

/// Points `location` at `new_parent_id`, persists it, and rebuilds the closure of its subtree.
///
/// `location` carries the caller's pending attribute changes; they are written in the same
/// statement as the new parent pointer.
fn reparent_tx(
    tx: &Transaction<'_>,
    location: &mut Location,
    new_parent_id: Option<String>,
) -> Result<(), StoreError> {
    if let Some(parent_id) = new_parent_id.as_deref() {
        if parent_id == location.id {
            return Err(StoreError::SelfParent);
        }
        if !location_exists_tx(tx, parent_id)? {
            return Err(StoreError::ParentNotFound);
        }
        if is_ancestor_tx(tx, &location.id, parent_id)? {
            return Err(StoreError::CircularReference);
        }
    }

    let previous_parent_id = std::mem::replace(&mut location.parent_id, new_parent_id);
    location.updated_at_ms = location.updated_at_ms.max(now_ms());
    location_update_tx(tx, location)?;

    let rebuilt = rebuild_subtree_tx(
        tx,
        &location.id,
        location.parent_id.as_deref(),
        None,
        &mut || {},
    )?;
    tracing::debug!(
        id = %location.id,
        from = ?previous_parent_id,
        to = ?location.parent_id,
        subtree_nodes = rebuilt.nodes,
        closure_entries = rebuilt.entries,
        "location moved"
    );
    Ok(())
}
