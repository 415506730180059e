#![forbid(unsafe_code)]

use super::params::{
    CreateParams, EmptyParams, IdParams, MoveParams, UpdateParams, parse_params,
};
use super::render::{
    descendants_json, detail_json, location_json, rebuild_json, tree_json, verify_json,
};
use loc_storage::{SqliteStore, StoreError};
use serde_json::{Value, json};
use std::sync::atomic::AtomicBool;

/// Outcome of a location method: a result payload, a params problem, or a store failure.
#[derive(Debug)]
pub(crate) enum MethodError {
    InvalidParams(String),
    Store(StoreError),
}

impl From<StoreError> for MethodError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

type MethodResult = Result<Value, MethodError>;

#[cfg(test)]
pub(crate) const LOCATION_METHODS: &[&str] = &[
    "locations.create",
    "locations.list",
    "locations.get",
    "locations.tree",
    "locations.ancestors",
    "locations.descendants",
    "locations.update",
    "locations.move",
    "locations.delete",
    "locations.verify",
    "locations.rebuild",
];

/// Returns `None` when `method` is not a location method.
pub(crate) fn dispatch_location_method(
    store: &mut SqliteStore,
    method: &str,
    params: Option<Value>,
) -> Option<MethodResult> {
    let result = match method {
        "locations.create" => create(store, params),
        "locations.list" => list(store, params),
        "locations.get" => get(store, params),
        "locations.tree" => tree(store, params),
        "locations.ancestors" => ancestors(store, params),
        "locations.descendants" => descendants(store, params),
        "locations.update" => update(store, params),
        "locations.move" => move_to(store, params),
        "locations.delete" => delete(store, params),
        "locations.verify" => verify(store, params),
        "locations.rebuild" => rebuild(store, params),
        _ => return None,
    };
    Some(result)
}

fn params<T: serde::de::DeserializeOwned>(raw: Option<Value>) -> Result<T, MethodError> {
    parse_params(raw).map_err(MethodError::InvalidParams)
}

fn create(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    let request = params::<CreateParams>(raw)?.into();
    let location = store.create_location(request)?;
    Ok(location_json(&location))
}

fn list(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    params::<EmptyParams>(raw)?;
    let forest = store.forest()?;
    Ok(json!({ "roots": forest.iter().map(tree_json).collect::<Vec<_>>() }))
}

fn get(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    let IdParams { id } = params(raw)?;
    Ok(detail_json(&store.location_get(&id)?))
}

fn tree(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    let IdParams { id } = params(raw)?;
    Ok(tree_json(&store.subtree(&id)?))
}

fn ancestors(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    let IdParams { id } = params(raw)?;
    let chain = store.ancestor_chain(&id)?;
    Ok(json!({ "ancestors": chain.iter().map(location_json).collect::<Vec<_>>() }))
}

fn descendants(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    let IdParams { id } = params(raw)?;
    let rows = store.descendants(&id)?;
    Ok(json!({ "descendants": descendants_json(&rows) }))
}

fn update(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    let request = params::<UpdateParams>(raw)?.into();
    Ok(location_json(&store.update_location(request)?))
}

fn move_to(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    let request = params::<MoveParams>(raw)?.into();
    Ok(location_json(&store.move_location(request)?))
}

fn delete(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    let request = params::<IdParams>(raw)?.into();
    store.delete_location(request)?;
    Ok(json!({ "deleted": true }))
}

fn verify(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    params::<EmptyParams>(raw)?;
    Ok(verify_json(&store.verify_closure()?))
}

/// Requests are served one at a time, so nothing can cancel a rebuild once it has started.
fn rebuild(store: &mut SqliteStore, raw: Option<Value>) -> MethodResult {
    params::<EmptyParams>(raw)?;
    let cancel = AtomicBool::new(false);
    Ok(rebuild_json(&store.rebuild_closure(&cancel)?))
}
