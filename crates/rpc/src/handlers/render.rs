#![forbid(unsafe_code)]

use crate::ts_ms_to_rfc3339;
use loc_core::location::{ClosureEntry, DescendantRow, Location, LocationDetail, LocationTree};
use loc_storage::{ClosureReport, RebuildReport};
use serde_json::{Map, Value, json};

pub(super) fn location_json(location: &Location) -> Value {
    let attrs = &location.attributes;
    json!({
        "id": location.id,
        "parent_id": location.parent_id,
        "building": attrs.building,
        "name": attrs.name,
        "number": attrs.number,
        "area": attrs.area,
        "created_at": ts_ms_to_rfc3339(location.created_at_ms),
        "updated_at": ts_ms_to_rfc3339(location.updated_at_ms),
    })
}

/// Nested `children` arrays, built bottom-up without recursion.
pub(super) fn tree_json(tree: &LocationTree) -> Value {
    fn node(location: &Location) -> Map<String, Value> {
        match location_json(location) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
    fn close(mut map: Map<String, Value>, children: Vec<Value>) -> Value {
        map.insert("children".to_string(), Value::Array(children));
        Value::Object(map)
    }

    let mut stack: Vec<(&LocationTree, usize, Vec<Value>)> =
        vec![(tree, 0, Vec::with_capacity(tree.children.len()))];
    while let Some(top) = stack.last_mut() {
        let current: &LocationTree = top.0;
        if let Some(child) = current.children.get(top.1) {
            top.1 += 1;
            stack.push((child, 0, Vec::with_capacity(child.children.len())));
            continue;
        }

        let Some((done, _, children)) = stack.pop() else {
            break;
        };
        let rendered = close(node(&done.location), children);
        match stack.last_mut() {
            Some((_, _, siblings)) => siblings.push(rendered),
            None => return rendered,
        }
    }
    Value::Null
}

pub(super) fn detail_json(detail: &LocationDetail) -> Value {
    json!({
        "location": location_json(&detail.location),
        "parent": detail.parent.as_ref().map(location_json),
        "children": detail.children.iter().map(location_json).collect::<Vec<_>>(),
    })
}

pub(super) fn descendants_json(rows: &[DescendantRow]) -> Value {
    Value::Array(
        rows.iter()
            .map(|row| json!({ "depth": row.depth, "location": location_json(&row.location) }))
            .collect(),
    )
}

fn entry_json(entry: &ClosureEntry) -> Value {
    json!({
        "ancestor_id": entry.ancestor_id,
        "descendant_id": entry.descendant_id,
        "depth": entry.depth,
    })
}

pub(super) fn verify_json(report: &ClosureReport) -> Value {
    json!({
        "consistent": report.is_consistent(),
        "nodes": report.nodes,
        "entries": report.entries,
        "missing": report.missing.iter().map(entry_json).collect::<Vec<_>>(),
        "stale": report.stale.iter().map(entry_json).collect::<Vec<_>>(),
    })
}

pub(super) fn rebuild_json(report: &RebuildReport) -> Value {
    json!({ "nodes": report.nodes, "entries": report.entries })
}
