#![forbid(unsafe_code)]

use loc_storage::StoreError;
use serde::Deserialize;
use serde_json::{Value, json};

pub(crate) const PARSE_ERROR: i64 = -32700;
pub(crate) const INVALID_REQUEST: i64 = -32600;
pub(crate) const METHOD_NOT_FOUND: i64 = -32601;
pub(crate) const INVALID_PARAMS: i64 = -32602;
pub(crate) const SERVER_ERROR: i64 = -32000;
pub(crate) const NOT_FOUND: i64 = -32004;
pub(crate) const CONFLICT: i64 = -32009;
pub(crate) const HIERARCHY_VIOLATION: i64 = -32010;

#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcRequest {
    #[serde(default)]
    #[serde(rename = "jsonrpc")]
    pub(crate) _jsonrpc: Option<String>,
    pub(crate) method: String,
    #[serde(default)]
    pub(crate) id: Option<Value>,
    #[serde(default)]
    pub(crate) params: Option<Value>,
}

pub(crate) fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub(crate) fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// Error object carrying the stable store code as `data.kind`.
pub(crate) fn json_rpc_fault(id: Option<Value>, code: i64, kind: &str, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message, "data": { "kind": kind } }
    })
}

pub(crate) fn store_error_code(err: &StoreError) -> i64 {
    match err {
        StoreError::NodeNotFound | StoreError::ParentNotFound => NOT_FOUND,
        StoreError::DuplicateKey => CONFLICT,
        StoreError::SelfParent | StoreError::CircularReference | StoreError::HasChildren => {
            HIERARCHY_VIOLATION
        }
        StoreError::InvalidInput(_) => INVALID_PARAMS,
        StoreError::Cancelled
        | StoreError::CorruptHierarchy(_)
        | StoreError::Sql(_)
        | StoreError::Io(_) => SERVER_ERROR,
    }
}

pub(crate) fn store_error_response(id: Option<Value>, err: &StoreError) -> Value {
    json_rpc_fault(id, store_error_code(err), err.code(), &err.to_string())
}
