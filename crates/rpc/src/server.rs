#![forbid(unsafe_code)]

use crate::handlers::{MethodError, dispatch_location_method};
use crate::{
    INVALID_PARAMS, JsonRpcRequest, METHOD_NOT_FOUND, json_rpc_error, json_rpc_fault,
    json_rpc_response, store_error_response,
};
use loc_storage::SqliteStore;
use serde_json::{Value, json};

pub(crate) struct LocationServer {
    store: SqliteStore,
}

impl LocationServer {
    pub(crate) fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Requests without an `id` are notifications: they run, but produce no response.
    pub(crate) fn handle(&mut self, request: JsonRpcRequest) -> Option<Value> {
        let JsonRpcRequest {
            method, id, params, ..
        } = request;
        let is_notification = id.is_none();

        let response = self.respond(&method, id, params);
        if is_notification { None } else { Some(response) }
    }

    fn respond(&mut self, method: &str, id: Option<Value>, params: Option<Value>) -> Value {
        if method == "ping" {
            return json_rpc_response(id, json!({}));
        }

        let Some(outcome) = dispatch_location_method(&mut self.store, method, params) else {
            tracing::debug!(method, "unknown method");
            return json_rpc_error(id, METHOD_NOT_FOUND, &format!("Method not found: {method}"));
        };

        match outcome {
            Ok(result) => json_rpc_response(id, result),
            Err(MethodError::InvalidParams(message)) => {
                json_rpc_fault(id, INVALID_PARAMS, "INVALID_INPUT", &message)
            }
            Err(MethodError::Store(err)) => {
                if err.is_caller_error() {
                    tracing::debug!(method, code = err.code(), "request rejected");
                } else {
                    tracing::error!(method, error = %err, "request failed");
                }
                store_error_response(id, &err)
            }
        }
    }
}
