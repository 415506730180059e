#![forbid(unsafe_code)]

use loc_core::location::ParentChange;
use loc_storage::{
    CreateLocationRequest, DeleteLocationRequest, MoveLocationRequest, UpdateLocationRequest,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Missing params are treated as `{}` so that parameterless methods accept both forms.
pub(super) fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, String> {
    let value = match params {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(value) => value,
    };
    serde_json::from_value(value).map_err(|err| format!("Invalid params: {err}"))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct IdParams {
    pub(super) id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct EmptyParams {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct CreateParams {
    building: String,
    name: String,
    number: String,
    area: f64,
    #[serde(default)]
    parent_id: Option<String>,
}

impl From<CreateParams> for CreateLocationRequest {
    fn from(params: CreateParams) -> Self {
        Self {
            building: params.building,
            name: params.name,
            number: params.number,
            area: params.area,
            parent_id: params.parent_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct MoveParams {
    id: String,
    /// `null` detaches the location; the key itself is mandatory.
    #[serde(deserialize_with = "nullable")]
    new_parent_id: Option<String>,
}

impl From<MoveParams> for MoveLocationRequest {
    fn from(params: MoveParams) -> Self {
        Self {
            id: params.id,
            new_parent_id: params.new_parent_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct UpdateParams {
    id: String,
    #[serde(default)]
    building: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    area: Option<f64>,
    /// Absent keeps the parent, `null` detaches, a string re-parents.
    #[serde(default, deserialize_with = "present")]
    parent_id: Option<Option<String>>,
}

impl From<UpdateParams> for UpdateLocationRequest {
    fn from(params: UpdateParams) -> Self {
        Self {
            id: params.id,
            building: params.building,
            name: params.name,
            number: params.number,
            area: params.area,
            parent: params
                .parent_id
                .map(ParentChange::from_optional)
                .unwrap_or(ParentChange::Keep),
        }
    }
}

impl From<IdParams> for DeleteLocationRequest {
    fn from(params: IdParams) -> Self {
        Self { id: params.id }
    }
}

fn nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
