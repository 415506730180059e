#![forbid(unsafe_code)]

use loc_core::location::ParentChange;

#[derive(Clone, Debug, PartialEq)]
pub struct CreateLocationRequest {
    pub building: String,
    pub name: String,
    pub number: String,
    pub area: f64,
    pub parent_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveLocationRequest {
    pub id: String,
    /// `None` detaches the location and makes it a forest root.
    pub new_parent_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateLocationRequest {
    pub id: String,
    pub building: Option<String>,
    pub name: Option<String>,
    pub number: Option<String>,
    pub area: Option<f64>,
    pub parent: ParentChange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteLocationRequest {
    pub id: String,
}
