//! Bucket listing

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct ObjectListResponse {
    pub objects: Vec<String>,
    pub count: usize,
}

/// List object keys, 100 by default and never more than 1000
pub async fn list_objects(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ObjectListResponse>> {
    let objects = state
        .library()
        .list(query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;

    Ok(Json(ObjectListResponse {
        count: objects.len(),
        objects,
    }))
}
