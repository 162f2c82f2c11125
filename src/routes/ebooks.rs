//! Ebook metadata and cover endpoints
//!
//! Keys may contain slashes, so the whole tail of the path is captured and
//! the trailing `/metadata` or `/cover` segment is split off by hand.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::epub::BookMetadata;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Metadata record as returned to clients
#[derive(Serialize)]
pub struct MetadataResponse {
    #[serde(flatten)]
    pub metadata: BookMetadata,
    pub s3_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Metadata,
    Cover,
}

/// `GET /api/ebooks/{key}/metadata` and `GET /api/ebooks/{key}/cover`
pub async fn get_ebook_resource(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response> {
    let (key, resource) = split_resource(&path)?;
    validate_key(key)?;

    match resource {
        Resource::Metadata => {
            let metadata = state.library().metadata(key).await?;
            Ok(Json(MetadataResponse {
                metadata,
                s3_key: key.to_string(),
            })
            .into_response())
        }
        Resource::Cover => {
            let cover = state
                .library()
                .cover(key)
                .await?
                .ok_or_else(|| AppError::NotFound("No cover image found".to_string()))?;

            Ok(([(header::CONTENT_TYPE, cover.media_type)], cover.data).into_response())
        }
    }
}

fn split_resource(path: &str) -> Result<(&str, Resource)> {
    let path = path.trim_start_matches('/');
    if let Some(key) = path.strip_suffix("/metadata") {
        return Ok((key, Resource::Metadata));
    }
    if let Some(key) = path.strip_suffix("/cover") {
        return Ok((key, Resource::Cover));
    }
    Err(AppError::NotFound(format!("No such resource: {}", path)))
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || !key.to_lowercase().ends_with(".epub") {
        return Err(AppError::BadRequest("Only EPUB files are supported".to_string()));
    }
    Ok(())
}
