use axum::{extract::Query, Json};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{playback::PlaybackReference, types::AppError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlaybackQuery {
    /// Stored object path, with or without a leading `/`
    pub path: String,
}

/// Resolves a stored media path to its video proxy route
#[allow(clippy::unused_async)]
pub async fn resolve_playback(
    Query(query): Query<PlaybackQuery>,
) -> Result<Json<PlaybackReference>, AppError> {
    Ok(Json(PlaybackReference::resolve(&query.path)?))
}
