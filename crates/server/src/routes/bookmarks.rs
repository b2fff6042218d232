use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use service::social::PostView;

use crate::errors::ApiError;
use crate::extract::{Actor, ApiPath, Writer};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, Actor(actor): Actor) -> Result<Json<Vec<PostView>>, ApiError> {
    let posts = state.store.bookmarks(&actor).await?;
    Ok(Json(posts.into_iter().map(|p| PostView::from_post(p, Some(&actor))).collect()))
}

pub async fn add(
    State(state): State<AppState>,
    Writer(actor): Writer,
    ApiPath(post_id): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
    state.store.add_bookmark(&actor, &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    State(state): State<AppState>,
    Writer(actor): Writer,
    ApiPath(post_id): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.store.remove_bookmark(&actor, &post_id).await?;
    Ok(Json(json!({ "removed": removed })))
}
