use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use service::content::normalize_address;
use service::mirror::MirrorReport;
use service::social::FollowSummary;
use tracing::info;

use super::WithMirror;
use crate::errors::ApiError;
use crate::extract::{with_refreshed_token, ApiPath, LensToken, Viewer, Writer};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
    pub follower: String,
    pub followee: String,
    pub following: bool,
}

pub async fn summary(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    ApiPath(address): ApiPath<String>,
) -> Result<Json<FollowSummary>, ApiError> {
    Ok(Json(state.store.follow_summary(&address, viewer.as_deref()).await?))
}

pub async fn follow(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(address): ApiPath<String>,
) -> Result<Response, ApiError> {
    let f = state.store.follow(&actor, &address).await?;
    let lens = state.mirror.follow(&actor, token.as_deref(), &f.followee).await;
    info!(follower = %f.follower, followee = %f.followee, lens = ?lens.status, "followed");

    let refreshed = lens.refreshed_token.clone();
    let data = FollowState { follower: f.follower, followee: f.followee, following: true };
    Ok(with_refreshed_token(Json(WithMirror { data, lens }), refreshed.as_deref()))
}

/// Unfollow; Lens is only told when a local follow actually existed.
pub async fn unfollow(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(address): ApiPath<String>,
) -> Result<Response, ApiError> {
    let target = normalize_address(&address)?;
    let removed = state.store.unfollow(&actor, &target).await?;
    let lens = if removed {
        state.mirror.unfollow(&actor, token.as_deref(), &target).await
    } else {
        MirrorReport::skipped()
    };

    let refreshed = lens.refreshed_token.clone();
    let data = FollowState { follower: actor, followee: target, following: false };
    Ok(with_refreshed_token(Json(WithMirror { data, lens }), refreshed.as_deref()))
}
