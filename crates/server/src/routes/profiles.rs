use axum::extract::State;
use axum::response::Response;
use axum::Json;
use service::social::{Author, ProfileUpdate};

use super::WithMirror;
use crate::errors::ApiError;
use crate::extract::{with_refreshed_token, ApiJson, ApiPath, LensToken, Writer};
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> Result<Json<Author>, ApiError> {
    Ok(Json(state.store.get_profile(&address).await?))
}

/// Edit the caller's own profile and publish it as Lens account metadata.
pub async fn update_me(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Response, ApiError> {
    let profile = state.store.update_profile(&actor, update).await?;
    let lens = state.mirror.profile(&actor, token.as_deref(), &profile).await;
    let refreshed = lens.refreshed_token.clone();
    Ok(with_refreshed_token(Json(WithMirror { data: profile, lens }), refreshed.as_deref()))
}
