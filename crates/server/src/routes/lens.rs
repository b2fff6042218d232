//! Lens-first reads and direct Lens writes.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use service::content::{normalize_address, sanitize_content, MAX_REPLY_CHARS};
use service::feed::FeedPage;
use service::lens::metadata::post_metadata;
use service::lens::mutations::{self, LensMutation};
use service::lens::{LensAccount, MutationResult};
use service::social::NewPost;
use service::ServiceError;
use tracing::info;

use crate::errors::ApiError;
use crate::extract::{with_refreshed_token, ApiJson, ApiPath, ApiQuery, LensToken, Viewer, Writer};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LensFeedQuery {
    pub cursor: Option<String>,
    pub author: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LensRepliesQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LensWriteOutput {
    pub typename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

pub async fn posts(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    ApiQuery(q): ApiQuery<LensFeedQuery>,
) -> Result<Json<FeedPage>, ApiError> {
    let author = q.author.as_deref().map(normalize_address).transpose()?;
    let page = state.feed.posts(q.cursor.as_deref(), author.as_deref(), q.limit, viewer.as_deref()).await?;
    Ok(Json(page))
}

pub async fn replies(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(q): ApiQuery<LensRepliesQuery>,
) -> Result<Json<FeedPage>, ApiError> {
    Ok(Json(state.feed.replies(&id, q.cursor.as_deref(), q.limit).await?))
}

pub async fn account(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> Result<Json<LensAccount>, ApiError> {
    let address = normalize_address(&address)?;
    let account = state
        .lens
        .fetch_lens_account(&address)
        .await?
        .ok_or_else(|| ServiceError::not_found("lens account"))?;
    Ok(Json(account))
}

async fn run(state: &AppState, actor: &str, token: &LensToken, mutation: LensMutation) -> Result<Response, ApiError> {
    let MutationResult { outcome, refreshed_token } = state.lens.execute(actor, &mutation, token.require()?).await?;
    info!(%actor, field = mutation.field, hash = ?outcome.hash, "lens write");
    let body = LensWriteOutput { typename: outcome.typename, hash: outcome.hash };
    Ok(with_refreshed_token(Json(body), refreshed_token.as_deref()))
}

/// Publish content straight to Lens without a local copy.
pub async fn create_post(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiJson(input): ApiJson<NewPost>,
) -> Result<Response, ApiError> {
    token.require()?;
    let (content, media) = state.store.prepare_post(input)?;
    let uri = state.media.save_metadata(&post_metadata(&content, &media)).await?;
    run(&state, &actor, &token, mutations::create_post(&uri)).await
}

pub async fn create_reply(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<NewPost>,
) -> Result<Response, ApiError> {
    token.require()?;
    let content = sanitize_content(&input.content, MAX_REPLY_CHARS)?;
    if content.is_empty() {
        return Err(ServiceError::validation("reply cannot be empty").into());
    }
    let uri = state.media.save_metadata(&post_metadata(&content, &[])).await?;
    run(&state, &actor, &token, mutations::create_reply(&uri, &id)).await
}

pub async fn add_reaction(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    run(&state, &actor, &token, mutations::add_reaction(&id)).await
}

pub async fn undo_reaction(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    run(&state, &actor, &token, mutations::undo_reaction(&id)).await
}

/// `account` is a Lens account address, not a wallet.
pub async fn follow(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(account): ApiPath<String>,
) -> Result<Response, ApiError> {
    let account = normalize_address(&account)?;
    run(&state, &actor, &token, mutations::follow(&account)).await
}

pub async fn unfollow(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(account): ApiPath<String>,
) -> Result<Response, ApiError> {
    let account = normalize_address(&account)?;
    run(&state, &actor, &token, mutations::unfollow(&account)).await
}
