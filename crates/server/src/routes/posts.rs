use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use service::auth::AuthError;
use service::mirror::MirrorStatus;
use service::pagination::{CursorPage, PageRequest};
use service::social::{LikeState, NewPost, PostFilter, PostView, Reply};
use service::ServiceError;
use tracing::{info, warn};

use super::WithMirror;
use crate::errors::ApiError;
use crate::extract::{with_refreshed_token, ApiJson, ApiPath, ApiQuery, LensToken, Viewer, Writer};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
    pub author: Option<String>,
    /// `following` restricts the feed to accounts the viewer follows.
    pub scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NewReply {
    #[serde(default)]
    pub content: String,
}

pub async fn list_posts(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    ApiQuery(q): ApiQuery<ListPostsQuery>,
) -> Result<Json<CursorPage<PostView>>, ApiError> {
    let filter = match (q.scope.as_deref(), &q.author) {
        (Some("following"), _) => {
            let viewer = viewer.clone().ok_or(AuthError::MissingSession)?;
            PostFilter::FollowedBy(viewer)
        }
        (Some(other), _) if other != "all" => {
            return Err(ServiceError::validation(format!("unknown scope {other}")).into());
        }
        (_, Some(author)) => PostFilter::Author(author.clone()),
        _ => PostFilter::All,
    };
    let page = state.store.list_posts(&filter, &PageRequest::new(q.cursor, q.limit)).await?;
    Ok(Json(page.map(|p| PostView::from_post(p, viewer.as_deref()))))
}

pub async fn get_post(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<PostView>, ApiError> {
    let post = state.store.get_post(&id).await?.ok_or_else(|| ServiceError::not_found("post"))?;
    Ok(Json(PostView::from_post(post, viewer.as_deref())))
}

/// Create locally, then mirror; the Lens hash becomes the post's `lensId`.
pub async fn create_post(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiJson(input): ApiJson<NewPost>,
) -> Result<Response, ApiError> {
    let mut post = state.store.create_post(&actor, input).await?;
    let lens = state.mirror.post(&actor, token.as_deref(), &post).await;

    if let (MirrorStatus::Mirrored, Some(lens_id)) = (lens.status, lens.id.as_deref()) {
        if let Err(e) = state.store.set_post_lens_id(&post.id, lens_id).await {
            warn!(post_id = %post.id, error = %e, "could not record lens id");
        } else {
            post.lens_id = Some(lens_id.to_string());
        }
    }
    info!(post_id = %post.id, %actor, lens = ?lens.status, "post created");

    let refreshed = lens.refreshed_token.clone();
    let body = WithMirror { data: PostView::from_post(post, Some(&actor)), lens };
    Ok(with_refreshed_token((StatusCode::CREATED, Json(body)), refreshed.as_deref()))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Writer(actor): Writer,
    ApiPath(id): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_post(&actor, &id).await?;
    info!(post_id = %id, %actor, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_replies(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> Result<Json<CursorPage<Reply>>, ApiError> {
    Ok(Json(state.store.list_replies(&id, &PageRequest::new(q.cursor, q.limit)).await?))
}

pub async fn create_reply(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<NewReply>,
) -> Result<Response, ApiError> {
    let mut reply = state.store.create_reply(&actor, &id, &input.content).await?;
    let parent = state.store.get_post(&id).await?.ok_or_else(|| ServiceError::not_found("post"))?;
    let lens = state.mirror.reply(&actor, token.as_deref(), &parent, &reply).await;

    if let (MirrorStatus::Mirrored, Some(lens_id)) = (lens.status, lens.id.as_deref()) {
        if let Err(e) = state.store.set_reply_lens_id(&reply.id, lens_id).await {
            warn!(reply_id = %reply.id, error = %e, "could not record lens id");
        } else {
            reply.lens_id = Some(lens_id.to_string());
        }
    }

    let refreshed = lens.refreshed_token.clone();
    Ok(with_refreshed_token((StatusCode::CREATED, Json(WithMirror { data: reply, lens })), refreshed.as_deref()))
}

/// Toggle; the Lens reaction follows the new state.
pub async fn toggle_like(
    State(state): State<AppState>,
    Writer(actor): Writer,
    token: LensToken,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    let like: LikeState = state.store.toggle_like(&actor, &id).await?;
    let post = state.store.get_post(&id).await?.ok_or_else(|| ServiceError::not_found("post"))?;
    let lens = state.mirror.like(&actor, token.as_deref(), &post, like.liked).await;

    let refreshed = lens.refreshed_token.clone();
    Ok(with_refreshed_token(Json(WithMirror { data: like, lens }).into_response(), refreshed.as_deref()))
}
