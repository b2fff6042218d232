pub mod auth;
pub mod bookmarks;
pub mod follows;
pub mod lens;
pub mod media;
pub mod posts;
pub mod profiles;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use common::types::Health;
use serde::Serialize;
use service::mirror::MirrorReport;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

/// Local result plus what happened on Lens.
#[derive(Debug, Serialize)]
pub struct WithMirror<T> {
    #[serde(flatten)]
    pub data: T,
    pub lens: MirrorReport,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> impl IntoResponse {
    match service::observability::gather_metrics() {
        Ok(text) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": e }))).into_response(),
    }
}

/// Build the full application router.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    // 上传路由放宽 body 上限，超出部分由 MediaStore 给出 413
    let upload_limit = state.media.max_upload_bytes().saturating_add(1);
    let media_dir = ServeDir::new(state.media.root());

    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest_service("/media", media_dir);

    let api = Router::new()
        .route(
            "/api/auth/session",
            post(auth::create_session).get(auth::current_session).delete(auth::delete_session),
        )
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route("/api/posts/:id", get(posts::get_post).delete(posts::delete_post))
        .route("/api/posts/:id/replies", get(posts::list_replies).post(posts::create_reply))
        .route("/api/posts/:id/like", post(posts::toggle_like))
        .route(
            "/api/follows/:address",
            get(follows::summary).post(follows::follow).delete(follows::unfollow),
        )
        .route("/api/profiles/me", put(profiles::update_me))
        .route("/api/profiles/:address", get(profiles::get_profile))
        .route("/api/bookmarks", get(bookmarks::list))
        .route("/api/bookmarks/:post_id", post(bookmarks::add).delete(bookmarks::remove))
        .route("/api/media", post(media::upload).layer(DefaultBodyLimit::max(upload_limit)));

    let lens_routes = Router::new()
        .route("/api/lens/posts", get(lens::posts).post(lens::create_post))
        .route("/api/lens/posts/:id/replies", get(lens::replies).post(lens::create_reply))
        .route("/api/lens/posts/:id/like", post(lens::add_reaction).delete(lens::undo_reaction))
        .route("/api/lens/accounts/:address", get(lens::account))
        .route("/api/lens/follows/:account", post(lens::follow).delete(lens::unfollow));

    public
        .merge(api)
        .merge(lens_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                // 响应状态码与耗时
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
