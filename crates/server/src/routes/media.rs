use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::Json;
use service::media::StoredMedia;

use crate::errors::ApiError;
use crate::extract::{ApiBytes, Writer};
use crate::state::AppState;

/// Raw-body upload; the `Content-Type` header decides the file type.
pub async fn upload(
    State(state): State<AppState>,
    Writer(_actor): Writer,
    headers: HeaderMap,
    ApiBytes(body): ApiBytes,
) -> Result<(StatusCode, Json<StoredMedia>), ApiError> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    let stored = state.media.save_upload(&body, content_type).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
