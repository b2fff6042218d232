//! Request extractors for the session actor and the Lens access token.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;
use service::auth::{AuthError, SESSION_COOKIE};
use service::lens::LensError;
use service::ServiceError;

use crate::errors::ApiError;
use crate::state::AppState;

pub const LENS_TOKEN_HEADER: &str = "x-lens-access-token";
pub const LENS_TOKEN_COOKIE: &str = "lens_access_token";

/// Session cookie first, then `Authorization: Bearer`.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(c) = jar.get(SESSION_COOKIE) {
        return Some(c.value().to_string());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Authenticated actor address.
#[derive(Debug, Clone)]
pub struct Actor(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AuthError::MissingSession)?;
        Ok(Actor(state.sessions.verify(&token)?))
    }
}

/// Authenticated actor that also passed the per-address rate limiter.
/// Used on every mutating route.
#[derive(Debug, Clone)]
pub struct Writer(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Writer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Actor(address) = Actor::from_request_parts(parts, state).await?;
        state.limiter.check(&address)?;
        Ok(Writer(address))
    }
}

/// Viewer for read routes; an absent or bad session just means anonymous.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let viewer = session_token(&parts.headers).and_then(|t| state.sessions.verify(&t).ok());
        Ok(Viewer(viewer))
    }
}

/// Lens access token from `x-lens-access-token` or the `lens_access_token` cookie.
#[derive(Debug, Clone)]
pub struct LensToken(pub Option<String>);

impl LensToken {
    pub fn as_deref(&self) -> Option<&str> { self.0.as_deref() }

    pub fn require(&self) -> Result<&str, ApiError> {
        self.as_deref().ok_or_else(|| LensError::MissingToken.into())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for LensToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(LENS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        let token = from_header.or_else(|| {
            CookieJar::from_headers(&parts.headers).get(LENS_TOKEN_COOKIE).map(|c| c.value().to_string())
        });
        Ok(LensToken(token.filter(|t| !t.is_empty())))
    }
}

/// Body and URL rejections answer with the same `{"error"}` shape as
/// handler errors.
fn rejected(status: StatusCode, text: String) -> ApiError {
    let err = match status {
        StatusCode::PAYLOAD_TOO_LARGE => ServiceError::PayloadTooLarge(text),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ServiceError::UnsupportedMedia(text),
        _ => ServiceError::Validation(text),
    };
    ApiError(err)
}

/// `Json` body with `ApiError` rejections.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(r) => Err(rejected(r.status(), r.body_text())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(r) => Err(rejected(r.status(), r.body_text())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(r) => Err(rejected(r.status(), r.body_text())),
        }
    }
}

/// Raw body; an over-limit body is a JSON 413.
#[derive(Debug, Clone)]
pub struct ApiBytes(pub Bytes);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for ApiBytes {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Bytes::from_request(req, state).await {
            Ok(bytes) => Ok(ApiBytes(bytes)),
            Err(r) => Err(rejected(r.status(), r.body_text())),
        }
    }
}

/// Attach a token Lens issued during an account switch.
pub fn with_refreshed_token(resp: impl IntoResponse, token: Option<&str>) -> Response {
    let mut resp = resp.into_response();
    if let Some(value) = token.and_then(|t| HeaderValue::from_str(t).ok()) {
        resp.headers_mut().insert(HeaderName::from_static(LENS_TOKEN_HEADER), value);
    }
    resp
}
