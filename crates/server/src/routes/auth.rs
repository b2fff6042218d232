use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use service::auth::SESSION_COOKIE;
use service::content::normalize_address;
use tracing::info;

use crate::errors::ApiError;
use crate::extract::{Actor, ApiJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct SessionOutput {
    pub address: String,
}

/// Start a session for a wallet address. The wallet proof happens in the
/// auth provider in front of this route.
pub async fn create_session(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<(CookieJar, Json<SessionOutput>), ApiError> {
    let address = normalize_address(&input.address)?;
    let token = state.sessions.issue(&address)?;

    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(state.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    info!(%address, "session issued");
    Ok((jar.add(cookie), Json(SessionOutput { address })))
}

pub async fn current_session(Actor(address): Actor) -> Json<SessionOutput> {
    Json(SessionOutput { address })
}

pub async fn delete_session(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}
