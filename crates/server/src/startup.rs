use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use configs::AppConfig;
use service::lens::LensClient;
use service::rate_limiter::ActionRateLimiter;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::errors::StartupError;
use crate::extract::LENS_TOKEN_HEADER;
use crate::routes;
use crate::state::AppState;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// `scheme://host[:port]` of a base URL.
fn origin_of(base_url: &str) -> &str {
    let host_start = base_url.find("://").map(|i| i + 3).unwrap_or(0);
    match base_url[host_start..].find('/') {
        Some(i) => &base_url[..host_start + i],
        None => base_url,
    }
}

/// Credentialed CORS, limited to the public origin.
fn build_cors(cfg: &AppConfig) -> Result<CorsLayer, StartupError> {
    let origin = HeaderValue::from_str(origin_of(&cfg.server.public_base_url))
        .map_err(|e| StartupError::InvalidConfig(format!("public_base_url as origin: {e}")))?;
    let lens_token = HeaderName::from_static(LENS_TOKEN_HEADER);
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, lens_token.clone()])
        .expose_headers([lens_token])
        .allow_credentials(true))
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address: {e}")))
}

/// Drop idle rate-limiter entries in the background.
fn spawn_limiter_pruning(limiter: Arc<ActionRateLimiter>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.prune();
            debug!(tracked = limiter.tracked(), "rate limiter pruned");
        }
    });
}

/// Open the stores and build the router around `lens`.
pub async fn build_app(cfg: &AppConfig, lens: LensClient) -> Result<Router, StartupError> {
    let cors = build_cors(cfg)?;
    let state = AppState::new(cfg, lens).await?;
    Ok(routes::build_router(state, cors))
}

/// Public entry: wire everything from `cfg` and serve until the task is aborted.
pub async fn run(cfg: AppConfig) -> Result<(), StartupError> {
    service::observability::init_metrics();
    common::env::ensure_env(Path::new(&cfg.store.data_dir)).await?;

    let lens = LensClient::from_config(&cfg.lens).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    info!(enabled = lens.is_enabled(), endpoints = ?cfg.lens.endpoints, "lens client ready");

    let cors = build_cors(&cfg)?;
    let state = AppState::new(&cfg, lens).await?;
    spawn_limiter_pruning(Arc::clone(&state.limiter));
    let app = routes::build_router(state, cors);

    let addr = bind_addr(&cfg)?;
    info!(%addr, public_base_url = %cfg.server.public_base_url, "starting chainsocial server");
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(anyhow::Error::from)?;
    axum::serve(listener, app).await.map_err(anyhow::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_drops_path() {
        assert_eq!(origin_of("https://social.example/app"), "https://social.example");
        assert_eq!(origin_of("http://127.0.0.1:8080"), "http://127.0.0.1:8080");
    }
}
