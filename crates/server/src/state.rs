use std::path::Path;
use std::sync::Arc;

use configs::AppConfig;
use service::auth::SessionSigner;
use service::feed::FeedService;
use service::lens::LensClient;
use service::media::MediaStore;
use service::mirror::LensMirror;
use service::rate_limiter::ActionRateLimiter;
use service::social::SocialStore;
use service::ServiceError;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SocialStore>,
    pub media: Arc<MediaStore>,
    pub lens: Arc<LensClient>,
    pub mirror: Arc<LensMirror>,
    pub feed: Arc<FeedService>,
    pub limiter: Arc<ActionRateLimiter>,
    pub sessions: Arc<SessionSigner>,
    pub cookie_secure: bool,
}

impl AppState {
    /// Open the stores under `store.data_dir` and wire them to `lens`.
    pub async fn new(cfg: &AppConfig, lens: LensClient) -> Result<Self, ServiceError> {
        let data_dir = Path::new(&cfg.store.data_dir);
        let store = SocialStore::new(data_dir.join("social.json"), cfg.media.max_items_per_post).await?;
        let media = Arc::new(
            MediaStore::new(data_dir.join("media"), &cfg.server.public_base_url, cfg.media.max_upload_bytes).await?,
        );
        let lens = Arc::new(lens);

        Ok(Self {
            mirror: Arc::new(LensMirror::new(Arc::clone(&lens), Arc::clone(&media))),
            feed: Arc::new(FeedService::new(Arc::clone(&lens), Arc::clone(&store))),
            limiter: Arc::new(ActionRateLimiter::from_config(&cfg.rate_limit)),
            sessions: Arc::new(SessionSigner::from_config(&cfg.auth)),
            cookie_secure: cfg.auth.cookie_secure,
            store,
            media,
            lens,
        })
    }
}
