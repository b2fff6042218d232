use anyhow::{anyhow, Result};
use common::types::LogFormat;
use serde::Deserialize;

pub const DEV_SESSION_SECRET: &str = "dev-session-secret-change-me";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub lens: LensConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Absolute base used when building URLs for uploaded media.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            public_base_url: default_public_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self { Self { data_dir: default_data_dir() } }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_secret")]
    pub session_secret: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: default_session_secret(),
            session_ttl_hours: default_session_ttl_hours(),
            cookie_secure: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LensConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tried in order; the client remembers the last one that answered.
    #[serde(default = "default_lens_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_lens_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_account_cache_ttl")]
    pub account_cache_ttl_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: String,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoints: default_lens_endpoints(),
            request_timeout_secs: default_lens_timeout(),
            account_cache_ttl_secs: default_account_cache_ttl(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_actions")]
    pub max_actions: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_actions: default_max_actions(),
            window_secs: default_window_secs(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_max_items")]
    pub max_items_per_post: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self { max_upload_bytes: default_max_upload_bytes(), max_items_per_post: default_max_items() }
    }
}

fn default_true() -> bool { true }
fn default_public_base_url() -> String { "http://127.0.0.1:8080".into() }
fn default_data_dir() -> String { "data".into() }
fn default_session_secret() -> String { DEV_SESSION_SECRET.into() }
fn default_session_ttl_hours() -> i64 { 24 * 7 }
fn default_lens_endpoints() -> Vec<String> {
    vec![
        "https://api.lens.xyz/graphql".into(),
        "https://api.lens.dev/graphql".into(),
    ]
}
fn default_lens_timeout() -> u64 { 10 }
fn default_account_cache_ttl() -> u64 { 300 }
fn default_page_size() -> String { "TEN".into() }
fn default_max_actions() -> u32 { 20 }
fn default_window_secs() -> u64 { 60 }
fn default_cooldown_secs() -> u64 { 30 }
fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }
fn default_max_items() -> usize { 4 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` when present (defaults otherwise), apply env
    /// overrides, then validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.apply_env_overrides();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Ok(base) = std::env::var("PUBLIC_BASE_URL") {
            self.server.public_base_url = base;
        }
        if let Ok(dir) = std::env::var("DATA_DIR") {
            self.store.data_dir = dir;
        }
        if let Ok(secret) = std::env::var("SESSION_SECRET") {
            self.auth.session_secret = secret;
        }
        if let Ok(urls) = std::env::var("LENS_API_URLS") {
            self.lens.endpoints = urls
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.auth.validate()?;
        self.lens.validate()?;
        self.rate_limit.validate()?;
        if self.store.data_dir.trim().is_empty() {
            return Err(anyhow!("store.data_dir must not be empty"));
        }
        if self.media.max_upload_bytes == 0 {
            return Err(anyhow!("media.max_upload_bytes must be > 0"));
        }
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        // 去掉结尾的 `/`，拼接媒体 URL 时统一处理
        while self.public_base_url.ends_with('/') {
            self.public_base_url.pop();
        }
        if !(self.public_base_url.starts_with("http://") || self.public_base_url.starts_with("https://")) {
            return Err(anyhow!("server.public_base_url must start with http(s)://"));
        }
        Ok(())
    }
}

impl AuthConfig {
    fn validate(&self) -> Result<()> {
        if self.session_secret.len() < 16 {
            return Err(anyhow!("auth.session_secret must be at least 16 bytes"));
        }
        if self.cookie_secure && self.session_secret == DEV_SESSION_SECRET {
            return Err(anyhow!("auth.session_secret must be changed when cookie_secure is enabled"));
        }
        if self.session_ttl_hours <= 0 {
            return Err(anyhow!("auth.session_ttl_hours must be positive"));
        }
        Ok(())
    }
}

impl LensConfig {
    fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .endpoints
            .iter()
            .find(|e| !(e.starts_with("http://") || e.starts_with("https://")))
        {
            return Err(anyhow!("lens endpoint must be an http(s) URL: {bad:?}"));
        }
        if self.enabled && self.endpoints.is_empty() {
            return Err(anyhow!("lens.enabled requires at least one endpoint"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("lens.request_timeout_secs must be positive"));
        }
        Ok(())
    }
}

impl RateLimitConfig {
    fn validate(&self) -> Result<()> {
        if self.enabled && (self.window_secs == 0 || self.max_actions == 0) {
            return Err(anyhow!("rate_limit window_secs and max_actions must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let mut cfg = AppConfig::default();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.worker_threads, Some(4));
        assert_eq!(cfg.lens.endpoints.len(), 2);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            public_base_url = "https://social.example/"

            [lens]
            endpoints = ["https://a.example/graphql"]

            [rate_limit]
            max_actions = 3
            "#,
        )
        .unwrap();
        let mut cfg = cfg;
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.public_base_url, "https://social.example");
        assert_eq!(cfg.lens.endpoints, vec!["https://a.example/graphql".to_string()]);
        assert_eq!(cfg.rate_limit.max_actions, 3);
        assert_eq!(cfg.rate_limit.window_secs, 60);
        assert_eq!(cfg.store.data_dir, "data");
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.lens.endpoints = vec!["ftp://nope".into()];
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.auth.cookie_secure = true;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.rate_limit.window_secs = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.lens.enabled = false;
        cfg.lens.endpoints.clear();
        assert!(cfg.normalize_and_validate().is_ok());
    }
}
