//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::info;

/// Ensure the data directory and its media subdirectories exist.
pub async fn ensure_env(data_dir: &Path) -> anyhow::Result<()> {
    for dir in [data_dir.to_path_buf(), data_dir.join("media"), data_dir.join("media").join("metadata")] {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    }
    info!(data_dir = %data_dir.display(), "data directory ready");
    Ok(())
}
