//! Local media and metadata storage served back under `/media`.

use std::path::PathBuf;

use serde::Serialize;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::errors::ServiceError;

const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("video/mp4", "mp4"),
];

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub url: String,
    pub mime_type: String,
    pub size: usize,
}

pub struct MediaStore {
    root: PathBuf,
    public_base_url: String,
    max_upload_bytes: usize,
}

impl MediaStore {
    /// `root` is the directory mounted at `/media`.
    pub async fn new<P: Into<PathBuf>>(root: P, public_base_url: &str, max_upload_bytes: usize) -> Result<Self, ServiceError> {
        let root = root.into();
        fs::create_dir_all(root.join("metadata")).await.map_err(ServiceError::storage)?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_upload_bytes,
        })
    }

    pub fn root(&self) -> &std::path::Path { &self.root }

    pub fn max_upload_bytes(&self) -> usize { self.max_upload_bytes }

    fn public_url(&self, relative: &str) -> String {
        format!("{}/media/{}", self.public_base_url, relative)
    }

    /// Persist an uploaded file after checking its type and size.
    pub async fn save_upload(&self, bytes: &[u8], content_type: &str) -> Result<StoredMedia, ServiceError> {
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        let ext = ALLOWED_TYPES
            .iter()
            .find(|(m, _)| *m == mime)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| ServiceError::UnsupportedMedia(mime.clone()))?;
        if bytes.is_empty() {
            return Err(ServiceError::validation("upload is empty"));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.max_upload_bytes
            )));
        }

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(self.root.join(&name), bytes).await.map_err(ServiceError::storage)?;
        info!(file = %name, size = bytes.len(), %mime, "media stored");
        Ok(StoredMedia { url: self.public_url(&name), mime_type: mime, size: bytes.len() })
    }

    /// Write a metadata document and return the URL Lens should fetch it from.
    pub async fn save_metadata(&self, doc: &serde_json::Value) -> Result<String, ServiceError> {
        let name = format!("metadata/{}.json", Uuid::new_v4());
        let data = serde_json::to_vec(doc).map_err(ServiceError::storage)?;
        fs::write(self.root.join(&name), data).await.map_err(ServiceError::storage)?;
        Ok(self.public_url(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn media_store(limit: usize) -> MediaStore {
        let root = std::env::temp_dir().join(format!("media_store_{}", Uuid::new_v4()));
        MediaStore::new(root, "https://social.example/", limit).await.unwrap()
    }

    #[tokio::test]
    async fn stores_allowed_upload() -> anyhow::Result<()> {
        let store = media_store(1024).await;
        let saved = store.save_upload(b"\x89PNG....", "image/png; charset=binary").await?;
        assert!(saved.url.starts_with("https://social.example/media/"));
        assert!(saved.url.ends_with(".png"));
        assert_eq!(saved.size, 8);
        let name = saved.url.rsplit('/').next().unwrap();
        assert_eq!(tokio::fs::read(store.root().join(name)).await?, b"\x89PNG....");
        let _ = tokio::fs::remove_dir_all(store.root()).await;
        Ok(())
    }

    #[tokio::test]
    async fn rejects_bad_uploads() {
        let store = media_store(4).await;
        assert!(matches!(store.save_upload(b"abc", "text/html").await, Err(ServiceError::UnsupportedMedia(_))));
        assert!(matches!(store.save_upload(b"", "image/gif").await, Err(ServiceError::Validation(_))));
        assert!(matches!(
            store.save_upload(b"too big", "image/gif").await,
            Err(ServiceError::PayloadTooLarge(msg)) if msg == "7 bytes exceeds 4"
        ));
        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn metadata_gets_public_url() -> anyhow::Result<()> {
        let store = media_store(4).await;
        let url = store.save_metadata(&serde_json::json!({"lens": {"content": "hi"}})).await?;
        assert!(url.starts_with("https://social.example/media/metadata/"));
        let _ = tokio::fs::remove_dir_all(store.root()).await;
        Ok(())
    }
}
