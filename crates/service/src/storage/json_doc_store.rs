use std::{marker::PhantomData, path::PathBuf, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::debug;

use crate::errors::ServiceError;
use crate::observability::STORE_WRITES_TOTAL;

/// Generic JSON file-backed document store.
///
/// The whole document `T` lives in one file. Reads parse the file fresh;
/// mutations are serialized through a single async mutex, reload the file,
/// apply the change and write it back through a temp file + rename so a
/// crash mid-write never leaves a truncated document behind.
pub struct JsonDocStore<T> {
    file_path: PathBuf,
    write_lock: Mutex<()>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonDocStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Initialize the store from a path. Creates the file with `T::default()` if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(ServiceError::storage)?;
        }

        let store = Self { file_path, write_lock: Mutex::new(()), _doc: PhantomData };
        if fs::metadata(&store.file_path).await.is_err() {
            store.save(&T::default()).await?;
        }
        Ok(Arc::new(store))
    }

    pub fn path(&self) -> &std::path::Path { &self.file_path }

    /// Parse the current document from disk.
    pub async fn load(&self) -> Result<T, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(ServiceError::storage(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            ServiceError::Storage(format!("corrupt document {}: {e}", self.file_path.display()))
        })
    }

    async fn save(&self, doc: &T) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(doc).map_err(ServiceError::storage)?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, data).await.map_err(ServiceError::storage)?;
        fs::rename(&tmp, &self.file_path).await.map_err(ServiceError::storage)?;
        STORE_WRITES_TOTAL.inc();
        debug!(path = %self.file_path.display(), "document persisted");
        Ok(())
    }

    /// Apply a mutation to a freshly loaded document and persist it.
    /// Nothing is written when `f` fails.
    pub async fn mutate<F, R>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut T) -> Result<R, ServiceError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        let out = f(&mut doc)?;
        self.save(&doc).await?;
        Ok(out)
    }
}
