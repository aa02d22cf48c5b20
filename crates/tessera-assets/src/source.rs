use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::AssetError;
use crate::gltf_loader;
use crate::model::ModelAsset;

/// A boxed fetch, ready to be spawned on the cache's runtime.
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, AssetError>> + Send + 'static>>;

/// Where assets come from. The cache never fetches directly; it asks a source.
pub trait AssetSource<T>: Send + Sync {
    /// Start fetching the asset at `path`. The returned future must not borrow
    /// from `self`.
    fn fetch(&self, path: &str) -> FetchFuture<T>;
}

/// Loads glTF/GLB models from a directory on disk.
///
/// Paths are resolved against the root; a leading `/` means "root-relative",
/// so web-style paths such as `/shared/models/chunks/chunk_1_1.glb` work.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("FileSource rooted at {}", root.display());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl AssetSource<ModelAsset> for FileSource {
    fn fetch(&self, path: &str) -> FetchFuture<ModelAsset> {
        let full_path = self.resolve(path);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || gltf_loader::load_model(&full_path))
                .await
                .map_err(|e| AssetError::Transport(format!("loader task failed: {e}")))?
        })
    }
}

/// Downloads self-contained GLB models over HTTP.
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AssetError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AssetError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl AssetSource<ModelAsset> for HttpSource {
    fn fetch(&self, path: &str) -> FetchFuture<ModelAsset> {
        let client = self.client.clone();
        let url = self.url(path);
        let label = path.to_string();
        Box::pin(async move {
            debug!("GET {}", url);
            let response = client.get(&url).send().await?;
            match response.status() {
                StatusCode::NOT_FOUND => return Err(AssetError::NotFound(url)),
                status if !status.is_success() => {
                    return Err(AssetError::Transport(format!("{url} returned {status}")))
                }
                _ => {}
            }
            let bytes = response.bytes().await?;
            gltf_loader::parse_model(&bytes, &label)
        })
    }
}

/// An in-memory source keyed by path. Paths without an entry are `NotFound`.
///
/// An optional gate holds every fetch until a permit is added to the
/// semaphore; each permit releases exactly one fetch.
pub struct MemorySource<T> {
    entries: Mutex<HashMap<String, Result<T, AssetError>>>,
    fetches: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl<T: Clone + Send + 'static> MemorySource<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn insert(&self, path: impl Into<String>, asset: T) {
        self.entries.lock().insert(path.into(), Ok(asset));
    }

    /// Make every fetch of `path` fail with `error`.
    pub fn insert_error(&self, path: impl Into<String>, error: AssetError) {
        self.entries.lock().insert(path.into(), Err(error));
    }

    pub fn remove(&self, path: &str) {
        self.entries.lock().remove(path);
    }

    /// Number of fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + 'static> Default for MemorySource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> AssetSource<T> for MemorySource<T> {
    fn fetch(&self, path: &str) -> FetchFuture<T> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let result = self
            .entries
            .lock()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(AssetError::NotFound(path.to_string())));
        let gate = self.gate.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|_| AssetError::Transport("source gate closed".into()))?;
                permit.forget();
            }
            result
        })
    }
}
