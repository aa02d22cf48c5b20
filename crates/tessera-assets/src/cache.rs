use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use crate::error::AssetError;
use crate::model::ModelAsset;
use crate::source::AssetSource;

/// The cache used for chunk and character models.
pub type ModelCache = AssetCache<ModelAsset>;

/// A non-blocking handle to an asset load.
/// Call `try_recv()` each tick to check for the result without blocking the loop.
pub struct PendingAsset<T> {
    receiver: oneshot::Receiver<Result<T, AssetError>>,
}

impl<T> PendingAsset<T> {
    /// A handle that is already settled.
    pub fn ready(result: Result<T, AssetError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { receiver: rx }
    }

    /// Non-blocking check for the result. Returns `None` while still loading.
    ///
    /// Yields `Some` once; the handle should be dropped afterwards.
    pub fn try_recv(&mut self) -> Option<Result<T, AssetError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(AssetError::Transport("load was abandoned".into())))
            }
        }
    }

    /// Blocking wait for the result. Must not be called from inside an async
    /// context; only for start-up and tests.
    pub fn wait(self) -> Result<T, AssetError> {
        self.receiver
            .blocking_recv()
            .map_err(|_| AssetError::Transport("load was abandoned".into()))?
    }
}

struct CacheState<T> {
    loaded: HashMap<String, T>,
    in_flight: HashMap<String, Vec<oneshot::Sender<Result<T, AssetError>>>>,
    /// Bumped by `clear()`; fetches started before a clear do not repopulate.
    generation: u64,
    fetches: u64,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            loaded: HashMap::new(),
            in_flight: HashMap::new(),
            generation: 0,
            fetches: 0,
        }
    }
}

/// Deduplicating asynchronous asset loader.
///
/// At most one fetch per key is in flight; every caller for that key shares
/// its outcome. Successful results stay cached until `clear()`, and callers
/// always receive their own clone. Cloning the cache shares its state.
pub struct AssetCache<T> {
    state: Arc<Mutex<CacheState<T>>>,
    source: Arc<dyn AssetSource<T>>,
    handle: Handle,
    _runtime: Option<Arc<Runtime>>,
}

impl<T> Clone for AssetCache<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            source: Arc::clone(&self.source),
            handle: self.handle.clone(),
            _runtime: self._runtime.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> AssetCache<T> {
    /// Create a cache with its own small background runtime.
    pub fn new(source: Arc<dyn AssetSource<T>>) -> Result<Self, AssetError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("tessera-assets")
            .enable_all()
            .build()
            .map_err(|e| AssetError::Transport(format!("failed to create runtime: {e}")))?;
        info!("Asset cache started with a background runtime");
        Ok(Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            source,
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(runtime)),
        })
    }

    /// Create a cache that spawns its fetches on an existing runtime.
    pub fn with_handle(source: Arc<dyn AssetSource<T>>, handle: Handle) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            source,
            handle,
            _runtime: None,
        }
    }

    /// Request the asset at `path`, cached under `key`.
    pub fn load(&self, path: &str, key: &str) -> PendingAsset<T> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock();

        if let Some(asset) = state.loaded.get(key) {
            trace!("Asset '{}' served from cache", key);
            let _ = tx.send(Ok(asset.clone()));
            return PendingAsset { receiver: rx };
        }

        if let Some(waiters) = state.in_flight.get_mut(key) {
            trace!("Asset '{}' already in flight, joining", key);
            waiters.push(tx);
            return PendingAsset { receiver: rx };
        }

        state.in_flight.insert(key.to_string(), vec![tx]);
        state.fetches += 1;
        let generation = state.generation;
        drop(state);

        debug!("Fetching asset '{}' from {}", key, path);
        let fetch = self.source.fetch(path);
        let shared = Arc::clone(&self.state);
        let key = key.to_string();

        self.handle.spawn(async move {
            let result = fetch.await;
            let waiters = {
                let mut state = shared.lock();
                let waiters = state.in_flight.remove(&key).unwrap_or_default();
                if let Ok(asset) = &result {
                    if state.generation == generation {
                        state.loaded.insert(key.clone(), asset.clone());
                    }
                }
                waiters
            };
            match &result {
                Ok(_) => debug!("Asset '{}' loaded ({} waiters)", key, waiters.len()),
                Err(e) => warn!("Asset '{}' failed: {}", key, e),
            }
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        });

        PendingAsset { receiver: rx }
    }

    /// Issue several loads at once; they proceed in parallel.
    pub fn preload(&self, requests: &[(&str, &str)]) -> Vec<PendingAsset<T>> {
        requests
            .iter()
            .map(|(path, key)| self.load(path, key))
            .collect()
    }

    /// A clone of a cached asset, if present.
    pub fn get(&self, key: &str) -> Option<T> {
        self.state.lock().loaded.get(key).cloned()
    }

    pub fn is_loaded(&self, key: &str) -> bool {
        self.state.lock().loaded.contains_key(key)
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.state.lock().in_flight.contains_key(key)
    }

    /// Drop every cached asset. Fetches already in flight still deliver to
    /// their waiters but are not cached.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.loaded.len();
        state.loaded.clear();
        state.generation += 1;
        info!("Asset cache cleared ({} entries)", dropped);
    }

    pub fn loaded_count(&self) -> usize {
        self.state.lock().loaded.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Number of fetches issued to the source.
    pub fn fetch_count(&self) -> u64 {
        self.state.lock().fetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use tokio::sync::Semaphore;

    fn gated() -> (Arc<MemorySource<ModelAsset>>, Arc<Semaphore>, ModelCache) {
        let gate = Arc::new(Semaphore::new(0));
        let source = Arc::new(MemorySource::new().with_gate(gate.clone()));
        let cache: ModelCache = AssetCache::new(source.clone()).unwrap();
        (source, gate, cache)
    }

    #[test]
    fn concurrent_loads_share_one_fetch() {
        let (source, gate, cache) = gated();
        source.insert("chunk_1_1.glb", ModelAsset::new("chunk_1_1"));

        let a = cache.load("chunk_1_1.glb", "chunk_1_1");
        let b = cache.load("chunk_1_1.glb", "chunk_1_1");
        assert_eq!(cache.fetch_count(), 1);
        assert!(cache.is_loading("chunk_1_1"));

        gate.add_permits(1);
        assert_eq!(a.wait().unwrap().name, "chunk_1_1");
        assert_eq!(b.wait().unwrap().name, "chunk_1_1");
        assert_eq!(source.fetch_count(), 1);
        assert!(cache.is_loaded("chunk_1_1"));
        assert!(!cache.is_loading("chunk_1_1"));
    }

    #[test]
    fn cached_asset_is_served_without_fetching() {
        let (source, gate, cache) = gated();
        source.insert("hero.glb", ModelAsset::new("hero"));
        gate.add_permits(1);
        cache.load("hero.glb", "hero").wait().unwrap();

        let mut again = cache.load("hero.glb", "hero");
        assert!(matches!(again.try_recv(), Some(Ok(_))));
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn callers_receive_independent_clones() {
        let (source, gate, cache) = gated();
        source.insert("hero.glb", ModelAsset::new("hero").with_clip("idle", 1.0));
        gate.add_permits(1);

        let mut first = cache.load("hero.glb", "hero").wait().unwrap();
        first.clips.clear();
        first.name = "mutated".into();

        let second = cache.load("hero.glb", "hero").wait().unwrap();
        assert_eq!(second.name, "hero");
        assert_eq!(second.clips.len(), 1);
    }

    #[test]
    fn failure_reaches_every_waiter_and_next_call_retries() {
        let (source, gate, cache) = gated();
        source.insert_error("bad.glb", AssetError::Parse("truncated".into()));

        let a = cache.load("bad.glb", "bad");
        let b = cache.load("bad.glb", "bad");
        gate.add_permits(1);
        assert_eq!(a.wait(), Err(AssetError::Parse("truncated".into())));
        assert_eq!(b.wait(), Err(AssetError::Parse("truncated".into())));
        assert!(!cache.is_loading("bad"));
        assert!(!cache.is_loaded("bad"));

        source.insert("bad.glb", ModelAsset::new("fixed"));
        gate.add_permits(1);
        assert_eq!(cache.load("bad.glb", "bad").wait().unwrap().name, "fixed");
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn missing_asset_reports_not_found() {
        let (_source, gate, cache) = gated();
        gate.add_permits(1);
        assert!(matches!(
            cache.load("nope.glb", "nope").wait(),
            Err(AssetError::NotFound(_))
        ));
    }

    #[test]
    fn clear_forces_a_refetch() {
        let (source, gate, cache) = gated();
        source.insert("hero.glb", ModelAsset::new("hero"));
        gate.add_permits(2);
        cache.load("hero.glb", "hero").wait().unwrap();
        assert_eq!(cache.loaded_count(), 1);

        cache.clear();
        assert_eq!(cache.get("hero"), None);
        cache.load("hero.glb", "hero").wait().unwrap();
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn fetch_in_flight_during_clear_is_not_cached() {
        let (source, gate, cache) = gated();
        source.insert("hero.glb", ModelAsset::new("hero"));

        let pending = cache.load("hero.glb", "hero");
        cache.clear();
        gate.add_permits(1);
        assert!(pending.wait().is_ok());
        assert!(!cache.is_loaded("hero"));
    }

    #[test]
    fn preload_fans_out() {
        let (source, gate, cache) = gated();
        for key in ["chunk_1_1", "chunk_-1_1", "chunk_1_-1", "chunk_-1_-1"] {
            source.insert(format!("{key}.glb"), ModelAsset::new(key));
        }
        let paths: Vec<(String, String)> = ["chunk_1_1", "chunk_-1_1", "chunk_1_-1", "chunk_-1_-1"]
            .iter()
            .map(|k| (format!("{k}.glb"), k.to_string()))
            .collect();
        let requests: Vec<(&str, &str)> = paths
            .iter()
            .map(|(p, k)| (p.as_str(), k.as_str()))
            .collect();

        let pending = cache.preload(&requests);
        assert_eq!(cache.in_flight_count(), 4);
        gate.add_permits(4);
        for p in pending {
            assert!(p.wait().is_ok());
        }
        assert_eq!(cache.loaded_count(), 4);
    }
}
