//! Chunk streaming around the viewpoint

use std::collections::HashMap;

use glam::Vec3;
use tessera_assets::{AssetError, ModelAsset, ModelCache, PendingAsset};
use tessera_core::Transform;
use tessera_ecs::{EcsError, Entity, Registry, System};
use tessera_render::{RenderComponent, RenderHandle, SharedScene};
use tracing::{debug, info, trace, warn};

use crate::chunk::{ChunkComponent, ChunkConfig, ChunkCoord};
use crate::manifest::ContentManifest;

/// Where the world is being viewed from. Written by whoever owns the local
/// player, read by streaming.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewpoint {
    pub position: Vec3,
}

impl Viewpoint {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }
}

struct LoadedChunk {
    entity: Entity,
    handle: RenderHandle,
}

struct InFlightChunk {
    entity: Entity,
    pending: PendingAsset<ModelAsset>,
}

/// Loads chunks that come within `load_radius` of the viewpoint and unloads
/// those beyond `unload_radius`.
///
/// Needs a [`SharedScene`] and a [`ModelCache`] resource at init.
pub struct ChunkStreamingSystem {
    config: ChunkConfig,
    manifest: ContentManifest,
    /// Chunks with a live entity and a scene object.
    index: HashMap<ChunkCoord, LoadedChunk>,
    /// Chunks whose model is still being fetched.
    loading: HashMap<ChunkCoord, InFlightChunk>,
    preload: Vec<ChunkCoord>,
    scene: Option<SharedScene>,
    cache: Option<ModelCache>,
    center: Option<ChunkCoord>,
}

impl ChunkStreamingSystem {
    pub fn new(config: ChunkConfig, manifest: ContentManifest) -> Self {
        Self {
            config: config.sanitized(),
            manifest,
            index: HashMap::new(),
            loading: HashMap::new(),
            preload: Vec::new(),
            scene: None,
            cache: None,
            center: None,
        }
    }

    /// Chunks to request as soon as the system is initialized.
    pub fn with_preload(mut self, coords: impl IntoIterator<Item = ChunkCoord>) -> Self {
        self.preload.extend(coords);
        self
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    pub fn manifest(&self) -> &ContentManifest {
        &self.manifest
    }

    /// Request a chunk. Returns the chunk's entity (provisional while the
    /// model is in flight), or `None` if the chunk is not in the manifest or
    /// the system has not been initialized.
    ///
    /// Calling it again for the same chunk returns the same entity.
    pub fn load_chunk(&mut self, registry: &mut Registry, coord: ChunkCoord) -> Option<Entity> {
        if !self.manifest.contains(coord) {
            trace!("Chunk {} not in manifest, skipping", coord);
            return None;
        }
        if let Some(loaded) = self.index.get(&coord) {
            if registry.contains(loaded.entity) {
                return Some(loaded.entity);
            }
            debug!("Chunk {} entity {} was removed externally", coord, loaded.entity);
            self.forget(coord);
        }
        if let Some(in_flight) = self.loading.get(&coord) {
            return Some(in_flight.entity);
        }
        let Some(cache) = &self.cache else {
            warn!("Chunk {} requested before streaming was initialized", coord);
            return None;
        };

        let chunk = ChunkComponent::new(coord, &self.config);
        let transform = Transform::from_position(chunk.world_position());
        let path = self.config.asset_path(coord);
        let key = chunk.cache_key();

        let entity = registry.create_entity();
        if let Err(e) = registry
            .insert(entity, chunk)
            .and_then(|()| registry.insert(entity, transform))
        {
            warn!("Failed to set up chunk {}: {}", coord, e);
            return None;
        }

        info!("Loading chunk {} as {}", coord, entity);
        let pending = cache.load(&path, &key);
        self.loading.insert(coord, InFlightChunk { entity, pending });
        Some(entity)
    }

    /// Unload an indexed chunk: remove its scene object, destroy its entity
    /// and drop the index entry. Chunks still in flight are left alone.
    pub fn unload_chunk(&mut self, registry: &mut Registry, coord: ChunkCoord) -> bool {
        let Some(loaded) = self.index.remove(&coord) else {
            return false;
        };
        if let Some(scene) = &self.scene {
            scene.lock().remove_object(loaded.handle);
        }
        if let Err(e) = registry.remove_entity(loaded.entity) {
            debug!("Chunk {} entity already gone: {}", coord, e);
        }
        info!("Unloaded chunk {}", coord);
        true
    }

    /// Request several chunks at once; their fetches run in parallel.
    pub fn preload(&mut self, registry: &mut Registry, coords: &[ChunkCoord]) -> Vec<Entity> {
        coords
            .iter()
            .filter_map(|&coord| self.load_chunk(registry, coord))
            .collect()
    }

    /// Number of chunks with a live entity and scene object.
    pub fn loaded_count(&self) -> usize {
        self.index.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.loading.len()
    }

    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.index.contains_key(&coord)
    }

    /// Entity of a loaded chunk, if it is still alive in `registry`.
    pub fn entity_for(&self, registry: &Registry, coord: ChunkCoord) -> Option<Entity> {
        self.index
            .get(&coord)
            .map(|c| c.entity)
            .filter(|&entity| registry.contains(entity))
    }

    /// Drop an index entry and its scene object without touching the registry.
    fn forget(&mut self, coord: ChunkCoord) {
        if let Some(loaded) = self.index.remove(&coord) {
            if let Some(scene) = &self.scene {
                scene.lock().remove_object(loaded.handle);
            }
        }
    }

    /// Coordinates of every loaded chunk, sorted.
    pub fn loaded_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.index.keys().copied().collect();
        coords.sort();
        coords
    }

    /// The chunk the viewpoint was in at the last update.
    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    /// Drop index entries whose entity was removed behind our back.
    fn sweep_removed(&mut self, registry: &Registry) {
        let scene = &self.scene;
        self.index.retain(|coord, loaded| {
            if registry.contains(loaded.entity) {
                return true;
            }
            debug!("Chunk {} entity {} was removed externally", coord, loaded.entity);
            if let Some(scene) = scene {
                scene.lock().remove_object(loaded.handle);
            }
            false
        });
    }

    fn unload_distant(&mut self, registry: &mut Registry, center: ChunkCoord) {
        let radius = self.config.unload_radius;
        let to_unload: Vec<ChunkCoord> = self
            .index
            .keys()
            .filter(|coord| coord.distance(&center) > radius)
            .copied()
            .collect();
        for coord in to_unload {
            self.unload_chunk(registry, coord);
        }
    }

    fn apply_completed(&mut self, registry: &mut Registry) {
        let completed: Vec<(ChunkCoord, Result<ModelAsset, AssetError>)> = self
            .loading
            .iter_mut()
            .filter_map(|(&coord, in_flight)| in_flight.pending.try_recv().map(|r| (coord, r)))
            .collect();

        for (coord, result) in completed {
            let Some(in_flight) = self.loading.remove(&coord) else {
                continue;
            };
            let entity = in_flight.entity;

            let model = match result {
                Ok(model) => model,
                Err(e) => {
                    warn!("Failed to load chunk {}: {}", coord, e);
                    if let Err(e) = registry.remove_entity(entity) {
                        debug!("Chunk {} entity already gone: {}", coord, e);
                    }
                    continue;
                }
            };

            if !registry.contains(entity) {
                debug!("Chunk {} arrived after its entity was removed", coord);
                continue;
            }
            let Some(scene) = &self.scene else {
                continue;
            };

            let position = registry
                .get::<ChunkComponent>(entity)
                .map(ChunkComponent::world_position)
                .unwrap_or(Vec3::ZERO);
            let handle = {
                let mut scene = scene.lock();
                let handle = scene.add_object(&coord.key(), model);
                scene.set_position(handle, position);
                handle
            };

            if let Err(e) = registry.insert(entity, RenderComponent::new(handle)) {
                warn!("Chunk {} lost its entity: {}", coord, e);
                scene.lock().remove_object(handle);
                continue;
            }
            if let Some(chunk) = registry.get_mut::<ChunkComponent>(entity) {
                chunk.loaded = true;
                chunk.visible = true;
            }
            self.index.insert(coord, LoadedChunk { entity, handle });
            info!("Loaded chunk {}", coord);
        }
    }

    fn request_desired(&mut self, registry: &mut Registry, center: ChunkCoord) {
        for coord in self.manifest.within(center, self.config.load_radius) {
            if !self.index.contains_key(&coord) && !self.loading.contains_key(&coord) {
                self.load_chunk(registry, coord);
            }
        }
    }
}

impl System for ChunkStreamingSystem {
    fn name(&self) -> &'static str {
        "chunk_streaming"
    }

    fn init(&mut self, registry: &mut Registry) -> Result<(), EcsError> {
        let scene = registry
            .resource::<SharedScene>()
            .cloned()
            .ok_or(EcsError::ConfigurationMissing {
                system: self.name(),
                what: "scene graph",
            })?;
        let cache = registry
            .resource::<ModelCache>()
            .cloned()
            .ok_or(EcsError::ConfigurationMissing {
                system: self.name(),
                what: "model cache",
            })?;
        self.scene = Some(scene);
        self.cache = Some(cache);

        info!(
            "Chunk streaming: size {}, load radius {}, unload radius {}, {} chunks available",
            self.config.chunk_size,
            self.config.load_radius,
            self.config.unload_radius,
            self.manifest.len()
        );

        let preload = std::mem::take(&mut self.preload);
        if !preload.is_empty() {
            let issued = self.preload(registry, &preload);
            info!("Preloading {} chunks", issued.len());
        }
        Ok(())
    }

    fn update(&mut self, registry: &mut Registry, _dt: f32) {
        if self.cache.is_none() {
            return;
        }
        let position = registry
            .resource::<Viewpoint>()
            .map(|v| v.position)
            .unwrap_or(Vec3::ZERO);
        let center = ChunkCoord::from_world_pos(position, self.config.chunk_size);
        if self.center != Some(center) {
            debug!("Viewpoint entered chunk {}", center);
            self.center = Some(center);
        }

        self.sweep_removed(registry);
        self.unload_distant(registry, center);
        self.apply_completed(registry);
        self.request_desired(registry, center);
    }
}
