//! Character model loading and per-entity locomotion control
//!
//! The [`CharacterController`] component owns the character's animation mixer
//! and locomotion machine. Loading the base model and the four clip files is
//! aggregated: the machine only enters its first state once every request has
//! settled, and state requests made before then are remembered.

use serde::{Deserialize, Serialize};
use tessera_assets::{AssetError, ModelAsset, ModelCache, PendingAsset};
use tessera_core::Transform;
use tessera_ecs::{EcsError, Entity, Registry, System};
use tessera_render::{AnimationMixer, RenderComponent, SharedScene};
use tracing::{debug, info, warn};

use crate::components::{CharacterComponent, InputComponent, MovementComponent};
use crate::locomotion::{
    LocomotionConfig, LocomotionMachine, MovementIntent, SetStateOutcome, StateName, Transition,
};

/// Where the character model and its clips live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterAssets {
    pub base_path: String,
    pub model: String,
    pub idle: String,
    pub walk: String,
    pub run: String,
    pub dance: String,
}

impl Default for CharacterAssets {
    fn default() -> Self {
        Self {
            base_path: "/client/models/character".to_string(),
            model: "model.glb".to_string(),
            idle: "idle.glb".to_string(),
            walk: "walk.glb".to_string(),
            run: "run.glb".to_string(),
            dance: "dance.glb".to_string(),
        }
    }
}

impl CharacterAssets {
    pub fn model_path(&self) -> String {
        self.join(&self.model)
    }

    pub fn clip_path(&self, state: StateName) -> String {
        let file = match state {
            StateName::Idle => &self.idle,
            StateName::Walk => &self.walk,
            StateName::Run => &self.run,
            StateName::Dance => &self.dance,
        };
        self.join(file)
    }

    fn join(&self, file: &str) -> String {
        format!("{}/{}", self.base_path.trim_end_matches('/'), file)
    }
}

/// Outstanding requests for the model and clips.
struct CharacterLoading {
    model: Option<PendingAsset<ModelAsset>>,
    loaded_model: Option<ModelAsset>,
    clips: Vec<(StateName, PendingAsset<ModelAsset>)>,
}

impl CharacterLoading {
    fn is_settled(&self) -> bool {
        self.model.is_none() && self.clips.is_empty()
    }
}

/// Per-character animation state: mixer, locomotion machine and loading.
pub struct CharacterController {
    machine: LocomotionMachine,
    mixer: AnimationMixer,
    loading: Option<CharacterLoading>,
    /// State to enter once loading settles; last request wins.
    pending_state: StateName,
    started: bool,
    ready: bool,
}

impl std::fmt::Debug for CharacterController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterController")
            .field("state", &self.machine.current())
            .field("pending_state", &self.pending_state)
            .field("clips", &self.mixer.clip_count())
            .field("ready", &self.ready)
            .finish()
    }
}

impl CharacterController {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            machine: LocomotionMachine::new(config),
            mixer: AnimationMixer::new(),
            loading: None,
            pending_state: StateName::Idle,
            started: false,
            ready: false,
        }
    }

    /// A controller whose clips are already available; enters the pending
    /// state immediately.
    pub fn with_mixer(config: LocomotionConfig, mixer: AnimationMixer) -> Self {
        let mut controller = Self::new(config);
        controller.mixer = mixer;
        controller.started = true;
        controller.finish_loading();
        controller
    }

    /// Request the model and every clip. Called once; later calls are ignored.
    pub fn begin_loading(&mut self, cache: &ModelCache, assets: &CharacterAssets) {
        if self.started {
            return;
        }
        self.started = true;

        let model_path = assets.model_path();
        info!("Loading character model from {}", model_path);
        let model = cache.load(&model_path, &model_path);
        let clips = StateName::ALL
            .into_iter()
            .map(|state| {
                let path = assets.clip_path(state);
                (state, cache.load(&path, &path))
            })
            .collect();

        self.loading = Some(CharacterLoading {
            model: Some(model),
            loaded_model: None,
            clips,
        });
    }

    /// Collect finished loads. Returns the base model once, on the tick the
    /// whole batch settles, if it loaded.
    pub fn poll_loading(&mut self) -> Option<ModelAsset> {
        let loading = self.loading.as_mut()?;

        if let Some(pending) = loading.model.as_mut() {
            if let Some(result) = pending.try_recv() {
                loading.model = None;
                match result {
                    Ok(model) => {
                        debug!("Character model '{}' loaded", model.name);
                        loading.loaded_model = Some(model);
                    }
                    Err(e) => warn!("Character model failed to load: {}", e),
                }
            }
        }

        let mut still_loading = Vec::with_capacity(loading.clips.len());
        for (state, mut pending) in loading.clips.drain(..) {
            match pending.try_recv() {
                None => still_loading.push((state, pending)),
                Some(result) => register_clip(&mut self.mixer, state, result),
            }
        }
        loading.clips = still_loading;

        if !loading.is_settled() {
            return None;
        }
        let model = self.loading.take().and_then(|l| l.loaded_model);
        self.finish_loading();
        model
    }

    fn finish_loading(&mut self) {
        self.ready = true;
        info!(
            "Character ready with {} clips, entering {}",
            self.mixer.clip_count(),
            self.pending_state
        );
        self.machine.set_state(self.pending_state, &mut self.mixer);
    }

    /// Ask for a state change. Before loading settles the request is only
    /// remembered.
    pub fn request(&mut self, state: StateName) -> SetStateOutcome {
        if !self.ready {
            self.pending_state = state;
            return SetStateOutcome::Deferred;
        }
        self.machine.set_state(state, &mut self.mixer)
    }

    /// Advance clip playback, then the machine.
    pub fn update(&mut self, dt: f32, intent: MovementIntent) -> Option<Transition> {
        if !self.ready {
            return None;
        }
        self.mixer.update(dt);
        self.machine.update(dt, intent, &mut self.mixer)
    }

    pub fn state(&self) -> Option<StateName> {
        self.machine.current()
    }

    pub fn pending_state(&self) -> StateName {
        self.pending_state
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn history(&self) -> impl Iterator<Item = &Transition> {
        self.machine.history()
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }
}

fn register_clip(mixer: &mut AnimationMixer, state: StateName, result: Result<ModelAsset, AssetError>) {
    match result {
        Ok(asset) => match asset.first_clip() {
            Some(clip) => mixer.add_clip(state.clip(), clip),
            None => warn!("Clip file for {} contains no animation", state),
        },
        Err(e) => warn!("Clip for {} failed to load: {}", state, e),
    }
}

/// Drives every [`CharacterController`]: starts loading, registers the model
/// with the scene, feeds movement intent to the machine.
pub struct CharacterSystem {
    assets: CharacterAssets,
    scene: Option<SharedScene>,
    cache: Option<ModelCache>,
}

impl CharacterSystem {
    pub fn new(assets: CharacterAssets) -> Self {
        Self {
            assets,
            scene: None,
            cache: None,
        }
    }

    pub fn assets(&self) -> &CharacterAssets {
        &self.assets
    }

    fn attach_model(&self, registry: &mut Registry, entity: Entity, model: ModelAsset) {
        let Some(scene) = self.scene.as_ref() else {
            return;
        };
        let transform = registry.get::<Transform>(entity).copied().unwrap_or_default();
        let handle = {
            let mut scene = scene.lock();
            let handle = scene.add_object("character", model);
            scene.set_position(handle, transform.position);
            scene.set_rotation(handle, transform.rotation);
            handle
        };
        info!("Character {} added to scene as {}", entity, handle);
        if let Err(e) = registry.insert(entity, RenderComponent::new(handle)) {
            warn!("Character {} vanished before its model arrived: {}", entity, e);
            scene.lock().remove_object(handle);
        }
    }
}

impl System for CharacterSystem {
    fn name(&self) -> &'static str {
        "character"
    }

    fn init(&mut self, registry: &mut Registry) -> Result<(), EcsError> {
        let scene = registry
            .resource::<SharedScene>()
            .cloned()
            .ok_or(EcsError::ConfigurationMissing {
                system: "character",
                what: "scene graph",
            })?;
        let cache = registry
            .resource::<ModelCache>()
            .cloned()
            .ok_or(EcsError::ConfigurationMissing {
                system: "character",
                what: "model cache",
            })?;

        for entity in registry.entities_with::<CharacterController>() {
            if let Some(controller) = registry.get_mut::<CharacterController>(entity) {
                controller.begin_loading(&cache, &self.assets);
            }
        }
        self.scene = Some(scene);
        self.cache = Some(cache);
        Ok(())
    }

    fn update(&mut self, registry: &mut Registry, dt: f32) {
        let Some(cache) = self.cache.clone() else {
            return;
        };

        for entity in registry.entities_with::<CharacterController>() {
            let mut intent = registry
                .get::<InputComponent>(entity)
                .map(|input| input.intent)
                .unwrap_or_default();
            if registry
                .get::<MovementComponent>(entity)
                .is_some_and(|m| m.is_moving)
            {
                intent.is_moving = true;
            }

            let Some(controller) = registry.get_mut::<CharacterController>(entity) else {
                continue;
            };
            controller.begin_loading(&cache, &self.assets);
            let model = controller.poll_loading();
            if let Some(t) = controller.update(dt, intent) {
                debug!("Character {}: {:?} -> {}", entity, t.from, t.to);
            }
            let state = controller.state();

            if let Some(model) = model {
                self.attach_model(registry, entity, model);
            }
            if let (Some(state), Some(character)) =
                (state, registry.get_mut::<CharacterComponent>(entity))
            {
                character.state = state;
            }
        }
    }
}
