//! Game session bootstrap: builds the world, its systems and the player

use glam::Vec3;
use tessera_assets::{AssetError, ModelCache};
use tessera_core::Transform;
use tessera_ecs::{EcsError, Entity, Registry, World};
use tessera_render::SharedScene;
use tessera_world::{
    ChunkComponent, ChunkConfig, ChunkCoord, ChunkStreamingSystem, ContentManifest, Viewpoint,
};
use tracing::info;
use winit::event::ElementState;
use winit::keyboard::KeyCode;

use crate::character::{CharacterAssets, CharacterController, CharacterSystem};
use crate::components::{CharacterComponent, InputComponent, MovementComponent, PlayerComponent};
use crate::input::{InputAction, InputBindings, InputQueue, InputSystem};
use crate::locomotion::{LocomotionConfig, StateName};
use crate::movement::{MovementConfig, MovementSystem};
use crate::render_sync::RenderSystem;

/// Errors raised while setting up or driving a session.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Everything a session needs to start.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub chunks: ChunkConfig,
    pub manifest: ContentManifest,
    pub character: CharacterAssets,
    pub locomotion: LocomotionConfig,
    pub movement: MovementConfig,
    pub bindings: InputBindings,
    /// Where the player starts.
    pub spawn: Vec3,
    /// Load every available chunk within the load radius of the spawn point
    /// at start-up, in parallel.
    pub preload_chunks: bool,
}

/// A running client simulation: one world, one local player.
pub struct GameSession {
    world: World,
    player: Entity,
}

impl GameSession {
    /// Build the world and initialize every system.
    ///
    /// Systems run in the order input, movement, chunk streaming, character,
    /// render.
    pub fn new(config: SessionConfig, scene: SharedScene, cache: ModelCache) -> Result<Self, GameError> {
        let chunks = config.chunks.sanitized();
        let mut world = World::new();
        world.insert_resource(scene);
        world.insert_resource(cache);
        world.insert_resource(Viewpoint::new(config.spawn));
        world.insert_resource(InputQueue::default());

        let mut streaming = ChunkStreamingSystem::new(chunks.clone(), config.manifest.clone());
        if config.preload_chunks {
            let origin = ChunkCoord::from_world_pos(config.spawn, chunks.chunk_size);
            let initial = config.manifest.within(origin, chunks.load_radius);
            info!("Preloading {} chunks around {}", initial.len(), origin);
            streaming = streaming.with_preload(initial);
        }

        world.register_system(InputSystem::new(config.bindings))?;
        world.register_system(MovementSystem::new())?;
        world.register_system(streaming)?;
        world.register_system(CharacterSystem::new(config.character))?;
        world.register_system(RenderSystem::new())?;

        let player = world.create_entity();
        world.insert(player, Transform::from_position(config.spawn))?;
        world.insert(player, MovementComponent::from_config(&config.movement))?;
        world.insert(player, InputComponent::default())?;
        world.insert(player, CharacterComponent::default())?;
        world.insert(player, PlayerComponent::local())?;
        world.insert(player, CharacterController::new(config.locomotion))?;

        world.init()?;
        info!("Session started, player is {}", player);
        Ok(Self { world, player })
    }

    /// Advance the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.world.update(dt);
    }

    /// Queue a key event for the next tick.
    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        if let Some(queue) = self.world.registry_mut().resource_mut::<InputQueue>() {
            queue.key(key, state);
        }
    }

    pub fn press(&mut self, key: KeyCode) {
        self.handle_key(key, ElementState::Pressed);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.handle_key(key, ElementState::Released);
    }

    /// Press and release the dance action.
    pub fn trigger_dance(&mut self) {
        if let Some(queue) = self.world.registry_mut().resource_mut::<InputQueue>() {
            queue.action(InputAction::Dance, ElementState::Pressed);
            queue.action(InputAction::Dance, ElementState::Released);
        }
    }

    /// Click-to-move: walk the player toward `target`.
    pub fn set_move_target(&mut self, target: Vec3) {
        if let Some(movement) = self
            .world
            .registry_mut()
            .get_mut::<MovementComponent>(self.player)
        {
            movement.set_target(target);
        }
    }

    pub fn player(&self) -> Entity {
        self.player
    }

    pub fn registry(&self) -> &Registry {
        self.world.registry()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// The player's current locomotion state.
    pub fn character_state(&self) -> Option<StateName> {
        self.registry()
            .get::<CharacterComponent>(self.player)
            .map(|c| c.state)
    }

    /// Whether the character finished loading its model and clips.
    pub fn character_ready(&self) -> bool {
        self.registry()
            .get::<CharacterController>(self.player)
            .is_some_and(CharacterController::is_ready)
    }

    pub fn player_position(&self) -> Option<Vec3> {
        self.registry()
            .get::<Transform>(self.player)
            .map(|t| t.position)
    }

    /// Chunk entities alive, loaded or not.
    pub fn chunk_count(&self) -> usize {
        self.registry().count::<ChunkComponent>()
    }

    /// Coordinates of the chunks whose models are in the scene, sorted.
    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self
            .registry()
            .query::<&ChunkComponent>()
            .filter(|(_, chunk)| chunk.loaded)
            .map(|(_, chunk)| chunk.coord)
            .collect();
        coords.sort();
        coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tessera_assets::{AssetCache, MemorySource, ModelAsset};
    use tessera_render::HeadlessScene;

    const DT: f32 = 1.0 / 60.0;

    fn session(config: SessionConfig) -> (GameSession, Arc<parking_lot::Mutex<HeadlessScene>>) {
        let source = MemorySource::new();
        source.insert(
            config.character.model_path(),
            ModelAsset::new("hero"),
        );
        for (state, duration) in [
            (StateName::Idle, 2.0),
            (StateName::Walk, 1.0),
            (StateName::Run, 0.5),
            (StateName::Dance, 0.5),
        ] {
            source.insert(
                config.character.clip_path(state),
                ModelAsset::new(state.as_str()).with_clip(state.as_str(), duration),
            );
        }
        for coord in config.manifest.coords() {
            source.insert(config.chunks.asset_path(coord), ModelAsset::new(coord.key()));
        }
        let cache: ModelCache = AssetCache::new(Arc::new(source)).unwrap();
        let (headless, scene) = HeadlessScene::shared();
        let session = GameSession::new(config, scene, cache).unwrap();
        (session, headless)
    }

    fn run_until(session: &mut GameSession, mut done: impl FnMut(&GameSession) -> bool) {
        for _ in 0..500 {
            session.update(DT);
            if done(session) {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("condition never reached");
    }

    #[test]
    fn startup_loads_initial_chunks_and_character() {
        let (mut session, headless) = session(SessionConfig {
            preload_chunks: true,
            ..Default::default()
        });
        // Preload issued all four at init, before the first tick
        assert_eq!(session.chunk_count(), 4);

        run_until(&mut session, |s| s.loaded_chunks().len() == 4 && s.character_ready());
        assert_eq!(session.character_state(), Some(StateName::Idle));
        let labels = headless.lock().labels();
        assert!(labels.contains(&"character".to_string()));
        assert!(labels.contains(&"chunk_1_1".to_string()));
    }

    #[test]
    fn walk_key_round_trip() {
        let (mut session, _) = session(SessionConfig::default());
        run_until(&mut session, GameSession::character_ready);

        session.press(KeyCode::KeyW);
        session.update(DT);
        assert_eq!(session.character_state(), Some(StateName::Walk));
        assert!(session.player_position().unwrap().z < 0.0);

        session.release(KeyCode::KeyW);
        session.update(DT);
        assert_eq!(session.character_state(), Some(StateName::Idle));

        let controller = session
            .registry()
            .get::<CharacterController>(session.player())
            .unwrap();
        let transitions: Vec<_> = controller.history().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            transitions,
            vec![
                (None, StateName::Idle),
                (Some(StateName::Idle), StateName::Walk),
                (Some(StateName::Walk), StateName::Idle),
            ]
        );
    }

    #[test]
    fn motion_before_ready_is_remembered() {
        let (mut session, _) = session(SessionConfig::default());
        session.press(KeyCode::ShiftLeft);
        session.press(KeyCode::KeyD);
        session.update(DT);
        run_until(&mut session, GameSession::character_ready);
        assert_eq!(session.character_state(), Some(StateName::Run));
    }

    #[test]
    fn dance_returns_to_idle() {
        let (mut session, _) = session(SessionConfig::default());
        run_until(&mut session, GameSession::character_ready);
        session.trigger_dance();
        session.update(DT);
        assert_eq!(session.character_state(), Some(StateName::Dance));

        for _ in 0..60 {
            session.update(DT);
        }
        assert_eq!(session.character_state(), Some(StateName::Idle));
    }

    #[test]
    fn dance_while_running_resumes_running() {
        let (mut session, _) = session(SessionConfig::default());
        run_until(&mut session, GameSession::character_ready);

        session.press(KeyCode::ShiftLeft);
        session.press(KeyCode::KeyW);
        run_until(&mut session, |s| s.character_state() == Some(StateName::Run));

        session.trigger_dance();
        session.update(DT);
        assert_eq!(session.character_state(), Some(StateName::Dance));

        for _ in 0..60 {
            session.update(DT);
        }
        assert_eq!(session.character_state(), Some(StateName::Run));

        session.release(KeyCode::ShiftLeft);
        session.update(DT);
        assert_eq!(session.character_state(), Some(StateName::Walk));
    }

    #[test]
    fn walking_away_unloads_chunks() {
        let (mut session, _) = session(SessionConfig::default());
        run_until(&mut session, |s| s.loaded_chunks().len() == 4);

        let far = Vec3::new(5.0 * 64.0 + 1.0, 0.0, 5.0 * 64.0 + 1.0);
        if let Some(t) = session.world.registry_mut().get_mut::<Transform>(session.player) {
            t.position = far;
        }
        session.set_move_target(far + Vec3::X);
        session.update(DT);
        assert_eq!(session.chunk_count(), 0);
    }

    #[test]
    fn missing_scene_resource_is_fatal() {
        let mut world = World::new();
        world
            .register_system(RenderSystem::new())
            .unwrap();
        assert!(matches!(
            world.init(),
            Err(EcsError::ConfigurationMissing { system: "render", .. })
        ));
    }
}
