//! Placeholder content and the scripted input sequence for the headless client

use glam::Vec3;
use tessera_assets::{MemorySource, MeshAsset, ModelAsset};
use tessera_game::{CharacterAssets, GameSession, StateName};
use tessera_world::{ChunkConfig, ContentManifest};
use tracing::info;
use winit::keyboard::KeyCode;

/// In-memory stand-ins for the character and every chunk in the manifest.
pub fn placeholder_source(
    character: &CharacterAssets,
    chunks: &ChunkConfig,
    manifest: &ContentManifest,
) -> MemorySource<ModelAsset> {
    let source = MemorySource::new();
    source.insert(
        character.model_path(),
        ModelAsset::new("character").with_mesh(MeshAsset::quad("body", 0.5)),
    );
    for (state, duration) in [
        (StateName::Idle, 2.0),
        (StateName::Walk, 1.0),
        (StateName::Run, 0.66),
        (StateName::Dance, 2.5),
    ] {
        source.insert(
            character.clip_path(state),
            ModelAsset::new(state.as_str()).with_clip(state.as_str(), duration),
        );
    }
    for coord in manifest.coords() {
        source.insert(
            chunks.asset_path(coord),
            ModelAsset::new(coord.key()).with_mesh(MeshAsset::quad("ground", chunks.chunk_size / 2.0)),
        );
    }
    source
}

/// One scripted input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Press(KeyCode),
    Release(KeyCode),
    Dance,
    MoveTo(Vec3),
}

/// Walk, run, stop, dance, then click-to-move; times in simulated seconds.
pub fn script() -> Vec<(f32, Step)> {
    vec![
        (1.0, Step::Press(KeyCode::KeyW)),
        (3.0, Step::Press(KeyCode::ShiftLeft)),
        (5.0, Step::Release(KeyCode::ShiftLeft)),
        (6.0, Step::Release(KeyCode::KeyW)),
        (7.0, Step::Dance),
        (10.5, Step::MoveTo(Vec3::new(8.0, 0.0, -30.0))),
    ]
}

/// Replays a script against a session as simulated time passes.
pub struct ScriptRunner {
    steps: Vec<(f32, Step)>,
    next: usize,
}

impl ScriptRunner {
    pub fn new(steps: Vec<(f32, Step)>) -> Self {
        Self { steps, next: 0 }
    }

    /// Apply every step due at or before `now`.
    pub fn apply(&mut self, now: f32, session: &mut GameSession) {
        while let Some(&(at, step)) = self.steps.get(self.next) {
            if at > now {
                break;
            }
            info!("[{:5.2}s] {:?}", now, step);
            match step {
                Step::Press(key) => session.press(key),
                Step::Release(key) => session.release(key),
                Step::Dance => session.trigger_dance(),
                Step::MoveTo(target) => session.set_move_target(target),
            }
            self.next += 1;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tessera_assets::{AssetCache, ModelCache};

    #[test]
    fn placeholder_covers_every_chunk_and_clip() {
        let character = CharacterAssets::default();
        let chunks = ChunkConfig::default();
        let manifest = ContentManifest::default();
        let source = placeholder_source(&character, &chunks, &manifest);
        let cache: ModelCache = AssetCache::new(Arc::new(source)).unwrap();

        for coord in manifest.coords() {
            let path = chunks.asset_path(coord);
            let model = cache.load(&path, &coord.key()).wait().unwrap();
            assert_eq!(model.name, coord.key());
        }
        for state in StateName::ALL {
            let path = character.clip_path(state);
            let clip = cache.load(&path, &path).wait().unwrap();
            assert_eq!(clip.first_clip().map(|c| c.name.as_str()), Some(state.as_str()));
        }
        let model_path = character.model_path();
        assert!(cache.load(&model_path, &model_path).wait().is_ok());
    }

    #[test]
    fn script_is_in_time_order() {
        let steps = script();
        assert!(steps.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
