//! Pushes logical transforms onto scene objects

use tessera_core::Transform;
use tessera_ecs::{EcsError, Registry, System};
use tessera_render::{RenderComponent, SharedScene};
use tracing::trace;

/// Copies every `(Transform, RenderComponent)` pair onto the scene graph.
/// Runs last so it sees the final transforms of the tick.
#[derive(Default)]
pub struct RenderSystem {
    scene: Option<SharedScene>,
    synced: usize,
}

impl RenderSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects updated on the last tick.
    pub fn synced(&self) -> usize {
        self.synced
    }
}

impl System for RenderSystem {
    fn name(&self) -> &'static str {
        "render"
    }

    fn init(&mut self, registry: &mut Registry) -> Result<(), EcsError> {
        let scene = registry
            .resource::<SharedScene>()
            .cloned()
            .ok_or(EcsError::ConfigurationMissing {
                system: "render",
                what: "scene graph",
            })?;
        self.scene = Some(scene);
        Ok(())
    }

    fn update(&mut self, registry: &mut Registry, _dt: f32) {
        let Some(scene) = self.scene.as_ref() else {
            return;
        };
        let mut scene = scene.lock();
        self.synced = 0;
        for (entity, (transform, render)) in registry.query::<(&Transform, &RenderComponent)>() {
            let placed = scene.set_position(render.handle, transform.position)
                && scene.set_rotation(render.handle, transform.rotation);
            if placed {
                self.synced += 1;
            } else {
                trace!("Entity {} has no live scene object {}", entity, render.handle);
            }
        }
    }
}
