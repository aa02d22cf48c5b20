//! Rendering-engine contract
//!
//! The client never talks to a GPU directly. Systems register models with a
//! [`SceneGraph`] and push transforms to it; the concrete engine sits behind
//! the trait. [`HeadlessScene`] is the in-process implementation used by the
//! headless client and tests.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use tessera_assets::ModelAsset;
use tracing::{debug, trace};

/// Opaque handle to an object owned by the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(u64);

impl RenderHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the simulation needs from a rendering engine.
pub trait SceneGraph: Send {
    /// Take ownership of a model and add it to the scene.
    fn add_object(&mut self, label: &str, model: ModelAsset) -> RenderHandle;

    /// Remove an object. Returns `false` if the handle was unknown.
    fn remove_object(&mut self, handle: RenderHandle) -> bool;

    fn set_position(&mut self, handle: RenderHandle, position: Vec3) -> bool;

    /// Euler XYZ rotation in radians.
    fn set_rotation(&mut self, handle: RenderHandle, rotation: Vec3) -> bool;

    fn contains(&self, handle: RenderHandle) -> bool;

    fn object_count(&self) -> usize;
}

/// The scene graph as shared between systems (stored as a registry resource).
pub type SharedScene = Arc<Mutex<dyn SceneGraph>>;

/// An object held by [`HeadlessScene`].
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub label: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub vertex_count: usize,
}

/// A scene graph with no GPU behind it; tracks objects and their transforms.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    objects: HashMap<RenderHandle, SceneObject>,
    next_id: u64,
    added: usize,
    removed: usize,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in the shared form systems expect.
    pub fn shared() -> (Arc<Mutex<HeadlessScene>>, SharedScene) {
        let scene = Arc::new(Mutex::new(HeadlessScene::new()));
        let shared: SharedScene = scene.clone();
        (scene, shared)
    }

    pub fn object(&self, handle: RenderHandle) -> Option<&SceneObject> {
        self.objects.get(&handle)
    }

    /// Find an object by label.
    pub fn find(&self, label: &str) -> Option<(RenderHandle, &SceneObject)> {
        self.objects
            .iter()
            .find(|(_, o)| o.label == label)
            .map(|(&h, o)| (h, o))
    }

    /// Labels of every live object, sorted.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.objects.values().map(|o| o.label.clone()).collect();
        labels.sort();
        labels
    }

    /// Total objects ever added.
    pub fn total_added(&self) -> usize {
        self.added
    }

    /// Total objects ever removed.
    pub fn total_removed(&self) -> usize {
        self.removed
    }
}

impl SceneGraph for HeadlessScene {
    fn add_object(&mut self, label: &str, model: ModelAsset) -> RenderHandle {
        self.next_id += 1;
        let handle = RenderHandle(self.next_id);
        self.objects.insert(
            handle,
            SceneObject {
                label: label.to_string(),
                position: Vec3::ZERO,
                rotation: Vec3::ZERO,
                vertex_count: model.vertex_count(),
            },
        );
        self.added += 1;
        debug!("Scene: added '{}' as {}", label, handle);
        handle
    }

    fn remove_object(&mut self, handle: RenderHandle) -> bool {
        match self.objects.remove(&handle) {
            Some(object) => {
                self.removed += 1;
                debug!("Scene: removed '{}' ({})", object.label, handle);
                true
            }
            None => false,
        }
    }

    fn set_position(&mut self, handle: RenderHandle, position: Vec3) -> bool {
        let Some(object) = self.objects.get_mut(&handle) else {
            return false;
        };
        if object.position != position {
            trace!("Scene: {} -> {:?}", handle, position);
            object.position = position;
        }
        true
    }

    fn set_rotation(&mut self, handle: RenderHandle, rotation: Vec3) -> bool {
        let Some(object) = self.objects.get_mut(&handle) else {
            return false;
        };
        object.rotation = rotation;
        true
    }

    fn contains(&self, handle: RenderHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    fn object_count(&self) -> usize {
        self.objects.len()
    }
}
