use crate::scene::RenderHandle;

/// Associates an entity with an object in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderComponent {
    pub handle: RenderHandle,
}

impl RenderComponent {
    pub fn new(handle: RenderHandle) -> Self {
        Self { handle }
    }
}
