//! Tessera Render - Rendering-engine contract
//!
//! The scene-graph trait the simulation pushes objects and transforms into,
//! an in-process headless implementation, and per-character clip playback
//! with cross-fades.

pub mod animation;
pub mod component;
pub mod scene;

pub use animation::{AnimationMixer, AnimationProxy, ClipStatus, CrossFade, LoopMode, PlayRequest};
pub use component::RenderComponent;
pub use scene::{HeadlessScene, RenderHandle, SceneGraph, SceneObject, SharedScene};
