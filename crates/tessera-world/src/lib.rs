//! Tessera World - Chunk streaming
//!
//! Grid coordinates, the content manifest of available chunks, and the system
//! that streams chunk models in and out around the viewpoint.

pub mod chunk;
pub mod manifest;
pub mod streaming;

pub use chunk::{ChunkComponent, ChunkConfig, ChunkCoord};
pub use manifest::{ContentManifest, ManifestError};
pub use streaming::{ChunkStreamingSystem, Viewpoint};
