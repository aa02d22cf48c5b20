//! Tessera Assets - Model loading and caching
//!
//! Provides glTF 2.0 model loading, pluggable asset sources (disk, HTTP,
//! in-memory) and a deduplicating asynchronous asset cache.

mod cache;
mod error;
mod gltf_loader;
mod model;
mod source;

pub use cache::{AssetCache, ModelCache, PendingAsset};
pub use error::AssetError;
pub use gltf_loader::{load_model, parse_model};
pub use model::{ClipAsset, MeshAsset, MeshPrimitive, ModelAsset};
pub use source::{AssetSource, FetchFuture, FileSource, HttpSource, MemorySource};
