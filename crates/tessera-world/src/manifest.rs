use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunk::ChunkCoord;

/// Errors reading a content manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed manifest: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct ManifestFile {
    chunks: Vec<[i32; 2]>,
}

/// The set of chunks that actually exist. Coordinates outside it are never
/// requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentManifest {
    chunks: HashSet<ChunkCoord>,
}

impl Default for ContentManifest {
    /// The four chunks around the origin.
    fn default() -> Self {
        Self::new([
            ChunkCoord::new(1, 1),
            ChunkCoord::new(-1, 1),
            ChunkCoord::new(1, -1),
            ChunkCoord::new(-1, -1),
        ])
    }
}

impl ContentManifest {
    pub fn new(chunks: impl IntoIterator<Item = ChunkCoord>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }

    /// Parse `{"chunks": [[x, z], ...]}`.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = serde_json::from_str(json)?;
        Ok(Self::new(
            file.chunks.into_iter().map(|[x, z]| ChunkCoord::new(x, z)),
        ))
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)?;
        let manifest = Self::from_json(&contents)?;
        info!(
            "Loaded content manifest from {} ({} chunks)",
            path.display(),
            manifest.len()
        );
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        let file = ManifestFile {
            chunks: self.coords().into_iter().map(|c| [c.x, c.z]).collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains(&coord)
    }

    pub fn insert(&mut self, coord: ChunkCoord) -> bool {
        self.chunks.insert(coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All coordinates, sorted.
    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.chunks.iter().copied().collect();
        coords.sort();
        coords
    }

    /// Available coordinates within `radius` of `center`, sorted.
    pub fn within(&self, center: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self
            .chunks
            .iter()
            .filter(|c| c.distance(&center) <= radius)
            .copied()
            .collect();
        coords.sort();
        coords
    }
}
