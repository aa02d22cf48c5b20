//! Chunk grid coordinates and the per-chunk component

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Grid coordinate for a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Convert a world position to the chunk coordinate that contains it
    pub fn from_world_pos(pos: Vec3, chunk_size: f32) -> Self {
        Self {
            x: (pos.x / chunk_size).floor() as i32,
            z: (pos.z / chunk_size).floor() as i32,
        }
    }

    /// Chebyshev distance to another chunk coord
    pub fn distance(&self, other: &ChunkCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }

    /// Cache key and file stem, e.g. `chunk_-1_1`
    pub fn key(&self) -> String {
        format!("chunk_{}_{}", self.x, self.z)
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Configuration for chunk streaming
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Size of each chunk in world units
    pub chunk_size: f32,
    /// Divides grid offsets when placing chunk models (exporter unit scale)
    pub scale_factor: f32,
    /// Radius in chunks around the viewpoint to keep loaded
    pub load_radius: u32,
    /// Radius beyond which chunks are unloaded (hysteresis)
    pub unload_radius: u32,
    /// Directory (or URL path) holding the chunk models
    pub chunk_dir: String,
    /// Model file extension
    pub extension: String,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64.0,
            scale_factor: 1.0,
            load_radius: 2,
            unload_radius: 3,
            chunk_dir: "/shared/models/chunks".to_string(),
            extension: "glb".to_string(),
        }
    }
}

impl ChunkConfig {
    /// Where the model for `coord` lives, e.g. `/shared/models/chunks/chunk_1_1.glb`
    pub fn asset_path(&self, coord: ChunkCoord) -> String {
        format!(
            "{}/{}.{}",
            self.chunk_dir.trim_end_matches('/'),
            coord.key(),
            self.extension
        )
    }

    /// Ensure `unload_radius >= load_radius` and positive sizes.
    pub fn sanitized(mut self) -> Self {
        if self.unload_radius < self.load_radius {
            tracing::warn!(
                "unload_radius {} < load_radius {}; raising it",
                self.unload_radius,
                self.load_radius
            );
            self.unload_radius = self.load_radius;
        }
        if self.chunk_size <= 0.0 {
            tracing::warn!("chunk_size {} is not positive; using 64", self.chunk_size);
            self.chunk_size = 64.0;
        }
        if self.scale_factor <= 0.0 {
            tracing::warn!("scale_factor {} is not positive; using 1", self.scale_factor);
            self.scale_factor = 1.0;
        }
        self
    }
}

/// A world chunk. Position and key are pure functions of the coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkComponent {
    pub coord: ChunkCoord,
    pub loaded: bool,
    pub visible: bool,
    pub size: f32,
    pub scale_factor: f32,
}

impl ChunkComponent {
    pub fn new(coord: ChunkCoord, config: &ChunkConfig) -> Self {
        Self {
            coord,
            loaded: false,
            visible: false,
            size: config.chunk_size,
            scale_factor: config.scale_factor,
        }
    }

    pub fn world_position(&self) -> Vec3 {
        Vec3::new(
            self.coord.x as f32 * self.size / self.scale_factor,
            0.0,
            self.coord.z as f32 * self.size / self.scale_factor,
        )
    }

    pub fn cache_key(&self) -> String {
        self.coord.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_coord_from_world_pos() {
        let chunk_size = 64.0;
        assert_eq!(
            ChunkCoord::from_world_pos(Vec3::new(0.0, 0.0, 0.0), chunk_size),
            ChunkCoord::new(0, 0)
        );
        assert_eq!(
            ChunkCoord::from_world_pos(Vec3::new(65.0, 0.0, 130.0), chunk_size),
            ChunkCoord::new(1, 2)
        );
        assert_eq!(
            ChunkCoord::from_world_pos(Vec3::new(-1.0, 0.0, -1.0), chunk_size),
            ChunkCoord::new(-1, -1)
        );
    }

    #[test]
    fn chunk_coord_distance_is_chebyshev() {
        let a = ChunkCoord::new(0, 0);
        assert_eq!(a.distance(&ChunkCoord::new(3, 2)), 3);
        assert_eq!(a.distance(&ChunkCoord::new(-2, 1)), 2);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn distance_saturates_far_from_origin() {
        let far = ChunkCoord::from_world_pos(Vec3::new(1e12, 0.0, 0.0), 64.0);
        assert_eq!(far.x, i32::MAX);
        assert_eq!(far.distance(&ChunkCoord::new(-1, 1)), i32::MAX as u32 + 1);
        let corner = ChunkCoord::new(i32::MIN, i32::MIN);
        assert_eq!(corner.distance(&ChunkCoord::new(i32::MAX, 0)), u32::MAX);
    }

    #[test]
    fn keys_and_paths() {
        let coord = ChunkCoord::new(-1, 1);
        assert_eq!(coord.key(), "chunk_-1_1");
        let config = ChunkConfig::default();
        assert_eq!(config.asset_path(coord), "/shared/models/chunks/chunk_-1_1.glb");

        let trailing = ChunkConfig {
            chunk_dir: "assets/chunks/".into(),
            ..Default::default()
        };
        assert_eq!(trailing.asset_path(coord), "assets/chunks/chunk_-1_1.glb");
    }

    #[test]
    fn world_position_uses_size_and_scale() {
        let config = ChunkConfig {
            chunk_size: 1.0,
            scale_factor: 10000.0,
            ..Default::default()
        };
        let chunk = ChunkComponent::new(ChunkCoord::new(1, -1), &config);
        assert_eq!(chunk.world_position(), Vec3::new(0.0001, 0.0, -0.0001));
        assert_eq!(chunk.cache_key(), "chunk_1_-1");

        let chunk = ChunkComponent::new(ChunkCoord::new(2, 3), &ChunkConfig::default());
        assert_eq!(chunk.world_position(), Vec3::new(128.0, 0.0, 192.0));
        assert!(!chunk.loaded && !chunk.visible);
    }

    #[test]
    fn sanitized_enforces_hysteresis_order() {
        let config = ChunkConfig {
            load_radius: 4,
            unload_radius: 2,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.unload_radius, 4);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ChunkConfig = serde_json::from_str(r#"{"load_radius": 1}"#).unwrap();
        assert_eq!(config.load_radius, 1);
        assert_eq!(config.unload_radius, 3);
        assert_eq!(config.extension, "glb");
    }
}
