use glam::Vec3;

/// A loaded model (renderer-agnostic): meshes plus the animation clips that
/// shipped in the same file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelAsset {
    pub name: String,
    pub meshes: Vec<MeshAsset>,
    pub clips: Vec<ClipAsset>,
}

/// A named mesh and its draw primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshAsset {
    pub name: String,
    pub primitives: Vec<MeshPrimitive>,
}

/// A single draw primitive within a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPrimitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Option<Vec<u32>>,
}

/// An animation clip. Only timing is kept; sampling is the renderer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipAsset {
    pub name: String,
    /// Length in seconds (the latest keyframe time over all channels).
    pub duration: f32,
}

impl ModelAsset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder used for placeholder content: append a clip.
    pub fn with_clip(mut self, name: impl Into<String>, duration: f32) -> Self {
        self.clips.push(ClipAsset {
            name: name.into(),
            duration,
        });
        self
    }

    /// Builder used for placeholder content: append a mesh.
    pub fn with_mesh(mut self, mesh: MeshAsset) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Look up a clip by name.
    pub fn clip(&self, name: &str) -> Option<&ClipAsset> {
        self.clips.iter().find(|c| c.name == name)
    }

    /// The first clip, which is what single-animation files carry.
    pub fn first_clip(&self) -> Option<&ClipAsset> {
        self.clips.first()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|m| &m.primitives)
            .map(|p| p.positions.len())
            .sum()
    }

    /// Axis-aligned bounds over every vertex, or `None` for an empty model.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self
            .meshes
            .iter()
            .flat_map(|m| &m.primitives)
            .flat_map(|p| &p.positions)
            .map(|&p| Vec3::from(p));
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

impl MeshAsset {
    /// A flat quad of the given half-extent in the XZ plane.
    pub fn quad(name: impl Into<String>, half_extent: f32) -> Self {
        let h = half_extent;
        Self {
            name: name.into(),
            primitives: vec![MeshPrimitive {
                positions: vec![[-h, 0.0, -h], [h, 0.0, -h], [h, 0.0, h], [-h, 0.0, h]],
                normals: vec![[0.0, 1.0, 0.0]; 4],
                indices: Some(vec![0, 2, 1, 0, 3, 2]),
            }],
        }
    }
}
