use std::path::Path;

use tracing::debug;

use crate::error::AssetError;
use crate::model::{ClipAsset, MeshAsset, MeshPrimitive, ModelAsset};

/// Load a glTF 2.0 file (.gltf or .glb) from disk.
pub fn load_model(path: &Path) -> Result<ModelAsset, AssetError> {
    if !path.exists() {
        return Err(AssetError::NotFound(path.display().to_string()));
    }
    let (document, buffers, _images) = gltf::import(path)?;
    let label = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    Ok(extract(&document, &buffers, label))
}

/// Parse a self-contained glTF/GLB payload (e.g. an HTTP response body).
pub fn parse_model(bytes: &[u8], label: &str) -> Result<ModelAsset, AssetError> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| AssetError::Parse(format!("{label}: {e}")))?;
    Ok(extract(&document, &buffers, label))
}

fn extract(document: &gltf::Document, buffers: &[gltf::buffer::Data], label: &str) -> ModelAsset {
    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let name = mesh.name().unwrap_or("unnamed").to_string();
        let mut primitives = Vec::new();

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let indices: Option<Vec<u32>> = reader
                .read_indices()
                .map(|idx| idx.into_u32().collect());

            primitives.push(MeshPrimitive {
                positions,
                normals,
                indices,
            });
        }

        meshes.push(MeshAsset { name, primitives });
    }

    let mut clips = Vec::new();
    for (i, animation) in document.animations().enumerate() {
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{i}"));

        let duration = animation
            .channels()
            .filter_map(|channel| {
                let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
                reader.read_inputs().map(|inputs| inputs.fold(0.0f32, f32::max))
            })
            .fold(0.0f32, f32::max);

        clips.push(ClipAsset { name, duration });
    }

    debug!(
        "glTF '{}': {} meshes, {} clips",
        label,
        meshes.len(),
        clips.len()
    );

    ModelAsset {
        name: label.to_string(),
        meshes,
        clips,
    }
}
