// SPDX-License-Identifier: GPL-3.0-only

//! GLB export of foot meshes
//!
//! One glTF node and mesh per foot. Every mesh carries POSITION, NORMAL,
//! TEXCOORD_0 and COLOR_0 plus a u32 index buffer, all packed into the
//! single binary chunk.

use super::geometry::FootGeometry;
use crate::constants::app_info;
use crate::errors::GeometryError;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// glTF vertex colours are linear
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Appends attribute blocks to the binary buffer and records their views
struct BufferBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BufferBuilder {
    fn new() -> Self {
        Self {
            bin: Vec::new(),
            views: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Add one accessor backed by its own buffer view, returning its index
    fn push(
        &mut self,
        bytes: &[u8],
        count: usize,
        accessor_type: &str,
        component_type: u32,
        target: u32,
        stride: Option<usize>,
        bounds: Option<([f32; 3], [f32; 3])>,
    ) -> usize {
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        // Keep every view 4-byte aligned
        let padding = (4 - (self.bin.len() % 4)) % 4;
        self.bin.extend(std::iter::repeat_n(0u8, padding));

        let mut view = json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
            "target": target
        });
        if let Some(stride) = stride {
            view["byteStride"] = json!(stride);
        }
        self.views.push(view);

        let mut accessor = json!({
            "bufferView": self.views.len() - 1,
            "byteOffset": 0,
            "componentType": component_type,
            "count": count,
            "type": accessor_type
        });
        if let Some((min, max)) = bounds {
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }
}

/// Serialise meshes into a GLB byte stream
pub fn build_glb(geometries: &[FootGeometry]) -> Result<Vec<u8>, GeometryError> {
    if geometries.is_empty() {
        return Err(GeometryError::ExportFailed("no geometry to export".to_string()));
    }

    let mut buffers = BufferBuilder::new();
    let mut meshes = Vec::with_capacity(geometries.len());
    let mut nodes = Vec::with_capacity(geometries.len());

    for (i, geometry) in geometries.iter().enumerate() {
        let count = geometry.vertex_count();
        if geometry.normals.len() != count
            || geometry.uvs.len() != count
            || geometry.colors.len() != count
        {
            return Err(GeometryError::ExportFailed(format!(
                "{} foot has mismatched attribute lengths",
                geometry.side
            )));
        }

        let linear_colors: Vec<[f32; 3]> = geometry
            .colors
            .iter()
            .map(|c| [srgb_to_linear(c[0]), srgb_to_linear(c[1]), srgb_to_linear(c[2])])
            .collect();

        let position = buffers.push(
            bytemuck::cast_slice(&geometry.positions),
            count,
            "VEC3",
            FLOAT,
            ARRAY_BUFFER,
            Some(12),
            Some(geometry.bounds()),
        );
        let normal = buffers.push(
            bytemuck::cast_slice(&geometry.normals),
            count,
            "VEC3",
            FLOAT,
            ARRAY_BUFFER,
            Some(12),
            None,
        );
        let texcoord = buffers.push(
            bytemuck::cast_slice(&geometry.uvs),
            count,
            "VEC2",
            FLOAT,
            ARRAY_BUFFER,
            Some(8),
            None,
        );
        let color = buffers.push(
            bytemuck::cast_slice(&linear_colors),
            count,
            "VEC3",
            FLOAT,
            ARRAY_BUFFER,
            Some(12),
            None,
        );
        let indices = buffers.push(
            bytemuck::cast_slice(&geometry.indices),
            geometry.indices.len(),
            "SCALAR",
            UNSIGNED_INT,
            ELEMENT_ARRAY_BUFFER,
            None,
            None,
        );

        meshes.push(json!({
            "name": format!("{} foot", geometry.side),
            "primitives": [{
                "attributes": {
                    "POSITION": position,
                    "NORMAL": normal,
                    "TEXCOORD_0": texcoord,
                    "COLOR_0": color
                },
                "indices": indices,
                "material": 0,
                "mode": 4  // TRIANGLES
            }]
        }));
        nodes.push(json!({
            "name": format!("{} foot", geometry.side),
            "mesh": i
        }));
    }

    let gltf_json = json!({
        "asset": {
            "generator": app_info::generator(),
            "version": "2.0"
        },
        "scene": 0,
        "scenes": [{
            "nodes": (0..geometries.len()).collect::<Vec<_>>()
        }],
        "nodes": nodes,
        "meshes": meshes,
        "materials": [{
            "pbrMetallicRoughness": {
                "baseColorFactor": [1.0, 1.0, 1.0, 1.0],
                "metallicFactor": 0.1,
                "roughnessFactor": 0.6
            },
            "doubleSided": true
        }],
        "accessors": buffers.accessors,
        "bufferViews": buffers.views,
        "buffers": [{
            "byteLength": buffers.bin.len()
        }]
    });

    let json_string = serde_json::to_string(&gltf_json)
        .map_err(|e| GeometryError::ExportFailed(format!("Failed to serialize glTF: {}", e)))?;
    let json_bytes = json_string.as_bytes();
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let padded_json_len = json_bytes.len() + json_padding;
    let bin_len = buffers.bin.len();

    let total_length = 12 + 8 + padded_json_len + 8 + bin_len;
    let mut glb: Vec<u8> = Vec::with_capacity(total_length);

    // Header
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    // JSON chunk, space padded
    glb.extend_from_slice(&(padded_json_len as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes());
    glb.extend_from_slice(json_bytes);
    glb.extend(std::iter::repeat_n(0x20u8, json_padding));

    // BIN chunk, already aligned by BufferBuilder
    glb.extend_from_slice(&(bin_len as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes());
    glb.extend_from_slice(&buffers.bin);

    debug!(
        meshes = geometries.len(),
        json_bytes = padded_json_len,
        bin_bytes = bin_len,
        "GLB assembled"
    );
    Ok(glb)
}

/// Write meshes to `path` as GLB
pub async fn export_glb(geometries: Vec<FootGeometry>, path: &Path) -> Result<PathBuf, GeometryError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let glb = build_glb(&geometries)?;
        std::fs::write(&path, &glb).map_err(|e| {
            GeometryError::ExportFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), bytes = glb.len(), "Foot model exported");
        Ok(path)
    })
    .await
    .map_err(|e| GeometryError::ExportFailed(format!("Task join error: {}", e)))?
}
