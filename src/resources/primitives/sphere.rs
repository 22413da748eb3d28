use std::f32::consts::PI;

use crate::resources::mesh::MeshData;

pub struct SphereOptions {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            width_segments: 32,
            height_segments: 16,
        }
    }
}

/// Creates a latitude/longitude UV sphere (Y-up).
#[must_use]
pub fn create_sphere(options: &SphereOptions) -> MeshData {
    let radius = options.radius;
    let width_segments = options.width_segments.max(3);
    let height_segments = options.height_segments.max(2);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();

    for y in 0..=height_segments {
        let v_ratio = y as f32 / height_segments as f32;
        // Latitude from south pole to north pole.
        let theta = v_ratio * PI;

        let py = -radius * theta.cos();
        let ring_radius = radius * theta.sin();

        for x in 0..=width_segments {
            let u_ratio = x as f32 / width_segments as f32;
            let phi = u_ratio * 2.0 * PI;

            let px = -ring_radius * phi.cos();
            let pz = ring_radius * phi.sin();

            positions.push([px, py, pz]);
            normals.push([px / radius, py / radius, pz / radius]);
            uvs.push([u_ratio, 1.0 - v_ratio]);
        }
    }

    // Two triangles per grid cell; the degenerate pole triangles are
    // harmless.
    let stride = width_segments + 1;
    for y in 0..height_segments {
        for x in 0..width_segments {
            let v0 = y * stride + x;
            let v1 = v0 + 1;
            let v2 = (y + 1) * stride + x;
            let v3 = v2 + 1;

            indices.extend_from_slice(&[v0, v1, v2]);
            indices.extend_from_slice(&[v1, v3, v2]);
        }
    }

    MeshData::new("sphere", positions, normals, uvs, indices)
}
