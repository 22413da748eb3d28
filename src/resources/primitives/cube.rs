use crate::resources::mesh::MeshData;

/// Creates a unit cube (half-extent `size`) with per-face normals.
///
/// Used by the environment capture passes, which render the cube from the
/// inside; callers disable back-face culling for that.
#[must_use]
pub fn create_cube(size: f32) -> MeshData {
    let s = size;

    // 24 vertices, 4 per face.
    let face_data: [([f32; 3], [[f32; 3]; 4]); 6] = [
        // +X
        (
            [1.0, 0.0, 0.0],
            [[s, -s, -s], [s, s, -s], [s, s, s], [s, -s, s]],
        ),
        // -X
        (
            [-1.0, 0.0, 0.0],
            [[-s, -s, s], [-s, s, s], [-s, s, -s], [-s, -s, -s]],
        ),
        // +Y
        (
            [0.0, 1.0, 0.0],
            [[-s, s, s], [s, s, s], [s, s, -s], [-s, s, -s]],
        ),
        // -Y
        (
            [0.0, -1.0, 0.0],
            [[-s, -s, -s], [s, -s, -s], [s, -s, s], [-s, -s, s]],
        ),
        // +Z
        (
            [0.0, 0.0, 1.0],
            [[s, -s, s], [s, s, s], [-s, s, s], [-s, -s, s]],
        ),
        // -Z
        (
            [0.0, 0.0, -1.0],
            [[-s, -s, -s], [-s, s, -s], [s, s, -s], [s, -s, -s]],
        ),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, corners)) in face_data.iter().enumerate() {
        let base = (face * 4) as u32;
        positions.extend_from_slice(corners);
        normals.extend_from_slice(&[*normal; 4]);
        uvs.extend_from_slice(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]);
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::new("cube", positions, normals, uvs, indices)
}
