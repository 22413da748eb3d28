use crate::resources::mesh::MeshData;

/// Creates a full-screen quad in NDC (z = 0), wound counter-clockwise.
#[must_use]
pub fn create_quad() -> MeshData {
    let positions = vec![
        [-1.0, -1.0, 0.0],
        [1.0, -1.0, 0.0],
        [1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
    ];
    let normals = vec![[0.0, 0.0, 1.0]; 4];
    let uvs = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let indices = vec![0, 1, 2, 0, 2, 3];

    MeshData::new("quad", positions, normals, uvs, indices)
}
