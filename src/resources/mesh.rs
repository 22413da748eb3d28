use std::borrow::Cow;

use slotmap::SlotMap;
use wgpu::PrimitiveTopology;

use crate::resources::{BoundingBox, MeshKey};

/// CPU-side mesh data: planar vertex attributes plus an index list.
///
/// Mesh import (file decode, tangent generation) is an external concern;
/// this type is the handoff format the importer produces and the
/// primitive generators emit. The local bounding box is computed once at
/// construction.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: Cow<'static, str>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub topology: PrimitiveTopology,
    bounds: BoundingBox,
}

impl MeshData {
    #[must_use]
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Vec<[f32; 2]>,
        indices: Vec<u32>,
    ) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            name: name.into(),
            positions,
            normals,
            uvs,
            indices,
            topology: PrimitiveTopology::TriangleList,
            bounds,
        }
    }

    fn compute_bounds(positions: &[[f32; 3]]) -> BoundingBox {
        if positions.is_empty() {
            return BoundingBox::default();
        }
        let mut min = glam::Vec3::splat(f32::INFINITY);
        let mut max = glam::Vec3::splat(f32::NEG_INFINITY);
        for p in positions {
            let v = glam::Vec3::from_array(*p);
            min = min.min(v);
            max = max.max(v);
        }
        BoundingBox { min, max }
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Registry of meshes, handed out as [`MeshKey`] values that outlive any
/// frame's command buffer.
#[derive(Default)]
pub struct MeshRegistry {
    meshes: SlotMap<MeshKey, MeshData>,
}

impl MeshRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meshes: SlotMap::with_key(),
        }
    }

    pub fn insert(&mut self, mesh: MeshData) -> MeshKey {
        self.meshes.insert(mesh)
    }

    #[must_use]
    pub fn get(&self, key: MeshKey) -> Option<&MeshData> {
        self.meshes.get(key)
    }

    #[must_use]
    pub fn get_mut(&mut self, key: MeshKey) -> Option<&mut MeshData> {
        self.meshes.get_mut(key)
    }

    pub fn remove(&mut self, key: MeshKey) -> Option<MeshData> {
        self.meshes.remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshKey, &MeshData)> {
        self.meshes.iter()
    }
}
