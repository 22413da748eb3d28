//! Shared render resources.
//!
//! Meshes and materials live in registries and are referenced everywhere
//! else through generation-checked keys; the per-frame render commands
//! never own the resources they point at.

pub mod library;
pub mod material;
pub mod mesh;
pub mod primitives;

pub use library::MaterialLibrary;
pub use material::{Material, MaterialKind, SamplerBinding, SamplerKind, UniformValue};
pub use mesh::{MeshData, MeshRegistry};

use glam::{Mat4, Vec3};
use slotmap::new_key_type;

new_key_type! {
    /// Generation-checked handle to a mesh in a [`MeshRegistry`].
    pub struct MeshKey;
    /// Generation-checked handle to a material instance in a
    /// [`MaterialLibrary`].
    pub struct MaterialKey;
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// A box large enough to never be culled; the default bounds for
    /// drawables that don't provide their own.
    pub const UNBOUNDED: Self = Self {
        min: Vec3::splat(-99999.0),
        max: Vec3::splat(99999.0),
    };

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Transforms all eight corners and re-wraps them in an axis-aligned
    /// box.
    #[must_use]
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for corner in corners {
            let p = matrix.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }

        Self { min, max }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}
