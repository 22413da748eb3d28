use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Mat4, Vec3};

use crate::resources::{BoundingBox, MaterialKey, MeshKey};
use crate::scene::NodeKey;

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// A scene node: hierarchical transform plus drawable references.
///
/// # Hierarchy
///
/// Nodes form a tree through parent-child relationships stored as
/// [`NodeKey`] handles. A node has at most one parent; reparenting through
/// [`SceneGraph::attach`](crate::scene::SceneGraph::attach) detaches from
/// the previous parent first.
///
/// # Transform
///
/// The local transform is stored as translation, axis-angle rotation, and
/// scale, composed as `T * S * R`. The cached world matrix is resolved
/// lazily on access or eagerly once per frame by
/// [`SceneGraph::update_transforms`](crate::scene::SceneGraph::update_transforms);
/// setters only mark the node dirty. The previous-frame world matrix is
/// kept alongside for motion-vector style effects.
#[derive(Debug, Clone)]
pub struct SceneNode {
    id: u32,

    // === Hierarchy ===
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,

    // === Local TRS ===
    position: Vec3,
    rotation_axis: Vec3,
    rotation_angle: f32,
    scale: Vec3,

    // === Cached matrices ===
    pub(crate) transform: Mat4,
    pub(crate) prev_transform: Mat4,
    pub(crate) dirty: bool,

    // === Drawable references (non-owning, into the shared registries) ===
    pub mesh: Option<MeshKey>,
    pub material: Option<MaterialKey>,

    /// Local-space bounding box of the attached mesh.
    pub bounds: BoundingBox,
}

impl SceneNode {
    /// Creates a node with an identity transform and a fresh unique id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            parent: None,
            children: Vec::new(),
            position: Vec3::ZERO,
            rotation_axis: Vec3::Y,
            rotation_angle: 0.0,
            scale: Vec3::ONE,
            transform: Mat4::IDENTITY,
            prev_transform: Mat4::IDENTITY,
            dirty: true,
            mesh: None,
            material: None,
            bounds: BoundingBox::UNBOUNDED,
        }
    }

    /// Process-wide unique node id (monotonic).
    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    // ========================================================================
    // Local TRS
    // ========================================================================

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty = true;
    }

    /// Sets the local rotation as an axis-angle pair. The axis is
    /// normalized; a degenerate axis falls back to +Y.
    pub fn set_rotation(&mut self, axis: Vec3, angle: f32) {
        self.rotation_axis = axis.try_normalize().unwrap_or(Vec3::Y);
        self.rotation_angle = angle;
        self.dirty = true;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dirty = true;
    }

    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.scale = Vec3::splat(scale);
        self.dirty = true;
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Local rotation as (axis, angle).
    #[inline]
    #[must_use]
    pub fn rotation(&self) -> (Vec3, f32) {
        (self.rotation_axis, self.rotation_angle)
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// Composes the local matrix as `T * S * R`.
    pub(crate) fn local_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_scale(self.scale)
            * Mat4::from_axis_angle(self.rotation_axis, self.rotation_angle)
    }

    /// The cached world matrix. May be stale while the node is dirty;
    /// use [`SceneGraph::transform`](crate::scene::SceneGraph::transform)
    /// to resolve on access.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Mat4 {
        &self.transform
    }

    /// The world matrix as resolved at the end of the previous frame.
    #[inline]
    #[must_use]
    pub fn prev_world_matrix(&self) -> &Mat4 {
        &self.prev_transform
    }

    /// Translation component of the cached world matrix.
    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// Forces a recompute on the next transform resolution.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}
