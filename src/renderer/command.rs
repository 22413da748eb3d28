use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use slotmap::Key;

use crate::renderer::device::{RenderTargetId, ShaderHandle};
use crate::resources::material::{Material, MaterialKind};
use crate::resources::{BoundingBox, MaterialKey, MeshKey};
use crate::scene::camera::Frustum;

/// All state required to submit one draw.
///
/// Commands are rebuilt from scratch every frame and carry no identity
/// across frames. The mesh and material fields are non-owning keys into
/// registries that outlive the frame; the shader and shadow-cast fields
/// are snapshots taken at push time so sorting and shadow filtering need
/// no registry lookups.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    pub mesh: MeshKey,
    pub material: MaterialKey,
    pub transform: Mat4,
    pub prev_transform: Mat4,
    pub bounds: BoundingBox,
    pub(crate) shader: ShaderHandle,
    pub(crate) shadow_cast: bool,
}

/// Per-frame accumulation of render commands, partitioned into the
/// buckets the pipeline consumes:
///
/// - **deferred**: opaque geometry, fills the G-buffer
/// - **alpha**: transparent geometry, forward-rendered after lighting
/// - **post-processing**: full-screen composites
/// - **custom**: per-target overrides (shadow maps, reflection probes),
///   keyed by target
///
/// A pushed command lands in exactly one bucket, decided at push time by
/// the material kind and the optional target override.
#[derive(Default)]
pub struct CommandBuffer {
    deferred: Vec<RenderCommand>,
    alpha: Vec<RenderCommand>,
    post_processing: Vec<RenderCommand>,
    custom: FxHashMap<RenderTargetId, Vec<RenderCommand>>,
}

impl CommandBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes one drawable for this frame.
    ///
    /// `bounds` is the world-space box used for culling. Mesh and
    /// material must outlive the frame; that holds by construction since
    /// both live in persistent registries.
    pub fn push(
        &mut self,
        mesh: MeshKey,
        material_key: MaterialKey,
        material: &Material,
        transform: Mat4,
        prev_transform: Mat4,
        bounds: BoundingBox,
        target: Option<RenderTargetId>,
    ) {
        let command = RenderCommand {
            mesh,
            material: material_key,
            transform,
            prev_transform,
            bounds,
            shader: material.shader(),
            shadow_cast: material.shadow_cast,
        };

        if let Some(target) = target {
            self.custom.entry(target).or_default().push(command);
            return;
        }

        match material.kind {
            MaterialKind::Opaque => self.deferred.push(command),
            MaterialKind::Transparent => self.alpha.push(command),
            MaterialKind::PostProcess => self.post_processing.push(command),
        }
    }

    /// Empties all buckets; the start of a frame's gathering phase.
    pub fn clear(&mut self) {
        self.deferred.clear();
        self.alpha.clear();
        self.post_processing.clear();
        self.custom.clear();
    }

    /// Orders the buckets for submission.
    ///
    /// The deferred bucket is grouped by shader, then material, to
    /// minimize state changes. The alpha bucket is ordered back-to-front
    /// by squared distance to `camera_position` for correct blending;
    /// the sort is stable, so equal distances keep insertion order and a
    /// static scene produces the same order every frame.
    pub fn sort(&mut self, camera_position: Vec3) {
        self.deferred
            .sort_by_key(|cmd| (cmd.shader, cmd.material.data().as_ffi()));

        self.alpha.sort_by(|a, b| {
            let da = a.transform.w_axis.truncate().distance_squared(camera_position);
            let db = b.transform.w_axis.truncate().distance_squared(camera_position);
            db.total_cmp(&da)
        });
    }

    fn filtered(commands: &[RenderCommand], frustum: Option<&Frustum>) -> Vec<RenderCommand> {
        match frustum {
            Some(frustum) => commands
                .iter()
                .filter(|cmd| frustum.intersects_aabb(&cmd.bounds))
                .cloned()
                .collect(),
            None => commands.to_vec(),
        }
    }

    /// The deferred bucket, optionally frustum-culled. Returns a fresh
    /// list each call.
    #[must_use]
    pub fn deferred_commands(&self, frustum: Option<&Frustum>) -> Vec<RenderCommand> {
        Self::filtered(&self.deferred, frustum)
    }

    /// The alpha bucket, optionally frustum-culled.
    #[must_use]
    pub fn alpha_commands(&self, frustum: Option<&Frustum>) -> Vec<RenderCommand> {
        Self::filtered(&self.alpha, frustum)
    }

    /// Commands pushed with an explicit target override.
    #[must_use]
    pub fn custom_commands(
        &self,
        target: RenderTargetId,
        frustum: Option<&Frustum>,
    ) -> Vec<RenderCommand> {
        self.custom
            .get(&target)
            .map_or_else(Vec::new, |commands| Self::filtered(commands, frustum))
    }

    /// Targets that received custom commands this frame.
    #[must_use]
    pub fn custom_targets(&self) -> Vec<RenderTargetId> {
        self.custom
            .iter()
            .filter(|(_, commands)| !commands.is_empty())
            .map(|(&target, _)| target)
            .collect()
    }

    /// The post-processing bucket, in push order.
    #[must_use]
    pub fn post_processing_commands(&self) -> &[RenderCommand] {
        &self.post_processing
    }

    /// Deferred and alpha commands whose material cast shadows at push
    /// time; the input of each shadow-casting light's depth pass.
    #[must_use]
    pub fn shadow_cast_commands(&self) -> Vec<RenderCommand> {
        self.deferred
            .iter()
            .chain(self.alpha.iter())
            .filter(|cmd| cmd.shadow_cast)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deferred.is_empty()
            && self.alpha.is_empty()
            && self.post_processing.is_empty()
            && self.custom.values().all(Vec::is_empty)
    }
}
