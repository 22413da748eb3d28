use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::scene::camera::Camera;

/// The per-frame global uniform block, uploaded once at the top of
/// [`Renderer::render_pushed_commands`](crate::renderer::Renderer::render_pushed_commands).
///
/// Carries the camera matrices plus the previous frame's view-projection
/// for motion vectors. std140-compatible: only mat4/vec4 members.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub prev_view_projection: Mat4,
    pub camera_position: Vec4,
}

impl GlobalUniforms {
    #[must_use]
    pub fn from_camera(camera: &Camera, prev_view_projection: Mat4) -> Self {
        Self {
            view: *camera.view_matrix(),
            projection: *camera.projection_matrix(),
            view_projection: *camera.view_projection(),
            prev_view_projection,
            camera_position: camera.position().extend(1.0),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for GlobalUniforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            prev_view_projection: Mat4::IDENTITY,
            camera_position: Vec4::W,
        }
    }
}
