//! Render-state change suppression.
//!
//! Every material bind re-states its full pipeline state; most of it is
//! identical between consecutive draws. The cache shadows the last value
//! set for each piece of state and forwards to the device only on change.

use crate::renderer::device::{RenderDevice, ShaderHandle};

/// Shadow copy of the device's pipeline state.
///
/// Purely an optimization layer: skipping a redundant `set_*` never
/// changes observable rendering, only the number of backend calls. Fields
/// start unset so the first use of each state always reaches the device.
#[derive(Default)]
pub struct StateCache {
    depth_test: Option<bool>,
    depth_write: Option<bool>,
    depth_compare: Option<wgpu::CompareFunction>,
    blend: Option<bool>,
    blend_func: Option<(wgpu::BlendFactor, wgpu::BlendFactor)>,
    blend_equation: Option<wgpu::BlendOperation>,
    cull: Option<bool>,
    cull_face: Option<wgpu::Face>,
    front_face: Option<wgpu::FrontFace>,
    polygon_mode: Option<wgpu::PolygonMode>,
    shader: Option<ShaderHandle>,
}

impl StateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all shadowed state; every subsequent set reaches the
    /// device again. Call after anything outside the cache touched
    /// device state.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    pub fn set_depth_test(&mut self, device: &mut dyn RenderDevice, enable: bool) {
        if self.depth_test != Some(enable) {
            device.set_depth_test(enable);
        }
        self.depth_test = Some(enable);
    }

    pub fn set_depth_write(&mut self, device: &mut dyn RenderDevice, enable: bool) {
        if self.depth_write != Some(enable) {
            device.set_depth_write(enable);
        }
        self.depth_write = Some(enable);
    }

    pub fn set_depth_compare(
        &mut self,
        device: &mut dyn RenderDevice,
        compare: wgpu::CompareFunction,
    ) {
        if self.depth_compare != Some(compare) {
            device.set_depth_compare(compare);
        }
        self.depth_compare = Some(compare);
    }

    pub fn set_blend(&mut self, device: &mut dyn RenderDevice, enable: bool) {
        if self.blend != Some(enable) {
            device.set_blend(enable);
        }
        self.blend = Some(enable);
    }

    pub fn set_blend_func(
        &mut self,
        device: &mut dyn RenderDevice,
        src: wgpu::BlendFactor,
        dst: wgpu::BlendFactor,
    ) {
        if self.blend_func != Some((src, dst)) {
            device.set_blend_func(src, dst);
        }
        self.blend_func = Some((src, dst));
    }

    pub fn set_blend_equation(&mut self, device: &mut dyn RenderDevice, op: wgpu::BlendOperation) {
        if self.blend_equation != Some(op) {
            device.set_blend_equation(op);
        }
        self.blend_equation = Some(op);
    }

    pub fn set_cull(&mut self, device: &mut dyn RenderDevice, enable: bool) {
        if self.cull != Some(enable) {
            device.set_cull(enable);
        }
        self.cull = Some(enable);
    }

    pub fn set_cull_face(&mut self, device: &mut dyn RenderDevice, face: wgpu::Face) {
        if self.cull_face != Some(face) {
            device.set_cull_face(face);
        }
        self.cull_face = Some(face);
    }

    pub fn set_front_face(&mut self, device: &mut dyn RenderDevice, winding: wgpu::FrontFace) {
        if self.front_face != Some(winding) {
            device.set_front_face(winding);
        }
        self.front_face = Some(winding);
    }

    pub fn set_polygon_mode(&mut self, device: &mut dyn RenderDevice, mode: wgpu::PolygonMode) {
        if self.polygon_mode != Some(mode) {
            device.set_polygon_mode(mode);
        }
        self.polygon_mode = Some(mode);
    }

    pub fn switch_shader(&mut self, device: &mut dyn RenderDevice, shader: ShaderHandle) {
        if self.shader != Some(shader) {
            device.bind_shader(shader);
        }
        self.shader = Some(shader);
    }
}
