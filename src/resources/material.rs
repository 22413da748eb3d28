use std::borrow::Cow;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::renderer::device::{RenderDevice, ShaderHandle, TextureHandle};
use crate::renderer::state::StateCache;

/// Routing kind of a material.
///
/// The kind decides which command bucket a drawable lands in, matched
/// exhaustively at push time: `Opaque` fills the G-buffer, `Transparent`
/// is forward-rendered back-to-front after deferred lighting, and
/// `PostProcess` runs as a full-screen composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialKind {
    #[default]
    Opaque,
    Transparent,
    PostProcess,
}

/// A uniform value by name, mirroring what the shader side accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

/// Sampler dimensionality, so the backend binds the right target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerKind {
    D2,
    Cube,
}

/// A named texture binding: which texture, on which unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerBinding {
    pub texture: TextureHandle,
    pub unit: u32,
    pub kind: SamplerKind,
}

/// A material: one shader plus the uniform values, samplers, and fixed
/// render state to bind before drawing with it.
///
/// Materials are only constructible from a [`ShaderHandle`], which in turn
/// only exists when the loader resolved and compiled the shader; an
/// "invalid shader" cannot produce a usable-looking material.
///
/// Cloning performs a deep copy of the uniform and sampler maps;
/// [`Material::instantiate`] is the template-copy entry point that also
/// assigns a fresh identity.
#[derive(Debug, Clone)]
pub struct Material {
    pub uuid: Uuid,
    pub name: Option<Cow<'static, str>>,
    shader: ShaderHandle,
    pub kind: MaterialKind,

    uniforms: FxHashMap<Cow<'static, str>, UniformValue>,
    samplers: FxHashMap<Cow<'static, str>, SamplerBinding>,

    // depth state
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,

    // face culling state
    pub cull: bool,
    pub cull_face: wgpu::Face,
    pub front_face: wgpu::FrontFace,

    // blending state
    pub blend: bool,
    pub blend_src: wgpu::BlendFactor,
    pub blend_dst: wgpu::BlendFactor,
    pub blend_op: wgpu::BlendOperation,

    // shadow state
    pub shadow_cast: bool,
    pub shadow_receive: bool,
}

impl Material {
    #[must_use]
    pub fn new(shader: ShaderHandle) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: None,
            shader,
            kind: MaterialKind::Opaque,
            uniforms: FxHashMap::default(),
            samplers: FxHashMap::default(),
            depth_test: true,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            cull: true,
            cull_face: wgpu::Face::Back,
            front_face: wgpu::FrontFace::Ccw,
            blend: false,
            // pre-multiplied alpha
            blend_src: wgpu::BlendFactor::One,
            blend_dst: wgpu::BlendFactor::OneMinusSrcAlpha,
            blend_op: wgpu::BlendOperation::Add,
            shadow_cast: true,
            shadow_receive: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn shader(&self) -> ShaderHandle {
        self.shader
    }

    pub fn set_shader(&mut self, shader: ShaderHandle) {
        self.shader = shader;
    }

    /// Deep copy with a fresh identity; what
    /// [`MaterialLibrary::create_material`](crate::resources::MaterialLibrary::create_material)
    /// hands out for a template.
    #[must_use]
    pub fn instantiate(&self) -> Self {
        let mut copy = self.clone();
        copy.uuid = Uuid::new_v4();
        copy
    }

    /// Switches the material onto the transparent path: routes into the
    /// alpha bucket and enables blending.
    pub fn make_transparent(&mut self) {
        self.kind = MaterialKind::Transparent;
        self.blend = true;
    }

    // ========================================================================
    // Uniforms & samplers
    // ========================================================================

    pub fn set_uniform(&mut self, name: impl Into<Cow<'static, str>>, value: UniformValue) {
        self.uniforms.insert(name.into(), value);
    }

    pub fn set_bool(&mut self, name: impl Into<Cow<'static, str>>, value: bool) {
        self.set_uniform(name, UniformValue::Bool(value));
    }

    pub fn set_int(&mut self, name: impl Into<Cow<'static, str>>, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    pub fn set_float(&mut self, name: impl Into<Cow<'static, str>>, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    pub fn set_vec2(&mut self, name: impl Into<Cow<'static, str>>, value: Vec2) {
        self.set_uniform(name, UniformValue::Vec2(value));
    }

    pub fn set_vec3(&mut self, name: impl Into<Cow<'static, str>>, value: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    pub fn set_vec4(&mut self, name: impl Into<Cow<'static, str>>, value: Vec4) {
        self.set_uniform(name, UniformValue::Vec4(value));
    }

    pub fn set_mat4(&mut self, name: impl Into<Cow<'static, str>>, value: Mat4) {
        self.set_uniform(name, UniformValue::Mat4(value));
    }

    pub fn set_texture(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        texture: TextureHandle,
        unit: u32,
    ) {
        self.samplers.insert(
            name.into(),
            SamplerBinding {
                texture,
                unit,
                kind: SamplerKind::D2,
            },
        );
    }

    pub fn set_texture_cube(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        texture: TextureHandle,
        unit: u32,
    ) {
        self.samplers.insert(
            name.into(),
            SamplerBinding {
                texture,
                unit,
                kind: SamplerKind::Cube,
            },
        );
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    #[must_use]
    pub fn sampler(&self, name: &str) -> Option<&SamplerBinding> {
        self.samplers.get(name)
    }

    #[must_use]
    pub fn uniforms(&self) -> &FxHashMap<Cow<'static, str>, UniformValue> {
        &self.uniforms
    }

    #[must_use]
    pub fn samplers(&self) -> &FxHashMap<Cow<'static, str>, SamplerBinding> {
        &self.samplers
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Binds this material's shader, render state, uniforms, and samplers.
    /// Render state goes through the cache so repeated materials don't
    /// re-emit unchanged state.
    pub(crate) fn bind(&self, state: &mut StateCache, device: &mut dyn RenderDevice) {
        state.set_depth_test(device, self.depth_test);
        state.set_depth_write(device, self.depth_write);
        state.set_depth_compare(device, self.depth_compare);
        state.set_blend(device, self.blend);
        if self.blend {
            state.set_blend_func(device, self.blend_src, self.blend_dst);
            state.set_blend_equation(device, self.blend_op);
        }
        state.set_cull(device, self.cull);
        if self.cull {
            state.set_cull_face(device, self.cull_face);
            state.set_front_face(device, self.front_face);
        }
        state.switch_shader(device, self.shader);

        for (name, value) in &self.uniforms {
            device.set_uniform(name, *value);
        }
        for (name, sampler) in &self.samplers {
            device.bind_texture(sampler.unit, sampler.texture);
            device.set_uniform(name, UniformValue::Int(sampler.unit as i32));
        }
    }
}
