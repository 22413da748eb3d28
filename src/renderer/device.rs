use rustc_hash::FxHashMap;

use crate::errors::{RenderError, Result};
use crate::resources::MeshKey;
use crate::resources::material::UniformValue;
use crate::resources::mesh::MeshData;

/// Opaque handle to a compiled-and-linked shader program.
///
/// Only a [`ResourceLoader`](crate::assets::ResourceLoader) produces
/// these, so holding one is proof the program exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(u32);

impl ShaderHandle {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque handle to a device texture (2D or cubemap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u32);

impl TextureHandle {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque handle to a render target owned by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(u32);

impl RenderTargetId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// An attachment point on a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Color(u32),
    Depth,
}

/// Description of a render target: color attachment formats plus an
/// optional depth attachment.
#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub color_formats: Vec<wgpu::TextureFormat>,
    pub depth: bool,
}

impl RenderTargetDesc {
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        width: u32,
        height: u32,
        color_formats: Vec<wgpu::TextureFormat>,
        depth: bool,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            color_formats,
            depth,
        }
    }

    /// The G-buffer layout: position+metallic, normal+roughness,
    /// albedo+AO, plus depth.
    #[must_use]
    pub fn gbuffer(width: u32, height: u32) -> Self {
        Self::new(
            "g-buffer",
            width,
            height,
            vec![
                wgpu::TextureFormat::Rgba16Float, // position + metallic
                wgpu::TextureFormat::Rgba16Float, // normal + roughness
                wgpu::TextureFormat::Rgba8Unorm,  // albedo + AO
            ],
            true,
        )
    }

    /// A single HDR color attachment with depth; the lit scene target.
    #[must_use]
    pub fn hdr(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new(label, width, height, vec![wgpu::TextureFormat::Rgba16Float], true)
    }

    /// Depth-only target for shadow maps.
    #[must_use]
    pub fn shadow(size: u32) -> Self {
        Self::new("shadow map", size, size, Vec::new(), true)
    }
}

/// The abstract GPU backend.
///
/// The renderer issues these operations in immediate mode on the calling
/// thread; a backend maps them onto its API of choice. The contract is
/// deliberately narrow: multi-attachment targets, cubemap
/// render-to-face/mip, a global uniform buffer, and the raw pipeline
/// state the [`StateCache`](crate::renderer::StateCache) deduplicates.
///
/// The raw `set_*` state methods should not be called directly from pass
/// code; route them through the state cache.
pub trait RenderDevice {
    // === Targets ===

    /// Creates a render target; incomplete/failed allocations are an
    /// `Err`, never a silently unusable target.
    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetId>;

    /// Reallocates a target's attachments at a new size.
    fn resize_render_target(
        &mut self,
        target: RenderTargetId,
        width: u32,
        height: u32,
    ) -> Result<()>;

    /// The texture backing an attachment, for sampling in later passes.
    fn target_texture(&self, target: RenderTargetId, attachment: Attachment)
    -> Option<TextureHandle>;

    /// Allocates a cubemap with the given face size and mip count.
    fn create_cubemap(&mut self, label: &str, size: u32, mip_levels: u32)
    -> Result<TextureHandle>;

    /// Binds a target for drawing; `None` is the default backbuffer.
    fn bind_render_target(&mut self, target: Option<RenderTargetId>);

    /// Binds one face/mip of a cubemap as the drawing target.
    fn bind_cubemap_face(&mut self, cubemap: TextureHandle, face: u32, mip: u32);

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clears the bound target's color (when `Some`) and/or depth.
    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool);

    // === Raw pipeline state ===

    fn set_depth_test(&mut self, enable: bool);
    fn set_depth_write(&mut self, enable: bool);
    fn set_depth_compare(&mut self, compare: wgpu::CompareFunction);
    fn set_blend(&mut self, enable: bool);
    fn set_blend_func(&mut self, src: wgpu::BlendFactor, dst: wgpu::BlendFactor);
    fn set_blend_equation(&mut self, op: wgpu::BlendOperation);
    fn set_cull(&mut self, enable: bool);
    fn set_cull_face(&mut self, face: wgpu::Face);
    fn set_front_face(&mut self, winding: wgpu::FrontFace);
    fn set_polygon_mode(&mut self, mode: wgpu::PolygonMode);
    fn bind_shader(&mut self, shader: ShaderHandle);

    // === Resources & drawing ===

    /// Uploads (or re-uploads) mesh data under its registry key.
    fn upload_mesh(&mut self, key: MeshKey, mesh: &MeshData);

    /// Draws a previously uploaded mesh with the bound state.
    fn draw_mesh(&mut self, key: MeshKey);

    /// Binds a texture to a sampler unit.
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Sets a per-draw uniform on the bound shader.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Replaces the contents of the global per-frame uniform buffer.
    fn update_global_uniforms(&mut self, data: &[u8]);
}

/// One recorded backend operation; what [`HeadlessDevice`] stores.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateRenderTarget { id: RenderTargetId, label: String },
    ResizeRenderTarget { id: RenderTargetId, width: u32, height: u32 },
    CreateCubemap { texture: TextureHandle, label: String, size: u32, mip_levels: u32 },
    BindRenderTarget(Option<RenderTargetId>),
    BindCubemapFace { cubemap: TextureHandle, face: u32, mip: u32 },
    SetViewport { width: u32, height: u32 },
    Clear { color: Option<[f32; 4]>, depth: bool },
    SetDepthTest(bool),
    SetDepthWrite(bool),
    SetDepthCompare(wgpu::CompareFunction),
    SetBlend(bool),
    SetBlendFunc(wgpu::BlendFactor, wgpu::BlendFactor),
    SetBlendEquation(wgpu::BlendOperation),
    SetCull(bool),
    SetCullFace(wgpu::Face),
    SetFrontFace(wgpu::FrontFace),
    SetPolygonMode(wgpu::PolygonMode),
    BindShader(ShaderHandle),
    UploadMesh(MeshKey),
    DrawMesh(MeshKey),
    BindTexture { unit: u32, texture: TextureHandle },
    SetUniform { name: String, value: UniformValue },
    UpdateGlobalUniforms { len: usize },
}

struct TargetRecord {
    color_textures: Vec<TextureHandle>,
    depth_texture: Option<TextureHandle>,
}

/// A backend that executes nothing and records everything.
///
/// Drives the pipeline without a GPU: handles are vended from counters
/// and every operation is appended to a call log, which makes ordering
/// guarantees (shadow maps written before they are sampled, exactly one
/// G-buffer draw per command) directly observable. Target allocation can
/// be forced to fail to exercise the fail-fast paths.
#[derive(Default)]
pub struct HeadlessDevice {
    calls: Vec<DeviceCall>,
    next_target: u32,
    next_texture: u32,
    targets: FxHashMap<RenderTargetId, TargetRecord>,
    fail_target_allocations: bool,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        // Texture handles start past the loader's range so the two don't
        // alias in the call log.
        Self {
            next_texture: 0x1000,
            ..Self::default()
        }
    }

    /// Every call issued so far, in order.
    #[must_use]
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Makes subsequent target/cubemap allocations fail.
    pub fn fail_target_allocations(&mut self, fail: bool) {
        self.fail_target_allocations = fail;
    }

    fn alloc_texture(&mut self) -> TextureHandle {
        let handle = TextureHandle::new(self.next_texture);
        self.next_texture += 1;
        handle
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetId> {
        if self.fail_target_allocations {
            return Err(RenderError::TargetAllocation {
                label: desc.label.clone(),
                reason: "allocation rejected".to_owned(),
            });
        }

        let id = RenderTargetId::new(self.next_target);
        self.next_target += 1;

        let color_textures = (0..desc.color_formats.len())
            .map(|_| self.alloc_texture())
            .collect();
        let depth_texture = desc.depth.then(|| self.alloc_texture());
        self.targets.insert(
            id,
            TargetRecord {
                color_textures,
                depth_texture,
            },
        );

        self.calls.push(DeviceCall::CreateRenderTarget {
            id,
            label: desc.label.clone(),
        });
        Ok(id)
    }

    fn resize_render_target(
        &mut self,
        target: RenderTargetId,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if !self.targets.contains_key(&target) {
            return Err(RenderError::InvalidHandle {
                context: format!("resize of unknown render target {target:?}"),
            });
        }
        self.calls.push(DeviceCall::ResizeRenderTarget {
            id: target,
            width,
            height,
        });
        Ok(())
    }

    fn target_texture(
        &self,
        target: RenderTargetId,
        attachment: Attachment,
    ) -> Option<TextureHandle> {
        let record = self.targets.get(&target)?;
        match attachment {
            Attachment::Color(index) => record.color_textures.get(index as usize).copied(),
            Attachment::Depth => record.depth_texture,
        }
    }

    fn create_cubemap(
        &mut self,
        label: &str,
        size: u32,
        mip_levels: u32,
    ) -> Result<TextureHandle> {
        if self.fail_target_allocations {
            return Err(RenderError::TargetAllocation {
                label: label.to_owned(),
                reason: "allocation rejected".to_owned(),
            });
        }
        let texture = self.alloc_texture();
        self.calls.push(DeviceCall::CreateCubemap {
            texture,
            label: label.to_owned(),
            size,
            mip_levels,
        });
        Ok(texture)
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetId>) {
        self.calls.push(DeviceCall::BindRenderTarget(target));
    }

    fn bind_cubemap_face(&mut self, cubemap: TextureHandle, face: u32, mip: u32) {
        self.calls.push(DeviceCall::BindCubemapFace { cubemap, face, mip });
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(DeviceCall::SetViewport { width, height });
    }

    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool) {
        self.calls.push(DeviceCall::Clear { color, depth });
    }

    fn set_depth_test(&mut self, enable: bool) {
        self.calls.push(DeviceCall::SetDepthTest(enable));
    }

    fn set_depth_write(&mut self, enable: bool) {
        self.calls.push(DeviceCall::SetDepthWrite(enable));
    }

    fn set_depth_compare(&mut self, compare: wgpu::CompareFunction) {
        self.calls.push(DeviceCall::SetDepthCompare(compare));
    }

    fn set_blend(&mut self, enable: bool) {
        self.calls.push(DeviceCall::SetBlend(enable));
    }

    fn set_blend_func(&mut self, src: wgpu::BlendFactor, dst: wgpu::BlendFactor) {
        self.calls.push(DeviceCall::SetBlendFunc(src, dst));
    }

    fn set_blend_equation(&mut self, op: wgpu::BlendOperation) {
        self.calls.push(DeviceCall::SetBlendEquation(op));
    }

    fn set_cull(&mut self, enable: bool) {
        self.calls.push(DeviceCall::SetCull(enable));
    }

    fn set_cull_face(&mut self, face: wgpu::Face) {
        self.calls.push(DeviceCall::SetCullFace(face));
    }

    fn set_front_face(&mut self, winding: wgpu::FrontFace) {
        self.calls.push(DeviceCall::SetFrontFace(winding));
    }

    fn set_polygon_mode(&mut self, mode: wgpu::PolygonMode) {
        self.calls.push(DeviceCall::SetPolygonMode(mode));
    }

    fn bind_shader(&mut self, shader: ShaderHandle) {
        self.calls.push(DeviceCall::BindShader(shader));
    }

    fn upload_mesh(&mut self, key: MeshKey, _mesh: &MeshData) {
        self.calls.push(DeviceCall::UploadMesh(key));
    }

    fn draw_mesh(&mut self, key: MeshKey) {
        self.calls.push(DeviceCall::DrawMesh(key));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.calls.push(DeviceCall::BindTexture { unit, texture });
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.calls.push(DeviceCall::SetUniform {
            name: name.to_owned(),
            value,
        });
    }

    fn update_global_uniforms(&mut self, data: &[u8]) {
        self.calls.push(DeviceCall::UpdateGlobalUniforms { len: data.len() });
    }
}
