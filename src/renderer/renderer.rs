use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};

use crate::assets::ResourceLoader;
use crate::errors::Result;
use crate::renderer::command::{CommandBuffer, RenderCommand};
use crate::renderer::device::{
    Attachment, RenderDevice, RenderTargetDesc, RenderTargetId, ShaderHandle, TextureHandle,
};
use crate::renderer::pbr::{self, PbrCapture, PbrSystem};
use crate::renderer::state::StateCache;
use crate::renderer::uniforms::GlobalUniforms;
use crate::resources::library::MaterialLibrary;
use crate::resources::mesh::MeshRegistry;
use crate::resources::primitives::{SphereOptions, create_quad, create_sphere};
use crate::resources::{BoundingBox, MaterialKey, MeshKey, UniformValue};
use crate::scene::NodeKey;
use crate::scene::camera::Camera;
use crate::scene::graph::SceneGraph;
use crate::scene::light::{DirectionalLight, PointLight};

pub(crate) const SHADOW_MAP_SIZE: u32 = 2048;
const MAX_SHADOW_CASTERS: usize = 4;

bitflags! {
    /// Feature toggles of the frame pipeline.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RenderOptions: u32 {
        /// Sample irradiance/prefiltered environment maps in the ambient pass.
        const IRRADIANCE_GI = 1 << 0;
        /// Render shadow depth passes and sample them in light passes.
        const SHADOWS       = 1 << 1;
        /// Run the per-light accumulation passes at all.
        const LIGHTS        = 1 << 2;
        /// Debug-draw point-light volumes.
        const LIGHT_VOLUMES = 1 << 3;
        /// Debug-draw irradiance probes.
        const RENDER_PROBES = 1 << 4;
        /// Rasterize geometry passes as wireframe.
        const WIREFRAME     = 1 << 5;
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::IRRADIANCE_GI | Self::SHADOWS | Self::LIGHTS
    }
}

/// The frame orchestrator.
///
/// Owns the command buffer, the G-buffer and intermediate targets, the
/// material library, the state cache, and the PBR capture subsystem, and
/// drives the multi-pass deferred frame:
///
/// 1. upload per-frame globals
/// 2. G-buffer fill (culled, sorted deferred bucket)
/// 3. shadow depth passes, one per shadow-casting directional light
/// 4. ambient/irradiance full-screen pass (non-blended base layer)
/// 5. additive directional-light passes, sampling the shadow maps
/// 6. additive point-light volume passes
/// 7. forward alpha bucket, back-to-front
/// 8. post-process chain, ending on the backbuffer
/// 9. optional debug visualization
///
/// Everything runs synchronously on the calling thread; commands and
/// light lists are frame-scoped and drain at the end of
/// [`Renderer::render_pushed_commands`].
pub struct Renderer {
    options: RenderOptions,
    render_size: (u32, u32),
    clear_color: [f32; 4],

    commands: CommandBuffer,
    state: StateCache,
    meshes: MeshRegistry,
    materials: MaterialLibrary,
    pbr: PbrSystem,

    // frame-scoped light lists
    directional_lights: Vec<DirectionalLight>,
    point_lights: Vec<PointLight>,

    // targets
    gbuffer: RenderTargetId,
    gbuffer_textures: [TextureHandle; 3],
    scene_target: RenderTargetId,
    post_targets: [RenderTargetId; 2],
    shadow_targets: Vec<RenderTargetId>,
    shadow_view_projections: Vec<Mat4>,

    // internal meshes
    quad: MeshKey,
    sphere: MeshKey,

    ssao_texture: Option<TextureHandle>,
    prev_view_projection: Mat4,
    probe_spatials: Vec<Vec4>,
}

impl Renderer {
    /// Builds the full pipeline: render targets, internal meshes, the
    /// material library, and the PBR subsystem.
    ///
    /// Every allocation and shader load is checked; a failure here means
    /// the pipeline cannot produce correct frames, so construction
    /// reports it instead of limping along with incomplete targets.
    pub fn new(
        device: &mut dyn RenderDevice,
        loader: &mut dyn ResourceLoader,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let mut meshes = MeshRegistry::new();
        let quad = meshes.insert(create_quad());
        device.upload_mesh(quad, meshes.get(quad).expect("just inserted"));
        let sphere = meshes.insert(create_sphere(&SphereOptions {
            radius: 1.0,
            width_segments: 16,
            height_segments: 16,
        }));
        device.upload_mesh(sphere, meshes.get(sphere).expect("just inserted"));

        let gbuffer = device.create_render_target(&RenderTargetDesc::gbuffer(width, height))?;
        let gbuffer_textures = Self::query_gbuffer_textures(device, gbuffer);
        let scene_target =
            device.create_render_target(&RenderTargetDesc::hdr("scene", width, height))?;
        let post_targets = [
            device.create_render_target(&RenderTargetDesc::hdr("post ping", width, height))?,
            device.create_render_target(&RenderTargetDesc::hdr("post pong", width, height))?,
        ];
        let shadow_targets = (0..MAX_SHADOW_CASTERS)
            .map(|_| device.create_render_target(&RenderTargetDesc::shadow(SHADOW_MAP_SIZE)))
            .collect::<Result<Vec<_>>>()?;

        let mut state = StateCache::new();
        let materials = MaterialLibrary::new(loader)?;
        let pbr = PbrSystem::new(device, loader, &mut meshes, &mut state, quad)?;

        Ok(Self {
            options: RenderOptions::default(),
            render_size: (width, height),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            commands: CommandBuffer::new(),
            state,
            meshes,
            materials,
            pbr,
            directional_lights: Vec::new(),
            point_lights: Vec::new(),
            gbuffer,
            gbuffer_textures,
            scene_target,
            post_targets,
            shadow_targets,
            shadow_view_projections: Vec::new(),
            quad,
            sphere,
            ssao_texture: None,
            prev_view_projection: Mat4::IDENTITY,
            probe_spatials: Vec::new(),
        })
    }

    fn query_gbuffer_textures(
        device: &dyn RenderDevice,
        gbuffer: RenderTargetId,
    ) -> [TextureHandle; 3] {
        [0, 1, 2].map(|i| {
            device
                .target_texture(gbuffer, Attachment::Color(i))
                .expect("g-buffer has three color attachments")
        })
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    #[must_use]
    pub fn options(&self) -> RenderOptions {
        self.options
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    #[must_use]
    pub fn render_size(&self) -> (u32, u32) {
        self.render_size
    }

    /// Recreates the size-dependent targets at a new resolution.
    pub fn set_render_size(
        &mut self,
        device: &mut dyn RenderDevice,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.render_size = (width, height);
        device.resize_render_target(self.gbuffer, width, height)?;
        device.resize_render_target(self.scene_target, width, height)?;
        for target in self.post_targets {
            device.resize_render_target(target, width, height)?;
        }
        // Attachment handles may change across a reallocation.
        self.gbuffer_textures = Self::query_gbuffer_textures(device, self.gbuffer);
        Ok(())
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// Installs (or removes) the SSAO input sampled by the ambient pass.
    pub fn set_ssao_texture(&mut self, texture: Option<TextureHandle>) {
        self.ssao_texture = texture;
    }

    #[must_use]
    pub fn meshes(&self) -> &MeshRegistry {
        &self.meshes
    }

    #[must_use]
    pub fn meshes_mut(&mut self) -> &mut MeshRegistry {
        &mut self.meshes
    }

    #[must_use]
    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    #[must_use]
    pub fn materials_mut(&mut self) -> &mut MaterialLibrary {
        &mut self.materials
    }

    #[must_use]
    pub fn pbr(&self) -> &PbrSystem {
        &self.pbr
    }

    /// The commands gathered so far this frame.
    #[must_use]
    pub fn commands(&self) -> &CommandBuffer {
        &self.commands
    }

    // ========================================================================
    // Material creation (delegates into the library)
    // ========================================================================

    pub fn create_material(&mut self, base: &str) -> Result<MaterialKey> {
        self.materials.create_material(base)
    }

    pub fn create_custom_material(&mut self, shader: ShaderHandle) -> MaterialKey {
        self.materials.create_custom_material(shader)
    }

    pub fn create_post_processing_material(&mut self, shader: ShaderHandle) -> MaterialKey {
        self.materials.create_post_processing_material(shader)
    }

    // ========================================================================
    // Frame population
    // ========================================================================

    /// Pushes one drawable for this frame. The world-space bounds come
    /// from the mesh's local box under `transform`.
    pub fn push_render(
        &mut self,
        mesh: MeshKey,
        material: MaterialKey,
        transform: Mat4,
        prev_transform: Mat4,
    ) {
        self.push_render_to_target(mesh, material, transform, prev_transform, None);
    }

    /// Pushes one drawable into the custom bucket of `target`.
    pub fn push_render_to_target(
        &mut self,
        mesh: MeshKey,
        material: MaterialKey,
        transform: Mat4,
        prev_transform: Mat4,
        target: Option<RenderTargetId>,
    ) {
        let Some(mat) = self.materials.get(material) else {
            log::warn!("Pushed render with stale material key {material:?}");
            return;
        };
        let bounds = self
            .meshes
            .get(mesh)
            .map_or(BoundingBox::UNBOUNDED, |m| m.bounds().transform(&transform));
        self.commands
            .push(mesh, material, mat, transform, prev_transform, bounds, target);
    }

    /// Convenience overload: pushes a scene node's mesh/material with its
    /// resolved world transform, previous-frame transform, and bounds.
    /// The graph's transforms must be up to date
    /// ([`SceneGraph::update_transforms`] ran this frame).
    pub fn push_render_node(&mut self, graph: &SceneGraph, key: NodeKey) {
        let Some(node) = graph.node(key) else {
            log::warn!("Pushed render for missing node {key:?}");
            return;
        };
        let (Some(mesh), Some(material)) = (node.mesh, node.material) else {
            return;
        };
        let Some(mat) = self.materials.get(material) else {
            log::warn!("Node {:?} refers to missing material {material:?}", node.id());
            return;
        };
        let transform = *node.world_matrix();
        let bounds = node.bounds.transform(&transform);
        self.commands.push(
            mesh,
            material,
            mat,
            transform,
            *node.prev_world_matrix(),
            bounds,
            None,
        );
    }

    /// Queues a post-processing material for this frame; it draws the
    /// internal full-screen quad during the composite step.
    pub fn push_post_processor(&mut self, material: MaterialKey) {
        let Some(mat) = self.materials.get(material) else {
            log::warn!("Pushed post-processor with stale material key {material:?}");
            return;
        };
        self.commands.push(
            self.quad,
            material,
            mat,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            BoundingBox::UNBOUNDED,
            None,
        );
    }

    pub fn add_light(&mut self, light: DirectionalLight) {
        self.directional_lights.push(light);
    }

    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    /// Drops everything gathered for the current frame without
    /// rendering it.
    pub fn clear_frame(&mut self) {
        self.commands.clear();
        self.directional_lights.clear();
        self.point_lights.clear();
    }

    // ========================================================================
    // Frame execution
    // ========================================================================

    /// Renders everything pushed since the last call, in the strict pass
    /// order documented on [`Renderer`]. Commands and lights drain at
    /// the end; they are scoped to this frame.
    pub fn render_pushed_commands(&mut self, device: &mut dyn RenderDevice, camera: &Camera) {
        let (width, height) = self.render_size;

        // 1. Per-frame globals, including last frame's view-projection
        // for motion vectors.
        let globals = GlobalUniforms::from_camera(camera, self.prev_view_projection);
        device.update_global_uniforms(globals.as_bytes());

        self.commands.sort(camera.position());

        // Custom per-target passes (reflection captures and similar
        // inputs) render before the main view consumes their output.
        for target in self.commands.custom_targets() {
            let commands = self.commands.custom_commands(target, None);
            device.bind_render_target(Some(target));
            device.set_viewport(width, height);
            device.clear(Some([0.0, 0.0, 0.0, 1.0]), true);
            for cmd in &commands {
                Self::draw_command(&mut self.state, &self.materials, device, cmd);
            }
        }

        // 2. Geometry pass: fill the G-buffer.
        device.bind_render_target(Some(self.gbuffer));
        device.set_viewport(width, height);
        device.clear(Some([0.0, 0.0, 0.0, 1.0]), true);
        let wireframe = self.options.contains(RenderOptions::WIREFRAME);
        if wireframe {
            self.state.set_polygon_mode(device, wgpu::PolygonMode::Line);
        }
        let deferred = self.commands.deferred_commands(Some(camera.frustum()));
        for cmd in &deferred {
            Self::draw_command(&mut self.state, &self.materials, device, cmd);
        }
        if wireframe {
            self.state.set_polygon_mode(device, wgpu::PolygonMode::Fill);
        }

        // 3. Shadow depth passes. These must be complete before any
        // lighting pass samples the maps.
        self.render_shadow_passes(device);

        // Lighting accumulates into the HDR scene target.
        device.bind_render_target(Some(self.scene_target));
        device.set_viewport(width, height);
        device.clear(Some(self.clear_color), true);

        // 4. Ambient base layer, written exactly once with blending off.
        self.render_deferred_ambient(device, camera);

        if self.options.contains(RenderOptions::LIGHTS) {
            // 5. Directional lights, additive on top of ambient.
            self.render_deferred_dir_lights(device);
            // 6. Point-light volumes, additive.
            self.render_deferred_point_lights(device, camera);
        }

        // 7. Forward alpha bucket, back-to-front.
        let alpha = self.commands.alpha_commands(Some(camera.frustum()));
        for cmd in &alpha {
            Self::draw_command(&mut self.state, &self.materials, device, cmd);
        }

        // 8. Post-process chain / final composite to the backbuffer.
        self.render_post_processing(device);

        // 9. Debug visualization onto the final image.
        self.render_debug(device);

        self.prev_view_projection = *camera.view_projection();
        self.clear_frame();
    }

    fn render_shadow_passes(&mut self, device: &mut dyn RenderDevice) {
        self.shadow_view_projections.clear();
        if !self.options.contains(RenderOptions::SHADOWS) {
            return;
        }

        let shadow_commands = self.commands.shadow_cast_commands();
        let mut slot = 0;
        for light in &self.directional_lights {
            if !light.cast_shadows {
                continue;
            }
            if slot >= self.shadow_targets.len() {
                log::warn!(
                    "More shadow-casting lights than shadow targets ({}); extras render unshadowed",
                    self.shadow_targets.len()
                );
                break;
            }

            device.bind_render_target(Some(self.shadow_targets[slot]));
            device.set_viewport(SHADOW_MAP_SIZE, SHADOW_MAP_SIZE);
            device.clear(None, true);

            self.state.set_depth_test(device, true);
            self.state.set_depth_write(device, true);
            self.state.set_depth_compare(device, wgpu::CompareFunction::Less);
            self.state.set_blend(device, false);
            // Front-face culling in the depth pass reduces peter-panning.
            self.state.set_cull(device, true);
            self.state.set_cull_face(device, wgpu::Face::Front);
            self.state.switch_shader(device, self.materials.dir_shadow_shader);

            let light_vp = directional_light_view_projection(light);
            device.set_uniform("lightSpaceMatrix", UniformValue::Mat4(light_vp));
            for cmd in &shadow_commands {
                device.set_uniform("model", UniformValue::Mat4(cmd.transform));
                device.draw_mesh(cmd.mesh);
            }

            self.shadow_view_projections.push(light_vp);
            slot += 1;
        }
        self.state.set_cull_face(device, wgpu::Face::Back);
    }

    fn render_deferred_ambient(&mut self, device: &mut dyn RenderDevice, camera: &Camera) {
        for (unit, texture) in self.gbuffer_textures.iter().enumerate() {
            device.bind_texture(unit as u32, *texture);
        }
        device.set_uniform("gPositionMetallic", UniformValue::Int(0));
        device.set_uniform("gNormalRoughness", UniformValue::Int(1));
        device.set_uniform("gAlbedoAO", UniformValue::Int(2));

        self.state.set_depth_test(device, false);
        self.state.set_depth_write(device, false);
        self.state.set_blend(device, false);
        self.state.set_cull(device, true);
        self.state.set_cull_face(device, wgpu::Face::Back);

        let use_ibl =
            self.options.contains(RenderOptions::IRRADIANCE_GI) && self.pbr.sky_capture().is_some();
        if use_ibl {
            // Prefer a local probe around the camera, falling back to the
            // sky capture.
            let capture = self
                .pbr
                .irradiance_probes(camera.position(), 1.0)
                .first()
                .copied()
                .cloned()
                .unwrap_or_else(|| self.pbr.sky_capture().expect("checked above").clone());

            self.state
                .switch_shader(device, self.materials.deferred_irradiance_shader);
            device.bind_texture(3, capture.irradiance);
            device.set_uniform("envIrradiance", UniformValue::Int(3));
            if let Some(prefiltered) = capture.prefiltered {
                device.bind_texture(4, prefiltered);
                device.set_uniform("envPrefilter", UniformValue::Int(4));
            }
            device.bind_texture(5, self.pbr.brdf_lut());
            device.set_uniform("BRDFLUT", UniformValue::Int(5));
        } else {
            self.state
                .switch_shader(device, self.materials.deferred_ambient_shader);
        }

        device.set_uniform("SSAO", UniformValue::Bool(self.ssao_texture.is_some()));
        if let Some(ssao) = self.ssao_texture {
            device.bind_texture(6, ssao);
            device.set_uniform("TexSSAO", UniformValue::Int(6));
        }

        device.draw_mesh(self.quad);
    }

    fn render_deferred_dir_lights(&mut self, device: &mut dyn RenderDevice) {
        if self.directional_lights.is_empty() {
            return;
        }

        self.state.set_blend(device, true);
        self.state
            .set_blend_func(device, wgpu::BlendFactor::One, wgpu::BlendFactor::One);
        self.state.set_blend_equation(device, wgpu::BlendOperation::Add);
        self.state
            .switch_shader(device, self.materials.deferred_directional_shader);

        let shadows_on = self.options.contains(RenderOptions::SHADOWS);
        let mut shadow_slot = 0;
        for light in &self.directional_lights {
            device.set_uniform("lightDir", UniformValue::Vec3(light.direction));
            device.set_uniform("lightColor", UniformValue::Vec3(light.color));
            device.set_uniform("lightIntensity", UniformValue::Float(light.intensity));

            let shadowed = shadows_on
                && light.cast_shadows
                && shadow_slot < self.shadow_view_projections.len();
            device.set_uniform("ShadowsEnabled", UniformValue::Bool(shadowed));
            if shadowed {
                if let Some(depth) =
                    device.target_texture(self.shadow_targets[shadow_slot], Attachment::Depth)
                {
                    device.bind_texture(3, depth);
                    device.set_uniform("lightShadowMap", UniformValue::Int(3));
                }
                device.set_uniform(
                    "lightShadowViewProjection",
                    UniformValue::Mat4(self.shadow_view_projections[shadow_slot]),
                );
                shadow_slot += 1;
            }

            device.draw_mesh(self.quad);
        }
    }

    fn render_deferred_point_lights(&mut self, device: &mut dyn RenderDevice, camera: &Camera) {
        if self.point_lights.is_empty() {
            return;
        }

        self.state.set_blend(device, true);
        self.state
            .set_blend_func(device, wgpu::BlendFactor::One, wgpu::BlendFactor::One);
        self.state
            .switch_shader(device, self.materials.deferred_point_shader);
        // Shade front-culled volume backfaces so a camera inside the
        // volume still receives light.
        self.state.set_cull(device, true);
        self.state.set_cull_face(device, wgpu::Face::Front);

        for light in &self.point_lights {
            if !camera.frustum().intersects_sphere(light.position, light.radius) {
                continue;
            }

            device.set_uniform("lightPos", UniformValue::Vec3(light.position));
            device.set_uniform("lightColor", UniformValue::Vec3(light.color));
            device.set_uniform("lightIntensity", UniformValue::Float(light.intensity));
            device.set_uniform("lightRadius", UniformValue::Float(light.radius));

            let model = Mat4::from_translation(light.position)
                * Mat4::from_scale(Vec3::splat(light.radius));
            device.set_uniform("model", UniformValue::Mat4(model));
            device.draw_mesh(self.sphere);
        }

        self.state.set_cull_face(device, wgpu::Face::Back);
        self.state.set_blend(device, false);
    }

    fn render_post_processing(&mut self, device: &mut dyn RenderDevice) {
        let (width, height) = self.render_size;
        let post = self.commands.post_processing_commands().to_vec();

        let mut input = device
            .target_texture(self.scene_target, Attachment::Color(0))
            .expect("scene target has a color attachment");

        self.state.set_depth_test(device, false);
        self.state.set_depth_write(device, false);
        self.state.set_blend(device, false);
        self.state.set_cull(device, true);
        self.state.set_cull_face(device, wgpu::Face::Back);

        if post.is_empty() {
            // No post materials this frame: plain composite of the lit
            // scene onto the backbuffer.
            device.bind_render_target(None);
            device.set_viewport(width, height);
            device.clear(Some(self.clear_color), true);
            self.state.switch_shader(device, self.materials.blit_shader);
            device.bind_texture(0, input);
            device.set_uniform("TexSrc", UniformValue::Int(0));
            device.draw_mesh(self.quad);
            return;
        }

        for (i, cmd) in post.iter().enumerate() {
            let last = i + 1 == post.len();
            let dst = if last { None } else { Some(self.post_targets[i % 2]) };

            device.bind_render_target(dst);
            device.set_viewport(width, height);
            device.clear(Some(self.clear_color), true);

            let Some(material) = self.materials.get(cmd.material) else {
                log::warn!("Post-process material {:?} missing", cmd.material);
                continue;
            };
            material.bind(&mut self.state, device);
            device.bind_texture(0, input);
            device.set_uniform("TexSrc", UniformValue::Int(0));
            device.draw_mesh(cmd.mesh);

            if !last {
                input = device
                    .target_texture(self.post_targets[i % 2], Attachment::Color(0))
                    .expect("post target has a color attachment");
            }
        }
    }

    fn render_debug(&mut self, device: &mut dyn RenderDevice) {
        let volumes_on = self.options.contains(RenderOptions::LIGHT_VOLUMES);
        if volumes_on || self.point_lights.iter().any(|l| l.render_volume) {
            self.state.switch_shader(device, self.materials.debug_light_shader);
            self.state.set_polygon_mode(device, wgpu::PolygonMode::Line);
            for light in &self.point_lights {
                if !(volumes_on || light.render_volume) {
                    continue;
                }
                device.set_uniform("lightColor", UniformValue::Vec3(light.color));
                let model = Mat4::from_translation(light.position)
                    * Mat4::from_scale(Vec3::splat(light.radius));
                device.set_uniform("model", UniformValue::Mat4(model));
                device.draw_mesh(self.sphere);
            }
            self.state.set_polygon_mode(device, wgpu::PolygonMode::Fill);
        }

        if self.options.contains(RenderOptions::RENDER_PROBES) {
            self.pbr.render_probes(device, &mut self.state);
        }
    }

    fn draw_command(
        state: &mut StateCache,
        materials: &MaterialLibrary,
        device: &mut dyn RenderDevice,
        cmd: &RenderCommand,
    ) {
        let Some(material) = materials.get(cmd.material) else {
            log::warn!("Material {:?} missing during draw", cmd.material);
            return;
        };
        material.bind(state, device);
        device.set_uniform("model", UniformValue::Mat4(cmd.transform));
        device.set_uniform("prevModel", UniformValue::Mat4(cmd.prev_transform));
        device.draw_mesh(cmd.mesh);
    }

    // ========================================================================
    // Blit
    // ========================================================================

    /// Draws `src` into `dst` (the backbuffer when `None`) through
    /// `material`, or the default blit material when none is given. The
    /// source texture binds to unit 0 under `texture_uniform`.
    pub fn blit(
        &mut self,
        device: &mut dyn RenderDevice,
        src: Option<TextureHandle>,
        dst: Option<RenderTargetId>,
        material: Option<MaterialKey>,
        texture_uniform: &str,
    ) {
        let (width, height) = self.render_size;
        device.bind_render_target(dst);
        device.set_viewport(width, height);

        self.state.set_depth_test(device, false);
        self.state.set_depth_write(device, false);
        self.state.set_blend(device, false);

        match material.and_then(|key| self.materials.get(key)) {
            Some(material) => material.bind(&mut self.state, device),
            None => self.state.switch_shader(device, self.materials.blit_shader),
        }
        if let Some(src) = src {
            device.bind_texture(0, src);
            device.set_uniform(texture_uniform, UniformValue::Int(0));
        }
        device.draw_mesh(self.quad);
    }

    // ========================================================================
    // Environment probes
    // ========================================================================

    /// Processes an equirectangular environment texture into a capture.
    pub fn process_equirectangular(
        &mut self,
        device: &mut dyn RenderDevice,
        env_map: TextureHandle,
    ) -> Result<PbrCapture> {
        self.pbr
            .process_equirectangular(device, &mut self.state, env_map)
    }

    /// Installs the global sky capture consumed by the ambient pass.
    pub fn set_sky_capture(&mut self, capture: PbrCapture) {
        self.pbr.set_sky_capture(capture);
    }

    #[must_use]
    pub fn sky_capture(&self) -> Option<&PbrCapture> {
        self.pbr.sky_capture()
    }

    /// Registers a bake point for [`Renderer::bake_probes`].
    pub fn add_irradiance_probe(&mut self, position: Vec3, radius: f32) {
        self.probe_spatials.push(position.extend(radius));
    }

    /// Captures the environment at every registered probe position by
    /// rendering the scene into a cubemap per probe, then convolving it
    /// into irradiance/prefiltered maps. One-time or on-demand
    /// precomputation, not part of the per-frame path.
    pub fn bake_probes(
        &mut self,
        device: &mut dyn RenderDevice,
        graph: &SceneGraph,
    ) -> Result<()> {
        let spatials = self.probe_spatials.clone();
        for spatial in spatials {
            let position = spatial.truncate();
            let cubemap = device.create_cubemap("probe scene capture", pbr::CAPTURE_SIZE, 1)?;

            self.state.set_depth_test(device, true);
            self.state.set_depth_write(device, true);
            self.state.set_blend(device, false);
            self.state.set_cull(device, true);
            self.state.set_cull_face(device, wgpu::Face::Back);
            self.state.switch_shader(device, self.pbr.probe_capture_shader);
            device.set_uniform(
                "projection",
                UniformValue::Mat4(pbr::cube_face_projection()),
            );

            for face in 0..6 {
                device.bind_cubemap_face(cubemap, face, 0);
                device.set_viewport(pbr::CAPTURE_SIZE, pbr::CAPTURE_SIZE);
                device.clear(Some([0.0, 0.0, 0.0, 1.0]), true);
                device.set_uniform(
                    "view",
                    UniformValue::Mat4(pbr::cube_face_view(face, position)),
                );

                for (_, node) in graph.iter() {
                    let Some(mesh) = node.mesh else { continue };
                    // Bind the node's material textures so the capture
                    // sees surface albedo, not flat gray.
                    if let Some(material) = node.material.and_then(|key| self.materials.get(key)) {
                        for (name, sampler) in material.samplers() {
                            device.bind_texture(sampler.unit, sampler.texture);
                            device.set_uniform(name, UniformValue::Int(sampler.unit as i32));
                        }
                    }
                    device.set_uniform("model", UniformValue::Mat4(*node.world_matrix()));
                    device.draw_mesh(mesh);
                }
            }

            let capture = self.pbr.process_cube(device, &mut self.state, cubemap, true)?;
            self.pbr.add_probe(capture, position, spatial.w);
        }
        Ok(())
    }
}

/// Orthographic light-space view-projection for a directional light's
/// shadow pass. Fixed world-extent bounds around the origin.
fn directional_light_view_projection(light: &DirectionalLight) -> Mat4 {
    let dir = light.direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let up = if dir.dot(Vec3::Y).abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(-dir * 10.0, Vec3::ZERO, up);
    let projection = Mat4::orthographic_rh(-20.0, 20.0, -20.0, 20.0, -15.0, 20.0);
    projection * view
}
