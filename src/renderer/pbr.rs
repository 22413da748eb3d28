//! PBR environment capture.
//!
//! Converts raw environment imagery into the two cubemaps the ambient
//! lighting pass consumes: a small cosine-convolved irradiance map for
//! diffuse IBL and a roughness-indexed GGX-prefiltered mip chain for
//! specular IBL. Also owns the BRDF integration LUT and the registry of
//! local irradiance probes.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::assets::ResourceLoader;
use crate::errors::Result;
use crate::renderer::device::{
    Attachment, RenderDevice, RenderTargetDesc, ShaderHandle, TextureHandle,
};
use crate::renderer::state::StateCache;
use crate::resources::mesh::MeshRegistry;
use crate::resources::primitives::{SphereOptions, create_cube, create_sphere};
use crate::resources::{Material, MeshKey, UniformValue};

/// Face size of the intermediate environment capture cubemap.
pub(crate) const CAPTURE_SIZE: u32 = 128;
/// Face size of the irradiance (diffuse) cubemap.
pub const IRRADIANCE_SIZE: u32 = 32;
/// Base face size of the prefiltered (specular) cubemap.
pub const PREFILTER_SIZE: u32 = 128;
/// Number of roughness-indexed mip levels in the prefiltered map.
pub const PREFILTER_MIP_LEVELS: u32 = 5;

const BRDF_LUT_SIZE: u32 = 128;

/// A processed environment capture: the two cubemaps plus the world
/// position and influence radius when registered as a local probe.
#[derive(Debug, Clone)]
pub struct PbrCapture {
    pub irradiance: TextureHandle,
    pub prefiltered: Option<TextureHandle>,
    pub position: Vec3,
    pub radius: f32,
}

/// The capture subsystem. Owns the convolution materials, the unit cube
/// they render with, the BRDF LUT, and the probe registry.
pub struct PbrSystem {
    sky_capture: Option<PbrCapture>,
    probes: Vec<PbrCapture>,

    hdr_to_cubemap: Material,
    irradiance_capture: Material,
    prefilter_capture: Material,
    pub(crate) probe_capture_shader: ShaderHandle,
    probe_debug_shader: ShaderHandle,

    capture_cube: MeshKey,
    debug_sphere: MeshKey,
    brdf_lut: TextureHandle,
}

impl PbrSystem {
    /// Builds the capture materials and integrates the BRDF LUT.
    ///
    /// `quad` is the renderer's full-screen quad, borrowed for the LUT
    /// integration pass.
    pub fn new(
        device: &mut dyn RenderDevice,
        loader: &mut dyn ResourceLoader,
        meshes: &mut MeshRegistry,
        state: &mut StateCache,
        quad: MeshKey,
    ) -> Result<Self> {
        let hdr_to_cubemap_shader = loader.load_shader(
            "pbr:hdr_to_cubemap",
            "shaders/pbr/cube_sample.vs",
            "shaders/pbr/spherical_to_cube.fs",
            &[],
        )?;
        let irradiance_shader = loader.load_shader(
            "pbr:irradiance",
            "shaders/pbr/cube_sample.vs",
            "shaders/pbr/irradiance_capture.fs",
            &[],
        )?;
        let prefilter_shader = loader.load_shader(
            "pbr:prefilter",
            "shaders/pbr/cube_sample.vs",
            "shaders/pbr/prefilter_capture.fs",
            &[],
        )?;
        let integrate_brdf_shader = loader.load_shader(
            "pbr:integrate_brdf",
            "shaders/screen_quad.vs",
            "shaders/pbr/integrate_brdf.fs",
            &[],
        )?;
        let probe_capture_shader = loader.load_shader(
            "pbr:capture",
            "shaders/capture.vs",
            "shaders/capture.fs",
            &[],
        )?;
        let probe_debug_shader = loader.load_shader(
            "pbr:probe_render",
            "shaders/pbr/probe_render.vs",
            "shaders/pbr/probe_render.fs",
            &[],
        )?;

        // The capture cube is rendered from the inside, depth-equal at
        // the far plane.
        let mut hdr_to_cubemap = Material::new(hdr_to_cubemap_shader);
        let mut irradiance_capture = Material::new(irradiance_shader);
        let mut prefilter_capture = Material::new(prefilter_shader);
        for material in [
            &mut hdr_to_cubemap,
            &mut irradiance_capture,
            &mut prefilter_capture,
        ] {
            material.depth_compare = wgpu::CompareFunction::LessEqual;
            material.cull = false;
        }

        let capture_cube = meshes.insert(create_cube(1.0));
        device.upload_mesh(capture_cube, meshes.get(capture_cube).expect("just inserted"));
        let debug_sphere = meshes.insert(create_sphere(&SphereOptions {
            radius: 0.25,
            width_segments: 32,
            height_segments: 32,
        }));
        device.upload_mesh(debug_sphere, meshes.get(debug_sphere).expect("just inserted"));

        // Integrate the BRDF LUT once.
        let brdf_target = device.create_render_target(&RenderTargetDesc::new(
            "brdf lut",
            BRDF_LUT_SIZE,
            BRDF_LUT_SIZE,
            vec![wgpu::TextureFormat::Rg16Float],
            false,
        ))?;
        device.bind_render_target(Some(brdf_target));
        device.set_viewport(BRDF_LUT_SIZE, BRDF_LUT_SIZE);
        device.clear(Some([0.0; 4]), false);
        state.set_depth_test(device, false);
        state.switch_shader(device, integrate_brdf_shader);
        device.draw_mesh(quad);
        let brdf_lut = device
            .target_texture(brdf_target, Attachment::Color(0))
            .expect("brdf target has one color attachment");

        Ok(Self {
            sky_capture: None,
            probes: Vec::new(),
            hdr_to_cubemap,
            irradiance_capture,
            prefilter_capture,
            probe_capture_shader,
            probe_debug_shader,
            capture_cube,
            debug_sphere,
            brdf_lut,
        })
    }

    #[must_use]
    pub fn brdf_lut(&self) -> TextureHandle {
        self.brdf_lut
    }

    // ========================================================================
    // Capture processing
    // ========================================================================

    /// Converts an equirectangular 2D environment texture into a cubemap
    /// and processes it into a capture.
    pub fn process_equirectangular(
        &mut self,
        device: &mut dyn RenderDevice,
        state: &mut StateCache,
        env_map: TextureHandle,
    ) -> Result<PbrCapture> {
        let cubemap = device.create_cubemap("environment capture", CAPTURE_SIZE, 1)?;
        self.hdr_to_cubemap.set_texture("environment", env_map, 0);
        render_to_cubemap_faces(
            device,
            state,
            &self.hdr_to_cubemap,
            self.capture_cube,
            cubemap,
            CAPTURE_SIZE,
            0,
        );

        self.process_cube(device, state, cubemap, true)
    }

    /// Convolves an environment cubemap into an irradiance map and,
    /// optionally, the prefiltered specular mip chain.
    pub fn process_cube(
        &mut self,
        device: &mut dyn RenderDevice,
        state: &mut StateCache,
        capture: TextureHandle,
        prefilter: bool,
    ) -> Result<PbrCapture> {
        // Diffuse: cosine-weighted hemisphere convolution into a small
        // cubemap; the signal is so low-frequency that 32x32 suffices.
        let irradiance = device.create_cubemap("irradiance", IRRADIANCE_SIZE, 1)?;
        self.irradiance_capture.set_texture_cube("environment", capture, 0);
        render_to_cubemap_faces(
            device,
            state,
            &self.irradiance_capture,
            self.capture_cube,
            irradiance,
            IRRADIANCE_SIZE,
            0,
        );

        // Specular: GGX importance-sampled convolution at increasing
        // roughness per mip.
        let prefiltered = if prefilter {
            let map = device.create_cubemap("prefiltered", PREFILTER_SIZE, PREFILTER_MIP_LEVELS)?;
            self.prefilter_capture.set_texture_cube("environment", capture, 0);
            for mip in 0..PREFILTER_MIP_LEVELS {
                let roughness = mip as f32 / (PREFILTER_MIP_LEVELS - 1) as f32;
                self.prefilter_capture.set_float("roughness", roughness);
                let mip_size = (PREFILTER_SIZE >> mip).max(1);
                render_to_cubemap_faces(
                    device,
                    state,
                    &self.prefilter_capture,
                    self.capture_cube,
                    map,
                    mip_size,
                    mip,
                );
            }
            Some(map)
        } else {
            None
        };

        Ok(PbrCapture {
            irradiance,
            prefiltered,
            position: Vec3::ZERO,
            radius: 0.0,
        })
    }

    // ========================================================================
    // Probe registry
    // ========================================================================

    pub fn set_sky_capture(&mut self, capture: PbrCapture) {
        self.sky_capture = Some(capture);
    }

    #[must_use]
    pub fn sky_capture(&self) -> Option<&PbrCapture> {
        self.sky_capture.as_ref()
    }

    /// Registers a capture as a local irradiance probe.
    pub fn add_probe(&mut self, mut capture: PbrCapture, position: Vec3, radius: f32) {
        capture.position = position;
        capture.radius = radius;
        self.probes.push(capture);
    }

    pub fn clear_probes(&mut self) {
        self.probes.clear();
    }

    #[must_use]
    pub fn probes(&self) -> &[PbrCapture] {
        &self.probes
    }

    /// Local probes within `query_radius` of `query_pos`, by squared
    /// distance. When any local probe matches, the sky capture is
    /// appended as the blend fallback. Results accumulate into a list
    /// distinct from the registry itself.
    #[must_use]
    pub fn irradiance_probes(
        &self,
        query_pos: Vec3,
        query_radius: f32,
    ) -> SmallVec<[&PbrCapture; 4]> {
        let mut in_range: SmallVec<[&PbrCapture; 4]> = SmallVec::new();
        for probe in &self.probes {
            let length_sq = (probe.position - query_pos).length_squared();
            if length_sq < query_radius * query_radius {
                in_range.push(probe);
            }
        }
        if !in_range.is_empty()
            && let Some(sky) = &self.sky_capture
        {
            in_range.push(sky);
        }
        in_range
    }

    /// Debug-renders the registered probes (and the sky capture) as
    /// prefiltered-map spheres.
    pub fn render_probes(&self, device: &mut dyn RenderDevice, state: &mut StateCache) {
        state.switch_shader(device, self.probe_debug_shader);
        state.set_depth_test(device, true);
        state.set_blend(device, false);

        if let Some(sky) = &self.sky_capture {
            self.render_probe_sphere(device, sky, Vec3::new(0.0, 2.0, 0.0));
        }
        for probe in &self.probes {
            self.render_probe_sphere(device, probe, probe.position);
        }
    }

    fn render_probe_sphere(
        &self,
        device: &mut dyn RenderDevice,
        capture: &PbrCapture,
        position: Vec3,
    ) {
        let map = capture.prefiltered.unwrap_or(capture.irradiance);
        device.bind_texture(0, map);
        device.set_uniform(
            "model",
            UniformValue::Mat4(Mat4::from_translation(position)),
        );
        device.draw_mesh(self.debug_sphere);
    }
}

/// Renders `cube` into all six faces of `target` at `mip` with the given
/// convolution material.
fn render_to_cubemap_faces(
    device: &mut dyn RenderDevice,
    state: &mut StateCache,
    material: &Material,
    cube: MeshKey,
    target: TextureHandle,
    face_size: u32,
    mip: u32,
) {
    let projection = cube_face_projection();
    for face in 0..6 {
        device.bind_cubemap_face(target, face, mip);
        device.set_viewport(face_size, face_size);
        device.clear(Some([0.0; 4]), true);

        material.bind(state, device);
        device.set_uniform("projection", UniformValue::Mat4(projection));
        device.set_uniform(
            "view",
            UniformValue::Mat4(cube_face_view(face, Vec3::ZERO)),
        );
        device.draw_mesh(cube);
    }
}

/// 90-degree perspective used for cubemap face capture.
#[must_use]
pub(crate) fn cube_face_projection() -> Mat4 {
    Mat4::perspective_rh(90.0_f32.to_radians(), 1.0, 0.1, 10.0)
}

/// View matrix looking down cubemap face `face` from `position`.
#[must_use]
pub(crate) fn cube_face_view(face: u32, position: Vec3) -> Mat4 {
    let (target, up) = match face {
        0 => (Vec3::X, Vec3::NEG_Y),
        1 => (Vec3::NEG_X, Vec3::NEG_Y),
        2 => (Vec3::Y, Vec3::Z),
        3 => (Vec3::NEG_Y, Vec3::NEG_Z),
        4 => (Vec3::Z, Vec3::NEG_Y),
        _ => (Vec3::NEG_Z, Vec3::NEG_Y),
    };
    Mat4::look_at_rh(position, position + target, up)
}
