//! PBR capture tests
//!
//! Tests for:
//! - Capture processing sizes and mip counts
//! - The equirectangular-to-cube chain
//! - BRDF LUT integration at construction
//! - Probe registry queries (separate accumulator, sky fallback)
//! - Probe baking through the renderer

use glam::Vec3;
use kiln::assets::NullLoader;
use kiln::renderer::device::{DeviceCall, HeadlessDevice, RenderDevice, TextureHandle};
use kiln::renderer::pbr::{IRRADIANCE_SIZE, PREFILTER_MIP_LEVELS, PREFILTER_SIZE, PbrSystem};
use kiln::renderer::renderer::Renderer;
use kiln::renderer::state::StateCache;
use kiln::resources::mesh::MeshRegistry;
use kiln::resources::primitives::{create_cube, create_quad};
use kiln::scene::SceneGraph;

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    device: HeadlessDevice,
    state: StateCache,
    pbr: PbrSystem,
}

fn harness() -> Harness {
    let mut device = HeadlessDevice::new();
    let mut loader = NullLoader::new();
    let mut meshes = MeshRegistry::new();
    let mut state = StateCache::new();
    let quad = meshes.insert(create_quad());
    device.upload_mesh(quad, meshes.get(quad).unwrap());
    let pbr = PbrSystem::new(&mut device, &mut loader, &mut meshes, &mut state, quad)
        .expect("pbr init");
    Harness { device, state, pbr }
}

fn cubemap_creations(device: &HeadlessDevice, label: &str) -> Vec<(TextureHandle, u32, u32)> {
    device
        .calls()
        .iter()
        .filter_map(|call| match call {
            DeviceCall::CreateCubemap {
                texture,
                label: l,
                size,
                mip_levels,
            } if l == label => Some((*texture, *size, *mip_levels)),
            _ => None,
        })
        .collect()
}

fn face_binds(device: &HeadlessDevice, texture: TextureHandle) -> usize {
    device
        .calls()
        .iter()
        .filter(|call| matches!(call, DeviceCall::BindCubemapFace { cubemap, .. } if *cubemap == texture))
        .count()
}

// ============================================================================
// Capture processing
// ============================================================================

#[test]
fn process_cube_produces_irradiance_and_prefilter_chain() {
    let mut h = harness();
    let env = h.device.create_cubemap("env", 512, 1).unwrap();

    let capture = h
        .pbr
        .process_cube(&mut h.device, &mut h.state, env, true)
        .unwrap();

    let irradiance = cubemap_creations(&h.device, "irradiance");
    assert_eq!(irradiance.len(), 1);
    let (irr_tex, irr_size, irr_mips) = irradiance[0];
    assert_eq!(irr_tex, capture.irradiance);
    assert_eq!(irr_size, IRRADIANCE_SIZE);
    assert_eq!(irr_mips, 1);
    // One pass per face.
    assert_eq!(face_binds(&h.device, irr_tex), 6);

    let prefiltered = cubemap_creations(&h.device, "prefiltered");
    assert_eq!(prefiltered.len(), 1);
    let (pre_tex, pre_size, pre_mips) = prefiltered[0];
    assert_eq!(Some(pre_tex), capture.prefiltered);
    assert_eq!(pre_size, PREFILTER_SIZE);
    assert_eq!(pre_mips, PREFILTER_MIP_LEVELS);
    // Six faces for each roughness mip.
    assert_eq!(face_binds(&h.device, pre_tex), (6 * PREFILTER_MIP_LEVELS) as usize);
}

#[test]
fn process_cube_can_skip_prefiltering() {
    let mut h = harness();
    let env = h.device.create_cubemap("env", 512, 1).unwrap();

    let capture = h
        .pbr
        .process_cube(&mut h.device, &mut h.state, env, false)
        .unwrap();

    assert!(capture.prefiltered.is_none());
    assert!(cubemap_creations(&h.device, "prefiltered").is_empty());
}

#[test]
fn process_equirectangular_converts_then_processes() {
    let mut h = harness();
    let env_2d = TextureHandle::new(9999);

    let capture = h
        .pbr
        .process_equirectangular(&mut h.device, &mut h.state, env_2d)
        .unwrap();

    // The 2D source is first rasterized into an intermediate cubemap...
    let intermediates = cubemap_creations(&h.device, "environment capture");
    assert_eq!(intermediates.len(), 1);
    assert_eq!(face_binds(&h.device, intermediates[0].0), 6);

    // ...which then feeds the regular cube processing.
    assert!(capture.prefiltered.is_some());
    assert_eq!(cubemap_creations(&h.device, "irradiance").len(), 1);
}

#[test]
fn brdf_lut_is_integrated_once_at_construction() {
    let h = harness();
    let lut_targets = h
        .device
        .calls()
        .iter()
        .filter(|c| matches!(c, DeviceCall::CreateRenderTarget { label, .. } if label == "brdf lut"))
        .count();
    assert_eq!(lut_targets, 1);
}

#[test]
fn cubemap_allocation_failure_is_an_error() {
    let mut h = harness();
    let env = h.device.create_cubemap("env", 512, 1).unwrap();
    h.device.fail_target_allocations(true);

    let result = h.pbr.process_cube(&mut h.device, &mut h.state, env, true);
    assert!(result.is_err());
}

// ============================================================================
// Probe registry
// ============================================================================

#[test]
fn probe_query_uses_a_separate_accumulator() {
    let mut h = harness();
    let env = h.device.create_cubemap("env", 512, 1).unwrap();

    for i in 0..3 {
        let capture = h
            .pbr
            .process_cube(&mut h.device, &mut h.state, env, false)
            .unwrap();
        h.pbr
            .add_probe(capture, Vec3::new(i as f32 * 10.0, 0.0, 0.0), 5.0);
    }
    assert_eq!(h.pbr.probes().len(), 3);

    // Probes at x = 0 and x = 10 are within 12 units of the origin.
    let results = h.pbr.irradiance_probes(Vec3::ZERO, 12.0);
    assert_eq!(results.len(), 2);

    // Querying never mutates the registry itself.
    assert_eq!(h.pbr.probes().len(), 3);
    let again = h.pbr.irradiance_probes(Vec3::ZERO, 12.0);
    assert_eq!(again.len(), 2);
}

#[test]
fn sky_capture_joins_results_when_local_probes_match() {
    let mut h = harness();
    let env = h.device.create_cubemap("env", 512, 1).unwrap();

    let sky = h.pbr.process_cube(&mut h.device, &mut h.state, env, true).unwrap();
    let sky_irradiance = sky.irradiance;
    h.pbr.set_sky_capture(sky);

    let local = h.pbr.process_cube(&mut h.device, &mut h.state, env, false).unwrap();
    h.pbr.add_probe(local, Vec3::ZERO, 5.0);

    let results = h.pbr.irradiance_probes(Vec3::new(1.0, 0.0, 0.0), 4.0);
    assert_eq!(results.len(), 2);
    assert_eq!(results.last().unwrap().irradiance, sky_irradiance);

    // No local match, no sky fallback either.
    let far = h.pbr.irradiance_probes(Vec3::new(100.0, 0.0, 0.0), 4.0);
    assert!(far.is_empty());
}

#[test]
fn clear_probes_keeps_sky_capture() {
    let mut h = harness();
    let env = h.device.create_cubemap("env", 512, 1).unwrap();

    let sky = h.pbr.process_cube(&mut h.device, &mut h.state, env, true).unwrap();
    h.pbr.set_sky_capture(sky);
    let local = h.pbr.process_cube(&mut h.device, &mut h.state, env, false).unwrap();
    h.pbr.add_probe(local, Vec3::ZERO, 5.0);

    h.pbr.clear_probes();
    assert!(h.pbr.probes().is_empty());
    assert!(h.pbr.sky_capture().is_some());
}

// ============================================================================
// Probe baking through the renderer
// ============================================================================

#[test]
fn bake_probes_captures_each_registered_position() {
    let mut device = HeadlessDevice::new();
    let mut loader = NullLoader::new();
    let mut renderer = Renderer::new(&mut device, &mut loader, 640, 480).unwrap();

    let mesh = renderer.meshes_mut().insert(create_cube(1.0));
    let material = renderer.create_material("default").unwrap();
    let mut graph = SceneGraph::new();
    graph
        .build_node()
        .with_position(Vec3::new(0.0, 0.0, -3.0))
        .with_mesh(mesh)
        .with_material(material)
        .build();
    graph.update_transforms(true);

    renderer.add_irradiance_probe(Vec3::new(2.0, 1.0, 0.0), 8.0);
    renderer.add_irradiance_probe(Vec3::new(-2.0, 1.0, 0.0), 8.0);
    renderer.bake_probes(&mut device, &graph).unwrap();

    let probes = renderer.pbr().probes();
    assert_eq!(probes.len(), 2);
    assert_eq!(probes[0].position, Vec3::new(2.0, 1.0, 0.0));
    assert_eq!(probes[0].radius, 8.0);
    assert!(probes.iter().all(|p| p.prefiltered.is_some()));

    // Each bake renders the scene into its own capture cubemap.
    let captures = cubemap_creations(&device, "probe scene capture");
    assert_eq!(captures.len(), 2);
    assert_eq!(face_binds(&device, captures[0].0), 6);
}
