//! Command buffer tests
//!
//! Tests for:
//! - Bucket routing by material kind and target override
//! - The exactly-one-bucket invariant
//! - Deferred sort grouping and stable back-to-front alpha ordering
//! - Frustum culling of retrieved command lists
//! - Shadow-cast filtering

use glam::{Mat4, Vec3};
use kiln::renderer::command::CommandBuffer;
use kiln::renderer::device::{RenderTargetId, ShaderHandle};
use kiln::resources::material::{Material, MaterialKind};
use kiln::resources::mesh::MeshRegistry;
use kiln::resources::primitives::create_cube;
use kiln::resources::{BoundingBox, MaterialKey, MeshKey};
use kiln::scene::Camera;
use slotmap::SlotMap;

// ============================================================================
// Helpers
// ============================================================================

struct Setup {
    buffer: CommandBuffer,
    mesh: MeshKey,
    materials: SlotMap<MaterialKey, Material>,
}

fn setup() -> Setup {
    let mut meshes = MeshRegistry::new();
    let mesh = meshes.insert(create_cube(1.0));
    Setup {
        buffer: CommandBuffer::new(),
        mesh,
        materials: SlotMap::with_key(),
    }
}

impl Setup {
    fn material(&mut self, kind: MaterialKind, shader: u32) -> MaterialKey {
        let mut material = Material::new(ShaderHandle::new(shader));
        material.kind = kind;
        if kind == MaterialKind::Transparent {
            material.blend = true;
        }
        self.materials.insert(material)
    }

    fn push_at(&mut self, material: MaterialKey, position: Vec3) {
        let transform = Mat4::from_translation(position);
        let bounds = BoundingBox::new(position - Vec3::ONE, position + Vec3::ONE);
        self.buffer.push(
            self.mesh,
            material,
            &self.materials[material],
            transform,
            Mat4::IDENTITY,
            bounds,
            None,
        );
    }
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn opaque_routes_to_deferred_bucket() {
    let mut s = setup();
    let mat = s.material(MaterialKind::Opaque, 1);
    s.push_at(mat, Vec3::ZERO);

    assert_eq!(s.buffer.deferred_commands(None).len(), 1);
    assert_eq!(s.buffer.alpha_commands(None).len(), 0);
    assert_eq!(s.buffer.post_processing_commands().len(), 0);
}

#[test]
fn transparent_routes_to_alpha_bucket() {
    let mut s = setup();
    let mat = s.material(MaterialKind::Transparent, 1);
    s.push_at(mat, Vec3::ZERO);

    assert_eq!(s.buffer.deferred_commands(None).len(), 0);
    assert_eq!(s.buffer.alpha_commands(None).len(), 1);
    assert_eq!(s.buffer.post_processing_commands().len(), 0);
}

#[test]
fn post_process_routes_to_post_bucket() {
    let mut s = setup();
    let mat = s.material(MaterialKind::PostProcess, 1);
    s.push_at(mat, Vec3::ZERO);

    assert_eq!(s.buffer.deferred_commands(None).len(), 0);
    assert_eq!(s.buffer.alpha_commands(None).len(), 0);
    assert_eq!(s.buffer.post_processing_commands().len(), 1);
}

#[test]
fn target_override_routes_to_custom_bucket_only() {
    let mut s = setup();
    let mat = s.material(MaterialKind::Opaque, 1);
    let target = RenderTargetId::new(42);

    let transform = Mat4::IDENTITY;
    s.buffer.push(
        s.mesh,
        mat,
        &s.materials[mat],
        transform,
        transform,
        BoundingBox::UNBOUNDED,
        Some(target),
    );

    // The override wins over the material kind; exactly one bucket.
    assert_eq!(s.buffer.custom_commands(target, None).len(), 1);
    assert_eq!(s.buffer.deferred_commands(None).len(), 0);
    assert_eq!(s.buffer.alpha_commands(None).len(), 0);
    assert_eq!(s.buffer.post_processing_commands().len(), 0);
}

#[test]
fn unknown_custom_target_yields_empty_list() {
    let s = setup();
    assert!(s.buffer.custom_commands(RenderTargetId::new(7), None).is_empty());
}

#[test]
fn clear_empties_every_bucket() {
    let mut s = setup();
    let opaque = s.material(MaterialKind::Opaque, 1);
    let alpha = s.material(MaterialKind::Transparent, 2);
    let post = s.material(MaterialKind::PostProcess, 3);
    s.push_at(opaque, Vec3::ZERO);
    s.push_at(alpha, Vec3::ZERO);
    s.push_at(post, Vec3::ZERO);
    assert!(!s.buffer.is_empty());

    s.buffer.clear();

    assert!(s.buffer.is_empty());
    assert_eq!(s.buffer.deferred_commands(None).len(), 0);
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn deferred_sort_groups_by_shader() {
    let mut s = setup();
    let mat_a = s.material(MaterialKind::Opaque, 2);
    let mat_b = s.material(MaterialKind::Opaque, 1);
    // Interleave shaders 2, 1, 2, 1.
    s.push_at(mat_a, Vec3::ZERO);
    s.push_at(mat_b, Vec3::ZERO);
    s.push_at(mat_a, Vec3::ZERO);
    s.push_at(mat_b, Vec3::ZERO);

    s.buffer.sort(Vec3::ZERO);

    let commands = s.buffer.deferred_commands(None);
    let materials: Vec<_> = commands.iter().map(|c| c.material).collect();
    assert_eq!(materials, vec![mat_b, mat_b, mat_a, mat_a]);
}

#[test]
fn alpha_sorts_back_to_front() {
    let mut s = setup();
    let mat = s.material(MaterialKind::Transparent, 1);
    s.push_at(mat, Vec3::new(0.0, 0.0, -5.0));
    s.push_at(mat, Vec3::new(0.0, 0.0, -15.0));
    s.push_at(mat, Vec3::new(0.0, 0.0, -10.0));

    // Camera at the origin: farthest first.
    s.buffer.sort(Vec3::ZERO);

    let commands = s.buffer.alpha_commands(None);
    let depths: Vec<f32> = commands.iter().map(|c| c.transform.w_axis.z).collect();
    assert_eq!(depths, vec![-15.0, -10.0, -5.0]);
}

#[test]
fn alpha_sort_is_stable_for_equal_distances() {
    let mut s = setup();
    let mat_a = s.material(MaterialKind::Transparent, 1);
    let mat_b = s.material(MaterialKind::Transparent, 2);
    let mat_c = s.material(MaterialKind::Transparent, 3);

    // All three at the same distance; insertion order must survive the
    // sort, so static scenes do not flicker between frames.
    let position = Vec3::new(0.0, 0.0, -10.0);
    s.push_at(mat_a, position);
    s.push_at(mat_b, position);
    s.push_at(mat_c, position);

    s.buffer.sort(Vec3::ZERO);
    let first: Vec<_> = s.buffer.alpha_commands(None).iter().map(|c| c.material).collect();
    s.buffer.sort(Vec3::ZERO);
    let second: Vec<_> = s.buffer.alpha_commands(None).iter().map(|c| c.material).collect();

    assert_eq!(first, vec![mat_a, mat_b, mat_c]);
    assert_eq!(first, second);
}

// ============================================================================
// Culling
// ============================================================================

#[test]
fn culled_retrieval_drops_out_of_frustum_commands() {
    let mut s = setup();
    let mat = s.material(MaterialKind::Opaque, 1);
    s.push_at(mat, Vec3::new(0.0, 0.0, -10.0)); // in front
    s.push_at(mat, Vec3::new(0.0, 0.0, 50.0)); // behind the camera
    s.push_at(mat, Vec3::new(1000.0, 0.0, -10.0)); // far off to the side

    let mut camera = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    camera.set_view(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);

    let culled = s.buffer.deferred_commands(Some(camera.frustum()));
    assert_eq!(culled.len(), 1);
    assert_eq!(culled[0].transform.w_axis.z, -10.0);

    // Retrieval is a filtered copy; the bucket itself keeps everything.
    assert_eq!(s.buffer.deferred_commands(None).len(), 3);
}

#[test]
fn straddling_bounds_survive_culling() {
    let mut s = setup();
    let mat = s.material(MaterialKind::Opaque, 1);

    // A command whose box crosses the near plane.
    let transform = Mat4::from_translation(Vec3::ZERO);
    s.buffer.push(
        s.mesh,
        mat,
        &s.materials[mat],
        transform,
        transform,
        BoundingBox::new(Vec3::new(-1.0, -1.0, -2.0), Vec3::new(1.0, 1.0, 2.0)),
        None,
    );

    let mut camera = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    camera.set_view(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);

    assert_eq!(s.buffer.deferred_commands(Some(camera.frustum())).len(), 1);
}

// ============================================================================
// Shadow casting
// ============================================================================

#[test]
fn shadow_list_filters_by_material_flag() {
    let mut s = setup();
    let caster = s.material(MaterialKind::Opaque, 1);
    let non_caster_key = {
        let mut material = Material::new(ShaderHandle::new(2));
        material.shadow_cast = false;
        s.materials.insert(material)
    };
    let alpha_caster = s.material(MaterialKind::Transparent, 3);

    s.push_at(caster, Vec3::ZERO);
    s.push_at(non_caster_key, Vec3::ZERO);
    s.push_at(alpha_caster, Vec3::ZERO);

    // Deferred and alpha casters both feed the shadow pass.
    let shadow = s.buffer.shadow_cast_commands();
    assert_eq!(shadow.len(), 2);
    assert!(shadow.iter().all(|c| c.material != non_caster_key));
}

#[test]
fn post_process_commands_never_cast_shadows() {
    let mut s = setup();
    let post = s.material(MaterialKind::PostProcess, 1);
    s.push_at(post, Vec3::ZERO);
    assert!(s.buffer.shadow_cast_commands().is_empty());
}
