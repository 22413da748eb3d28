//! Camera frustum tests
//!
//! Tests for:
//! - Point and sphere containment
//! - Conservative AABB intersection (inside, outside, straddling)
//! - Default frustum behavior before a camera is set

use glam::Vec3;
use kiln::resources::BoundingBox;
use kiln::scene::{Camera, Frustum};

fn looking_down_neg_z() -> Camera {
    let mut camera = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    camera.set_view(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    camera
}

// ============================================================================
// Points and spheres
// ============================================================================

#[test]
fn point_in_front_is_inside() {
    let camera = looking_down_neg_z();
    assert!(camera.frustum().intersects_point(Vec3::new(0.0, 0.0, -10.0)));
}

#[test]
fn point_behind_camera_is_outside() {
    let camera = looking_down_neg_z();
    assert!(!camera.frustum().intersects_point(Vec3::new(0.0, 0.0, 10.0)));
}

#[test]
fn point_beyond_far_plane_is_outside() {
    let camera = looking_down_neg_z();
    assert!(!camera.frustum().intersects_point(Vec3::new(0.0, 0.0, -200.0)));
}

#[test]
fn sphere_overlapping_plane_is_inside() {
    let camera = looking_down_neg_z();
    // Center sits outside the left plane, but the radius reaches in.
    let center = Vec3::new(-12.0, 0.0, -10.0);
    assert!(!camera.frustum().intersects_point(center));
    assert!(camera.frustum().intersects_sphere(center, 8.0));
}

#[test]
fn sphere_far_outside_is_culled() {
    let camera = looking_down_neg_z();
    assert!(!camera.frustum().intersects_sphere(Vec3::new(0.0, 500.0, -10.0), 1.0));
}

// ============================================================================
// AABBs
// ============================================================================

#[test]
fn aabb_fully_inside_is_kept() {
    let camera = looking_down_neg_z();
    let bounds = BoundingBox::new(Vec3::new(-1.0, -1.0, -11.0), Vec3::new(1.0, 1.0, -9.0));
    assert!(camera.frustum().intersects_aabb(&bounds));
}

#[test]
fn aabb_fully_outside_is_culled() {
    let camera = looking_down_neg_z();
    // Entirely behind the camera.
    let behind = BoundingBox::new(Vec3::new(-1.0, -1.0, 9.0), Vec3::new(1.0, 1.0, 11.0));
    assert!(!camera.frustum().intersects_aabb(&behind));

    // Entirely past the left plane.
    let left = BoundingBox::new(Vec3::new(-500.0, -1.0, -11.0), Vec3::new(-400.0, 1.0, -9.0));
    assert!(!camera.frustum().intersects_aabb(&left));
}

#[test]
fn aabb_straddling_plane_is_kept() {
    let camera = looking_down_neg_z();
    // Spans the left plane: partially visible boxes must never be
    // culled (conservative test, no false negatives).
    let bounds = BoundingBox::new(Vec3::new(-50.0, -1.0, -11.0), Vec3::new(0.0, 1.0, -9.0));
    assert!(camera.frustum().intersects_aabb(&bounds));
}

#[test]
fn huge_aabb_surrounding_frustum_is_kept() {
    let camera = looking_down_neg_z();
    assert!(camera.frustum().intersects_aabb(&BoundingBox::UNBOUNDED));
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn default_frustum_accepts_everything() {
    // Before any camera is configured the zeroed planes must not cull;
    // culling is opt-in once a view exists.
    let frustum = Frustum::default();
    assert!(frustum.intersects_point(Vec3::new(1e6, -1e6, 1e6)));
    let bounds = BoundingBox::new(Vec3::splat(500.0), Vec3::splat(501.0));
    assert!(frustum.intersects_aabb(&bounds));
}

#[test]
fn frustum_tracks_view_changes() {
    let mut camera = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    camera.set_view(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    let point = Vec3::new(0.0, 0.0, -10.0);
    assert!(camera.frustum().intersects_point(point));

    // Turn the camera around; the same point is now behind it.
    camera.set_view(Vec3::ZERO, Vec3::Z, Vec3::Y);
    assert!(!camera.frustum().intersects_point(point));
}
