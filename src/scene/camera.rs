use glam::{Mat4, Vec3, Vec4};

use crate::resources::BoundingBox;

/// The camera contract the renderer consumes: a view matrix, a projection
/// matrix, a world position, and the derived culling frustum. How the
/// application steers the camera (input, controllers) is outside this
/// crate; it only needs to keep the view in sync via [`Camera::set_view`].
#[derive(Debug, Clone)]
pub struct Camera {
    pub projection: ProjectionKind,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub ortho_size: f32,

    position: Vec3,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    view_projection: Mat4,
    frustum: Frustum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Perspective,
    Orthographic,
}

impl Camera {
    /// Creates a perspective camera. `fov` is the vertical field of view
    /// in degrees.
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            projection: ProjectionKind::Perspective,
            fov: fov.to_radians(),
            aspect,
            near,
            far,
            ortho_size: 10.0,
            position: Vec3::ZERO,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        cam.update_projection();
        cam
    }

    /// Creates an orthographic camera with the given half-height.
    #[must_use]
    pub fn new_orthographic(size: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            projection: ProjectionKind::Orthographic,
            fov: 0.0,
            aspect,
            near,
            far,
            ortho_size: size,
            position: Vec3::ZERO,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        cam.update_projection();
        cam
    }

    /// Recomputes the projection matrix from the current parameters.
    pub fn update_projection(&mut self) {
        self.projection_matrix = match self.projection {
            ProjectionKind::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
            }
            ProjectionKind::Orthographic => {
                let w = self.ortho_size * self.aspect;
                let h = self.ortho_size;
                Mat4::orthographic_rh(-w, w, -h, h, self.near, self.far)
            }
        };
        self.refresh();
    }

    /// Points the camera at `target` from `eye`.
    pub fn set_view(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.position = eye;
        self.view_matrix = Mat4::look_at_rh(eye, target, up);
        self.refresh();
    }

    /// Installs an externally computed view matrix.
    pub fn set_view_matrix(&mut self, view: Mat4, position: Vec3) {
        self.position = position;
        self.view_matrix = view;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.view_projection = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_view_projection(self.view_projection);
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> &Mat4 {
        &self.view_projection
    }

    #[inline]
    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

/// Six-plane view frustum used for command-buffer culling.
///
/// Planes are stored as `(normal, d)` in [`Vec4`] form, normals pointing
/// into the frustum; a point is inside when its signed distance to every
/// plane is non-negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    /// Extracts the planes from a view-projection matrix
    /// (Gribb-Hartmann).
    #[must_use]
    pub fn from_view_projection(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0], // Left
            rows[3] - rows[0], // Right
            rows[3] + rows[1], // Bottom
            rows[3] - rows[1], // Top
            rows[2],           // Near (NDC depth range [0, 1])
            rows[3] - rows[2], // Far
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[inline]
    fn distance(plane: Vec4, point: Vec3) -> f32 {
        plane.x * point.x + plane.y * point.y + plane.z * point.z + plane.w
    }

    #[must_use]
    pub fn intersects_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|&plane| Self::distance(plane, point) >= 0.0)
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|&plane| Self::distance(plane, center) >= -radius)
    }

    /// Conservative AABB test via the positive vertex: for each plane,
    /// test the box corner farthest along the plane normal. Boxes that
    /// straddle a plane are reported as intersecting (no false
    /// negatives).
    #[must_use]
    pub fn intersects_aabb(&self, bounds: &BoundingBox) -> bool {
        for &plane in &self.planes {
            let positive = Vec3::new(
                if plane.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if plane.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if plane.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );
            if Self::distance(plane, positive) < 0.0 {
                return false;
            }
        }
        true
    }
}
