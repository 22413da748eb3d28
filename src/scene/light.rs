use glam::Vec3;

/// A directional light. Participates in the full-screen deferred lighting
/// pass; the first few shadow-casting directional lights get a shadow
/// map slot each frame.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
}

impl DirectionalLight {
    #[must_use]
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction,
            color,
            intensity,
            cast_shadows: true,
        }
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::new(-0.3, -1.0, -0.3), Vec3::ONE, 1.0)
    }
}

/// A point light, rendered as a sphere volume clipped to its radius
/// during the deferred per-light accumulation pass.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    /// Draw the light volume as a debug mesh when the renderer's
    /// light-volume option is on.
    pub render_volume: bool,
}

impl PointLight {
    #[must_use]
    pub fn new(position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            position,
            color,
            intensity,
            radius,
            render_volume: false,
        }
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ONE, 1.0, 5.0)
    }
}
