//! Rendering configuration.

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane
    pub near_plane: f32,

    /// Far clipping plane
    pub far_plane: f32,

    /// Camera distance from the origin along +Z (the mesh sits at origin)
    pub camera_distance: f32,

    /// Icosphere subdivision level (0 = bare icosahedron)
    pub mesh_subdivisions: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 75.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            camera_distance: 6.0,
            mesh_subdivisions: 2,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }
}
