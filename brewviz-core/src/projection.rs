//! Camera and projection utilities

use nalgebra::{Matrix4, Point3, Vector3};

/// Vertical field of view used by the viewer, in degrees
pub const FOV_DEGREES: f32 = 45.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 1000.0;

/// Perspective camera configuration for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 2.0, 5.0),
            target: Point3::origin(),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: FOV_DEGREES.to_radians(),
            aspect: aspect_ratio(width, height),
            near: NEAR,
            far: FAR,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Move the camera and aim it at `target`
    pub fn look_from(&mut self, position: Point3<f32>, target: Point3<f32>) {
        self.position = position;
        self.target = target;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Project through a precomputed model-view-projection matrix.
///
/// Returns `(x, y, depth)` with depth in normalized device coordinates
/// (`-1` near, `1` far), or `None` when the point is behind the camera or
/// outside the view volume.
pub fn project_with(
    mvp: &Matrix4<f32>,
    point: &Point3<f32>,
    width: u32,
    height: u32,
) -> Option<(f32, f32, f32)> {
    let clip = mvp * point.to_homogeneous();

    // Behind the eye (or degenerate)
    if clip.w <= 1e-6 {
        return None;
    }

    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    let depth = clip.z / clip.w;

    // Clip test
    if !(-1.0..=1.0).contains(&ndc_x) || !(-1.0..=1.0).contains(&ndc_y) || !(-1.0..=1.0).contains(&depth) {
        return None;
    }

    // Convert to screen space
    let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
    let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

    Some((screen_x, screen_y, depth))
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
