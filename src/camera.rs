use cgmath::{Deg, Matrix4};
use serde::Deserialize;

use crate::math::OPENGL_TO_WGPU_MATRIX;

/// Camera component attached to a scene node.
///
/// The camera looks down the node's local -Z axis; its placement comes from
/// the owning node's world transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(fovy: f32, znear: f32, zfar: f32) -> Self {
        Self { fovy, znear, zfar }
    }

    /// Builds the projection for the current viewport aspect ratio.
    ///
    /// Not cached: the aspect ratio may change between frames. `aspect_ratio`
    /// must be finite and non-zero.
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(self.fovy), aspect_ratio, self.znear, self.zfar)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(60.0, 0.1, 100.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            position: [0.0, 0.0, 15.0],
            fovy: camera.fovy,
            znear: camera.znear,
            zfar: camera.zfar,
        }
    }
}

impl CameraConfig {
    pub fn camera(&self) -> Camera {
        Camera::new(self.fovy, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Vector4;

    #[test]
    fn projection_maps_near_and_far_planes_to_wgpu_depth_range() {
        let camera = Camera::new(60.0, 0.5, 50.0);
        let projection = camera.projection_matrix(1.0);

        let near = projection * Vector4::new(0.0, 0.0, -0.5, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, -50.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn projection_tracks_aspect_ratio() {
        let camera = Camera::default();
        let square = camera.projection_matrix(1.0);
        let wide = camera.projection_matrix(2.0);
        // Horizontal scale halves when the viewport gets twice as wide
        assert_relative_eq!(wide.x.x * 2.0, square.x.x, epsilon = 1e-6);
        assert_relative_eq!(wide.y.y, square.y.y, epsilon = 1e-6);
    }
}
