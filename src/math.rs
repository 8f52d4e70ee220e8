//! Matrix helpers shared by the renderer and the picking path.
//!
//! Everything here is a pure function over `cgmath` types.

use cgmath::{Matrix, Matrix4, Point3, SquareMatrix, Vector4};

use crate::input::{ScreenPoint, ViewportSize};

// cgmath produces OpenGL clip space (z in -1..1); wgpu expects z in 0..1
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::from_translation(cgmath::Vector3::new(x, y, z))
}

pub fn invert(matrix: &Matrix4<f32>) -> Option<Matrix4<f32>> {
    matrix.invert()
}

/// Inverse-transpose of a model-view matrix, used to carry normals into eye
/// space. Singular matrices fall back to the matrix itself.
pub fn normal_matrix(model_view: &Matrix4<f32>) -> Matrix4<f32> {
    match model_view.invert() {
        Some(inverse) => inverse.transpose(),
        None => *model_view,
    }
}

/// Translation part of an affine matrix, i.e. where it sends the local origin.
pub fn origin_of(matrix: &Matrix4<f32>) -> Point3<f32> {
    Point3::new(matrix.w.x, matrix.w.y, matrix.w.z)
}

/// Largest axis scale of the upper 3x3 block.
pub fn max_scale(matrix: &Matrix4<f32>) -> f32 {
    use cgmath::InnerSpace;
    let x = matrix.x.truncate().magnitude();
    let y = matrix.y.truncate().magnitude();
    let z = matrix.z.truncate().magnitude();
    x.max(y).max(z)
}

/// Converts a top-left-origin screen point into normalized device coordinates.
pub fn screen_to_ndc(viewport: ViewportSize, point: ScreenPoint) -> (f32, f32) {
    let ndc_x = point.x / viewport.width * 2.0 - 1.0;
    let ndc_y = 1.0 - point.y / viewport.height * 2.0;
    (ndc_x, ndc_y)
}

/// Maps an NDC point back through `inverse_view_projection`.
///
/// Returns `None` when the homogeneous `w` collapses to zero.
pub fn unproject(
    inverse_view_projection: &Matrix4<f32>,
    ndc_x: f32,
    ndc_y: f32,
    ndc_z: f32,
) -> Option<Point3<f32>> {
    let clip = inverse_view_projection * Vector4::new(ndc_x, ndc_y, ndc_z, 1.0);
    if clip.w.abs() <= f32::EPSILON {
        return None;
    }
    Some(Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w))
}

/// Projects a world-space point to top-left-origin screen coordinates.
///
/// Points behind the eye (`w <= 0`) have no screen position.
pub fn world_to_screen(
    view_projection: &Matrix4<f32>,
    viewport: ViewportSize,
    point: Point3<f32>,
) -> Option<ScreenPoint> {
    let clip = view_projection * Vector4::new(point.x, point.y, point.z, 1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    Some(ScreenPoint {
        x: (ndc_x + 1.0) * 0.5 * viewport.width,
        y: (1.0 - ndc_y) * 0.5 * viewport.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Deg, EuclideanSpace};

    #[test]
    fn screen_center_maps_to_ndc_origin() {
        let viewport = ViewportSize::new(800.0, 600.0);
        let (x, y) = screen_to_ndc(viewport, ScreenPoint::new(400.0, 300.0));
        assert_relative_eq!(x, 0.0);
        assert_relative_eq!(y, 0.0);
    }

    #[test]
    fn screen_top_left_maps_to_upper_left_ndc() {
        let viewport = ViewportSize::new(800.0, 600.0);
        let (x, y) = screen_to_ndc(viewport, ScreenPoint::new(0.0, 0.0));
        assert_relative_eq!(x, -1.0);
        assert_relative_eq!(y, 1.0);
    }

    #[test]
    fn unproject_inverts_projection() {
        let projection =
            OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(60.0), 4.0 / 3.0, 0.1, 100.0);
        let view = translation(0.0, 0.0, -15.0);
        let view_projection = projection * view;
        let viewport = ViewportSize::new(800.0, 600.0);

        let world = Point3::new(1.5, -2.0, 3.0);
        let screen = world_to_screen(&view_projection, viewport, world).unwrap();
        let (ndc_x, ndc_y) = screen_to_ndc(viewport, screen);

        let inverse = invert(&view_projection).unwrap();
        let near = unproject(&inverse, ndc_x, ndc_y, 0.0).unwrap();
        let far = unproject(&inverse, ndc_x, ndc_y, 1.0).unwrap();

        // The world point must lie on the segment between the near and far points
        let along = far - near;
        let to_point = world - near;
        let t = cgmath::InnerSpace::dot(to_point, along) / cgmath::InnerSpace::magnitude2(along);
        let closest = near + along * t;
        assert_relative_eq!(closest.to_vec(), world.to_vec(), epsilon = 1e-3);
    }

    #[test]
    fn normal_matrix_of_rigid_transform_is_itself() {
        let rigid = translation(1.0, 2.0, 3.0) * Matrix4::from_angle_y(Deg(30.0));
        let normal = normal_matrix(&rigid);
        // Rotation part is preserved for rigid transforms
        assert_relative_eq!(normal.x.truncate(), rigid.x.truncate(), epsilon = 1e-5);
        assert_relative_eq!(normal.z.truncate(), rigid.z.truncate(), epsilon = 1e-5);
    }

    #[test]
    fn max_scale_reads_largest_axis() {
        let scaled = Matrix4::from_nonuniform_scale(1.0, 3.0, 2.0);
        assert_relative_eq!(max_scale(&scaled), 3.0);
        assert_relative_eq!(max_scale(&Matrix4::identity()), 1.0);
    }
}
