//! Math utilities and types
//!
//! Provides the fundamental math types shared by frames, eyes and the matrix
//! handler. Everything is `f32`, matching what graphics backends consume.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Tolerance used when comparing projected and unprojected coordinates
    pub const EPSILON: f32 = 1e-6;
}

/// Math utility functions
pub mod utils {
    use super::*;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Angle in radians between two vectors, `0` when either is degenerate
    pub fn angle_between(a: &Vec3, b: &Vec3) -> f32 {
        let denominator = a.norm() * b.norm();
        if denominator <= constants::EPSILON {
            return 0.0;
        }
        (a.dot(b) / denominator).clamp(-1.0, 1.0).acos()
    }

    /// Returns `true` when every component is finite and non-zero
    pub fn is_valid_scale(scale: &Vec3) -> bool {
        scale.iter().all(|s| s.is_finite() && *s != 0.0)
    }
}

/// Projection constructors in the graph's clip convention
pub trait Mat4Ext {
    /// Create a perspective projection matrix
    ///
    /// OpenGL convention: the eye looks down -Z and depth lands in [-1, 1].
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a symmetric orthographic projection matrix from half extents
    fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [f/a  0   0            0          ]
        //     [0    f   0            0          ]
        //     [0    0   (f+n)/(n-f)  2fn/(n-f)  ]
        //     [0    0   -1           0          ]
        let focal = 1.0 / (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = focal / aspect;
        result[(1, 1)] = focal;
        result[(2, 2)] = (far + near) / (near - far);
        result[(2, 3)] = 2.0 * far * near / (near - far);
        result[(3, 2)] = -1.0;

        result
    }

    fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Mat4 {
        let mut result = Mat4::identity();
        result[(0, 0)] = 1.0 / half_width;
        result[(1, 1)] = 1.0 / half_height;
        result[(2, 2)] = -2.0 / (far - near);
        result[(2, 3)] = -(far + near) / (far - near);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_maps_clip_planes_to_ndc_depth() {
        let projection = Mat4::perspective(utils::deg_to_rad(60.0), 1.0, 1.0, 100.0);

        let near = projection * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = projection * Vec4::new(0.0, 0.0, -100.0, 1.0);

        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_orthographic_maps_extents_to_unit_square() {
        let projection = Mat4::orthographic(4.0, 2.0, 1.0, 10.0);
        let corner = projection.transform_point(&Point3::new(4.0, -2.0, -1.0));

        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(corner.y, -1.0, epsilon = 1e-6);
        assert_relative_eq!(corner.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_angle_between_degenerate_is_zero() {
        assert_eq!(utils::angle_between(&Vec3::zeros(), &Vec3::x()), 0.0);
        assert_relative_eq!(
            utils::angle_between(&Vec3::x(), &Vec3::y()),
            constants::HALF_PI,
            epsilon = 1e-6
        );
    }
}
