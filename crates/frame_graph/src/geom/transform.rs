//! Transform value type
//!
//! Translation, rotation and scale in 2D or 3D. 2D transforms are the same
//! type restricted to the XY plane with rotations about +Z, so frames, eyes
//! and the matrix stack never branch on dimensionality.

use crate::foundation::math::{Vec3, Mat4, Point3, Quat, utils};

/// Transform representing translation, rotation, and scale
///
/// Invariants: `rotation` is a unit quaternion and every `scale` component is
/// a finite non-zero number. Setters that would break an invariant keep the
/// previous value and return `false`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from its three parts
    ///
    /// Returns `None` when a scale component is zero or not finite.
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Option<Self> {
        if !utils::is_valid_scale(&scale) {
            return None;
        }
        Some(Self {
            translation,
            rotation,
            scale,
        })
    }

    /// Create a transform with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Create a transform with only a rotation
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform with a per-axis scale
    pub fn from_scale(scale: Vec3) -> Option<Self> {
        Self::new(Vec3::zeros(), Quat::identity(), scale)
    }

    /// Create a transform with a uniform scale
    ///
    /// Returns `None` when `scale` is zero or not finite.
    pub fn uniform(scale: f32) -> Option<Self> {
        Self::from_scale(Vec3::new(scale, scale, scale))
    }

    /// Create a 2D transform: translation in the XY plane, rotation about +Z
    /// and a uniform scale
    pub fn new_2d(x: f32, y: f32, angle: f32, scale: f32) -> Option<Self> {
        Self::new(
            Vec3::new(x, y, 0.0),
            Quat::from_axis_angle(&Vec3::z_axis(), angle),
            Vec3::new(scale, scale, 1.0),
        )
    }

    /// Create a 2D rotation about +Z
    pub fn from_angle(angle: f32) -> Self {
        Self::from_rotation(Quat::from_axis_angle(&Vec3::z_axis(), angle))
    }

    /// Translation part
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Rotation part
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Scale part
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Set the translation
    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
    }

    /// Set the rotation
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    /// Set the scale, keeping the previous value if `scale` is invalid
    pub fn set_scale(&mut self, scale: Vec3) -> bool {
        if !utils::is_valid_scale(&scale) {
            log::warn!("Rejected transform scale {:?}: components must be finite and non-zero", scale);
            return false;
        }
        self.scale = scale;
        true
    }

    /// Builder pattern: set translation
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Builder pattern: set rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder pattern: set uniform scale (ignored when invalid)
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.set_scale(Vec3::new(scale, scale, scale));
        self
    }

    /// Builder pattern: set per-axis scale (ignored when invalid)
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    /// Rotation angle about +Z, for 2D transforms
    pub fn angle_2d(&self) -> f32 {
        let q = self.rotation.quaternion();
        2.0 * q.k.atan2(q.w)
    }

    /// Average scale factor, the "magnitude" of the transform
    pub fn magnitude(&self) -> f32 {
        (self.scale.x.abs() * self.scale.y.abs() * self.scale.z.abs()).cbrt()
    }

    /// Whether all scale components are equal
    pub fn is_uniform(&self) -> bool {
        approx::relative_eq!(self.scale.x, self.scale.y) && approx::relative_eq!(self.scale.y, self.scale.z)
    }

    /// Convert to a transformation matrix (T * R * S)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        Point3::from(self.translation + self.rotation * self.scale.component_mul(&point.coords))
    }

    /// Apply this transform to a vector (no translation)
    pub fn transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation * self.scale.component_mul(vector)
    }

    /// Map a point expressed in the transformed space back to the source space
    pub fn inverse_transform_point(&self, point: &Point3) -> Point3 {
        let unrotated = self.rotation.inverse() * (point.coords - self.translation);
        Point3::from(unrotated.component_div(&self.scale))
    }

    /// Compose `self` (parent) with `other` (child)
    ///
    /// The result maps child-local coordinates to the space `self` maps into.
    /// Exact when `self` has uniform scale; otherwise the shear a non-uniform
    /// parent would introduce is dropped, and callers should use matrices.
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation * self.scale.component_mul(&other.translation),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }

    /// Get the inverse transform
    ///
    /// `t.compose(&t.inverse())` is the identity for every valid transform;
    /// `t.inverse().compose(&t)` is too when the scale is uniform.
    pub fn inverse(&self) -> Transform {
        let inv_scale = Vec3::new(1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z);
        let inv_rotation = self.rotation.inverse();
        let inv_translation = -inv_scale.component_mul(&(inv_rotation * self.translation));

        Transform {
            translation: inv_translation,
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::{HALF_PI, PI};
    use approx::assert_relative_eq;

    fn sample() -> Transform {
        Transform::new(
            Vec3::new(2.0, 3.0, 1.0),
            Quat::from_axis_angle(&nalgebra::Unit::new_normalize(Vec3::new(1.0, 1.0, 0.0)), 0.785),
            Vec3::new(2.0, 2.0, 2.0),
        )
        .expect("valid scale")
    }

    #[test]
    fn test_invalid_scale_rejected() {
        assert!(Transform::uniform(0.0).is_none());
        assert!(Transform::from_scale(Vec3::new(1.0, 2.0, f32::INFINITY)).is_none());
        assert!(Transform::new(Vec3::zeros(), Quat::identity(), Vec3::new(1.0, f32::NAN, 1.0)).is_none());

        let mut transform = Transform::identity();
        assert!(!transform.set_scale(Vec3::new(0.0, 1.0, 1.0)));
        assert_eq!(transform.scale(), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_compose_matches_matrix_product() {
        let parent = sample();
        let child = Transform::from_translation(Vec3::new(0.0, 0.0, 1.0))
            .with_rotation(Quat::from_axis_angle(&Vec3::y_axis(), HALF_PI));

        let composed = parent.compose(&child).to_matrix();
        let product = parent.to_matrix() * child.to_matrix();

        assert_relative_eq!(composed, product, epsilon = 1e-5);
    }

    #[test]
    fn test_compose_is_not_commutative() {
        let a = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let b = Transform::from_rotation(Quat::from_axis_angle(&Vec3::z_axis(), HALF_PI));

        let ab = a.compose(&b);
        let ba = b.compose(&a);

        assert_relative_eq!(ab.translation(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(ba.translation(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_round_trip_is_identity() {
        let transform = sample();

        for combined in [transform.compose(&transform.inverse()), transform.inverse().compose(&transform)] {
            assert_relative_eq!(combined.translation(), Vec3::zeros(), epsilon = 1e-5);
            assert_relative_eq!(combined.scale(), Vec3::new(1.0, 1.0, 1.0), epsilon = 1e-5);
            assert!(combined.rotation().angle() < 1e-3);
        }
    }

    #[test]
    fn test_non_uniform_inverse_point_round_trip() {
        let transform = Transform::from_translation(Vec3::new(1.0, -2.0, 0.5))
            .with_rotation(Quat::from_axis_angle(&Vec3::x_axis(), 0.3))
            .with_scale(Vec3::new(1.0, 3.0, 0.5));
        let point = Point3::new(0.25, 4.0, -1.0);

        let forward = transform.transform_point(&point);
        assert_relative_eq!(forward, transform.to_matrix().transform_point(&point), epsilon = 1e-5);
        assert_relative_eq!(transform.inverse_transform_point(&forward), point, epsilon = 1e-5);
    }

    #[test]
    fn test_angle_2d() {
        let transform = Transform::new_2d(3.0, 4.0, PI / 3.0, 2.0).expect("valid scale");
        assert_relative_eq!(transform.angle_2d(), PI / 3.0, epsilon = 1e-6);
        assert_eq!(transform.translation().z, 0.0);
    }
}
