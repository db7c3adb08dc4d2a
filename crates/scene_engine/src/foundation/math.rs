//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the [`Transform`] value type carried by
//! every scene node.

pub use nalgebra::{Matrix4, Quaternion, Unit, UnitQuaternion, Vector2, Vector3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Local transform of a scene node relative to its parent.
///
/// A plain value: copying it never touches any other state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent
    pub position: Vec3,

    /// Per-axis scale factors
    pub scale: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            rotation: Quat::identity(),
        }
    }
}

impl Transform {
    /// Create a transform from its three components
    pub fn new(position: Vec3, scale: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            scale,
            rotation,
        }
    }

    /// Identity transform: no translation, unit scale, no rotation
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only a translation
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Replace the scale, keeping position and rotation
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Replace the rotation, keeping position and scale
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Local-to-parent matrix.
    ///
    /// Composition order is scale, then rotate, then translate, so the
    /// resulting matrix is `T * R * S`.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_identity_matrix() {
        assert_relative_eq!(Transform::identity().to_matrix(), Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_translation_only() {
        let matrix = Transform::from_position(Vec3::new(1.0, 2.0, 3.0)).to_matrix();
        let moved = matrix.transform_point(&Point3::origin());
        assert_relative_eq!(moved, Point3::new(1.0, 2.0, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_scale_applied_before_rotation_and_translation() {
        // Scale x by 2, rotate +90 degrees about Z, then move by (10, 0, 0).
        let transform = Transform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 1.0),
            Quat::from_axis_angle(&Vec3::z_axis(), constants::HALF_PI),
        );

        // (1, 0, 0) -> scaled (2, 0, 0) -> rotated (0, 2, 0) -> translated (10, 2, 0)
        let point = transform.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point, Point3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_non_uniform_scale() {
        let transform = Transform::identity().with_scale(Vec3::new(1.0, 3.0, 0.5));
        let point = transform.transform_point(Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(point, Point3::new(1.0, 3.0, 0.5), epsilon = EPSILON);
    }
}
