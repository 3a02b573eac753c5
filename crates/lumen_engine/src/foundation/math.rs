//! Math types and matrix helpers
//!
//! Thin aliases over nalgebra plus the handful of matrix constructors the
//! renderer needs for a Vulkan-style clip space (Y down, depth in [0, 1]).

pub use nalgebra::{Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Degrees to radians conversion factor
pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

/// Convert degrees to radians
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * DEG_TO_RAD
}

/// Normalize `v`, or `None` when it has no usable direction (zero length or
/// any non-finite component)
pub fn try_normalize(v: Vec3) -> Option<Vec3> {
    if !v.iter().all(|c| c.is_finite()) {
        return None;
    }
    v.try_normalize(f32::EPSILON)
}

/// Pack a vector into the `[f32; 3]` layout used by GPU records
pub fn to_array3(v: &Vec3) -> [f32; 3] {
    [v.x, v.y, v.z]
}

/// Matrix constructors for the Vulkan coordinate conventions
pub trait Mat4Ext {
    /// Rotation around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Rotation around the X axis
    fn rotation_x(angle: f32) -> Mat4;

    /// Perspective projection mapping view-space +Z to depth [0, 1]
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed, Y-up look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Flips Y and Z so a Y-up right-handed view space feeds `perspective`
    fn vulkan_coordinate_transform() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn rotation_x(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::x_axis(), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }

    fn vulkan_coordinate_transform() -> Mat4 {
        Mat4::new(
            1.0,  0.0,  0.0, 0.0,
            0.0, -1.0,  0.0, 0.0,
            0.0,  0.0, -1.0, 0.0,
            0.0,  0.0,  0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_look_at_places_target_on_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let target = view.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(target.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective(deg_to_rad(60.0), 1.0, 0.1, 100.0)
            * Mat4::vulkan_coordinate_transform();

        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_vulkan_transform_flips_y() {
        let proj = Mat4::perspective(deg_to_rad(90.0), 1.0, 0.1, 10.0)
            * Mat4::vulkan_coordinate_transform();
        let above = proj * Vec4::new(0.0, 1.0, -2.0, 1.0);
        assert!(above.y / above.w < 0.0, "up in view space must be negative Y in clip space");
    }

    #[test]
    fn test_try_normalize_rejects_zero() {
        assert!(try_normalize(Vec3::zeros()).is_none());
        let n = try_normalize(Vec3::new(0.0, 3.0, 4.0)).unwrap();
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_try_normalize_rejects_non_finite() {
        assert!(try_normalize(Vec3::new(f32::NAN, 0.0, 0.0)).is_none());
        assert!(try_normalize(Vec3::new(0.0, f32::INFINITY, 0.0)).is_none());
        assert!(try_normalize(Vec3::new(1.0, 1.0, f32::NEG_INFINITY)).is_none());
    }
}
