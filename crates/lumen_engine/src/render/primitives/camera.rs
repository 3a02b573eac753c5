//! # 3D Camera
//!
//! Perspective camera producing view and projection matrices for the uniform
//! block. View space is right-handed and Y-up; the Vulkan Y/Z flip is folded
//! into [`Camera::projection_matrix`] so callers never apply it themselves.

use crate::foundation::math::{deg_to_rad, Mat4, Mat4Ext, Vec3};

/// Perspective camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically +Y)
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera at `position` looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: deg_to_rad(fov_degrees),
            near,
            far,
        }
    }

    /// Move the camera, keeping its target
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Point the camera at `target`
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// World to view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View to clip transform for the given aspect ratio: P × X
    ///
    /// X converts the Y-up view space to Vulkan's Y-down, +Z-forward clip
    /// convention before P maps depth to [0, 1].
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective(self.fov, aspect, self.near, self.far) * Mat4::vulkan_coordinate_transform()
    }
}

impl Default for Camera {
    /// Above and in front of the origin, 45 degree field of view
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 2.0, 5.0), 45.0, 0.1, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector4};

    fn clip(camera: &Camera, point: Vec3) -> Vector4<f32> {
        let view = camera.view_matrix();
        let proj = camera.projection_matrix(1.0);
        proj * view * Vector4::new(point.x, point.y, point.z, 1.0)
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = Camera::default();
        let c = clip(&camera, camera.target);
        assert_relative_eq!(c.x / c.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(c.y / c.w, 0.0, epsilon = 1e-5);
        let depth = c.z / c.w;
        assert!(depth > 0.0 && depth < 1.0, "depth {} outside [0, 1]", depth);
    }

    #[test]
    fn test_world_up_maps_to_negative_clip_y() {
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 0.1, 100.0);
        camera.set_target(Vec3::zeros());
        let c = clip(&camera, Vec3::new(0.0, 1.0, 0.0));
        assert!(c.y / c.w < 0.0, "Vulkan clip space is Y-down");
    }

    #[test]
    fn test_near_and_far_planes_map_to_depth_range() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 0.0), 60.0, 0.5, 50.0);
        let mut looking = camera.clone();
        looking.set_target(Vec3::new(0.0, 0.0, -1.0));

        let near = clip(&looking, Vec3::new(0.0, 0.0, -0.5));
        let far = clip(&looking, Vec3::new(0.0, 0.0, -50.0));
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_view_matrix_moves_camera_to_origin() {
        let camera = Camera::default();
        let eye = camera.view_matrix().transform_point(&Point3::from(camera.position));
        assert_relative_eq!(eye.coords.norm(), 0.0, epsilon = 1e-5);
    }
}
