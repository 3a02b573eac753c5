//! GPU-facing data layouts shared with the shaders
//!
//! `UniformBufferObject` mirrors the std140 uniform block at binding 0
//! (transforms, viewer, ambient and sun) and
//! `LightBufferData` mirrors the std430 storage block at binding 1. Both are
//! plain `#[repr(C)]` structs with explicit padding so they can be copied
//! byte-for-byte into mapped memory.

use crate::foundation::math::Mat4;

/// Fixed capacity of the light storage buffer
pub const MAX_LIGHTS: usize = 32;

/// Per-frame uniform block (binding 0, vertex + fragment stages)
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBufferObject {
    /// Object to world transform
    pub model: Mat4,
    /// World to view transform
    pub view: Mat4,
    /// View to clip transform
    pub proj: Mat4,
    /// Viewer position in world space
    pub view_pos: [f32; 3],
    /// Seconds since startup
    pub time: f32,
    /// Ambient light color
    pub ambient_light: [f32; 3],
    /// Number of valid records in the light buffer
    pub num_lights: i32,
    /// Unit direction sunlight travels
    pub sun_direction: [f32; 3],
    /// Sun intensity; zero switches the sun off
    pub sun_intensity: f32,
    /// Sun color
    pub sun_color: [f32; 3],
    _pad: f32,
}

/// One light record in the storage buffer
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    /// World-space position
    pub position: [f32; 3],
    _pad0: f32,
    /// Unit direction the light points towards
    pub direction: [f32; 3],
    _pad1: f32,
    /// Linear RGB color
    pub color: [f32; 3],
    /// Intensity multiplier
    pub intensity: f32,
    /// Falloff distance for point and spot lights
    pub range: f32,
    /// Inner cone angle in degrees
    pub inner_cone: f32,
    /// Outer cone angle in degrees
    pub outer_cone: f32,
    /// 0 = directional, 1 = point, 2 = spot
    pub light_type: i32,
    /// Non-zero when the light contributes
    pub enabled: i32,
    _pad2: [i32; 3],
}

/// Light storage block (binding 1, fragment stage): count header plus records
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightBufferData {
    /// Number of valid entries in `lights`
    pub count: i32,
    _pad: [i32; 3],
    /// Light records; only the first `count` are meaningful
    pub lights: [LightData; MAX_LIGHTS],
}

unsafe impl bytemuck::Pod for UniformBufferObject {}
unsafe impl bytemuck::Zeroable for UniformBufferObject {}

unsafe impl bytemuck::Pod for LightData {}
unsafe impl bytemuck::Zeroable for LightData {}

unsafe impl bytemuck::Pod for LightBufferData {}
unsafe impl bytemuck::Zeroable for LightBufferData {}

impl Default for UniformBufferObject {
    fn default() -> Self {
        Self::new(Mat4::identity(), Mat4::identity(), Mat4::identity(), [0.0; 3], 0.0, [0.0; 3], 0)
    }
}

impl UniformBufferObject {
    /// Build a block with the sun switched off; padding is always zeroed
    pub fn new(
        model: Mat4,
        view: Mat4,
        proj: Mat4,
        view_pos: [f32; 3],
        time: f32,
        ambient_light: [f32; 3],
        num_lights: i32,
    ) -> Self {
        Self {
            model,
            view,
            proj,
            view_pos,
            time,
            ambient_light,
            num_lights,
            sun_direction: [0.0, -1.0, 0.0],
            sun_intensity: 0.0,
            sun_color: [0.0; 3],
            _pad: 0.0,
        }
    }

    /// Set the sun terms
    pub fn with_sun(mut self, direction: [f32; 3], color: [f32; 3], intensity: f32) -> Self {
        self.sun_direction = direction;
        self.sun_color = color;
        self.sun_intensity = intensity;
        self
    }
}

impl LightData {
    /// Build a record; padding is always zeroed
    pub fn new(
        light_type: i32,
        position: [f32; 3],
        direction: [f32; 3],
        color: [f32; 3],
        intensity: f32,
        range: f32,
        inner_cone: f32,
        outer_cone: f32,
        enabled: bool,
    ) -> Self {
        Self {
            position,
            _pad0: 0.0,
            direction,
            _pad1: 0.0,
            color,
            intensity,
            range,
            inner_cone,
            outer_cone,
            light_type,
            enabled: i32::from(enabled),
            _pad2: [0; 3],
        }
    }
}

impl Default for LightData {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

impl LightBufferData {
    /// Pack up to `MAX_LIGHTS` records; anything beyond the cap is dropped
    pub fn from_records(records: &[LightData]) -> Self {
        let mut data: Self = bytemuck::Zeroable::zeroed();
        let count = records.len().min(MAX_LIGHTS);
        data.lights[..count].copy_from_slice(&records[..count]);
        data.count = count as i32;
        data
    }

    /// The valid prefix of the record array
    pub fn active(&self) -> &[LightData] {
        let count = usize::try_from(self.count).unwrap_or(0).min(MAX_LIGHTS);
        &self.lights[..count]
    }
}

impl Default for LightBufferData {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn test_uniform_block_matches_std140() {
        assert_eq!(size_of::<UniformBufferObject>(), 256);
        assert_eq!(align_of::<UniformBufferObject>(), 16);
        assert_eq!(offset_of!(UniformBufferObject, view), 64);
        assert_eq!(offset_of!(UniformBufferObject, proj), 128);
        assert_eq!(offset_of!(UniformBufferObject, view_pos), 192);
        assert_eq!(offset_of!(UniformBufferObject, time), 204);
        assert_eq!(offset_of!(UniformBufferObject, ambient_light), 208);
        assert_eq!(offset_of!(UniformBufferObject, num_lights), 220);
        assert_eq!(offset_of!(UniformBufferObject, sun_direction), 224);
        assert_eq!(offset_of!(UniformBufferObject, sun_intensity), 236);
        assert_eq!(offset_of!(UniformBufferObject, sun_color), 240);
    }

    #[test]
    fn test_light_record_matches_std430() {
        assert_eq!(size_of::<LightData>(), 80);
        assert_eq!(offset_of!(LightData, direction), 16);
        assert_eq!(offset_of!(LightData, color), 32);
        assert_eq!(offset_of!(LightData, intensity), 44);
        assert_eq!(offset_of!(LightData, range), 48);
        assert_eq!(offset_of!(LightData, inner_cone), 52);
        assert_eq!(offset_of!(LightData, outer_cone), 56);
        assert_eq!(offset_of!(LightData, light_type), 60);
        assert_eq!(offset_of!(LightData, enabled), 64);
    }

    #[test]
    fn test_light_buffer_header_and_capacity() {
        assert_eq!(offset_of!(LightBufferData, lights), 16);
        assert_eq!(size_of::<LightBufferData>(), 16 + 80 * MAX_LIGHTS);
    }

    #[test]
    fn test_from_records_truncates_at_capacity() {
        let record = LightData::new(1, [1.0; 3], [0.0, -1.0, 0.0], [1.0; 3], 1.0, 10.0, 30.0, 45.0, true);
        let records = vec![record; MAX_LIGHTS + 8];

        let data = LightBufferData::from_records(&records);
        assert_eq!(data.count, MAX_LIGHTS as i32);
        assert_eq!(data.active().len(), MAX_LIGHTS);
        assert!(data.active().iter().all(|l| *l == record));
    }

    #[test]
    fn test_from_records_zeroes_unused_slots() {
        let record = LightData::new(0, [0.0; 3], [0.0, -1.0, 0.0], [1.0; 3], 2.0, 10.0, 30.0, 45.0, true);
        let data = LightBufferData::from_records(&[record]);
        assert_eq!(data.count, 1);
        assert_eq!(data.lights[1], LightData::default());
    }
}
