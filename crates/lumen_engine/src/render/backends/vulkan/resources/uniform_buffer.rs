//! Per-frame shader data buffers
//!
//! Each frame slot owns a uniform buffer (binding 0) and a light storage
//! buffer (binding 1), both persistently mapped.

use ash::vk;
use std::mem::size_of;

use super::buffer::MappedBuffer;
use crate::render::backends::vulkan::initialization::{VulkanContext, VulkanResult};
use crate::render::shader_data::{LightBufferData, UniformBufferObject};

/// Mapped uniform and light buffers for one frame slot
pub struct FrameUniforms {
    uniforms: MappedBuffer,
    lights: MappedBuffer,
}

impl FrameUniforms {
    /// Allocate and map both buffers, zero-filled
    pub fn new(context: &VulkanContext) -> VulkanResult<Self> {
        Ok(Self {
            uniforms: MappedBuffer::new(
                context,
                size_of::<UniformBufferObject>() as vk::DeviceSize,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
            )?,
            lights: MappedBuffer::new(
                context,
                size_of::<LightBufferData>() as vk::DeviceSize,
                vk::BufferUsageFlags::STORAGE_BUFFER,
            )?,
        })
    }

    /// Mapped bytes of the uniform buffer
    pub fn uniform_bytes(&mut self) -> &mut [u8] {
        self.uniforms.as_mut_slice()
    }

    /// Mapped bytes of the light buffer
    pub fn light_bytes(&mut self) -> &mut [u8] {
        self.lights.as_mut_slice()
    }

    /// Uniform buffer handle
    pub fn uniform_buffer(&self) -> vk::Buffer {
        self.uniforms.handle()
    }

    /// Light buffer handle
    pub fn light_buffer(&self) -> vk::Buffer {
        self.lights.handle()
    }
}
