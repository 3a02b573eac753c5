//! Vulkan resource management
//!
//! Owned device handles, buffers, descriptor sets and the per-frame shader
//! data buffers.

/// Owned device object handles
pub mod handle;

/// Buffer types (generic, vertex, index, persistently mapped)
pub mod buffer;

/// Descriptor set management
pub mod descriptor_set;

/// Per-frame uniform and light buffers
pub mod uniform_buffer;

pub use buffer::{Buffer, IndexBuffer, MappedBuffer, VertexBuffer};
pub use descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
pub use handle::{DeviceHandle, DeviceObject};
pub use uniform_buffer::FrameUniforms;
