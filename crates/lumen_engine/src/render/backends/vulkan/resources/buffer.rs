//! Buffer management for vertex data and uniforms
//!
//! All buffers here live in host-visible, host-coherent memory: the sample
//! geometry is tiny and the per-frame buffers are rewritten every tick.

use ash::vk;
use std::ptr::NonNull;

use super::DeviceHandle;
use crate::render::backends::vulkan::initialization::{VulkanContext, VulkanError, VulkanResult};

const HOST_MEMORY: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// Buffer with its own memory allocation
pub struct Buffer {
    buffer: DeviceHandle<vk::Buffer>,
    memory: DeviceHandle<vk::DeviceMemory>,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(
        context: &VulkanContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { device.create_buffer(&buffer_info, None) }.map_err(VulkanError::Api)?;
        let buffer = DeviceHandle::new(device.clone(), buffer);

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer.raw()) };
        let memory_type = context.find_memory_type(requirements.memory_type_bits, properties)?;
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        let memory = unsafe { device.allocate_memory(&alloc_info, None) }.map_err(VulkanError::Api)?;
        let memory = DeviceHandle::new(device.clone(), memory);

        unsafe { device.bind_buffer_memory(buffer.raw(), memory.raw(), 0) }.map_err(VulkanError::Api)?;

        Ok(Self { buffer, memory, size })
    }

    /// Copy `bytes` to the start of a host-visible buffer
    pub fn write_bytes(&self, bytes: &[u8]) -> VulkanResult<()> {
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("{} bytes do not fit a {} byte buffer", bytes.len(), self.size),
            });
        }
        let device = self.memory.device();
        unsafe {
            let ptr = device
                .map_memory(self.memory.raw(), 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            device.unmap_memory(self.memory.raw());
        }
        Ok(())
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.raw()
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

/// Host-visible vertex buffer filled at creation
pub struct VertexBuffer {
    buffer: Buffer,
    vertex_count: u32,
}

impl VertexBuffer {
    /// Create vertex buffer with vertex data
    pub fn new<T: bytemuck::Pod>(context: &VulkanContext, vertices: &[T]) -> VulkanResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let buffer = Buffer::new(
            context,
            bytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            HOST_MEMORY,
        )?;
        buffer.write_bytes(bytes)?;
        Ok(Self {
            buffer,
            vertex_count: vertices.len() as u32,
        })
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// Host-visible 32-bit index buffer filled at creation
pub struct IndexBuffer {
    buffer: Buffer,
    index_count: u32,
}

impl IndexBuffer {
    /// Create index buffer with index data
    pub fn new(context: &VulkanContext, indices: &[u32]) -> VulkanResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let buffer = Buffer::new(
            context,
            bytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::INDEX_BUFFER,
            HOST_MEMORY,
        )?;
        buffer.write_bytes(bytes)?;
        Ok(Self {
            buffer,
            index_count: indices.len() as u32,
        })
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Get index count
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Buffer mapped once at creation and kept mapped until dropped
pub struct MappedBuffer {
    buffer: Buffer,
    mapped: NonNull<u8>,
}

impl MappedBuffer {
    /// Create a host-visible buffer of `size` bytes and map it
    pub fn new(context: &VulkanContext, size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> VulkanResult<Self> {
        let buffer = Buffer::new(context, size, usage, HOST_MEMORY)?;
        let ptr = unsafe {
            buffer
                .memory
                .device()
                .map_memory(buffer.memory.raw(), 0, size, vk::MemoryMapFlags::empty())
        }
        .map_err(VulkanError::Api)?;
        let mapped = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| VulkanError::InitializationFailed("vkMapMemory returned null".to_string()))?;

        let mut mapped = Self { buffer, mapped };
        mapped.as_mut_slice().fill(0);
        Ok(mapped)
    }

    /// The mapped bytes
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.mapped.as_ptr(), self.buffer.size as usize) }
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.buffer.size()
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        unsafe {
            self.buffer.memory.device().unmap_memory(self.buffer.memory.raw());
        }
    }
}
