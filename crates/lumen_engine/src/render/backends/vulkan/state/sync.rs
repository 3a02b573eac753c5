//! Vulkan synchronization primitives
//!
//! Semaphores order GPU work against GPU work; fences let the CPU wait for
//! the GPU.

use ash::{vk, Device};

use crate::render::backends::vulkan::initialization::{VulkanError, VulkanResult};
use crate::render::backends::vulkan::resources::DeviceHandle;

/// Binary semaphore
pub struct Semaphore {
    handle: DeviceHandle<vk::Semaphore>,
}

impl Semaphore {
    /// Create a new semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { device.create_semaphore(&create_info, None) }.map_err(VulkanError::Api)?;
        Ok(Self {
            handle: DeviceHandle::new(device, semaphore),
        })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.handle.raw()
    }
}

/// CPU-visible fence
pub struct Fence {
    handle: DeviceHandle<vk::Fence>,
}

impl Fence {
    /// Create a new fence, optionally already signalled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { device.create_fence(&create_info, None) }.map_err(VulkanError::Api)?;
        Ok(Self {
            handle: DeviceHandle::new(device, fence),
        })
    }

    /// Block until signalled or `timeout` nanoseconds pass
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe { self.handle.device().wait_for_fences(&[self.handle.raw()], true, timeout) }
            .map_err(VulkanError::Api)
    }

    /// Return to the unsignalled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.handle.device().reset_fences(&[self.handle.raw()]) }.map_err(VulkanError::Api)
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.handle.raw()
    }
}

/// Synchronization objects for one frame slot.
///
/// Render-finished semaphores are per swapchain image instead, because the
/// present engine may still hold one when the slot comes round again.
pub struct FrameSync {
    /// Signalled when the acquired swapchain image is ready
    pub image_available: Semaphore,
    /// In-flight guard; created signalled so the first wait returns at once
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create frame synchronization objects
    pub fn new(device: Device) -> VulkanResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device, true)?,
        })
    }
}
