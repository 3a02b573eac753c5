//! Owned device object handles
//!
//! Every device-level Vulkan object is held in a `DeviceHandle<T>`. The
//! release call is chosen statically by the `DeviceObject` impl for `T`, so a
//! handle carries no destructor closure and dropping it always runs the right
//! `vkDestroy*`/`vkFree*` function exactly once.

use ash::{vk, Device};

/// A raw Vulkan handle type that is released through the logical device
pub trait DeviceObject: Copy {
    /// Release the object.
    ///
    /// # Safety
    /// `raw` must have been created from `device`, must not be in use by the
    /// GPU, and must not be released twice.
    unsafe fn destroy(raw: Self, device: &Device);
}

macro_rules! device_object {
    ($($ty:ty => $release:ident),* $(,)?) => {
        $(
            impl DeviceObject for $ty {
                unsafe fn destroy(raw: Self, device: &Device) {
                    device.$release(raw, None);
                }
            }
        )*
    };
}

device_object! {
    vk::Semaphore => destroy_semaphore,
    vk::Fence => destroy_fence,
    vk::ImageView => destroy_image_view,
    vk::Image => destroy_image,
    vk::DeviceMemory => free_memory,
    vk::Buffer => destroy_buffer,
    vk::Framebuffer => destroy_framebuffer,
    vk::RenderPass => destroy_render_pass,
    vk::ShaderModule => destroy_shader_module,
    vk::PipelineLayout => destroy_pipeline_layout,
    vk::Pipeline => destroy_pipeline,
    vk::DescriptorSetLayout => destroy_descriptor_set_layout,
    vk::DescriptorPool => destroy_descriptor_pool,
    vk::CommandPool => destroy_command_pool,
}

/// Owning wrapper around a device object; releases it on drop
pub struct DeviceHandle<T: DeviceObject> {
    device: Device,
    raw: T,
}

impl<T: DeviceObject> DeviceHandle<T> {
    /// Take ownership of `raw`, which was created from `device`
    pub fn new(device: Device, raw: T) -> Self {
        Self { device, raw }
    }

    /// The raw handle; still owned by `self`
    pub fn raw(&self) -> T {
        self.raw
    }

    /// The device that owns the object
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl<T: DeviceObject> Drop for DeviceHandle<T> {
    fn drop(&mut self) {
        unsafe {
            T::destroy(self.raw, &self.device);
        }
    }
}
