//! Framebuffers and the shared depth attachment
//!
//! Everything here is sized to the swapchain extent and rebuilt together with
//! the swapchain.

use ash::vk;

use crate::render::backends::vulkan::initialization::{VulkanContext, VulkanError, VulkanResult};
use crate::render::backends::vulkan::resources::DeviceHandle;

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D32_SFLOAT,
];

/// First candidate whose optimal-tiling features allow depth attachments
pub fn pick_depth_format(
    candidates: &[vk::Format],
    optimal_features: impl Fn(vk::Format) -> vk::FormatFeatureFlags,
) -> VulkanResult<vk::Format> {
    candidates
        .iter()
        .copied()
        .find(|&format| optimal_features(format).contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT))
        .ok_or(VulkanError::UnsupportedDepthFormat)
}

/// Query the device and pick a depth format from [`DEPTH_FORMAT_CANDIDATES`]
pub fn find_depth_format(context: &VulkanContext) -> VulkanResult<vk::Format> {
    pick_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| unsafe {
        context
            .instance()
            .get_physical_device_format_properties(context.physical_device.device, format)
            .optimal_tiling_features
    })
}

/// Whether `format` carries a stencil component
pub fn has_stencil_component(format: vk::Format) -> bool {
    matches!(format, vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT)
}

/// Depth image, its memory and view
pub struct DepthTarget {
    // Field order is release order
    view: DeviceHandle<vk::ImageView>,
    _image: DeviceHandle<vk::Image>,
    _memory: DeviceHandle<vk::DeviceMemory>,
}

impl DepthTarget {
    /// Create a device-local depth image of `extent`
    pub fn new(context: &VulkanContext, format: vk::Format, extent: vk::Extent2D) -> VulkanResult<Self> {
        let device = context.raw_device();

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);
        let image = unsafe { device.create_image(&image_info, None) }.map_err(VulkanError::Api)?;
        let image = DeviceHandle::new(device.clone(), image);

        let requirements = unsafe { device.get_image_memory_requirements(image.raw()) };
        let memory_type =
            context.find_memory_type(requirements.memory_type_bits, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        let memory = unsafe { device.allocate_memory(&alloc_info, None) }.map_err(VulkanError::Api)?;
        let memory = DeviceHandle::new(device.clone(), memory);

        unsafe { device.bind_image_memory(image.raw(), memory.raw(), 0) }.map_err(VulkanError::Api)?;

        let aspect_mask = if has_stencil_component(format) {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        } else {
            vk::ImageAspectFlags::DEPTH
        };
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image.raw())
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe { device.create_image_view(&view_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self {
            view: DeviceHandle::new(device, view),
            _image: image,
            _memory: memory,
        })
    }

    /// Get the image view handle
    pub fn image_view(&self) -> vk::ImageView {
        self.view.raw()
    }
}

/// One framebuffer per swapchain image, all sharing one depth target
pub struct Framebuffers {
    framebuffers: Vec<DeviceHandle<vk::Framebuffer>>,
}

impl Framebuffers {
    /// Create framebuffers binding each color view with `depth`
    pub fn new(
        context: &VulkanContext,
        render_pass: vk::RenderPass,
        color_views: &[vk::ImageView],
        depth: &DepthTarget,
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let mut framebuffers = Vec::with_capacity(color_views.len());
        for &color_view in color_views {
            let attachments = [color_view, depth.image_view()];
            let create_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            let framebuffer =
                unsafe { device.create_framebuffer(&create_info, None) }.map_err(VulkanError::Api)?;
            framebuffers.push(DeviceHandle::new(device.clone(), framebuffer));
        }
        Ok(Self { framebuffers })
    }

    /// Framebuffer for a swapchain image
    pub fn get(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).map(DeviceHandle::raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_format_prefers_combined_32_bit() {
        let format = pick_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| {
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
        })
        .unwrap();
        assert_eq!(format, vk::Format::D32_SFLOAT_S8_UINT);
    }

    #[test]
    fn test_depth_format_skips_unsupported() {
        let format = pick_depth_format(&DEPTH_FORMAT_CANDIDATES, |f| {
            if f == vk::Format::D32_SFLOAT {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT | vk::FormatFeatureFlags::SAMPLED_IMAGE
            } else {
                vk::FormatFeatureFlags::SAMPLED_IMAGE
            }
        })
        .unwrap();
        assert_eq!(format, vk::Format::D32_SFLOAT);
    }

    #[test]
    fn test_depth_format_none_supported() {
        let result = pick_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| vk::FormatFeatureFlags::empty());
        assert!(matches!(result, Err(VulkanError::UnsupportedDepthFormat)));
    }

    #[test]
    fn test_stencil_detection() {
        assert!(has_stencil_component(vk::Format::D24_UNORM_S8_UINT));
        assert!(has_stencil_component(vk::Format::D32_SFLOAT_S8_UINT));
        assert!(!has_stencil_component(vk::Format::D32_SFLOAT));
    }
}
