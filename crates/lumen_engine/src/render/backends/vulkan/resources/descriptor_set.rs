//! Descriptor set layouts, pools and writes

use ash::{vk, Device};

use super::DeviceHandle;
use crate::render::backends::vulkan::initialization::{VulkanError, VulkanResult};

/// Descriptor set layout builder
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new descriptor set layout builder
    pub fn new() -> Self {
        Self::default()
    }

    fn add(mut self, binding: u32, ty: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(ty)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER, stage_flags)
    }

    /// Add a storage buffer binding
    pub fn add_storage_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::STORAGE_BUFFER, stage_flags)
    }

    /// Bindings added so far
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }.map_err(VulkanError::Api)?;
        Ok(DescriptorSetLayout {
            handle: DeviceHandle::new(device.clone(), layout),
            bindings: self.bindings,
        })
    }
}

/// Descriptor set layout plus the bindings it was built from
pub struct DescriptorSetLayout {
    handle: DeviceHandle<vk::DescriptorSetLayout>,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle.raw()
    }

    /// Get the bindings used in this layout
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }
}

/// Pool sizes for exactly `set_count` sets of the given bindings
pub fn pool_sizes_for(bindings: &[vk::DescriptorSetLayoutBinding], set_count: u32) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for binding in bindings {
        let count = binding.descriptor_count * set_count;
        match sizes.iter_mut().find(|s| s.ty == binding.descriptor_type) {
            Some(size) => size.descriptor_count += count,
            None => sizes.push(vk::DescriptorPoolSize {
                ty: binding.descriptor_type,
                descriptor_count: count,
            }),
        }
    }
    sizes
}

/// Descriptor pool sized for a fixed number of sets of one layout
pub struct DescriptorPool {
    handle: DeviceHandle<vk::DescriptorPool>,
    max_sets: u32,
}

impl DescriptorPool {
    /// Create a pool holding exactly `max_sets` sets of `layout`
    pub fn for_layout(device: Device, layout: &DescriptorSetLayout, max_sets: u32) -> VulkanResult<Self> {
        let pool_sizes = pool_sizes_for(layout.bindings(), max_sets);
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);
        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }.map_err(VulkanError::Api)?;
        Ok(Self {
            handle: DeviceHandle::new(device, pool),
            max_sets,
        })
    }

    /// Allocate one set per entry in `layouts`
    pub fn allocate_descriptor_sets(&self, layouts: &[vk::DescriptorSetLayout]) -> VulkanResult<Vec<vk::DescriptorSet>> {
        if layouts.len() as u32 > self.max_sets {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Pool holds {} sets, {} requested", self.max_sets, layouts.len()),
            });
        }
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.handle.raw())
            .set_layouts(layouts);
        unsafe { self.handle.device().allocate_descriptor_sets(&alloc_info) }.map_err(VulkanError::Api)
    }

    /// Get the pool handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.handle.raw()
    }
}

/// Collects buffer writes for one descriptor set
pub struct DescriptorSetWriter {
    set: vk::DescriptorSet,
    buffers: Vec<(u32, vk::DescriptorType, vk::DescriptorBufferInfo)>,
}

impl DescriptorSetWriter {
    /// Start writing into `set`
    pub fn new(set: vk::DescriptorSet) -> Self {
        Self {
            set,
            buffers: Vec::new(),
        }
    }

    /// Point a uniform buffer binding at the whole of `buffer`
    pub fn uniform_buffer(mut self, binding: u32, buffer: vk::Buffer) -> Self {
        self.buffers
            .push((binding, vk::DescriptorType::UNIFORM_BUFFER, whole(buffer)));
        self
    }

    /// Point a storage buffer binding at the whole of `buffer`
    pub fn storage_buffer(mut self, binding: u32, buffer: vk::Buffer) -> Self {
        self.buffers
            .push((binding, vk::DescriptorType::STORAGE_BUFFER, whole(buffer)));
        self
    }

    /// Apply all writes
    pub fn update(self, device: &Device) {
        let infos: Vec<[vk::DescriptorBufferInfo; 1]> = self.buffers.iter().map(|(_, _, info)| [*info]).collect();
        let writes: Vec<vk::WriteDescriptorSet> = self
            .buffers
            .iter()
            .zip(&infos)
            .map(|((binding, ty, _), info)| {
                vk::WriteDescriptorSet::builder()
                    .dst_set(self.set)
                    .dst_binding(*binding)
                    .descriptor_type(*ty)
                    .buffer_info(info)
                    .build()
            })
            .collect();
        unsafe { device.update_descriptor_sets(&writes, &[]) };
    }
}

fn whole(buffer: vk::Buffer) -> vk::DescriptorBufferInfo {
    vk::DescriptorBufferInfo {
        buffer,
        offset: 0,
        range: vk::WHOLE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_sizes_cover_exactly_the_sets() {
        let builder = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .add_storage_buffer(1, vk::ShaderStageFlags::FRAGMENT);

        let sizes = pool_sizes_for(builder.bindings(), 2);
        assert_eq!(sizes.len(), 2);
        let count = |ty| sizes.iter().find(|s| s.ty == ty).map(|s| s.descriptor_count);
        assert_eq!(count(vk::DescriptorType::UNIFORM_BUFFER), Some(2));
        assert_eq!(count(vk::DescriptorType::STORAGE_BUFFER), Some(2));
    }

    #[test]
    fn test_pool_sizes_merge_same_type() {
        let builder = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .add_uniform_buffer(1, vk::ShaderStageFlags::FRAGMENT);
        let sizes = pool_sizes_for(builder.bindings(), 3);
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].descriptor_count, 6);
    }

    #[test]
    fn test_binding_stages() {
        let builder = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .add_storage_buffer(1, vk::ShaderStageFlags::FRAGMENT);
        let bindings = builder.bindings();
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert!(bindings[0].stage_flags.contains(vk::ShaderStageFlags::VERTEX));
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }
}
