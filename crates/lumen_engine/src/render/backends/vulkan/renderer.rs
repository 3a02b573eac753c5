//! Vulkan renderer
//!
//! Owns every GPU object for the lit-mesh scene and implements
//! [`FrameBackend`] so the frame executor can drive it. The executor decides
//! when to wait, acquire, record, submit, present and rebuild; this type only
//! knows how.

use ash::vk;

use super::initialization::{VulkanContext, VulkanError, VulkanResult, Window};
use super::rendering::{CommandPool, CommandRecorder, GraphicsPipeline, RenderPass, ShaderModule};
use super::resources::{
    DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter, FrameUniforms, IndexBuffer,
    VertexBuffer,
};
use super::state::{
    choose_extent, choose_surface_format, find_depth_format, is_zero_area, DepthTarget, FrameSync, Framebuffers,
    Semaphore, Swapchain,
};
use crate::core::{ShaderConfig, VulkanRendererConfig};
use crate::render::frame::{AcquireOutcome, FrameBackend, PresentOutcome, MAX_FRAMES_IN_FLIGHT};
use crate::render::primitives::Mesh;

/// Everything sized to or counted by the swapchain; rebuilt as a unit.
///
/// Field order is drop order.
struct SurfaceResources {
    framebuffers: Framebuffers,
    _depth: DepthTarget,
    render_finished: Vec<Semaphore>,
    swapchain: Swapchain,
}

impl SurfaceResources {
    fn new(
        context: &VulkanContext,
        render_pass: &RenderPass,
        depth_format: vk::Format,
        desired_extent: vk::Extent2D,
        old: Option<&Swapchain>,
    ) -> VulkanResult<Self> {
        let swapchain = Swapchain::new(context, desired_extent, old)?;
        let depth = DepthTarget::new(context, depth_format, swapchain.extent())?;
        let framebuffers = Framebuffers::new(
            context,
            render_pass.handle(),
            &swapchain.image_views(),
            &depth,
            swapchain.extent(),
        )?;
        let render_finished = (0..swapchain.image_count())
            .map(|_| Semaphore::new(context.raw_device()))
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self {
            framebuffers,
            _depth: depth,
            render_finished,
            swapchain,
        })
    }
}

/// Lit-mesh renderer over a single window surface.
///
/// Fields drop top to bottom: surface-dependent objects, pipeline, buffers,
/// sync objects, then the context (device, surface, instance).
pub struct VulkanRenderer {
    surface: SurfaceResources,
    pipeline: GraphicsPipeline,
    render_pass: RenderPass,

    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,
    frame_uniforms: Vec<FrameUniforms>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    _descriptor_pool: DescriptorPool,
    descriptor_layout: DescriptorSetLayout,

    command_recorders: Vec<CommandRecorder>,
    _command_pool: CommandPool,
    frame_sync: Vec<FrameSync>,

    slot_images: [u32; MAX_FRAMES_IN_FLIGHT],
    depth_format: vk::Format,
    desired_extent: vk::Extent2D,
    surface_stale: bool,
    clear_color: [f32; 4],
    shaders: ShaderConfig,

    context: VulkanContext,
}

impl VulkanRenderer {
    /// Build the context, surface resources, pipeline and per-frame data,
    /// and upload `mesh` as the scene geometry
    pub fn new(window: &Window, config: &VulkanRendererConfig, mesh: &Mesh) -> VulkanResult<Self> {
        log::info!("Initializing Vulkan renderer...");
        let context = VulkanContext::new(window, config)?;
        let device = context.raw_device();

        let (width, height) = window.framebuffer_size();
        let desired_extent = vk::Extent2D { width, height };

        let depth_format = find_depth_format(&context)?;
        log::debug!("Depth format: {:?}", depth_format);

        let descriptor_layout = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .add_storage_buffer(1, vk::ShaderStageFlags::FRAGMENT)
            .build(&device)?;

        let surface_format = {
            let support = context.surface_support()?;
            choose_surface_format(&support.formats)
                .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))?
        };
        let render_pass = RenderPass::new_forward_pass(device.clone(), surface_format.format, depth_format)?;
        let pipeline = Self::build_pipeline(&context, &config.shaders, &render_pass, &descriptor_layout)?;

        let surface = SurfaceResources::new(&context, &render_pass, depth_format, desired_extent, None)?;

        let vertex_buffer = VertexBuffer::new(&context, &mesh.vertices)?;
        let index_buffer = IndexBuffer::new(&context, &mesh.indices)?;

        let frame_uniforms = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameUniforms::new(&context))
            .collect::<VulkanResult<Vec<_>>>()?;

        let descriptor_pool =
            DescriptorPool::for_layout(device.clone(), &descriptor_layout, MAX_FRAMES_IN_FLIGHT as u32)?;
        let layouts = [descriptor_layout.handle(); MAX_FRAMES_IN_FLIGHT];
        let descriptor_sets = descriptor_pool.allocate_descriptor_sets(&layouts)?;
        for (set, uniforms) in descriptor_sets.iter().zip(&frame_uniforms) {
            DescriptorSetWriter::new(*set)
                .uniform_buffer(0, uniforms.uniform_buffer())
                .storage_buffer(1, uniforms.light_buffer())
                .update(&device);
        }

        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let command_recorders = command_pool
            .allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?
            .into_iter()
            .map(|cb| CommandRecorder::new(cb, device.clone()))
            .collect();

        let frame_sync = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!(
            "Vulkan renderer ready: {}x{}, {} swapchain image(s), {} frames in flight",
            surface.swapchain.extent().width,
            surface.swapchain.extent().height,
            surface.swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            surface,
            pipeline,
            render_pass,
            vertex_buffer,
            index_buffer,
            frame_uniforms,
            descriptor_sets,
            _descriptor_pool: descriptor_pool,
            descriptor_layout,
            command_recorders,
            _command_pool: command_pool,
            frame_sync,
            slot_images: [0; MAX_FRAMES_IN_FLIGHT],
            depth_format,
            desired_extent,
            surface_stale: false,
            clear_color: config.clear_color,
            shaders: config.shaders.clone(),
            context,
        })
    }

    fn build_pipeline(
        context: &VulkanContext,
        shaders: &ShaderConfig,
        render_pass: &RenderPass,
        descriptor_layout: &DescriptorSetLayout,
    ) -> VulkanResult<GraphicsPipeline> {
        let device = context.raw_device();
        let vertex = ShaderModule::from_file(device.clone(), &shaders.vertex_shader_path)?;
        let fragment = ShaderModule::from_file(device.clone(), &shaders.fragment_shader_path)?;
        GraphicsPipeline::new(
            device,
            render_pass.handle(),
            &vertex,
            &fragment,
            &[descriptor_layout.handle()],
        )
    }

    /// Record the window's current framebuffer size for the next rebuild
    pub fn set_framebuffer_size(&mut self, width: u32, height: u32) {
        self.desired_extent = vk::Extent2D { width, height };
    }

    /// Current swapchain extent
    pub fn extent(&self) -> (u32, u32) {
        let extent = self.surface.swapchain.extent();
        (extent.width, extent.height)
    }

    /// Width over height of the swapchain images
    pub fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.extent();
        width as f32 / height.max(1) as f32
    }

    /// Block until all queued GPU work has finished
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }
}

impl FrameBackend for VulkanRenderer {
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.frame_sync[slot].in_flight.wait(u64::MAX)
    }

    fn acquire_image(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
        if self.surface_stale {
            return Ok(AcquireOutcome::OutOfDate);
        }
        self.surface
            .swapchain
            .acquire_next_image(self.frame_sync[slot].image_available.handle())
    }

    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.frame_sync[slot].in_flight.reset()
    }

    fn record_commands(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
        self.slot_images[slot] = image_index;

        let framebuffer = self
            .surface
            .framebuffers
            .get(image_index)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No framebuffer for swapchain image {}", image_index),
            })?;
        let extent = self.surface.swapchain.extent();
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];

        let recorder = &mut self.command_recorders[slot];
        recorder.begin()?;
        {
            let mut pass =
                recorder.begin_render_pass(self.render_pass.handle(), framebuffer, render_area, &clear_values)?;
            pass.set_viewport(vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            });
            pass.set_scissor(render_area);
            pass.bind_pipeline(self.pipeline.handle());
            pass.bind_descriptor_sets(self.pipeline.layout(), &self.descriptor_sets[slot..=slot]);
            pass.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
            pass.bind_index_buffer(self.index_buffer.handle());
            pass.draw_indexed(self.index_buffer.index_count(), 1);
        }
        recorder.end()?;
        Ok(())
    }

    fn submit(&mut self, slot: usize) -> VulkanResult<()> {
        let image_index = self.slot_images[slot] as usize;
        let sync = &self.frame_sync[slot];

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.command_recorders[slot].handle()];
        let signal_semaphores = [self.surface.render_finished[image_index].handle()];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.context.device.device.queue_submit(
                self.context.device.graphics_queue,
                &[submit_info.build()],
                sync.in_flight.handle(),
            )
        }
        .map_err(VulkanError::Api)
    }

    fn present(&mut self, _slot: usize, image_index: u32) -> VulkanResult<PresentOutcome> {
        let wait = self.surface.render_finished[image_index as usize].handle();
        self.surface
            .swapchain
            .present(self.context.device.present_queue, image_index, wait)
    }

    fn recreate_surface(&mut self) -> VulkanResult<()> {
        self.context.wait_idle()?;

        let support = self.context.surface_support()?;
        if is_zero_area(choose_extent(&support.capabilities, self.desired_extent)) {
            log::debug!("Surface has zero area, deferring swapchain rebuild");
            self.surface_stale = true;
            return Ok(());
        }

        let format = choose_surface_format(&support.formats)
            .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))?
            .format;
        if format != self.render_pass.color_format() {
            log::info!(
                "Surface format changed {:?} -> {:?}, rebuilding pipeline",
                self.render_pass.color_format(),
                format
            );
            let render_pass = RenderPass::new_forward_pass(self.context.raw_device(), format, self.depth_format)?;
            self.pipeline = Self::build_pipeline(&self.context, &self.shaders, &render_pass, &self.descriptor_layout)?;
            self.render_pass = render_pass;
        }

        let rebuilt = SurfaceResources::new(
            &self.context,
            &self.render_pass,
            self.depth_format,
            self.desired_extent,
            Some(&self.surface.swapchain),
        )?;
        // Assigning drops the previous set, retiring the old swapchain
        self.surface = rebuilt;
        self.surface_stale = false;

        let extent = self.surface.swapchain.extent();
        log::info!("Swapchain rebuilt at {}x{}", extent.width, extent.height);
        Ok(())
    }

    fn uniform_region(&mut self, slot: usize) -> &mut [u8] {
        self.frame_uniforms[slot].uniform_bytes()
    }

    fn light_region(&mut self, slot: usize) -> &mut [u8] {
        self.frame_uniforms[slot].light_bytes()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        log::debug!("Cleaning up VulkanRenderer...");
        if let Err(e) = self.wait_idle() {
            log::error!("Device did not reach idle before teardown: {}", e);
        }
    }
}
