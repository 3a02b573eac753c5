//! Frame executor
//!
//! Drives the per-slot frame state machine
//! (`Idle → Acquiring → Recording → Submitted → Presenting → Idle`) over a
//! ring of [`MAX_FRAMES_IN_FLIGHT`] slots. The GPU work itself sits behind
//! the [`FrameBackend`] trait, which the Vulkan renderer implements.
//!
//! A slot's command buffer and mapped buffers are only written after its
//! in-flight guard has been waited on in [`FrameExecutor::begin_frame`].

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use crate::render::shader_data::{LightBufferData, UniformBufferObject};

/// Number of frame slots cycled round-robin
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Result of acquiring a presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image acquired (a suboptimal acquire is still usable)
    Image(u32),
    /// The surface no longer matches the window
    OutOfDate,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented as-is
    Presented,
    /// Presented, but the surface should be rebuilt
    Suboptimal,
    /// Not presented; the surface must be rebuilt
    OutOfDate,
}

/// Where a frame slot is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Free for a new frame
    #[default]
    Idle,
    /// Waiting on the guard and acquiring an image
    Acquiring,
    /// Commands recorded, uploads allowed
    Recording,
    /// Commands handed to the graphics queue
    Submitted,
    /// Image handed to the present queue
    Presenting,
}

/// GPU operations the executor sequences
pub trait FrameBackend {
    /// Block until the slot's previous submission has retired
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Acquire the next image, signalling the slot's image-available semaphore
    fn acquire_image(&mut self, slot: usize) -> VulkanResult<AcquireOutcome>;

    /// Unsignal the slot's in-flight guard
    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Record the slot's draw commands targeting `image_index`
    fn record_commands(&mut self, slot: usize, image_index: u32) -> VulkanResult<()>;

    /// Submit the slot's commands, signalling render-finished and the guard
    fn submit(&mut self, slot: usize) -> VulkanResult<()>;

    /// Present `image_index` once the slot's render-finished is signalled
    fn present(&mut self, slot: usize, image_index: u32) -> VulkanResult<PresentOutcome>;

    /// Wait for idle and rebuild the presentation surface
    fn recreate_surface(&mut self) -> VulkanResult<()>;

    /// Mapped bytes of the slot's uniform buffer
    fn uniform_region(&mut self, slot: usize) -> &mut [u8];

    /// Mapped bytes of the slot's light buffer
    fn light_region(&mut self, slot: usize) -> &mut [u8];
}

/// Frame in progress between `begin_frame` and `end_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveFrame {
    /// Frame slot in use
    pub slot: usize,
    /// Acquired swapchain image
    pub image_index: u32,
}

/// Slot ring and per-slot state machine
#[derive(Debug, Default)]
pub struct FrameExecutor {
    current_slot: usize,
    states: [SlotState; MAX_FRAMES_IN_FLIGHT],
    active: Option<ActiveFrame>,
    recreate_requested: bool,
    frames_presented: u64,
    surface_rebuilds: u64,
}

impl FrameExecutor {
    /// Start at slot 0 with every slot idle
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the surface before the next acquire (window resized)
    pub fn request_recreate(&mut self) {
        self.recreate_requested = true;
    }

    /// Begin a frame on the current slot.
    ///
    /// `Ok(None)` means the surface was out of date: it has been rebuilt and
    /// this tick renders nothing.
    pub fn begin_frame<B: FrameBackend>(&mut self, backend: &mut B) -> VulkanResult<Option<ActiveFrame>> {
        if self.active.is_some() {
            return Err(VulkanError::InvalidOperation {
                reason: "begin_frame called while a frame is active".to_string(),
            });
        }

        if self.recreate_requested {
            self.recreate_requested = false;
            self.rebuild_surface(backend)?;
        }

        let slot = self.current_slot;
        self.states[slot] = SlotState::Acquiring;
        backend.wait_for_slot(slot)?;

        let image_index = match backend.acquire_image(slot)? {
            AcquireOutcome::Image(index) => index,
            AcquireOutcome::OutOfDate => {
                log::debug!("Surface out of date on acquire, dropping frame");
                self.states[slot] = SlotState::Idle;
                self.rebuild_surface(backend)?;
                return Ok(None);
            }
        };

        backend.reset_slot(slot)?;
        backend.record_commands(slot, image_index)?;
        self.states[slot] = SlotState::Recording;

        let frame = ActiveFrame { slot, image_index };
        self.active = Some(frame);
        Ok(Some(frame))
    }

    /// Copy the uniform snapshot into the active slot's mapped buffer
    pub fn upload_uniforms<B: FrameBackend>(&mut self, backend: &mut B, ubo: &UniformBufferObject) -> VulkanResult<()> {
        let frame = self.require_active("upload_uniforms")?;
        write_region(backend.uniform_region(frame.slot), bytemuck::bytes_of(ubo))
    }

    /// Copy the light buffer into the active slot's mapped buffer
    pub fn upload_lights<B: FrameBackend>(&mut self, backend: &mut B, lights: &LightBufferData) -> VulkanResult<()> {
        let frame = self.require_active("upload_lights")?;
        write_region(backend.light_region(frame.slot), bytemuck::bytes_of(lights))
    }

    /// Submit and present the active frame, then advance the slot.
    ///
    /// Out-of-date or suboptimal presentation rebuilds the surface; only
    /// other failures are errors.
    pub fn end_frame<B: FrameBackend>(&mut self, backend: &mut B) -> VulkanResult<()> {
        let frame = self.active.take().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "end_frame called without an active frame".to_string(),
        })?;
        let slot = frame.slot;

        self.states[slot] = SlotState::Submitted;
        backend.submit(slot)?;

        self.states[slot] = SlotState::Presenting;
        let outcome = backend.present(slot, frame.image_index)?;
        self.states[slot] = SlotState::Idle;
        self.current_slot = (slot + 1) % MAX_FRAMES_IN_FLIGHT;
        self.frames_presented += 1;

        match outcome {
            PresentOutcome::Presented => {}
            PresentOutcome::Suboptimal | PresentOutcome::OutOfDate => {
                log::debug!("Present reported {:?}, rebuilding surface", outcome);
                self.rebuild_surface(backend)?;
            }
        }
        Ok(())
    }

    /// Slot the next frame will use
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// State of a slot, `None` if out of range
    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        self.states.get(slot).copied()
    }

    /// The frame between begin and end, if any
    pub fn active_frame(&self) -> Option<ActiveFrame> {
        self.active
    }

    /// Frames that went through `end_frame`
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Surface rebuilds triggered so far
    pub fn surface_rebuilds(&self) -> u64 {
        self.surface_rebuilds
    }

    fn rebuild_surface<B: FrameBackend>(&mut self, backend: &mut B) -> VulkanResult<()> {
        backend.recreate_surface()?;
        self.surface_rebuilds += 1;
        Ok(())
    }

    fn require_active(&self, operation: &str) -> VulkanResult<ActiveFrame> {
        match self.active {
            Some(frame) if self.states[frame.slot] == SlotState::Recording => Ok(frame),
            _ => Err(VulkanError::InvalidOperation {
                reason: format!("{} requires an active frame", operation),
            }),
        }
    }
}

fn write_region(region: &mut [u8], bytes: &[u8]) -> VulkanResult<()> {
    let region_len = region.len();
    let target = region.get_mut(..bytes.len()).ok_or_else(|| VulkanError::InvalidOperation {
        reason: format!("{} bytes do not fit a {} byte region", bytes.len(), region_len),
    })?;
    target.copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
    use crate::render::shader_data::{LightData, MAX_LIGHTS};
    use crate::render::systems::lighting::{LightType, LightingSystem};
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::mem::size_of;
    use std::rc::Rc;

    /// Stand-in for a swapchain; counts how many are alive
    struct MockSurface {
        live: Rc<Cell<i32>>,
        generation: u32,
    }

    impl MockSurface {
        fn new(live: &Rc<Cell<i32>>, generation: u32) -> Self {
            live.set(live.get() + 1);
            Self {
                live: Rc::clone(live),
                generation,
            }
        }
    }

    impl Drop for MockSurface {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    struct MockBackend {
        live_surfaces: Rc<Cell<i32>>,
        surface: Option<MockSurface>,
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<PresentOutcome>,
        uniforms: [Vec<u8>; MAX_FRAMES_IN_FLIGHT],
        lights: [Vec<u8>; MAX_FRAMES_IN_FLIGHT],
        calls: Vec<String>,
        next_image: u32,
    }

    impl MockBackend {
        fn new() -> Self {
            let live = Rc::new(Cell::new(0));
            let surface = MockSurface::new(&live, 0);
            Self {
                live_surfaces: live,
                surface: Some(surface),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                uniforms: [
                    vec![0; size_of::<UniformBufferObject>()],
                    vec![0; size_of::<UniformBufferObject>()],
                ],
                lights: [vec![0; size_of::<LightBufferData>()], vec![0; size_of::<LightBufferData>()]],
                calls: Vec::new(),
                next_image: 0,
            }
        }

        fn generation(&self) -> u32 {
            self.surface.as_ref().map_or(0, |s| s.generation)
        }
    }

    impl FrameBackend for MockBackend {
        fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
            self.calls.push(format!("wait{}", slot));
            Ok(())
        }

        fn acquire_image(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
            self.calls.push(format!("acquire{}", slot));
            Ok(self.acquire_script.pop_front().unwrap_or_else(|| {
                let image = self.next_image;
                self.next_image = (self.next_image + 1) % 3;
                AcquireOutcome::Image(image)
            }))
        }

        fn reset_slot(&mut self, slot: usize) -> VulkanResult<()> {
            self.calls.push(format!("reset{}", slot));
            Ok(())
        }

        fn record_commands(&mut self, slot: usize, _image_index: u32) -> VulkanResult<()> {
            self.calls.push(format!("record{}", slot));
            Ok(())
        }

        fn submit(&mut self, slot: usize) -> VulkanResult<()> {
            self.calls.push(format!("submit{}", slot));
            Ok(())
        }

        fn present(&mut self, slot: usize, _image_index: u32) -> VulkanResult<PresentOutcome> {
            self.calls.push(format!("present{}", slot));
            Ok(self.present_script.pop_front().unwrap_or(PresentOutcome::Presented))
        }

        fn recreate_surface(&mut self) -> VulkanResult<()> {
            self.calls.push("recreate".to_string());
            let generation = self.generation() + 1;
            self.surface = None;
            self.surface = Some(MockSurface::new(&self.live_surfaces, generation));
            Ok(())
        }

        fn uniform_region(&mut self, slot: usize) -> &mut [u8] {
            &mut self.uniforms[slot]
        }

        fn light_region(&mut self, slot: usize) -> &mut [u8] {
            &mut self.lights[slot]
        }
    }

    fn run_frame(executor: &mut FrameExecutor, backend: &mut MockBackend) {
        let frame = executor.begin_frame(backend).unwrap();
        assert!(frame.is_some());
        executor.end_frame(backend).unwrap();
    }

    #[test]
    fn test_slot_rotation() {
        let mut backend = MockBackend::new();
        let mut executor = FrameExecutor::new();
        for n in 1..=7u64 {
            run_frame(&mut executor, &mut backend);
            assert_eq!(executor.current_slot(), (n % 2) as usize);
            assert_eq!(executor.frames_presented(), n);
        }
        assert_eq!(executor.slot_state(0), Some(SlotState::Idle));
        assert_eq!(executor.slot_state(1), Some(SlotState::Idle));
        assert_eq!(executor.slot_state(2), None);
    }

    #[test]
    fn test_call_order() {
        let mut backend = MockBackend::new();
        let mut executor = FrameExecutor::new();
        run_frame(&mut executor, &mut backend);
        run_frame(&mut executor, &mut backend);
        assert_eq!(
            backend.calls,
            vec![
                "wait0", "acquire0", "reset0", "record0", "submit0", "present0", "wait1", "acquire1", "reset1",
                "record1", "submit1", "present1",
            ]
        );
    }

    #[test]
    fn test_out_of_date_acquire_drops_frame() {
        let mut backend = MockBackend::new();
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        let mut executor = FrameExecutor::new();

        let frame = executor.begin_frame(&mut backend).unwrap();
        assert!(frame.is_none());
        assert_eq!(executor.current_slot(), 0);
        assert_eq!(executor.slot_state(0), Some(SlotState::Idle));
        // The guard must stay signalled so the next wait cannot deadlock
        assert!(!backend.calls.iter().any(|c| c.starts_with("reset")));
        assert_eq!(backend.generation(), 1);

        run_frame(&mut executor, &mut backend);
        assert_eq!(executor.current_slot(), 1);
    }

    #[test]
    fn test_double_recreation_leaves_one_surface() {
        let mut backend = MockBackend::new();
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        let mut executor = FrameExecutor::new();

        assert!(executor.begin_frame(&mut backend).unwrap().is_none());
        assert!(executor.begin_frame(&mut backend).unwrap().is_none());

        assert_eq!(backend.live_surfaces.get(), 1);
        assert_eq!(backend.generation(), 2);
        assert_eq!(executor.surface_rebuilds(), 2);

        run_frame(&mut executor, &mut backend);
        assert_eq!(backend.live_surfaces.get(), 1);
    }

    #[test]
    fn test_present_outcomes_trigger_rebuild() {
        let mut backend = MockBackend::new();
        backend.present_script.push_back(PresentOutcome::Suboptimal);
        backend.present_script.push_back(PresentOutcome::OutOfDate);
        let mut executor = FrameExecutor::new();

        run_frame(&mut executor, &mut backend);
        run_frame(&mut executor, &mut backend);
        run_frame(&mut executor, &mut backend);

        assert_eq!(executor.surface_rebuilds(), 2);
        assert_eq!(executor.frames_presented(), 3);
        assert_eq!(executor.current_slot(), 1);
    }

    #[test]
    fn test_requested_recreate_runs_once_before_acquire() {
        let mut backend = MockBackend::new();
        let mut executor = FrameExecutor::new();
        executor.request_recreate();
        executor.request_recreate();

        run_frame(&mut executor, &mut backend);
        assert_eq!(backend.calls.first().map(String::as_str), Some("recreate"));
        assert_eq!(executor.surface_rebuilds(), 1);
    }

    #[test]
    fn test_uniform_round_trip() {
        let mut backend = MockBackend::new();
        let mut executor = FrameExecutor::new();

        let ubo = UniformBufferObject::new(
            Mat4::rotation_y(0.7),
            Mat4::look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::zeros(), Vec3::y()),
            Mat4::perspective(1.0, 16.0 / 9.0, 0.1, 100.0),
            [0.0, 2.0, 5.0],
            12.5,
            [0.1, 0.2, 0.3],
            3,
        )
        .with_sun([0.0, -0.6, 0.8], [1.0, 0.9, 0.7], 2.5);

        let frame = executor.begin_frame(&mut backend).unwrap().unwrap();
        executor.upload_uniforms(&mut backend, &ubo).unwrap();

        let region = backend.uniform_region(frame.slot);
        assert_eq!(&region[..size_of::<UniformBufferObject>()], bytemuck::bytes_of(&ubo));
        let read_back: UniformBufferObject = bytemuck::pod_read_unaligned(region);
        assert_eq!(read_back.model, ubo.model);
        assert_eq!(read_back.view, ubo.view);
        assert_eq!(read_back.proj, ubo.proj);
        assert_eq!(read_back.view_pos, ubo.view_pos);
        assert_eq!(read_back.time, ubo.time);
        assert_eq!(read_back.ambient_light, ubo.ambient_light);
        assert_eq!(read_back.num_lights, ubo.num_lights);
        assert_eq!(read_back.sun_direction, ubo.sun_direction);
        assert_eq!(read_back.sun_color, ubo.sun_color);
        assert_eq!(read_back.sun_intensity, ubo.sun_intensity);

        executor.end_frame(&mut backend).unwrap();
    }

    #[test]
    fn test_uploaded_light_count_matches_cap() {
        let mut lighting = LightingSystem::new();
        for _ in 0..40 {
            lighting.create_light(LightType::Point);
        }
        let lights = lighting.light_buffer();

        let mut backend = MockBackend::new();
        let mut executor = FrameExecutor::new();
        let frame = executor.begin_frame(&mut backend).unwrap().unwrap();
        executor.upload_lights(&mut backend, &lights).unwrap();

        let uploaded: LightBufferData = bytemuck::pod_read_unaligned(backend.light_region(frame.slot));
        assert_eq!(uploaded.count, MAX_LIGHTS as i32);
        assert_eq!(uploaded.active().len(), MAX_LIGHTS);
        assert!(uploaded.active().iter().all(|l: &LightData| l.enabled == 1));
    }

    #[test]
    fn test_uploads_and_end_require_active_frame() {
        let mut backend = MockBackend::new();
        let mut executor = FrameExecutor::new();

        assert!(matches!(
            executor.end_frame(&mut backend),
            Err(VulkanError::InvalidOperation { .. })
        ));
        assert!(matches!(
            executor.upload_uniforms(&mut backend, &UniformBufferObject::default()),
            Err(VulkanError::InvalidOperation { .. })
        ));
        assert!(executor.upload_lights(&mut backend, &LightBufferData::default()).is_err());
        assert_eq!(executor.frames_presented(), 0);
    }

    #[test]
    fn test_begin_twice_is_rejected() {
        let mut backend = MockBackend::new();
        let mut executor = FrameExecutor::new();
        executor.begin_frame(&mut backend).unwrap();
        assert!(executor.begin_frame(&mut backend).is_err());
        assert_eq!(executor.slot_state(0), Some(SlotState::Recording));
        executor.end_frame(&mut backend).unwrap();
    }
}
