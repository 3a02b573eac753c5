//! Core engine implementation
//!
//! Owns the window, the renderer and all scene state, and runs the frame
//! loop: events, script update, light snapshot, uniform build (which also
//! carries the ambient and sun globals), then
//! begin/upload/end on the frame executor.

use thiserror::Error;

use crate::core::{ApplicationConfig, ConfigError, EngineConfig};
use crate::foundation::math::{to_array3, Mat4, Mat4Ext};
use crate::foundation::time::Timer;
use crate::render::backends::vulkan::{VulkanError, VulkanRenderer, Window, WindowError, WindowEvent};
use crate::render::frame::FrameExecutor;
use crate::render::primitives::{Camera, Mesh};
use crate::render::shader_data::{LightBufferData, UniformBufferObject};
use crate::render::systems::lighting::{GlobalLighting, LightingSystem};
use crate::scripting::{ScriptApi, ScriptHost};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Window system failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan failure during initialization or a frame
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),
}

/// What the loop does in response to a window event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventReaction {
    Quit,
    Resize { width: u32, height: u32 },
    Ignore,
}

fn react(event: WindowEvent) -> EventReaction {
    match event {
        WindowEvent::CloseRequested | WindowEvent::KeyPressed(glfw::Key::Escape) => EventReaction::Quit,
        WindowEvent::FramebufferResized(width, height) => EventReaction::Resize { width, height },
        WindowEvent::KeyPressed(_) => EventReaction::Ignore,
    }
}

/// Main engine struct
///
/// Field order is drop order: the renderer (and with it the Vulkan surface)
/// goes before the window it was created from.
pub struct Engine {
    renderer: VulkanRenderer,
    window: Window,

    executor: FrameExecutor,
    lighting: LightingSystem,
    camera: Camera,
    timer: Timer,
    config: EngineConfig,

    quit_requested: bool,
    minimized: bool,
    model_angle: f32,
    last_stats_time: f32,
}

impl Engine {
    /// Validate `config`, open the window and bring up the renderer.
    ///
    /// The first failing step aborts; nothing is left half-running.
    pub fn new(config: ApplicationConfig) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");
        config.validate()?;

        let window = Window::new(&config.window)?;
        let renderer = VulkanRenderer::new(&window, &config.renderer, &Mesh::cube())?;
        let lighting = LightingSystem::from_config(&config.lighting);

        log::info!("Engine initialized");
        Ok(Self {
            renderer,
            window,
            executor: FrameExecutor::new(),
            lighting,
            camera: Camera::default(),
            timer: Timer::new(),
            config: config.engine,
            quit_requested: false,
            minimized: false,
            model_angle: 0.0,
            last_stats_time: 0.0,
        })
    }

    /// Run the frame loop until a script quits or the window closes.
    ///
    /// A frame error outside the recoverable presentation cases stops the
    /// loop; the device is drained before the error is returned.
    pub fn run(&mut self, scripts: &mut ScriptHost) -> Result<(), EngineError> {
        {
            let mut api = ScriptApi::new(
                &mut self.lighting,
                &mut self.camera,
                &mut self.quit_requested,
                self.timer.total_time(),
            );
            scripts.start(&mut api);
        }

        log::info!("Starting main loop...");
        while !self.quit_requested && !self.window.should_close() {
            if let Err(e) = self.tick(scripts) {
                log::error!("Fatal error during frame: {}", e);
                self.drain();
                return Err(e.into());
            }
        }

        self.drain();
        log::info!(
            "Engine shutdown complete: {} frames, {:.1} fps average, {} script failure(s)",
            self.executor.frames_presented(),
            self.timer.average_fps(),
            scripts.failure_count()
        );
        Ok(())
    }

    fn tick(&mut self, scripts: &mut ScriptHost) -> Result<(), VulkanError> {
        self.handle_events();
        if self.quit_requested {
            return Ok(());
        }

        if self.minimized {
            // Nothing to present to; sleep until the window changes
            self.window.wait_events();
            self.timer.update();
            return Ok(());
        }

        let delta_time = self.timer.update();
        {
            let mut api = ScriptApi::new(
                &mut self.lighting,
                &mut self.camera,
                &mut self.quit_requested,
                self.timer.total_time(),
            );
            scripts.call_update(&mut api, delta_time);
        }

        let lights = self.lighting.light_buffer();
        self.model_angle += self.config.model_spin_speed * delta_time;
        let uniforms = build_uniforms(
            &self.camera,
            self.renderer.aspect_ratio(),
            self.model_angle,
            self.timer.total_time(),
            self.lighting.globals(),
            &lights,
        );

        if self.executor.begin_frame(&mut self.renderer)?.is_some() {
            self.executor.upload_uniforms(&mut self.renderer, &uniforms)?;
            self.executor.upload_lights(&mut self.renderer, &lights)?;
            self.executor.end_frame(&mut self.renderer)?;
        }

        self.log_stats(scripts);
        Ok(())
    }

    fn handle_events(&mut self) {
        for event in self.window.poll_events() {
            match react(event) {
                EventReaction::Quit => {
                    log::info!("Shutdown requested by window");
                    self.quit_requested = true;
                }
                EventReaction::Resize { width, height } => {
                    log::debug!("Framebuffer resized to {}x{}", width, height);
                    self.minimized = width == 0 || height == 0;
                    self.renderer.set_framebuffer_size(width, height);
                    self.executor.request_recreate();
                }
                EventReaction::Ignore => {}
            }
        }
    }

    fn log_stats(&mut self, scripts: &ScriptHost) {
        let interval = self.config.stats_interval_secs;
        let now = self.timer.total_time();
        if interval <= 0.0 || now - self.last_stats_time < interval {
            return;
        }
        self.last_stats_time = now;

        let (width, height) = self.renderer.extent();
        log::info!(
            "{:.1} fps | {} frames | {} surface rebuild(s) | {} light(s) | {}x{} | {} script failure(s)",
            self.timer.average_fps(),
            self.executor.frames_presented(),
            self.executor.surface_rebuilds(),
            self.lighting.light_count(),
            width,
            height,
            scripts.failure_count()
        );
    }

    fn drain(&self) {
        if let Err(e) = self.renderer.wait_idle() {
            log::error!("Device did not reach idle during shutdown: {}", e);
        }
    }

    /// Light entities and global lighting
    pub fn lighting_mut(&mut self) -> &mut LightingSystem {
        &mut self.lighting
    }

    /// Scene camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Ask the loop to stop after the current tick
    pub fn quit(&mut self) {
        self.quit_requested = true;
    }
}

/// Assemble the per-frame uniform block
fn build_uniforms(
    camera: &Camera,
    aspect: f32,
    model_angle: f32,
    time: f32,
    globals: &GlobalLighting,
    lights: &LightBufferData,
) -> UniformBufferObject {
    UniformBufferObject::new(
        Mat4::rotation_y(model_angle) * Mat4::rotation_x(model_angle * 0.5),
        camera.view_matrix(),
        camera.projection_matrix(aspect),
        to_array3(&camera.position),
        time,
        to_array3(&globals.ambient_color),
        lights.count,
    )
    .with_sun(
        to_array3(&globals.sun_direction),
        to_array3(&globals.sun_color),
        globals.sun_intensity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::systems::lighting::LightType;
    use approx::assert_relative_eq;

    #[test]
    fn test_escape_and_close_quit() {
        assert_eq!(react(WindowEvent::CloseRequested), EventReaction::Quit);
        assert_eq!(react(WindowEvent::KeyPressed(glfw::Key::Escape)), EventReaction::Quit);
        assert_eq!(react(WindowEvent::KeyPressed(glfw::Key::Space)), EventReaction::Ignore);
    }

    #[test]
    fn test_resize_reaction_carries_size() {
        assert_eq!(
            react(WindowEvent::FramebufferResized(0, 0)),
            EventReaction::Resize { width: 0, height: 0 }
        );
    }

    #[test]
    fn test_uniforms_carry_light_count_and_ambient() {
        let mut lighting = LightingSystem::new();
        for _ in 0..3 {
            lighting.create_light(LightType::Point);
        }
        let disabled = lighting.create_light(LightType::Spot);
        lighting.set_light_enabled(disabled, false);

        let lights = lighting.light_buffer();
        let camera = Camera::default();
        let ubo = build_uniforms(&camera, 16.0 / 9.0, 0.0, 2.5, lighting.globals(), &lights);

        assert_eq!(ubo.num_lights, 3);
        assert_relative_eq!(ubo.time, 2.5);
        assert_eq!(ubo.view_pos, to_array3(&camera.position));
        assert_eq!(ubo.ambient_light, to_array3(&lighting.globals().ambient_color));
        assert_relative_eq!(ubo.model, Mat4::identity(), epsilon = 1e-6);
        assert_relative_eq!(ubo.proj, camera.projection_matrix(16.0 / 9.0), epsilon = 1e-6);
    }

    #[test]
    fn test_sun_changes_reach_uniforms() {
        let mut lighting = LightingSystem::new();
        lighting.set_sun_direction(Vec3::new(0.0, -2.0, 0.0));
        lighting.set_sun_color(Vec3::new(0.9, 0.5, 0.2));
        lighting.set_sun_intensity(1.25);

        let lights = lighting.light_buffer();
        let ubo = build_uniforms(&Camera::default(), 1.0, 0.0, 0.0, lighting.globals(), &lights);
        assert_eq!(ubo.sun_direction, [0.0, -1.0, 0.0]);
        assert_eq!(ubo.sun_color, [0.9, 0.5, 0.2]);
        assert_relative_eq!(ubo.sun_intensity, 1.25);
        assert_eq!(ubo.num_lights, 0, "the sun is not a light record");

        lighting.set_sun_intensity(0.0);
        let ubo = build_uniforms(&Camera::default(), 1.0, 0.0, 0.0, lighting.globals(), &lights);
        assert_eq!(ubo.sun_intensity, 0.0);
    }
}
