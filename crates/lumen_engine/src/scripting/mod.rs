//! # Scripting
//!
//! Per-tick script hooks and the capability object they operate through.
//!
//! Scripts never see the engine or the renderer. Each tick they get a
//! [`ScriptApi`] borrowing exactly what they may touch: lights, global
//! lighting, the camera, elapsed time and the shutdown flag. Light changes
//! made through it show up in the next light snapshot.
//!
//! A failing or panicking script is logged and skipped for that tick; the
//! frame loop keeps running.

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::render::primitives::Camera;
use crate::render::systems::lighting::{LightId, LightType, LightingSystem};

/// Errors raised by script code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// Script reported a failure
    #[error("Script '{script}' failed: {reason}")]
    Failed {
        /// Script name
        script: String,
        /// Failure description
        reason: String,
    },

    /// Script panicked; the panic was contained
    #[error("Script '{script}' panicked: {message}")]
    Panicked {
        /// Script name
        script: String,
        /// Panic payload, when it was a string
        message: String,
    },
}

impl ScriptError {
    /// Failure raised from inside a script
    pub fn failed(script: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            script: script.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for script code
pub type ScriptResult<T = ()> = Result<T, ScriptError>;

/// Initial properties for a light created from a script
#[derive(Debug, Clone, PartialEq)]
pub struct LightDesc {
    /// Light type
    pub light_type: LightType,
    /// World-space position
    pub position: Vec3,
    /// Linear RGB color
    pub color: Vec3,
    /// Intensity
    pub intensity: f32,
}

impl Default for LightDesc {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            position: Vec3::zeros(),
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
        }
    }
}

/// Capability object handed to scripts each tick
pub struct ScriptApi<'a> {
    lighting: &'a mut LightingSystem,
    camera: &'a mut Camera,
    quit_requested: &'a mut bool,
    elapsed: f32,
}

impl<'a> ScriptApi<'a> {
    /// Borrow the pieces of engine state scripts may touch
    pub fn new(
        lighting: &'a mut LightingSystem,
        camera: &'a mut Camera,
        quit_requested: &'a mut bool,
        elapsed: f32,
    ) -> Self {
        Self {
            lighting,
            camera,
            quit_requested,
            elapsed,
        }
    }

    // ---- lights ----

    /// Create a light from `desc` and return its id
    pub fn create_light(&mut self, desc: LightDesc) -> LightId {
        let id = self.lighting.create_light(desc.light_type);
        self.lighting.set_light_position(id, desc.position);
        self.lighting.set_light_color(id, desc.color);
        self.lighting.set_light_intensity(id, desc.intensity);
        id
    }

    /// Remove a light; false if the id is unknown
    pub fn remove_light(&mut self, id: LightId) -> bool {
        self.lighting.remove_light(id)
    }

    /// Set light position
    pub fn set_light_position(&mut self, id: LightId, position: Vec3) {
        self.lighting.set_light_position(id, position);
    }

    /// Set light direction (normalized on write)
    pub fn set_light_direction(&mut self, id: LightId, direction: Vec3) {
        self.lighting.set_light_direction(id, direction);
    }

    /// Set light color
    pub fn set_light_color(&mut self, id: LightId, color: Vec3) {
        self.lighting.set_light_color(id, color);
    }

    /// Set light intensity (clamped to >= 0)
    pub fn set_light_intensity(&mut self, id: LightId, intensity: f32) {
        self.lighting.set_light_intensity(id, intensity);
    }

    /// Set light range
    pub fn set_light_range(&mut self, id: LightId, range: f32) {
        self.lighting.set_light_range(id, range);
    }

    /// Set spot cone angles in degrees
    pub fn set_light_cone(&mut self, id: LightId, inner_degrees: f32, outer_degrees: f32) {
        self.lighting.set_light_cone(id, inner_degrees, outer_degrees);
    }

    /// Enable or disable a light
    pub fn set_light_enabled(&mut self, id: LightId, enabled: bool) {
        self.lighting.set_light_enabled(id, enabled);
    }

    /// Number of lights, enabled or not
    pub fn light_count(&self) -> usize {
        self.lighting.light_count()
    }

    // ---- globals ----

    /// Set ambient color
    pub fn set_ambient_color(&mut self, color: Vec3) {
        self.lighting.set_ambient_color(color);
    }

    /// Set sun direction
    pub fn set_sun_direction(&mut self, direction: Vec3) {
        self.lighting.set_sun_direction(direction);
    }

    /// Set sun color
    pub fn set_sun_color(&mut self, color: Vec3) {
        self.lighting.set_sun_color(color);
    }

    /// Set sun intensity
    pub fn set_sun_intensity(&mut self, intensity: f32) {
        self.lighting.set_sun_intensity(intensity);
    }

    // ---- camera ----

    /// Move the camera
    pub fn set_camera_position(&mut self, position: Vec3) {
        self.camera.set_position(position);
    }

    /// Point the camera at `target`
    pub fn set_camera_target(&mut self, target: Vec3) {
        self.camera.set_target(target);
    }

    /// Current camera position
    pub fn camera_position(&self) -> Vec3 {
        self.camera.position
    }

    // ---- engine ----

    /// Seconds since the engine started
    pub fn time(&self) -> f32 {
        self.elapsed
    }

    /// Write a message to the log under the `script` target
    pub fn log(&self, message: &str) {
        log::info!(target: "script", "{}", message);
    }

    /// Ask the engine to stop after this tick
    pub fn quit(&mut self) {
        log::info!("Shutdown requested by script");
        *self.quit_requested = true;
    }
}

/// A script driven once per tick
pub trait ScriptHook {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Called once before the first tick
    fn start(&mut self, _api: &mut ScriptApi<'_>) -> ScriptResult {
        Ok(())
    }

    /// Called every tick with the elapsed seconds since the previous one
    fn update(&mut self, api: &mut ScriptApi<'_>, delta_time: f32) -> ScriptResult;
}

/// Closure form of an update hook
pub type UpdateCallback = Box<dyn FnMut(&mut ScriptApi<'_>, f32) -> ScriptResult>;

const CALLBACK_NAME: &str = "update callback";

/// Runs the update callback and registered hooks, isolating their failures
#[derive(Default)]
pub struct ScriptHost {
    update_callback: Option<UpdateCallback>,
    hooks: Vec<Box<dyn ScriptHook>>,
    failures: u64,
}

impl ScriptHost {
    /// Create a host with nothing registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the per-tick update callback
    pub fn set_update_callback(
        &mut self,
        callback: impl FnMut(&mut ScriptApi<'_>, f32) -> ScriptResult + 'static,
    ) {
        self.update_callback = Some(Box::new(callback));
    }

    /// Register a hook; hooks run in registration order after the callback
    pub fn add_hook(&mut self, hook: impl ScriptHook + 'static) {
        log::debug!("Registered script hook '{}'", hook.name());
        self.hooks.push(Box::new(hook));
    }

    /// Number of registered hooks, not counting the callback
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Failures contained so far
    pub fn failure_count(&self) -> u64 {
        self.failures
    }

    /// Run every hook's `start`
    pub fn start(&mut self, api: &mut ScriptApi<'_>) {
        for hook in &mut self.hooks {
            let name = hook.name().to_string();
            let outcome = contain(&name, || hook.start(api));
            self.failures += record(outcome);
        }
    }

    /// Run the update callback and then every hook for one tick.
    ///
    /// Errors and panics are logged and counted, never propagated.
    pub fn call_update(&mut self, api: &mut ScriptApi<'_>, delta_time: f32) {
        if let Some(callback) = self.update_callback.as_mut() {
            let outcome = contain(CALLBACK_NAME, || callback(api, delta_time));
            self.failures += record(outcome);
        }

        for hook in &mut self.hooks {
            let name = hook.name().to_string();
            let outcome = contain(&name, || hook.update(api, delta_time));
            self.failures += record(outcome);
        }
    }
}

/// Run script code, turning a panic into `ScriptError::Panicked`
fn contain(name: &str, f: impl FnOnce() -> ScriptResult) -> ScriptResult {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Err(ScriptError::Panicked {
                script: name.to_string(),
                message,
            })
        }
    }
}

fn record(outcome: ScriptResult) -> u64 {
    match outcome {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    struct World {
        lighting: LightingSystem,
        camera: Camera,
        quit: bool,
    }

    impl World {
        fn new() -> Self {
            Self {
                lighting: LightingSystem::new(),
                camera: Camera::default(),
                quit: false,
            }
        }

        fn api(&mut self, elapsed: f32) -> ScriptApi<'_> {
            ScriptApi::new(&mut self.lighting, &mut self.camera, &mut self.quit, elapsed)
        }
    }

    struct Orbit {
        light: Option<LightId>,
    }

    impl ScriptHook for Orbit {
        fn name(&self) -> &str {
            "orbit"
        }

        fn start(&mut self, api: &mut ScriptApi<'_>) -> ScriptResult {
            self.light = Some(api.create_light(LightDesc::default()));
            Ok(())
        }

        fn update(&mut self, api: &mut ScriptApi<'_>, _delta_time: f32) -> ScriptResult {
            let id = self.light.ok_or_else(|| ScriptError::failed("orbit", "not started"))?;
            let t = api.time();
            api.set_light_position(id, Vec3::new(t.cos(), 1.0, t.sin()));
            Ok(())
        }
    }

    #[test]
    fn test_create_light_applies_description() {
        let mut world = World::new();
        let id = world.api(0.0).create_light(LightDesc {
            light_type: LightType::Spot,
            position: Vec3::new(1.0, 2.0, 3.0),
            color: Vec3::new(1.0, 0.0, 0.0),
            intensity: -4.0,
        });

        let light = world.lighting.light(id).unwrap();
        assert_eq!(light.light_type, LightType::Spot);
        assert_eq!(light.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(light.color, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(light.intensity, 0.0);
    }

    #[test]
    fn test_hook_changes_reach_snapshot() {
        let mut world = World::new();
        let mut host = ScriptHost::new();
        host.add_hook(Orbit { light: None });

        host.start(&mut world.api(0.0));
        host.call_update(&mut world.api(0.0), 0.016);

        let snapshot = world.lighting.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_relative_eq!(snapshot[0].position[0], 1.0);
        assert_relative_eq!(snapshot[0].position[2], 0.0);
        assert_eq!(host.failure_count(), 0);
    }

    #[test]
    fn test_callback_error_is_contained_and_hooks_still_run() {
        let mut world = World::new();
        let mut host = ScriptHost::new();
        let hook_ran = Rc::new(Cell::new(0));

        host.set_update_callback(|_, _| Err(ScriptError::failed("callback", "boom")));

        struct Counter(Rc<Cell<i32>>);
        impl ScriptHook for Counter {
            fn name(&self) -> &str {
                "counter"
            }
            fn update(&mut self, _api: &mut ScriptApi<'_>, _dt: f32) -> ScriptResult {
                self.0.set(self.0.get() + 1);
                Ok(())
            }
        }
        host.add_hook(Counter(hook_ran.clone()));

        host.call_update(&mut world.api(0.0), 0.016);
        host.call_update(&mut world.api(0.0), 0.016);

        assert_eq!(hook_ran.get(), 2);
        assert_eq!(host.failure_count(), 2);
    }

    #[test]
    fn test_panicking_callback_does_not_unwind_into_caller() {
        let mut world = World::new();
        let mut host = ScriptHost::new();
        host.set_update_callback(|api, _| {
            api.set_ambient_color(Vec3::new(0.5, 0.5, 0.5));
            panic!("script bug");
        });

        host.call_update(&mut world.api(0.0), 0.016);

        assert_eq!(host.failure_count(), 1);
        // Changes made before the panic stay applied
        assert_eq!(world.lighting.globals().ambient_color, Vec3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_panic_payload_becomes_message() {
        let err = contain("s", || panic!("bad {}", 7)).unwrap_err();
        assert_eq!(
            err,
            ScriptError::Panicked {
                script: "s".to_string(),
                message: "bad 7".to_string()
            }
        );
    }

    #[test]
    fn test_quit_sets_shutdown_flag() {
        let mut world = World::new();
        let mut host = ScriptHost::new();
        host.set_update_callback(|api, _| {
            if api.time() > 1.0 {
                api.quit();
            }
            Ok(())
        });

        host.call_update(&mut world.api(0.5), 0.5);
        assert!(!world.quit);
        host.call_update(&mut world.api(1.5), 0.5);
        assert!(world.quit);
    }

    #[test]
    fn test_camera_setters_route_to_camera() {
        let mut world = World::new();
        {
            let mut api = world.api(0.0);
            api.set_camera_position(Vec3::new(0.0, 5.0, 10.0));
            api.set_camera_target(Vec3::new(1.0, 0.0, 0.0));
            assert_eq!(api.camera_position(), Vec3::new(0.0, 5.0, 10.0));
        }
        assert_eq!(world.camera.target, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_remove_unknown_light_is_false() {
        let mut world = World::new();
        let mut api = world.api(0.0);
        let id = api.create_light(LightDesc::default());
        assert!(api.remove_light(id));
        assert!(!api.remove_light(id));
        assert_eq!(api.light_count(), 0);
    }
}
