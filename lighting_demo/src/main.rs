//! Lighting demo application
//!
//! Spins the sample cube under a handful of orbiting colored point lights,
//! a slowly turning sun and a spot light that pulses. All animation runs
//! through script hooks.

use std::path::Path;

use lumen_engine::prelude::*;

const CONFIG_PATH: &str = "lumen.toml";

/// Point lights circling the cube at staggered phases
struct OrbitingLights {
    lights: Vec<LightId>,
    radius: f32,
    speed: f32,
}

impl OrbitingLights {
    fn new(radius: f32, speed: f32) -> Self {
        Self {
            lights: Vec::new(),
            radius,
            speed,
        }
    }
}

impl ScriptHook for OrbitingLights {
    fn name(&self) -> &str {
        "orbiting_lights"
    }

    fn start(&mut self, api: &mut ScriptApi<'_>) -> ScriptResult {
        let colors = [
            Vec3::new(1.0, 0.2, 0.2),
            Vec3::new(0.2, 1.0, 0.2),
            Vec3::new(0.2, 0.4, 1.0),
        ];
        for color in colors {
            let id = api.create_light(LightDesc {
                light_type: LightType::Point,
                position: Vec3::new(self.radius, 1.0, 0.0),
                color,
                intensity: 4.0,
            });
            api.set_light_range(id, 8.0);
            self.lights.push(id);
        }

        api.log(&format!("Created {} orbiting lights", self.lights.len()));
        Ok(())
    }

    fn update(&mut self, api: &mut ScriptApi<'_>, _delta_time: f32) -> ScriptResult {
        let count = self.lights.len().max(1) as f32;
        let t = api.time() * self.speed;
        for (i, id) in self.lights.iter().enumerate() {
            let phase = t + i as f32 * std::f32::consts::TAU / count;
            let position = Vec3::new(
                self.radius * phase.cos(),
                1.0 + 0.5 * (phase * 2.0).sin(),
                self.radius * phase.sin(),
            );
            api.set_light_position(*id, position);
        }
        Ok(())
    }
}

/// Overhead spot light whose intensity breathes over time
struct PulsingSpot {
    light: Option<LightId>,
}

impl ScriptHook for PulsingSpot {
    fn name(&self) -> &str {
        "pulsing_spot"
    }

    fn start(&mut self, api: &mut ScriptApi<'_>) -> ScriptResult {
        let id = api.create_light(LightDesc {
            light_type: LightType::Spot,
            position: Vec3::new(0.0, 4.0, 0.0),
            color: Vec3::new(1.0, 0.9, 0.7),
            intensity: 6.0,
        });
        api.set_light_direction(id, Vec3::new(0.0, -1.0, 0.0));
        api.set_light_cone(id, 15.0, 30.0);
        api.set_light_range(id, 12.0);
        self.light = Some(id);
        Ok(())
    }

    fn update(&mut self, api: &mut ScriptApi<'_>, _delta_time: f32) -> ScriptResult {
        let id = self
            .light
            .ok_or_else(|| ScriptError::failed(self.name(), "update before start"))?;
        let pulse = 0.5 + 0.5 * (api.time() * 1.5).sin();
        api.set_light_intensity(id, 6.0 * pulse);
        Ok(())
    }
}

fn load_config() -> Result<ApplicationConfig, Box<dyn std::error::Error>> {
    if Path::new(CONFIG_PATH).exists() {
        Ok(ApplicationConfig::load_from_file(CONFIG_PATH)?)
    } else {
        Ok(ApplicationConfig::new("Lumen Lighting Demo"))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init(&config.engine.log_level);
    log::info!("Starting Lumen lighting demo");

    let mut scripts = ScriptHost::new();
    scripts.add_hook(OrbitingLights::new(3.0, 0.8));
    scripts.add_hook(PulsingSpot { light: None });
    scripts.set_update_callback(|api, _delta_time| {
        let t = api.time() * 0.2;
        api.set_sun_direction(Vec3::new(t.cos(), -0.8, t.sin()));
        api.set_camera_position(Vec3::new(6.0 * (t * 0.5).sin(), 3.0, 6.0 * (t * 0.5).cos()));
        Ok(())
    });

    let mut engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Engine initialization failed: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = engine.run(&mut scripts) {
        log::error!("Lighting demo stopped with an error: {}", e);
        return Err(e.into());
    }

    log::info!("Lighting demo finished successfully");
    Ok(())
}
