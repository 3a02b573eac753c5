//! Light entities, global lighting, and the per-frame GPU snapshot
//!
//! `LightingSystem` is the only owner of light state. Everything else refers
//! to lights by `LightId`, and the renderer only ever sees the flattened
//! `LightData` records produced by [`LightingSystem::snapshot`].
//!
//! Property setters clamp or normalize on write, so stored state is always
//! valid: intensity >= 0, range >= 0.1, inner cone in [0, 89] degrees, outer
//! cone in [inner, 90] degrees, and unit-length directions. Operating on an
//! id that does not exist is a silent no-op.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::LightingConfig;
use crate::foundation::math::{to_array3, try_normalize, Vec3};
use crate::render::shader_data::{LightBufferData, LightData, MAX_LIGHTS};

/// Smallest range a light may have
pub const MIN_LIGHT_RANGE: f32 = 0.1;
/// Largest inner cone angle in degrees
pub const MAX_INNER_CONE: f32 = 89.0;
/// Largest outer cone angle in degrees
pub const MAX_OUTER_CONE: f32 = 90.0;

/// Light types; the discriminant is the type tag written to the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LightType {
    /// Parallel rays along `direction` (sun-like)
    Directional = 0,
    /// Omnidirectional light at `position`
    Point = 1,
    /// Cone of light at `position` pointing along `direction`
    Spot = 2,
}

impl LightType {
    /// Integer tag used by the shaders
    pub fn gpu_tag(self) -> i32 {
        self as i32
    }
}

/// Unique light identity, assigned in ascending order and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightId(pub u32);

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "light#{}", self.0)
    }
}

/// A light entity
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// World-space position
    pub position: Vec3,
    /// Unit direction
    pub direction: Vec3,
    /// Linear RGB color
    pub color: Vec3,
    /// Intensity, never negative
    pub intensity: f32,
    /// Falloff distance, at least `MIN_LIGHT_RANGE`
    pub range: f32,
    /// Inner cone angle in degrees
    pub inner_cone: f32,
    /// Outer cone angle in degrees
    pub outer_cone: f32,
    /// Whether the light takes part in the snapshot
    pub enabled: bool,
}

impl Light {
    /// A light of the given type with default properties
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            position: Vec3::zeros(),
            direction: Vec3::new(0.0, -1.0, 0.0),
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            range: 10.0,
            inner_cone: 30.0,
            outer_cone: 45.0,
            enabled: true,
        }
    }

    /// Convert to the GPU record layout
    pub fn to_gpu(&self) -> LightData {
        LightData::new(
            self.light_type.gpu_tag(),
            to_array3(&self.position),
            to_array3(&self.direction),
            to_array3(&self.color),
            self.intensity,
            self.range,
            self.inner_cone,
            self.outer_cone,
            self.enabled,
        )
    }
}

/// Process-wide lighting shared by every object
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLighting {
    /// Ambient color
    pub ambient_color: Vec3,
    /// Unit direction of sunlight
    pub sun_direction: Vec3,
    /// Sun color
    pub sun_color: Vec3,
    /// Sun intensity, never negative
    pub sun_intensity: f32,
}

impl Default for GlobalLighting {
    fn default() -> Self {
        Self::from_config(&LightingConfig::default())
    }
}

impl GlobalLighting {
    /// Build globals from configuration, normalizing the sun direction
    pub fn from_config(config: &LightingConfig) -> Self {
        let [dx, dy, dz] = config.sun_direction;
        Self {
            ambient_color: Vec3::from(config.ambient_color),
            sun_direction: try_normalize(Vec3::new(dx, dy, dz))
                .unwrap_or_else(|| Vec3::new(0.0, -1.0, 0.0)),
            sun_color: Vec3::from(config.sun_color),
            sun_intensity: config.sun_intensity.max(0.0),
        }
    }
}

/// Owner of all light entities and global lighting
#[derive(Debug, Clone)]
pub struct LightingSystem {
    lights: BTreeMap<LightId, Light>,
    next_id: u32,
    globals: GlobalLighting,
}

impl Default for LightingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl LightingSystem {
    /// Create an empty lighting system with default globals
    pub fn new() -> Self {
        Self::with_globals(GlobalLighting::default())
    }

    /// Create an empty lighting system seeded from configuration
    pub fn from_config(config: &LightingConfig) -> Self {
        Self::with_globals(GlobalLighting::from_config(config))
    }

    fn with_globals(globals: GlobalLighting) -> Self {
        Self {
            lights: BTreeMap::new(),
            next_id: 1,
            globals,
        }
    }

    // ---- entity lifecycle ----

    /// Create a light with default properties and return its id
    pub fn create_light(&mut self, light_type: LightType) -> LightId {
        let id = LightId(self.next_id);
        self.next_id += 1;
        self.lights.insert(id, Light::new(light_type));
        log::debug!("Created {:?} {}", light_type, id);
        id
    }

    /// Remove a light; false if the id is unknown
    pub fn remove_light(&mut self, id: LightId) -> bool {
        let removed = self.lights.remove(&id).is_some();
        if removed {
            log::debug!("Removed {}", id);
        }
        removed
    }

    /// Look up a light
    pub fn light(&self, id: LightId) -> Option<&Light> {
        self.lights.get(&id)
    }

    /// Number of lights, enabled or not
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Iterate all lights in ascending id order
    pub fn lights(&self) -> impl Iterator<Item = (LightId, &Light)> {
        self.lights.iter().map(|(id, light)| (*id, light))
    }

    // ---- per-light setters ----

    fn with_light(&mut self, id: LightId, f: impl FnOnce(&mut Light)) {
        if let Some(light) = self.lights.get_mut(&id) {
            f(light);
        }
    }

    /// Change the light type
    pub fn set_light_type(&mut self, id: LightId, light_type: LightType) {
        self.with_light(id, |light| light.light_type = light_type);
    }

    /// Set position
    pub fn set_light_position(&mut self, id: LightId, position: Vec3) {
        self.with_light(id, |light| light.position = position);
    }

    /// Set direction; stored normalized. A zero or non-finite vector leaves it unchanged.
    pub fn set_light_direction(&mut self, id: LightId, direction: Vec3) {
        match try_normalize(direction) {
            Some(unit) => self.with_light(id, |light| light.direction = unit),
            None => log::warn!("Ignoring degenerate direction {:?} for {}", direction, id),
        }
    }

    /// Set color
    pub fn set_light_color(&mut self, id: LightId, color: Vec3) {
        self.with_light(id, |light| light.color = color);
    }

    /// Set intensity, clamped to >= 0
    pub fn set_light_intensity(&mut self, id: LightId, intensity: f32) {
        self.with_light(id, |light| light.intensity = intensity.max(0.0));
    }

    /// Set range, clamped to >= `MIN_LIGHT_RANGE`
    pub fn set_light_range(&mut self, id: LightId, range: f32) {
        self.with_light(id, |light| light.range = range.max(MIN_LIGHT_RANGE));
    }

    /// Set spot cone angles in degrees.
    ///
    /// Inner is clamped to [0, 89]; outer to [inner, 90] using the clamped inner.
    pub fn set_light_cone(&mut self, id: LightId, inner_degrees: f32, outer_degrees: f32) {
        let (inner, outer) = clamp_cone(inner_degrees, outer_degrees);
        self.with_light(id, |light| {
            light.inner_cone = inner;
            light.outer_cone = outer;
        });
    }

    /// Enable or disable a light
    pub fn set_light_enabled(&mut self, id: LightId, enabled: bool) {
        self.with_light(id, |light| light.enabled = enabled);
    }

    // ---- globals ----

    /// Current global lighting
    pub fn globals(&self) -> &GlobalLighting {
        &self.globals
    }

    /// Set ambient color
    pub fn set_ambient_color(&mut self, color: Vec3) {
        self.globals.ambient_color = color;
    }

    /// Set sun direction; stored normalized. A zero or non-finite vector leaves it unchanged.
    pub fn set_sun_direction(&mut self, direction: Vec3) {
        match try_normalize(direction) {
            Some(unit) => self.globals.sun_direction = unit,
            None => log::warn!("Ignoring degenerate sun direction {:?}", direction),
        }
    }

    /// Set sun color
    pub fn set_sun_color(&mut self, color: Vec3) {
        self.globals.sun_color = color;
    }

    /// Set sun intensity, clamped to >= 0
    pub fn set_sun_intensity(&mut self, intensity: f32) {
        self.globals.sun_intensity = intensity.max(0.0);
    }

    // ---- aggregation ----

    /// Enabled lights as GPU records, ascending by id, at most `MAX_LIGHTS`.
    ///
    /// Lights beyond the cap are dropped for this call only.
    pub fn snapshot(&self) -> Vec<LightData> {
        self.lights
            .values()
            .filter(|light| light.enabled)
            .take(MAX_LIGHTS)
            .map(Light::to_gpu)
            .collect()
    }

    /// The snapshot packed into the light buffer layout (count + records)
    pub fn light_buffer(&self) -> LightBufferData {
        LightBufferData::from_records(&self.snapshot())
    }
}

/// Clamp cone angles so `0 <= inner <= 89` and `inner <= outer <= 90`.
///
/// `max`/`min` discard a NaN operand, so a NaN inner becomes 0 and a NaN
/// outer becomes the clamped inner.
pub fn clamp_cone(inner_degrees: f32, outer_degrees: f32) -> (f32, f32) {
    let inner = inner_degrees.max(0.0).min(MAX_INNER_CONE);
    let outer = outer_degrees.max(inner).min(MAX_OUTER_CONE);
    (inner, outer)
}
