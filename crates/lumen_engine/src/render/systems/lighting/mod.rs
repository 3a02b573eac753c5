//! Lighting system: light entities, global lighting and GPU snapshots

#[allow(clippy::module_inception)]
mod lighting;

pub use lighting::{
    clamp_cone, GlobalLighting, Light, LightId, LightType, LightingSystem, MAX_INNER_CONE,
    MAX_OUTER_CONE, MIN_LIGHT_RANGE,
};
