//! # Lumen Engine
//!
//! A small Vulkan rendering core with scriptable multi-light lighting.
//!
//! ## Features
//!
//! - **Vulkan Rendering**: forward pass with depth, two frames in flight
//! - **Lighting**: up to 32 directional, point and spot lights per frame
//! - **Scripting**: per-tick hooks driving lights and camera through a
//!   capability API
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumen_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::new("Lights");
//!     let mut scripts = ScriptHost::new();
//!     scripts.set_update_callback(|api, _dt| {
//!         let t = api.time();
//!         api.set_sun_direction(Vec3::new(t.cos(), -1.0, t.sin()));
//!         Ok(())
//!     });
//!
//!     let mut engine = Engine::new(config)?;
//!     engine.run(&mut scripts)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

// Core engine modules
pub mod core;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scripting;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::{ApplicationConfig, Config, EngineConfig, LightingConfig, VulkanRendererConfig, WindowConfig},
        foundation::{
            logging,
            math::{Mat4, Vec3},
            time::Timer,
        },
        render::{Camera, LightId, LightType, LightingSystem},
        scripting::{LightDesc, ScriptApi, ScriptError, ScriptHook, ScriptHost, ScriptResult},
        Engine, EngineError,
    };
}
