//! # Core Engine Module
//!
//! Shared configuration types used by the engine, the renderer and applications.

pub mod config;

pub use config::{
    ApplicationConfig,
    Config,
    ConfigError,
    EngineConfig,
    LightingConfig,
    ShaderConfig,
    VulkanRendererConfig,
    WindowConfig,
};
