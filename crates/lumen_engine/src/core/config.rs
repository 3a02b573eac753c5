//! # Application Configuration
//!
//! All runtime settings for the engine: window, Vulkan renderer, shader
//! locations, lighting globals and logging. Every section carries serde
//! defaults so a config file only needs to list what it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::config::{Config, ConfigError};

/// Directories searched for compiled shaders, in order
const SHADER_SEARCH_DIRS: [&str; 5] = [
    "target/shaders/",
    "shaders/",
    "resources/shaders/",
    "../target/shaders/",
    "./",
];

/// # Shader Configuration
///
/// Locations of the compiled SPIR-V vertex and fragment stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Resolve file names against the usual shader directories, falling back
    /// to `shaders/<name>` when nothing is found.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let resolve = |name: &str| {
            SHADER_SEARCH_DIRS
                .iter()
                .map(|dir| format!("{}{}", dir, name))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("shaders/{}", name))
        };

        Self {
            vertex_shader_path: resolve(base_vertex),
            fragment_shader_path: resolve(base_fragment),
        }
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.vertex_shader_path, &self.fragment_shader_path] {
            if !Path::new(path).exists() {
                return Err(ConfigError::Invalid(format!("Shader not found: {}", path)));
            }
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("lit_vert.spv", "lit_frag.spv")
    }
}

/// # Window Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Lumen Engine".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// # Vulkan Renderer Configuration
///
/// Settings consumed while building the device context and pipeline.
/// Validation is an explicit value here rather than a build-mode switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulkanRendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Shader configuration
    pub shaders: ShaderConfig,
    /// Enable the Khronos validation layer and debug messenger
    pub enable_validation: bool,
    /// RGBA clear color of the color attachment
    pub clear_color: [f32; 4],
    /// Log adapter and memory heap details after device selection
    pub log_device_info: bool,
}

impl VulkanRendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            shaders: ShaderConfig::default(),
            enable_validation: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            log_device_info: true,
        }
    }

    /// Set application version
    pub fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.application_version = (major, minor, patch);
        self
    }

    /// Set custom shader configuration
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }
        self.shaders.validate()
    }
}

impl Default for VulkanRendererConfig {
    fn default() -> Self {
        Self::new("Lumen Engine Application")
    }
}

/// # Lighting Configuration
///
/// Initial global lighting. Directions need not be normalized here; the
/// lighting system normalizes them when applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Ambient color
    pub ambient_color: [f32; 3],
    /// Direction the sun shines towards
    pub sun_direction: [f32; 3],
    /// Sun color
    pub sun_color: [f32; 3],
    /// Sun intensity
    pub sun_intensity: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: [0.1, 0.1, 0.15],
            sun_direction: [0.3, -0.7, 0.5],
            sun_color: [1.0, 0.95, 0.8],
            sun_intensity: 3.0,
        }
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Seconds between frame statistics log lines (0 disables them)
    pub stats_interval_secs: f32,
    /// Rotation speed of the sample geometry in radians per second
    pub model_spin_speed: f32,
}

impl EngineConfig {
    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval_secs: 5.0,
            model_spin_speed: 0.5,
        }
    }
}

/// # Complete Application Configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Window configuration
    pub window: WindowConfig,
    /// Rendering system configuration
    pub renderer: VulkanRendererConfig,
    /// Initial lighting globals
    pub lighting: LightingConfig,
}

impl ApplicationConfig {
    /// Create a configuration whose window title and application name match
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            window: WindowConfig {
                title: app_name.clone(),
                ..WindowConfig::default()
            },
            renderer: VulkanRendererConfig::new(app_name),
            ..Self::default()
        }
    }

    /// Replace the window configuration
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Replace the renderer configuration
    pub fn with_renderer(mut self, renderer: VulkanRendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Validate everything that can be checked before touching the GPU
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("Window size must be non-zero".to_string()));
        }
        self.renderer.validate()
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ApplicationConfig::from_toml_str(
            r#"
            [window]
            title = "Lights"
            width = 800

            [renderer]
            enable_validation = false
            "#,
        )
        .unwrap();

        assert_eq!(config.window.title, "Lights");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 720);
        assert!(!config.renderer.enable_validation);
        assert_eq!(config.lighting, LightingConfig::default());
        assert_eq!(config.engine.log_level, "info");
    }

    #[test]
    fn test_ron_lighting_section() {
        let config = ApplicationConfig::from_ron_str(
            "(lighting: (ambient_color: (0.2, 0.2, 0.2), sun_intensity: 1.5))",
        )
        .unwrap();
        assert_eq!(config.lighting.ambient_color, [0.2, 0.2, 0.2]);
        assert_eq!(config.lighting.sun_intensity, 1.5);
        assert_eq!(config.lighting.sun_color, [1.0, 0.95, 0.8]);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = ApplicationConfig::new("Test");
        config.window.width = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_shaders_fail_validation() {
        let renderer = VulkanRendererConfig::new("Test")
            .with_shaders(ShaderConfig::new("nowhere/a.spv", "nowhere/b.spv"));
        assert!(renderer.validate().is_err());
    }

    #[test]
    fn test_new_sets_title_and_app_name() {
        let config = ApplicationConfig::new("Demo");
        assert_eq!(config.window.title, "Demo");
        assert_eq!(config.renderer.application_name, "Demo");
    }

    #[test]
    fn test_validation_only_from_configuration() {
        assert!(!VulkanRendererConfig::default().enable_validation);
        assert!(!ApplicationConfig::new("Demo").renderer.enable_validation);

        let config = ApplicationConfig::from_toml_str("[renderer]\nenable_validation = true\n").unwrap();
        assert!(config.renderer.enable_validation);
        assert!(VulkanRendererConfig::new("Demo").with_validation(true).enable_validation);
    }
}
