//! # Rendering System
//!
//! Backend-independent pieces (camera, mesh, GPU data layouts, lighting,
//! frame executor) plus the Vulkan backend that implements them.
//!
//! ## Architecture
//!
//! - **Frame executor**: per-slot state machine over the [`FrameBackend`] seam
//! - **Lighting**: authoritative light entities and the per-frame snapshot
//! - **Vulkan backend**: device context, swapchain, pipeline and resources

// Core primitives
pub mod primitives;

// GPU data layouts shared with shaders
pub mod shader_data;

// Systems
pub mod systems;

/// Frame-in-flight state machine
pub mod frame;

/// Graphics backend implementations
pub mod backends;

pub use frame::{FrameBackend, FrameExecutor, MAX_FRAMES_IN_FLIGHT};
pub use primitives::{Camera, Mesh, Vertex};
pub use shader_data::{LightBufferData, LightData, UniformBufferObject, MAX_LIGHTS};
pub use systems::lighting::{GlobalLighting, Light, LightId, LightType, LightingSystem};
