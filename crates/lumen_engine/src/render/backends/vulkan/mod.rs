//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering and state modules.

/// Vulkan initialization types (context, window)
pub mod initialization;

/// Vulkan resource management (handles, buffers, descriptors)
pub mod resources;

/// Vulkan rendering operations (shaders, pipelines, render passes, commands)
pub mod rendering;

/// Vulkan state management (swapchain, framebuffers, synchronization)
pub mod state;

/// Main Vulkan renderer implementation
pub mod renderer;

pub use renderer::VulkanRenderer;

pub use initialization::context::{PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanResult};
pub use initialization::window::{Window, WindowError, WindowEvent};
