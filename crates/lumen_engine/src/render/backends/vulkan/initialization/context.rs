//! Vulkan context management
//!
//! Instance, optional validation messenger, window surface, physical device
//! selection and the logical device with its graphics and present queues.
//! Built once at startup; every other Vulkan object depends on it. Any
//! failure here is fatal and is returned to the caller without retries.

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};
use std::collections::BTreeSet;
use std::ffi::{c_char, CStr, CString};
use thiserror::Error;

use super::window::Window;
use crate::core::VulkanRendererConfig;

const VALIDATION_LAYER: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") };

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No enumerated physical device met the requirements
    #[error("No suitable GPU found ({enumerated} device(s) enumerated)")]
    NoSuitableDevice {
        /// Number of devices the instance reported
        enumerated: usize,
    },

    /// A required instance extension is not available
    #[error("Required extension not available: {0}")]
    MissingExtension(String),

    /// A requested instance layer is not available
    #[error("Required layer not available: {0}")]
    MissingLayer(String),

    /// None of the candidate depth formats support depth attachments
    #[error("No supported depth format")]
    UnsupportedDepthFormat,

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// A shader binary could not be read
    #[error("Failed to load shader '{path}': {reason}")]
    ShaderLoad {
        /// Path of the shader file
        path: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Vulkan instance plus the validation messenger when enabled
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create the instance with the window system extensions, plus the
    /// validation layer and debug messenger when `enable_validation` is set.
    pub fn new(window: &Window, config: &VulkanRendererConfig) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {}", e)))?;

        let app_name = CString::new(config.application_name.as_str())
            .map_err(|_| VulkanError::InitializationFailed("Application name contains NUL".to_string()))?;
        let engine_name = CString::new("Lumen").map_err(|_| {
            VulkanError::InitializationFailed("Engine name contains NUL".to_string())
        })?;
        let (major, minor, patch) = config.application_version;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extension_names: Vec<CString> = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?
            .into_iter()
            .map(|name| {
                CString::new(name).map_err(|_| VulkanError::InitializationFailed("Bad extension name".to_string()))
            })
            .collect::<VulkanResult<_>>()?;
        if config.enable_validation {
            extension_names.push(DebugUtils::name().to_owned());
        }

        let available_extensions = entry
            .enumerate_instance_extension_properties(None)
            .map_err(VulkanError::Api)?;
        let available_extensions: Vec<&CStr> = available_extensions
            .iter()
            .map(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) })
            .collect();
        if let Some(missing) = first_missing(&extension_names, &available_extensions) {
            return Err(VulkanError::MissingExtension(missing));
        }

        let layer_names: Vec<CString> = if config.enable_validation {
            let available_layers = entry.enumerate_instance_layer_properties().map_err(VulkanError::Api)?;
            let available_layers: Vec<&CStr> = available_layers
                .iter()
                .map(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) })
                .collect();
            let wanted = vec![VALIDATION_LAYER.to_owned()];
            if let Some(missing) = first_missing(&wanted, &available_layers) {
                return Err(VulkanError::MissingLayer(missing));
            }
            wanted
        } else {
            Vec::new()
        };

        let extension_ptrs: Vec<*const c_char> = extension_names.iter().map(|n| n.as_ptr()).collect();
        let layer_ptrs: Vec<*const c_char> = layer_names.iter().map(|n| n.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(VulkanError::Api)?;

        let debug = if config.enable_validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => Some((debug_utils, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        log::info!(
            "Created Vulkan instance ({} extension(s), validation {})",
            extension_names.len(),
            if config.enable_validation { "on" } else { "off" }
        );

        Ok(Self { entry, instance, debug })
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }.map_err(VulkanError::Api)
    }

    /// Whether the debug messenger is active
    pub fn validation_enabled(&self) -> bool {
        self.debug.is_some()
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// First name in `wanted` that is not in `available`
fn first_missing(wanted: &[CString], available: &[&CStr]) -> Option<String> {
    wanted
        .iter()
        .find(|name| !available.contains(&name.as_c_str()))
        .map(|name| name.to_string_lossy().into_owned())
}

/// Routes validation messages into `log`
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::trace!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Window surface with its extension loader; destroyed on drop
pub struct WindowSurface {
    /// Surface extension loader
    pub loader: Surface,
    /// Surface handle
    pub surface: vk::SurfaceKHR,
}

impl WindowSurface {
    fn new(instance: &VulkanInstance, window: &Window) -> VulkanResult<Self> {
        let loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(format!("Surface creation: {}", e)))?;
        Ok(Self { loader, surface })
    }

    /// Capabilities, formats and present modes for `device`
    pub fn support(&self, device: vk::PhysicalDevice) -> VulkanResult<SurfaceSupport> {
        unsafe {
            Ok(SurfaceSupport {
                capabilities: self
                    .loader
                    .get_physical_device_surface_capabilities(device, self.surface)
                    .map_err(VulkanError::Api)?,
                formats: self
                    .loader
                    .get_physical_device_surface_formats(device, self.surface)
                    .map_err(VulkanError::Api)?,
                present_modes: self
                    .loader
                    .get_physical_device_surface_present_modes(device, self.surface)
                    .map_err(VulkanError::Api)?,
            })
        }
    }
}

impl Drop for WindowSurface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}

/// What a surface supports on a given physical device
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    /// Image count, extent and transform limits
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported format and color space pairs
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported presentation modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Graphics and present queue family indices; may be the same family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFamilyIndices {
    /// Family with graphics support
    pub graphics: Option<u32>,
    /// Family that can present to the surface
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Pick the first graphics family and the first present-capable family
    pub fn find(families: &[vk::QueueFamilyProperties], supports_present: impl Fn(u32) -> bool) -> Self {
        let mut indices = Self::default();
        for (index, family) in families.iter().enumerate() {
            let index = index as u32;
            if indices.graphics.is_none()
                && family.queue_count > 0
                && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            {
                indices.graphics = Some(index);
            }
            if indices.present.is_none() && supports_present(index) {
                indices.present = Some(index);
            }
            if indices.is_complete() {
                break;
            }
        }
        indices
    }

    /// Both families resolved
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Distinct family indices, for queue creation
    pub fn unique(&self) -> Vec<u32> {
        let set: BTreeSet<u32> = self.graphics.into_iter().chain(self.present).collect();
        set.into_iter().collect()
    }
}

/// Facts about a device that decide whether and how much we want it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCandidate {
    /// Reported device type
    pub device_type: vk::PhysicalDeviceType,
    /// Graphics and present families both found
    pub has_queue_families: bool,
    /// `VK_KHR_swapchain` supported
    pub has_swapchain_extension: bool,
    /// Number of surface formats reported
    pub surface_format_count: usize,
    /// Number of present modes reported
    pub present_mode_count: usize,
    /// Largest 2D image dimension
    pub max_image_dimension_2d: u32,
}

/// Score a device, or `None` when it cannot drive the surface.
///
/// Discrete GPUs always outrank integrated ones, which outrank everything else.
pub fn score_device(candidate: &DeviceCandidate) -> Option<u32> {
    if !candidate.has_queue_families
        || !candidate.has_swapchain_extension
        || candidate.surface_format_count == 0
        || candidate.present_mode_count == 0
    {
        return None;
    }

    let type_score = match candidate.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 100_000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 10_000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1_000,
        vk::PhysicalDeviceType::CPU => 100,
        _ => 10,
    };
    // Tie-break on texture size limit, kept below the type gap
    Some(type_score + (candidate.max_image_dimension_2d / 16).min(999))
}

/// Selected physical device and the facts later stages need
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
    /// Memory types and heaps
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
}

impl PhysicalDeviceInfo {
    /// Score every enumerated device and keep the best suitable one
    pub fn select_suitable_device(instance: &Instance, surface: &WindowSurface) -> VulkanResult<Self> {
        let devices = unsafe { instance.enumerate_physical_devices() }.map_err(VulkanError::Api)?;
        if devices.is_empty() {
            return Err(VulkanError::NoSuitableDevice { enumerated: 0 });
        }

        let mut best: Option<(u32, Self)> = None;
        for device in devices.iter().copied() {
            match Self::evaluate_device(instance, device, surface) {
                Ok(Some((score, info))) => {
                    log::debug!("GPU '{}' scored {}", device_name(&info.properties), score);
                    if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                        best = Some((score, info));
                    }
                }
                Ok(None) => {
                    let properties = unsafe { instance.get_physical_device_properties(device) };
                    log::debug!("GPU '{}' is not suitable", device_name(&properties));
                }
                Err(e) => log::warn!("Skipping GPU that failed evaluation: {}", e),
            }
        }

        let (_, info) = best.ok_or(VulkanError::NoSuitableDevice { enumerated: devices.len() })?;
        log::info!("Selected GPU: {}", device_name(&info.properties));
        Ok(info)
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: &WindowSurface,
    ) -> VulkanResult<Option<(u32, Self)>> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };
        let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let indices = QueueFamilyIndices::find(&queue_families, |index| unsafe {
            surface
                .loader
                .get_physical_device_surface_support(device, index, surface.surface)
                .unwrap_or(false)
        });

        let extensions = unsafe { instance.enumerate_device_extension_properties(device) }
            .map_err(VulkanError::Api)?;
        let has_swapchain_extension = extensions.iter().any(|available| {
            (unsafe { CStr::from_ptr(available.extension_name.as_ptr()) }) == SwapchainLoader::name()
        });

        let (surface_format_count, present_mode_count) = if has_swapchain_extension {
            let support = surface.support(device)?;
            (support.formats.len(), support.present_modes.len())
        } else {
            (0, 0)
        };

        let candidate = DeviceCandidate {
            device_type: properties.device_type,
            has_queue_families: indices.is_complete(),
            has_swapchain_extension,
            surface_format_count,
            present_mode_count,
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        };

        let (Some(score), Some(graphics_family), Some(present_family)) =
            (score_device(&candidate), indices.graphics, indices.present)
        else {
            return Ok(None);
        };

        Ok(Some((
            score,
            Self {
                device,
                properties,
                features,
                memory_properties,
                graphics_family,
                present_family,
            },
        )))
    }

    /// Log API version, adapter identity and memory heaps
    pub fn log_info(&self) {
        let p = &self.properties;
        log::info!(
            "Vulkan API {}.{}.{}, driver {:#x}",
            vk::api_version_major(p.api_version),
            vk::api_version_minor(p.api_version),
            vk::api_version_patch(p.api_version),
            p.driver_version
        );
        log::info!("GPU: {} ({:?})", device_name(p), p.device_type);

        let heaps = &self.memory_properties.memory_heaps[..self.memory_properties.memory_heap_count as usize];
        for (i, heap) in heaps.iter().enumerate() {
            let local = heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL);
            log::info!(
                "  heap {}: {} MiB{}",
                i,
                heap.size / (1024 * 1024),
                if local { " (device local)" } else { "" }
            );
        }
    }
}

fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Logical device with its queues; waits for idle and destroys itself on drop
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create one queue per distinct family, enabling anisotropy and
    /// sample-rate shading only where the device supports them
    pub fn new(instance: &Instance, physical: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let families = QueueFamilyIndices {
            graphics: Some(physical.graphics_family),
            present: Some(physical.present_family),
        };
        let priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extension_ptrs = [SwapchainLoader::name().as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(physical.features.sampler_anisotropy == vk::TRUE)
            .sample_rate_shading(physical.features.sample_rate_shading == vk::TRUE)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&device_features);

        let device = unsafe { instance.create_device(physical.device, &create_info, None) }
            .map_err(VulkanError::Api)?;

        let graphics_queue = unsafe { device.get_device_queue(physical.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(physical.present_family, 0) };
        let swapchain_loader = SwapchainLoader::new(instance, &device);

        log::debug!(
            "Created logical device with {} queue famil{}",
            queue_infos.len(),
            if queue_infos.len() == 1 { "y" } else { "ies" }
        );

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Owner of the instance, surface and devices.
///
/// Field order is drop order: device, then surface, then instance.
pub struct VulkanContext {
    /// Logical device and queues
    pub device: LogicalDevice,
    /// Selected physical device
    pub physical_device: PhysicalDeviceInfo,
    /// Window surface
    pub surface: WindowSurface,
    /// Vulkan instance and debug utilities
    pub instance: VulkanInstance,
}

impl VulkanContext {
    /// Build the full context for `window`; the first failing step aborts
    pub fn new(window: &Window, config: &VulkanRendererConfig) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(window, config)?;
        let surface = WindowSurface::new(&instance, window)?;
        let physical_device = PhysicalDeviceInfo::select_suitable_device(&instance.instance, &surface)?;
        if config.log_device_info {
            physical_device.log_info();
        }
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;

        Ok(Self {
            device,
            physical_device,
            surface,
            instance,
        })
    }

    /// Get a reference to the Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Get the raw Device handle
    pub fn raw_device(&self) -> Device {
        self.device.device.clone()
    }

    /// Get the swapchain loader
    pub fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.device.swapchain_loader
    }

    /// Get the graphics queue family index
    pub fn graphics_queue_family(&self) -> u32 {
        self.physical_device.graphics_family
    }

    /// Surface support for the selected device
    pub fn surface_support(&self) -> VulkanResult<SurfaceSupport> {
        self.surface.support(self.physical_device.device)
    }

    /// Block until all queued GPU work has finished
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device.device_wait_idle() }.map_err(VulkanError::Api)
    }

    /// Find a memory type index matching `type_filter` with `properties`
    pub fn find_memory_type(&self, type_filter: u32, properties: vk::MemoryPropertyFlags) -> VulkanResult<u32> {
        find_memory_type(&self.physical_device.memory_properties, type_filter, properties)
    }
}

/// Find a memory type index matching `type_filter` with `properties`
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && memory_properties.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    fn candidate(device_type: vk::PhysicalDeviceType) -> DeviceCandidate {
        DeviceCandidate {
            device_type,
            has_queue_families: true,
            has_swapchain_extension: true,
            surface_format_count: 2,
            present_mode_count: 1,
            max_image_dimension_2d: 16384,
        }
    }

    #[test]
    fn test_discrete_outranks_integrated() {
        let discrete = score_device(&DeviceCandidate {
            max_image_dimension_2d: 4096,
            ..candidate(vk::PhysicalDeviceType::DISCRETE_GPU)
        })
        .unwrap();
        let integrated = score_device(&DeviceCandidate {
            max_image_dimension_2d: 32768,
            ..candidate(vk::PhysicalDeviceType::INTEGRATED_GPU)
        })
        .unwrap();
        assert!(discrete > integrated);

        let cpu = score_device(&candidate(vk::PhysicalDeviceType::CPU)).unwrap();
        assert!(integrated > cpu);
    }

    #[test]
    fn test_unsuitable_devices_have_no_score() {
        let base = candidate(vk::PhysicalDeviceType::DISCRETE_GPU);
        assert!(score_device(&DeviceCandidate { has_queue_families: false, ..base }).is_none());
        assert!(score_device(&DeviceCandidate { has_swapchain_extension: false, ..base }).is_none());
        assert!(score_device(&DeviceCandidate { surface_format_count: 0, ..base }).is_none());
        assert!(score_device(&DeviceCandidate { present_mode_count: 0, ..base }).is_none());
    }

    #[test]
    fn test_queue_families_shared() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let indices = QueueFamilyIndices::find(&families, |_| true);
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, Some(0));
        assert_eq!(indices.unique(), vec![0]);
    }

    #[test]
    fn test_queue_families_distinct() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        let indices = QueueFamilyIndices::find(&families, |i| i == 2);
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(2));
        assert_eq!(indices.unique(), vec![1, 2]);
    }

    #[test]
    fn test_queue_families_incomplete_without_present() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let indices = QueueFamilyIndices::find(&families, |_| false);
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_find_memory_type_respects_filter_and_flags() {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 3,
            ..Default::default()
        };
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        props.memory_types[2].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE
            | vk::MemoryPropertyFlags::HOST_COHERENT
            | vk::MemoryPropertyFlags::DEVICE_LOCAL;

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type(&props, 0b111, host).unwrap(), 1);
        assert_eq!(find_memory_type(&props, 0b100, host).unwrap(), 2);
        assert!(matches!(
            find_memory_type(&props, 0b001, host),
            Err(VulkanError::NoSuitableMemoryType)
        ));
    }
}
