//! # mmdevice
//!
//! Runtime loader and device abstraction layer for native microscope device
//! modules. A device module is a shared library exporting a small C ABI; each
//! module hosts one or more device implementations (cameras, stages, shutters,
//! hubs, ...). This crate finds and validates those libraries, creates devices
//! from them, and exposes each device through a checked, typed view.
//!
//! ## Crate Structure
//!
//! - **`loader`**: opens one library and resolves the module entry points.
//! - **`adapter`**: a loaded module. Validates interface versions, enumerates
//!   the devices it declares, and creates or deletes device objects under the
//!   module lock.
//! - **`device`**: `DeviceInstance` with the base operation set, plus the
//!   capability views (`Camera`, `Stage`, `Hub`, ...) that are handed out
//!   only when the device's type tag matches.
//! - **`plugin_manager`**: search paths, platform file naming, and the
//!   per-name adapter cache.
//! - **`global`**: a lazily created process-wide `PluginManager`.
//! - **`device_manager`**: the label registry with hub/peripheral resolution.
//! - **`config`** / **`logging`**: Figment configuration and tracing setup.
//! - **`error`**: the `MmError` enum used by every fallible operation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mmdevice::{DeviceManager, PluginManager};
//!
//! let plugins = PluginManager::new();
//! plugins.add_search_path("/opt/micro-manager");
//! let adapter = plugins.get_device_adapter("DemoCamera")?;
//!
//! let devices = DeviceManager::new();
//! devices.load_device(&adapter, "DCam", "Camera")?.initialize()?;
//!
//! let camera = devices.get_camera("Camera")?;
//! camera.set_binning(2)?;
//! camera.snap_image()?;
//! let image = camera.image()?;
//! ```

pub mod adapter;
pub mod config;
pub mod device;
pub mod device_manager;
pub mod error;
mod ffi;
pub mod global;
pub mod loader;
pub mod logging;
pub mod plugin_manager;
pub mod types;

pub use adapter::{DeviceAdapter, DeviceHandle, ModuleGuard};
pub use device::{
    Camera, Capability, DeviceInstance, DeviceView, Hub, Image, PixelType, Roi, ScopedDevice,
    Shutter, Stage, StateDevice, XYStage,
};
pub use device_manager::DeviceManager;
pub use error::{MmError, MmResult};
pub use loader::LoadedLibrary;
pub use plugin_manager::PluginManager;
pub use types::{
    DetectionStatus, DeviceDescriptor, DeviceType, FocusDirection, ModuleDescriptor, PropertyType,
};

/// Module interface version this host accepts.
pub use mmdevice_sys::MODULE_INTERFACE_VERSION;
/// Device interface version this host accepts.
pub use mmdevice_sys::DEVICE_INTERFACE_VERSION;
