//! Process-wide default [`PluginManager`].
//!
//! For callers that do not want to pass a manager around. The instance is
//! created on first use with the platform naming convention and an empty
//! search path list, and is never reset. Tests and hosts that need isolation
//! should construct their own [`PluginManager`].

use crate::adapter::DeviceAdapter;
use crate::error::MmResult;
use crate::plugin_manager::PluginManager;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static INSTANCE: Lazy<PluginManager> = Lazy::new(|| {
    tracing::debug!("creating process-wide plugin manager");
    PluginManager::new()
});

/// The process-wide manager.
pub fn instance() -> &'static PluginManager {
    &INSTANCE
}

/// See [`PluginManager::set_search_paths`].
pub fn set_search_paths<I, P>(paths: I)
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    instance().set_search_paths(paths);
}

/// See [`PluginManager::search_paths`].
pub fn get_search_paths() -> Vec<PathBuf> {
    instance().search_paths()
}

/// See [`PluginManager::get_device_adapter`].
pub fn get_device_adapter(module_name: &str) -> MmResult<Arc<DeviceAdapter>> {
    instance().get_device_adapter(module_name)
}

/// See [`PluginManager::available_device_adapters`].
pub fn get_available_device_adapters() -> Vec<String> {
    instance().available_device_adapters()
}

/// See [`PluginManager::unload_plugin_library`].
pub fn unload_plugin_library(module_name: &str) -> MmResult<()> {
    instance().unload_plugin_library(module_name)
}
