//! Locating, loading and caching device modules.
//!
//! A [`PluginManager`] turns a logical module name such as `DemoCamera` into a
//! library file name using the platform naming convention
//! ([`LIBRARY_PREFIX`] + name + [`LIBRARY_SUFFIX`]), searches its ordered list
//! of directories for that file, and keeps one [`DeviceAdapter`] per module
//! name. Modules can also be registered in-process from a function table, in
//! which case no file is involved.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = PluginManager::new();
//! manager.set_search_paths(["~/micro-manager"]);
//! let adapter = manager.get_device_adapter("DemoCamera")?;
//! for name in adapter.available_device_names()? {
//!     println!("{name}");
//! }
//! ```

use crate::adapter::DeviceAdapter;
use crate::config::MmConfig;
use crate::error::{MmError, MmResult};
use crate::loader::LoadedLibrary;
use mmdevice_sys::ModuleFunctions;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// File name prefix of device module libraries on this platform.
#[cfg(windows)]
pub const LIBRARY_PREFIX: &str = "mmgr_dal_";
/// File name suffix of device module libraries on this platform.
#[cfg(windows)]
pub const LIBRARY_SUFFIX: &str = ".dll";

/// File name prefix of device module libraries on this platform.
#[cfg(target_os = "linux")]
pub const LIBRARY_PREFIX: &str = "libmmgr_dal_";
/// File name suffix of device module libraries on this platform.
#[cfg(target_os = "linux")]
pub const LIBRARY_SUFFIX: &str = ".so.0";

/// File name prefix of device module libraries on this platform.
#[cfg(not(any(windows, target_os = "linux")))]
pub const LIBRARY_PREFIX: &str = "libmmgr_dal_";
/// File name suffix of device module libraries on this platform.
#[cfg(not(any(windows, target_os = "linux")))]
pub const LIBRARY_SUFFIX: &str = "";

/// Environment variable the OS loader consults for transitive dependencies.
#[cfg(windows)]
pub const LIBRARY_PATH_VAR: &str = "PATH";
/// Environment variable the OS loader consults for transitive dependencies.
#[cfg(target_os = "macos")]
pub const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
/// Environment variable the OS loader consults for transitive dependencies.
#[cfg(not(any(windows, target_os = "macos")))]
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Finds device module libraries and caches one adapter per module name.
///
/// All state is behind locks, so a manager can be shared between threads.
/// Cached adapters are handed out as `Arc`s; unloading a module only drops the
/// cache's reference, and the library stays mapped until the last device
/// created from it is gone. Until then a request for the same name returns
/// that adapter again, so one module never has two module locks.
pub struct PluginManager {
    search_paths: RwLock<Vec<PathBuf>>,
    prefix: String,
    suffix: String,
    adapters: Mutex<HashMap<String, Arc<DeviceAdapter>>>,
    /// Unloaded adapters whose devices were still alive.
    retired: Mutex<HashMap<String, Weak<DeviceAdapter>>>,
    static_modules: RwLock<BTreeMap<String, ModuleFunctions>>,
}

impl PluginManager {
    /// Manager with an empty search path list and the platform naming
    /// convention.
    pub fn new() -> Self {
        Self::with_naming(LIBRARY_PREFIX, LIBRARY_SUFFIX)
    }

    /// Manager using a custom file name prefix and suffix.
    pub fn with_naming(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            search_paths: RwLock::new(Vec::new()),
            prefix: prefix.into(),
            suffix: suffix.into(),
            adapters: Mutex::new(HashMap::new()),
            retired: Mutex::new(HashMap::new()),
            static_modules: RwLock::new(BTreeMap::new()),
        }
    }

    /// Manager built from loaded configuration.
    ///
    /// # Errors
    ///
    /// [`MmError::Configuration`] if the configuration does not validate.
    pub fn from_config(config: &MmConfig) -> MmResult<Self> {
        config.validate().map_err(MmError::Configuration)?;
        let manager = Self::with_naming(&config.library_prefix, &config.library_suffix);
        manager.set_search_paths(&config.search_paths);
        Ok(manager)
    }

    // =========================================================================
    // Search paths
    // =========================================================================

    /// Replace the search path list.
    ///
    /// `~` is expanded and existing directories are made absolute. The
    /// directories are also prepended to [`LIBRARY_PATH_VAR`] so modules can
    /// find their own native dependencies.
    pub fn set_search_paths<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| normalize(p.as_ref())).collect();
        extend_library_path_var(&paths);
        tracing::debug!(?paths, "device module search paths set");
        *self.search_paths.write() = paths;
    }

    /// Append one directory to the search path list.
    pub fn add_search_path(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        extend_library_path_var(std::slice::from_ref(&path));
        let mut paths = self.search_paths.write();
        if !paths.contains(&path) {
            tracing::debug!(path = %path.display(), "device module search path added");
            paths.push(path);
        }
    }

    /// Current search path list, in priority order.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.read().clone()
    }

    /// Library file name for a module name.
    pub fn module_file_name(&self, module_name: &str) -> String {
        format!("{}{module_name}{}", self.prefix, self.suffix)
    }

    /// Module name for a library file name, if it follows the naming
    /// convention.
    fn module_name_for_file(&self, file_name: &str) -> Option<String> {
        let rest = file_name.strip_prefix(&self.prefix)?;
        let name = if self.suffix.is_empty() {
            rest.split('.').next().unwrap_or(rest)
        } else {
            rest.strip_suffix(&self.suffix)?
        };
        (!name.is_empty()).then(|| name.to_owned())
    }

    /// First search directory containing `file_name`.
    ///
    /// Falls back to the bare file name, so the platform's default library
    /// search rules apply when the load is attempted.
    pub fn find(&self, file_name: &str) -> PathBuf {
        self.search_paths
            .read()
            .iter()
            .map(|dir| dir.join(file_name))
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| {
                tracing::debug!(file_name, "module not found in search paths");
                PathBuf::from(file_name)
            })
    }

    // =========================================================================
    // Modules
    // =========================================================================

    /// Register a module compiled into the process.
    ///
    /// The table is validated like a library's when the module is first
    /// requested. A registered name takes precedence over library files.
    pub fn register_static(&self, module_name: impl Into<String>, functions: ModuleFunctions) {
        let module_name = module_name.into();
        tracing::debug!(module = %module_name, "in-process device module registered");
        self.static_modules.write().insert(module_name, functions);
    }

    /// Module names found under the current search paths plus in-process
    /// registrations, sorted and deduplicated.
    ///
    /// Directories are rescanned on every call.
    pub fn available_device_adapters(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.static_modules.read().keys().cloned().collect();
        for dir in self.search_paths.read().iter() {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::debug!(path = %dir.display(), error = %err, "skipping search path");
                    continue;
                }
            };
            names.extend(
                entries
                    .filter_map(Result::ok)
                    .filter(|entry| entry.path().is_file())
                    .filter_map(|entry| {
                        entry
                            .file_name()
                            .to_str()
                            .and_then(|name| self.module_name_for_file(name))
                    }),
            );
        }
        names.into_iter().collect()
    }

    /// Names of the modules currently cached, sorted.
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Adapter for `module_name`, loading it on first use.
    ///
    /// Later calls return the same adapter until the module is unloaded. After
    /// an unload the module is loaded afresh, unless devices created by the
    /// previous adapter are still alive; that adapter is then reinstated.
    ///
    /// # Errors
    ///
    /// - [`MmError::InvalidArgument`] for an empty name
    /// - [`MmError::ModuleLoad`] if the library cannot be opened or fails
    ///   validation; the cause is kept as the error source
    pub fn get_device_adapter(&self, module_name: &str) -> MmResult<Arc<DeviceAdapter>> {
        if module_name.trim().is_empty() {
            return Err(MmError::InvalidArgument(
                "device module name must not be empty".to_owned(),
            ));
        }

        let mut adapters = self.adapters.lock();
        if let Some(adapter) = adapters.get(module_name) {
            tracing::debug!(module = module_name, "device module cache hit");
            return Ok(Arc::clone(adapter));
        }
        if let Some(adapter) = self.reinstate(module_name) {
            adapters.insert(module_name.to_owned(), Arc::clone(&adapter));
            return Ok(adapter);
        }

        let static_functions = self.static_modules.read().get(module_name).copied();
        let (adapter, path) = match static_functions {
            Some(functions) => (
                DeviceAdapter::from_functions(module_name, functions),
                PathBuf::from(format!("<in-process {module_name}>")),
            ),
            None => {
                let path = self.find(&self.module_file_name(module_name));
                let adapter = LoadedLibrary::open(&path)
                    .and_then(|library| DeviceAdapter::from_library(module_name, library));
                (adapter, path)
            }
        };
        let adapter = Arc::new(adapter.map_err(|source| MmError::ModuleLoad {
            module: module_name.to_owned(),
            path: path.clone(),
            source: Box::new(source),
        })?);

        tracing::info!(module = module_name, path = %path.display(), "device module loaded");
        adapters.insert(module_name.to_owned(), Arc::clone(&adapter));
        Ok(adapter)
    }

    /// Drop the cached adapter for `module_name`.
    ///
    /// The next [`get_device_adapter`](Self::get_device_adapter) reloads the
    /// module. If devices created from it are still alive, the library stays
    /// mapped until they are released, and the adapter is handed out again
    /// instead of being reloaded.
    ///
    /// # Errors
    ///
    /// [`MmError::ModuleNotLoaded`] if the module is not cached.
    pub fn unload_plugin_library(&self, module_name: &str) -> MmResult<()> {
        let adapter = self
            .adapters
            .lock()
            .remove(module_name)
            .ok_or_else(|| MmError::ModuleNotLoaded(module_name.to_owned()))?;

        let live = adapter.live_devices();
        if Arc::strong_count(&adapter) > 1 || live > 0 {
            let mut retired = self.retired.lock();
            retired.retain(|_, weak| weak.strong_count() > 0);
            retired.insert(module_name.to_owned(), Arc::downgrade(&adapter));
            tracing::warn!(
                module = module_name,
                live_devices = live,
                "device module still referenced; library unload deferred"
            );
        } else {
            tracing::info!(module = module_name, "device module unloaded");
        }
        Ok(())
    }

    /// Previously unloaded adapter for `module_name` that still has live
    /// devices.
    fn reinstate(&self, module_name: &str) -> Option<Arc<DeviceAdapter>> {
        let mut retired = self.retired.lock();
        let adapter = retired.remove(module_name)?.upgrade()?;
        if adapter.live_devices() == 0 {
            return None;
        }
        tracing::info!(
            module = module_name,
            live_devices = adapter.live_devices(),
            "device module still resident; reusing unloaded adapter"
        );
        Some(adapter)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("search_paths", &*self.search_paths.read())
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("loaded", &self.loaded_modules())
            .finish_non_exhaustive()
    }
}

/// Expand `~` and make existing directories absolute.
fn normalize(path: &Path) -> PathBuf {
    let expanded = match path.to_str() {
        Some("~") => dirs::home_dir().unwrap_or_else(|| path.to_path_buf()),
        Some(s) => match (s.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => path.to_path_buf(),
        },
        None => path.to_path_buf(),
    };
    if expanded.is_dir() {
        std::fs::canonicalize(&expanded).unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Prepend `paths` to [`LIBRARY_PATH_VAR`], skipping entries already present.
fn extend_library_path_var(paths: &[PathBuf]) {
    let current: Vec<PathBuf> = std::env::var_os(LIBRARY_PATH_VAR)
        .map(|value| std::env::split_paths(&value).collect())
        .unwrap_or_default();
    let added: Vec<PathBuf> = paths
        .iter()
        .filter(|p| !current.contains(p))
        .cloned()
        .collect();
    if added.is_empty() {
        return;
    }
    match std::env::join_paths(added.iter().chain(current.iter())) {
        Ok(value) => set_library_path_var(value),
        Err(err) => {
            tracing::warn!(var = LIBRARY_PATH_VAR, error = %err, "cannot extend library search path");
        }
    }
}

fn set_library_path_var(value: OsString) {
    std::env::set_var(LIBRARY_PATH_VAR, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn module_file_name_follows_naming() {
        let manager = PluginManager::with_naming("libmmgr_dal_", ".so.0");
        assert_eq!(manager.module_file_name("DemoCamera"), "libmmgr_dal_DemoCamera.so.0");
        assert_eq!(
            manager.module_name_for_file("libmmgr_dal_DemoCamera.so.0").as_deref(),
            Some("DemoCamera")
        );
        assert_eq!(manager.module_name_for_file("libfoo.so.0"), None);
        assert_eq!(manager.module_name_for_file("libmmgr_dal_.so.0"), None);
    }

    #[test]
    fn empty_suffix_strips_extension() {
        let manager = PluginManager::with_naming("libmmgr_dal_", "");
        assert_eq!(
            manager.module_name_for_file("libmmgr_dal_Demo.dylib").as_deref(),
            Some("Demo")
        );
    }

    #[test]
    #[serial]
    fn find_walks_search_paths_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("libmmgr_dal_A.so.0"), b"").unwrap();
        std::fs::write(first.path().join("libmmgr_dal_B.so.0"), b"").unwrap();
        std::fs::write(second.path().join("libmmgr_dal_B.so.0"), b"").unwrap();

        let manager = PluginManager::with_naming("libmmgr_dal_", ".so.0");
        manager.set_search_paths([first.path(), second.path()]);

        let found_a = manager.find("libmmgr_dal_A.so.0");
        assert_eq!(found_a.parent().unwrap(), std::fs::canonicalize(second.path()).unwrap());
        let found_b = manager.find("libmmgr_dal_B.so.0");
        assert_eq!(found_b.parent().unwrap(), std::fs::canonicalize(first.path()).unwrap());
    }

    #[test]
    fn find_falls_back_to_bare_name() {
        let manager = PluginManager::new();
        assert_eq!(manager.find("libmmgr_dal_None.so.0"), PathBuf::from("libmmgr_dal_None.so.0"));
    }

    #[test]
    #[serial]
    fn available_adapters_scan_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("libmmgr_dal_Zeta.so.0"), b"").unwrap();
        std::fs::write(dir.path().join("libmmgr_dal_Alpha.so.0"), b"").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("libmmgr_dal_Dir.so.0")).unwrap();

        let manager = PluginManager::with_naming("libmmgr_dal_", ".so.0");
        manager.add_search_path(dir.path());
        manager.add_search_path(dir.path().join("missing"));

        assert_eq!(manager.available_device_adapters(), vec!["Alpha", "Zeta"]);
        assert!(manager.loaded_modules().is_empty());
    }

    #[test]
    fn empty_module_name_is_invalid() {
        let manager = PluginManager::new();
        assert!(matches!(
            manager.get_device_adapter(""),
            Err(MmError::InvalidArgument(_))
        ));
        assert!(matches!(
            manager.get_device_adapter("   "),
            Err(MmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_module_is_a_module_load_error() {
        let manager = PluginManager::new();
        match manager.get_device_adapter("NoSuchModule") {
            Err(MmError::ModuleLoad { module, path, source }) => {
                assert_eq!(module, "NoSuchModule");
                assert_eq!(path, PathBuf::from(manager.module_file_name("NoSuchModule")));
                assert!(matches!(*source, MmError::Load { .. }));
            }
            other => panic!("expected ModuleLoad, got {other:?}"),
        }
        assert!(manager.loaded_modules().is_empty());
    }

    #[test]
    fn unload_unknown_module_fails() {
        let manager = PluginManager::new();
        assert!(matches!(
            manager.unload_plugin_library("Ghost"),
            Err(MmError::ModuleNotLoaded(name)) if name == "Ghost"
        ));
    }

    #[test]
    #[serial]
    fn search_paths_are_prepended_to_library_path_var() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PluginManager::new();
        manager.add_search_path(dir.path());

        let canonical = std::fs::canonicalize(dir.path()).unwrap();
        let value = std::env::var_os(LIBRARY_PATH_VAR).unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(&value).collect();
        assert_eq!(entries.first(), Some(&canonical));

        // Adding the same directory again leaves the variable unchanged.
        manager.add_search_path(dir.path());
        assert_eq!(std::env::var_os(LIBRARY_PATH_VAR).unwrap(), value);
        assert_eq!(manager.search_paths(), vec![canonical]);
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            let expanded = normalize(Path::new("~/mm-nonexistent-dir"));
            assert_eq!(expanded, home.join("mm-nonexistent-dir"));
        }
    }
}
