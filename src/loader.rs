//! Opening device module libraries.
//!
//! [`LoadedLibrary`] resolves the nine entry points every device module must
//! export and keeps the library mapped for as long as it lives. It knows
//! nothing about devices; caching and reuse are decided by the caller.

use crate::error::{MmError, MmResult};
use libloading::Library;
use mmdevice_sys::{symbols, ModuleFunctions};
use std::fmt;
use std::path::{Path, PathBuf};

/// An open device module library and its resolved entry points.
pub struct LoadedLibrary {
    path: PathBuf,
    functions: ModuleFunctions,
    // Keeps the code behind `functions` mapped; must outlive every call.
    _library: Library,
}

impl LoadedLibrary {
    /// Open the library at `path` and resolve all module entry points.
    ///
    /// A bare file name (no directory) is handed to the platform loader as is,
    /// so the platform's default library search rules apply.
    ///
    /// # Errors
    ///
    /// - [`MmError::Load`] if the file is missing or the loader rejects it
    /// - [`MmError::SymbolResolution`] if any entry point is not exported
    pub fn open(path: impl AsRef<Path>) -> MmResult<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening device module library");

        // SAFETY: loading a library runs its static initializers. Device modules
        // are trusted native code; this is the same trust the host places in
        // every later call into them.
        let library = unsafe { Library::new(path) }.map_err(|source| MmError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let functions = ModuleFunctions {
            initialize_module_data: resolve(&library, path, symbols::INITIALIZE_MODULE_DATA)?,
            create_device: resolve(&library, path, symbols::CREATE_DEVICE)?,
            delete_device: resolve(&library, path, symbols::DELETE_DEVICE)?,
            get_module_version: resolve(&library, path, symbols::GET_MODULE_VERSION)?,
            get_device_interface_version: resolve(
                &library,
                path,
                symbols::GET_DEVICE_INTERFACE_VERSION,
            )?,
            get_number_of_devices: resolve(&library, path, symbols::GET_NUMBER_OF_DEVICES)?,
            get_device_name: resolve(&library, path, symbols::GET_DEVICE_NAME)?,
            get_device_type: resolve(&library, path, symbols::GET_DEVICE_TYPE)?,
            get_device_description: resolve(&library, path, symbols::GET_DEVICE_DESCRIPTION)?,
        };

        Ok(Self {
            path: path.to_path_buf(),
            functions,
            _library: library,
        })
    }

    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolved entry points. Only valid while `self` is alive.
    pub fn functions(&self) -> &ModuleFunctions {
        &self.functions
    }
}

impl fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Look up one entry point and copy the function pointer out of the symbol.
fn resolve<T: Copy>(library: &Library, path: &Path, name: &'static [u8]) -> MmResult<T> {
    // SAFETY: `T` is the entry point's signature from mmdevice-sys; modules
    // built against the same ABI export exactly that signature. Interface
    // versions are checked before any entry point beyond the initializer and
    // version getters is called.
    unsafe { library.get::<T>(name) }
        .map(|symbol| *symbol)
        .map_err(|source| MmError::SymbolResolution {
            path: path.to_path_buf(),
            symbol: symbols::display(name).to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libmmgr_dal_Missing.so.0");
        match LoadedLibrary::open(&path) {
            Err(MmError::Load { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Load error, got {other:?}"),
        }
    }

    #[test]
    fn non_library_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libmmgr_dal_Garbage.so.0");
        std::fs::write(&path, b"not a shared library").unwrap();
        assert!(matches!(
            LoadedLibrary::open(&path),
            Err(MmError::Load { .. })
        ));
    }

    // libm is present on every glibc system and exports none of the module
    // entry points.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn library_without_entry_points_fails_symbol_resolution() {
        match LoadedLibrary::open("libm.so.6") {
            Err(MmError::SymbolResolution { symbol, .. }) => {
                assert_eq!(symbol, "InitializeModuleData");
            }
            other => panic!("expected SymbolResolution error, got {other:?}"),
        }
    }
}
