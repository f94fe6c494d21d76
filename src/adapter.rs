//! A loaded device module.
//!
//! [`DeviceAdapter`] validates a module's interface versions, answers metadata
//! queries about the devices it declares, and creates and deletes native device
//! objects. Every call into the module goes through the adapter's module lock:
//! device modules keep static state and are not assumed to be reentrant.
//!
//! Device objects are owned by [`DeviceHandle`]s. A handle holds an `Arc` of
//! its adapter, so a module stays loaded until every device it created has been
//! deleted, and deletes its native object exactly once when dropped.

use crate::device::{DeviceInstance, ScopedDevice};
use crate::error::{MmError, MmResult};
use crate::ffi::{to_cstring, StrBuffer};
use crate::loader::LoadedLibrary;
use crate::plugin_manager::{LIBRARY_PREFIX, LIBRARY_SUFFIX};
use crate::types::{DeviceDescriptor, DeviceType, ModuleDescriptor};
use mmdevice_sys::{
    DeviceVtable, ModuleFunctions, RawDevice, DEVICE_INTERFACE_VERSION, MODULE_INTERFACE_VERSION,
};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::ffi::{c_int, c_void};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Guard over a module lock. Re-entrant: the holder may keep calling into the
/// module, directly or through its devices.
pub type ModuleGuard<'a> = ReentrantMutexGuard<'a, ()>;

/// A loaded, version-checked device module.
pub struct DeviceAdapter {
    name: String,
    path: Option<PathBuf>,
    functions: ModuleFunctions,
    module_version: i64,
    device_interface_version: i64,
    lock: ReentrantMutex<()>,
    live_devices: AtomicUsize,
    // Dropped last: unmaps the code `functions` points into.
    _library: Option<LoadedLibrary>,
}

impl DeviceAdapter {
    /// Wrap an opened library as the module `name`.
    ///
    /// # Errors
    ///
    /// [`MmError::IncompatibleInterface`] if the module reports interface
    /// versions other than the ones this host was built for.
    pub fn from_library(name: impl Into<String>, library: LoadedLibrary) -> MmResult<Self> {
        let functions = *library.functions();
        let path = library.path().to_path_buf();
        Self::new(name.into(), Some(path), functions, Some(library))
    }

    /// Wrap entry points linked into the current process as the module `name`.
    pub fn from_functions(name: impl Into<String>, functions: ModuleFunctions) -> MmResult<Self> {
        Self::new(name.into(), None, functions, None)
    }

    /// Open the library at `path`. Without an explicit `name`, the module name
    /// is the file name minus the platform prefix and everything from the
    /// first `.`.
    pub fn from_file(path: impl AsRef<Path>, name: Option<&str>) -> MmResult<Self> {
        let path = path.as_ref();
        let name = match name {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => module_name_from_path(path),
        };
        if name.is_empty() {
            return Err(MmError::InvalidArgument(format!(
                "cannot derive a module name from {}",
                path.display()
            )));
        }
        let library = LoadedLibrary::open(path)?;
        Self::from_library(name, library)
    }

    fn new(
        name: String,
        path: Option<PathBuf>,
        functions: ModuleFunctions,
        library: Option<LoadedLibrary>,
    ) -> MmResult<Self> {
        let lock = ReentrantMutex::new(());
        let (module_version, device_interface_version) = {
            let _guard = lock.lock();
            // SAFETY: the initializer and version getters take no arguments and
            // are part of every interface version, so they are safe to call
            // before the versions are known. `library` keeps them mapped.
            unsafe {
                (functions.initialize_module_data)();
                (
                    (functions.get_module_version)(),
                    (functions.get_device_interface_version)(),
                )
            }
        };

        if module_version != MODULE_INTERFACE_VERSION {
            return Err(MmError::IncompatibleInterface {
                module: name,
                interface: "module",
                required: i64::from(MODULE_INTERFACE_VERSION),
                found: i64::from(module_version),
            });
        }
        if device_interface_version != DEVICE_INTERFACE_VERSION {
            return Err(MmError::IncompatibleInterface {
                module: name,
                interface: "device",
                required: i64::from(DEVICE_INTERFACE_VERSION),
                found: i64::from(device_interface_version),
            });
        }

        tracing::debug!(module = %name, "device module initialized");
        Ok(Self {
            name,
            path,
            functions,
            module_version: i64::from(module_version),
            device_interface_version: i64::from(device_interface_version),
            lock,
            live_devices: AtomicUsize::new(0),
            _library: library,
        })
    }

    /// Logical module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Library file, or `None` for an in-process module.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Name, path and interface versions.
    pub fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            name: self.name.clone(),
            path: self.path.clone(),
            module_version: self.module_version,
            device_interface_version: self.device_interface_version,
        }
    }

    /// Acquire the module lock, blocking.
    pub fn lock(&self) -> ModuleGuard<'_> {
        self.lock.lock()
    }

    /// Acquire the module lock, giving up after `timeout`.
    ///
    /// Native calls cannot be interrupted; bounding the wait for the lock is
    /// the only way to put a deadline on a module call.
    pub fn try_lock_for(&self, timeout: Duration) -> Option<ModuleGuard<'_>> {
        self.lock.try_lock_for(timeout)
    }

    /// Number of device objects created by this adapter and not yet deleted.
    pub fn live_devices(&self) -> usize {
        self.live_devices.load(Ordering::Acquire)
    }

    fn call<R>(&self, f: impl FnOnce(&ModuleFunctions) -> R) -> R {
        let _guard = self.lock.lock();
        f(&self.functions)
    }

    // =========================================================================
    // Metadata queries
    // =========================================================================

    /// Number of devices the module declares.
    pub fn device_count(&self) -> MmResult<usize> {
        // SAFETY: entry point of a version-checked module.
        let count = self.call(|f| unsafe { (f.get_number_of_devices)() });
        usize::try_from(count).map_err(|_| MmError::Query {
            module: self.name.clone(),
            item: format!("device count (got {count})"),
        })
    }

    /// Name of the device at `index` in declaration order.
    ///
    /// # Errors
    ///
    /// [`MmError::Index`] when `index >= device_count()`, [`MmError::Query`]
    /// when the module fails to report the name.
    pub fn device_name(&self, index: usize) -> MmResult<String> {
        let _guard = self.lock();
        let count = self.device_count()?;
        if index >= count {
            return Err(MmError::Index {
                module: self.name.clone(),
                index,
                count,
            });
        }
        let raw_index = c_int::try_from(index).map_err(|_| MmError::Index {
            module: self.name.clone(),
            index,
            count,
        })?;
        let mut buf = StrBuffer::new();
        // SAFETY: `buf` is writable for `buf.len()` bytes.
        let ok = self.call(|f| unsafe { (f.get_device_name)(raw_index, buf.as_mut_ptr(), buf.len()) });
        if !ok {
            return Err(MmError::Query {
                module: self.name.clone(),
                item: format!("name of device {index}"),
            });
        }
        Ok(buf.into_string())
    }

    /// Type the module advertises for the device `name`.
    pub fn device_type(&self, name: &str) -> MmResult<DeviceType> {
        let cname = to_cstring(name)?;
        let mut raw: c_int = 0;
        // SAFETY: `cname` is NUL-terminated and `raw` is a valid out pointer.
        let ok = self.call(|f| unsafe { (f.get_device_type)(cname.as_ptr(), &mut raw) });
        if !ok {
            return Err(MmError::Query {
                module: self.name.clone(),
                item: format!("type of device \"{name}\""),
            });
        }
        Ok(DeviceType::from_raw(raw))
    }

    /// Description the module advertises for the device `name`.
    pub fn device_description(&self, name: &str) -> MmResult<String> {
        let cname = to_cstring(name)?;
        let mut buf = StrBuffer::new();
        // SAFETY: `cname` is NUL-terminated; `buf` is writable for `buf.len()` bytes.
        let ok = self.call(|f| unsafe {
            (f.get_device_description)(cname.as_ptr(), buf.as_mut_ptr(), buf.len())
        });
        if !ok {
            return Err(MmError::Query {
                module: self.name.clone(),
                item: format!("description of device \"{name}\""),
            });
        }
        Ok(buf.into_string())
    }

    /// Names of all declared devices, in declaration order.
    pub fn available_device_names(&self) -> MmResult<Vec<String>> {
        let _guard = self.lock();
        (0..self.device_count()?)
            .map(|i| self.device_name(i))
            .collect()
    }

    /// Name, type and description of every declared device.
    pub fn descriptors(&self) -> MmResult<Vec<DeviceDescriptor>> {
        let _guard = self.lock();
        self.available_device_names()?
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                Ok(DeviceDescriptor {
                    index,
                    device_type: self.device_type(&name)?,
                    description: self.device_description(&name)?,
                    name,
                })
            })
            .collect()
    }

    // =========================================================================
    // Device lifecycle
    // =========================================================================

    /// Create the native device `name`.
    ///
    /// The name does not have to be one of [`available_device_names`]; modules
    /// may accept names they do not enumerate.
    ///
    /// # Errors
    ///
    /// - [`MmError::Creation`] if the module returns a null handle
    /// - [`MmError::InvalidDevice`] if the object reports a different type than
    ///   the module advertises for `name`, or lacks the function table its type
    ///   requires; the object is deleted before returning
    ///
    /// [`available_device_names`]: DeviceAdapter::available_device_names
    pub fn create_device(self: &Arc<Self>, name: &str) -> MmResult<DeviceHandle> {
        let cname = to_cstring(name)?;
        let _guard = self.lock();

        // SAFETY: `cname` is NUL-terminated and outlives the call.
        let raw = unsafe { (self.functions.create_device)(cname.as_ptr()) };
        let Some(raw) = NonNull::new(raw) else {
            return Err(MmError::Creation {
                module: self.name.clone(),
                name: name.to_owned(),
            });
        };
        self.live_devices.fetch_add(1, Ordering::AcqRel);

        // SAFETY: `raw` is a live object just returned by the module.
        let header = unsafe { raw.as_ref() };
        let Some(vtable) = NonNull::new(header.vtable.cast_mut()) else {
            self.release(raw);
            return Err(self.invalid(name, "null base function table".into()));
        };
        let handle = DeviceHandle {
            raw,
            vtable,
            capability: header.capability,
            name: name.to_owned(),
            adapter: Arc::clone(self),
        };

        // SAFETY: the base table was just checked to be non-null.
        let actual = DeviceType::from_raw(unsafe { (handle.vtable().get_type)(handle.raw_ptr()) });
        if let Ok(advertised) = self.device_type(name) {
            if advertised != actual {
                drop(handle);
                return Err(self.invalid(
                    name,
                    format!("reports type {actual} but the module advertises {advertised}"),
                ));
            }
        }
        if actual.has_capability_table() && handle.capability.is_null() {
            drop(handle);
            return Err(self.invalid(name, format!("{actual} device without a capability table")));
        }

        tracing::debug!(module = %self.name, device = name, device_type = %actual, "created device");
        Ok(handle)
    }

    /// Delete a device created by this adapter.
    ///
    /// Dropping the handle has the same effect. A handle created by another
    /// adapter is rejected with [`MmError::ForeignHandle`] and released by its
    /// own adapter instead.
    pub fn delete_device(&self, handle: DeviceHandle) -> MmResult<()> {
        if !std::ptr::eq(Arc::as_ptr(&handle.adapter), self) {
            return Err(MmError::ForeignHandle {
                module: self.name.clone(),
                owner: handle.adapter.name.clone(),
                name: handle.name.clone(),
            });
        }
        drop(handle);
        Ok(())
    }

    fn release(&self, raw: NonNull<RawDevice>) {
        let _guard = self.lock();
        // SAFETY: `raw` came from this module's CreateDevice and every handle
        // releases exactly once (from Drop, or before a handle exists).
        unsafe { (self.functions.delete_device)(raw.as_ptr()) };
        self.live_devices.fetch_sub(1, Ordering::AcqRel);
    }

    fn invalid(&self, name: &str, reason: String) -> MmError {
        MmError::InvalidDevice {
            module: self.name.clone(),
            name: name.to_owned(),
            reason,
        }
    }

    /// Create the device `name` and wrap it as an instance labelled `label`.
    ///
    /// The instance is not initialized.
    pub fn load_device(self: &Arc<Self>, name: &str, label: &str) -> MmResult<Arc<DeviceInstance>> {
        let handle = self.create_device(name)?;
        let description = self.device_description(name).unwrap_or_default();
        Ok(Arc::new(DeviceInstance::new(label, description, handle)))
    }

    /// Create and initialize a device that is shut down and released when the
    /// returned guard is dropped, on every exit path.
    pub fn acquire(self: &Arc<Self>, name: &str, label: &str) -> MmResult<ScopedDevice> {
        let device = self.load_device(name, label)?;
        let scoped = ScopedDevice::new(device);
        scoped.initialize()?;
        Ok(scoped)
    }

    /// Run `f` with an initialized device that is released afterwards, whether
    /// `f` succeeds or not.
    pub fn with_device<R>(
        self: &Arc<Self>,
        name: &str,
        label: &str,
        f: impl FnOnce(&ScopedDevice) -> MmResult<R>,
    ) -> MmResult<R> {
        let device = self.acquire(name, label)?;
        f(&device)
    }
}

impl fmt::Debug for DeviceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceAdapter")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("live_devices", &self.live_devices())
            .finish_non_exhaustive()
    }
}

impl Drop for DeviceAdapter {
    fn drop(&mut self) {
        tracing::debug!(module = %self.name, "releasing device module");
    }
}

/// Derive a module name from a library file name.
pub(crate) fn module_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.strip_prefix(LIBRARY_PREFIX).unwrap_or(&file_name);
    let stem = if LIBRARY_SUFFIX.is_empty() {
        stem
    } else {
        stem.strip_suffix(LIBRARY_SUFFIX).unwrap_or(stem)
    };
    stem.split('.').next().unwrap_or_default().to_owned()
}

// =============================================================================
// Device Handle
// =============================================================================

/// Exclusive owner of one native device object.
///
/// Not `Clone`: exactly one handle exists per object, and dropping it deletes
/// the object through the adapter that created it.
pub struct DeviceHandle {
    raw: NonNull<RawDevice>,
    vtable: NonNull<DeviceVtable>,
    capability: *const c_void,
    name: String,
    adapter: Arc<DeviceAdapter>,
}

// SAFETY: the handle is only dereferenced while holding its adapter's module
// lock, which serializes all access to the native object across threads.
unsafe impl Send for DeviceHandle {}
// SAFETY: as above; shared references only reach the object under the lock.
unsafe impl Sync for DeviceHandle {}

impl DeviceHandle {
    /// Device name the object was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adapter that created the object.
    pub fn adapter(&self) -> &Arc<DeviceAdapter> {
        &self.adapter
    }

    pub(crate) fn raw_ptr(&self) -> *mut RawDevice {
        self.raw.as_ptr()
    }

    pub(crate) fn vtable(&self) -> &DeviceVtable {
        // SAFETY: checked non-null at creation; the table lives in the module,
        // which stays loaded while `self.adapter` is alive.
        unsafe { self.vtable.as_ref() }
    }

    pub(crate) fn capability_ptr(&self) -> *const c_void {
        self.capability
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("name", &self.name)
            .field("module", &self.adapter.name)
            .finish_non_exhaustive()
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        tracing::debug!(module = %self.adapter.name, device = %self.name, "deleting device");
        self.adapter.release(self.raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_strips_platform_affixes() {
        let file = format!("{LIBRARY_PREFIX}DemoCamera{LIBRARY_SUFFIX}");
        assert_eq!(module_name_from_path(Path::new(&file)), "DemoCamera");
        assert_eq!(
            module_name_from_path(Path::new("/opt/mm/custom.so.1")),
            "custom"
        );
    }
}
