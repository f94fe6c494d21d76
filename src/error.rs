//! Error types for the device layer.
//!
//! `MmError` is the single error type returned by every fallible operation in
//! this crate. Variants fall into four groups:
//!
//! 1. **Loader and ABI errors** - `Load`, `SymbolResolution`, `ModuleLoad`,
//!    `IncompatibleInterface`. These are permanent for a given library file and
//!    are never retried.
//! 2. **Module queries** - `Index`, `Query`, `Creation`, `InvalidDevice`. They
//!    come from explicit native return codes, not from crashes in native code.
//!    Bounds and lookup failures are recoverable by the caller, for example by
//!    falling back to enumeration.
//! 3. **Registry and dispatch errors** - `DuplicateLabel`, `NoSuchDevice`,
//!    `ModuleNotLoaded`, `CapabilityMismatch`, `ForeignHandle`.
//! 4. **Device and caller errors** - `Device` (non-zero native status code),
//!    `InvalidArgument`, `Config`, `Configuration`.

use crate::types::DeviceType;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using [`MmError`].
pub type MmResult<T> = std::result::Result<T, MmError>;

/// Primary error type for module loading and device access.
#[derive(Error, Debug)]
pub enum MmError {
    /// Empty or malformed caller input, such as a blank module name or a
    /// string containing an interior NUL.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The dynamic loader rejected the library file.
    ///
    /// Covers a missing file, a file that is not a shared library for this
    /// platform, and unresolved transitive dependencies. `source` carries the
    /// platform loader's message.
    #[error("Failed to load library {}: {source}", path.display())]
    Load {
        /// Path handed to the loader.
        path: PathBuf,
        /// Platform loader error.
        #[source]
        source: libloading::Error,
    },

    /// A required entry point is not exported by the library.
    #[error("Library {} does not export {symbol}", path.display())]
    SymbolResolution {
        /// Library that was searched.
        path: PathBuf,
        /// Missing symbol name.
        symbol: String,
        /// Platform loader error.
        #[source]
        source: libloading::Error,
    },

    /// Loading a module by name failed; wraps the underlying loader or ABI
    /// error with the module name and resolved path.
    #[error("Failed to load device module \"{module}\" from {}", path.display())]
    ModuleLoad {
        /// Logical module name requested by the caller.
        module: String,
        /// Library path after search path resolution.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: Box<MmError>,
    },

    /// The module was built against a different interface version.
    ///
    /// Calling into a mismatched ABI is undefined behavior, so this is always
    /// fatal to the adapter's construction.
    #[error("Module \"{module}\" has incompatible {interface} interface version {found} (required {required})")]
    IncompatibleInterface {
        /// Module name.
        module: String,
        /// `"module"` or `"device"`.
        interface: &'static str,
        /// Version this host was built for.
        required: i64,
        /// Version reported by the module.
        found: i64,
    },

    /// Device index outside `0..count`.
    #[error("Device index {index} out of range for module \"{module}\" ({count} devices)")]
    Index {
        /// Module name.
        module: String,
        /// Requested index.
        index: usize,
        /// Number of devices the module declares.
        count: usize,
    },

    /// A native metadata query returned failure.
    #[error("Module \"{module}\" failed to report {item}")]
    Query {
        /// Module name.
        module: String,
        /// What was being queried, e.g. `name of device 3`.
        item: String,
    },

    /// The module returned a null handle from device creation.
    #[error("Module \"{module}\" could not create device \"{name}\"")]
    Creation {
        /// Module name.
        module: String,
        /// Requested device name.
        name: String,
    },

    /// The module created a device object that cannot be used safely.
    ///
    /// The object has already been deleted when this error is returned.
    #[error("Module \"{module}\" returned an unusable object for device \"{name}\": {reason}")]
    InvalidDevice {
        /// Module name.
        module: String,
        /// Requested device name.
        name: String,
        /// What was wrong with the object.
        reason: String,
    },

    /// A label is already registered to a live device.
    #[error("Device label \"{0}\" is already in use")]
    DuplicateLabel(String),

    /// No device is registered under the label.
    #[error("No device with label \"{0}\"")]
    NoSuchDevice(String),

    /// Unload requested for a module that is not in the cache.
    #[error("Device module \"{0}\" is not loaded")]
    ModuleNotLoaded(String),

    /// A typed view was requested for a device of another type.
    #[error("Device \"{label}\" is a {actual} device, not a {expected} device")]
    CapabilityMismatch {
        /// Device label.
        label: String,
        /// Requested capability.
        expected: DeviceType,
        /// Type the device was created with.
        actual: DeviceType,
    },

    /// A device handle was passed to an adapter that did not create it.
    #[error("Device \"{name}\" belongs to module \"{owner}\", not \"{module}\"")]
    ForeignHandle {
        /// Adapter asked to delete the handle.
        module: String,
        /// Adapter that created the handle.
        owner: String,
        /// Device name.
        name: String,
    },

    /// A device call returned a non-zero status code.
    #[error("Error in device \"{label}\": {message} ({code})")]
    Device {
        /// Device label.
        label: String,
        /// Native status code.
        code: i32,
        /// Text reported by the device for `code`.
        message: String,
    },

    /// Configuration sources could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration parsed but failed validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl From<figment::Error> for MmError {
    fn from(err: figment::Error) -> Self {
        MmError::Config(Box::new(err))
    }
}

impl MmError {
    /// Whether the error comes from a failed lookup or bounds check the caller
    /// can recover from, as opposed to a loader or ABI failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MmError::Index { .. }
                | MmError::Query { .. }
                | MmError::NoSuchDevice(_)
                | MmError::ModuleNotLoaded(_)
                | MmError::CapabilityMismatch { .. }
                | MmError::Device { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_error_message_names_label_and_code() {
        let err = MmError::Device {
            label: "Camera".into(),
            code: 3,
            message: "Property value rejected".into(),
        };
        assert_eq!(
            err.to_string(),
            "Error in device \"Camera\": Property value rejected (3)"
        );
    }

    #[test]
    fn capability_mismatch_names_both_types() {
        let err = MmError::CapabilityMismatch {
            label: "Z".into(),
            expected: DeviceType::Camera,
            actual: DeviceType::Stage,
        };
        let msg = err.to_string();
        assert!(msg.contains("Stage"));
        assert!(msg.contains("Camera"));
    }

    #[test]
    fn abi_errors_are_not_recoverable() {
        let err = MmError::IncompatibleInterface {
            module: "Demo".into(),
            interface: "device",
            required: 71,
            found: 70,
        };
        assert!(!err.is_recoverable());
        assert!(MmError::NoSuchDevice("x".into()).is_recoverable());
    }
}
