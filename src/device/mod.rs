//! Device instances and typed capability views.
//!
//! A [`DeviceInstance`] owns one native device object together with its label,
//! description and the type tag fixed when the object was created. It exposes
//! the base operations every device supports (initialization, properties,
//! delays, parent ID, detection). Type-specific operations are reached through
//! capability views such as [`Camera`] or [`Stage`], which can only be obtained
//! after the type tag has been checked.
//!
//! Every native call goes through the module lock of the adapter that created
//! the device.

mod camera;
mod capability;
mod hub;
mod imaging;
mod io;
mod motion;

pub use camera::{Camera, Image, PixelType, Roi};
pub use capability::{Capability, DeviceView};
pub use hub::Hub;
pub use imaging::{ImageProcessor, Slm};
pub use io::{Magnifier, Serial, Shutter, SignalIO, StateDevice};
pub use motion::{AutoFocus, Galvo, Stage, XYLimits, XYStage};

use crate::adapter::{DeviceAdapter, DeviceHandle};
use crate::error::{MmError, MmResult};
use crate::ffi::{to_cstring, StrBuffer};
use crate::types::{DetectionStatus, DeviceType, PropertyType};
use mmdevice_sys::{DeviceVtable, RawDevice, DEVICE_OK};
use parking_lot::RwLock;
use std::ffi::{c_int, c_uint};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A live device object with a label and a fixed type tag.
pub struct DeviceInstance {
    label: String,
    description: String,
    device_type: DeviceType,
    initialized: AtomicBool,
    /// Set by a successful snap, cleared by geometry changes.
    image_ready: AtomicBool,
    parent_label: RwLock<Option<String>>,
    handle: DeviceHandle,
}

impl DeviceInstance {
    pub(crate) fn new(label: &str, description: String, handle: DeviceHandle) -> Self {
        let raw_type = {
            let _guard = handle.adapter().lock();
            // SAFETY: the handle's base table was validated at creation.
            unsafe { (handle.vtable().get_type)(handle.raw_ptr()) }
        };
        Self {
            label: label.to_owned(),
            description,
            device_type: DeviceType::from_raw(raw_type),
            initialized: AtomicBool::new(false),
            image_ready: AtomicBool::new(false),
            parent_label: RwLock::new(None),
            handle,
        }
    }

    /// Label the device is registered under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Device name within its module.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Description reported by the module.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Type tag, fixed at creation.
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Adapter that created the device.
    pub fn adapter(&self) -> &Arc<DeviceAdapter> {
        self.handle.adapter()
    }

    /// Name of the module the device belongs to.
    pub fn module_name(&self) -> &str {
        self.adapter().name()
    }

    /// Call into the native object under the module lock.
    pub(crate) fn call<R>(&self, f: impl FnOnce(&DeviceVtable, *mut RawDevice) -> R) -> R {
        let _guard = self.adapter().lock();
        f(self.handle.vtable(), self.handle.raw_ptr())
    }

    pub(crate) fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    pub(crate) fn set_image_ready(&self, ready: bool) {
        self.image_ready.store(ready, Ordering::Release);
    }

    pub(crate) fn image_ready(&self) -> bool {
        self.image_ready.load(Ordering::Acquire)
    }

    /// Map a native status code to a result, looking up the device's text for
    /// non-zero codes.
    pub(crate) fn check(&self, code: c_int) -> MmResult<()> {
        if code == DEVICE_OK {
            return Ok(());
        }
        Err(MmError::Device {
            label: self.label.clone(),
            code,
            message: self.error_text(code),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Initialize the device. Calling it again after success is a no-op.
    pub fn initialize(&self) -> MmResult<()> {
        if self.is_initialized() {
            return Ok(());
        }
        // SAFETY (all native calls in this module): `raw` is the live object
        // owned by `self.handle`, the table comes from the same module, and
        // `call` holds the module lock.
        let code = self.call(|vt, raw| unsafe { (vt.initialize)(raw) });
        self.check(code)?;
        self.initialized.store(true, Ordering::Release);
        tracing::debug!(label = %self.label, "device initialized");
        Ok(())
    }

    /// Shut the device down. Safe to call repeatedly; only the first call
    /// after a successful [`initialize`](Self::initialize) reaches the device.
    pub fn shutdown(&self) -> MmResult<()> {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let code = self.call(|vt, raw| unsafe { (vt.shutdown)(raw) });
        self.set_image_ready(false);
        tracing::debug!(label = %self.label, "device shut down");
        self.check(code)
    }

    /// Whether [`initialize`](Self::initialize) succeeded and no shutdown
    /// followed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Whether the device reports an operation in progress.
    pub fn busy(&self) -> bool {
        self.call(|vt, raw| unsafe { (vt.busy)(raw) })
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Names of all properties, in the device's order.
    pub fn property_names(&self) -> MmResult<Vec<String>> {
        self.call(|vt, raw| {
            let count = unsafe { (vt.get_number_of_properties)(raw) };
            (0..count)
                .map(|i| {
                    let mut buf = StrBuffer::new();
                    if unsafe { (vt.get_property_name)(raw, i, buf.as_mut_ptr(), buf.len()) } {
                        Ok(buf.into_string())
                    } else {
                        Err(self.query_error(format!("name of property {i}")))
                    }
                })
                .collect()
        })
    }

    /// Whether the device has a property called `name`.
    pub fn has_property(&self, name: &str) -> MmResult<bool> {
        let cname = to_cstring(name)?;
        Ok(self.call(|vt, raw| unsafe { (vt.has_property)(raw, cname.as_ptr()) }))
    }

    /// Current value of a property.
    pub fn get_property(&self, name: &str) -> MmResult<String> {
        let cname = to_cstring(name)?;
        let mut buf = StrBuffer::new();
        let code = self.call(|vt, raw| unsafe {
            (vt.get_property)(raw, cname.as_ptr(), buf.as_mut_ptr(), buf.len())
        });
        self.check(code)?;
        Ok(buf.into_string())
    }

    /// Set a property from its string form.
    pub fn set_property(&self, name: &str, value: &str) -> MmResult<()> {
        let cname = to_cstring(name)?;
        let cvalue = to_cstring(value)?;
        let code = self.call(|vt, raw| unsafe {
            (vt.set_property)(raw, cname.as_ptr(), cvalue.as_ptr())
        });
        self.check(code)
    }

    /// Value type of a property.
    pub fn property_type(&self, name: &str) -> MmResult<PropertyType> {
        let cname = to_cstring(name)?;
        let mut raw_type: c_int = 0;
        let ok = self.call(|vt, raw| unsafe {
            (vt.get_property_type)(raw, cname.as_ptr(), &mut raw_type)
        });
        if !ok {
            return Err(self.query_error(format!("type of property \"{name}\"")));
        }
        Ok(PropertyType::from_raw(raw_type))
    }

    /// Whether a property is read-only.
    pub fn is_property_read_only(&self, name: &str) -> MmResult<bool> {
        let cname = to_cstring(name)?;
        let mut read_only = false;
        let ok = self.call(|vt, raw| unsafe {
            (vt.get_property_read_only)(raw, cname.as_ptr(), &mut read_only)
        });
        if !ok {
            return Err(self.query_error(format!("read-only flag of property \"{name}\"")));
        }
        Ok(read_only)
    }

    /// `(lower, upper)` limits of a numeric property, if it has any.
    pub fn property_limits(&self, name: &str) -> MmResult<Option<(f64, f64)>> {
        let cname = to_cstring(name)?;
        self.call(|vt, raw| {
            if !unsafe { (vt.has_property_limits)(raw, cname.as_ptr()) } {
                return Ok(None);
            }
            let (mut lower, mut upper) = (0.0, 0.0);
            let ok = unsafe {
                (vt.get_property_lower_limit)(raw, cname.as_ptr(), &mut lower)
                    && (vt.get_property_upper_limit)(raw, cname.as_ptr(), &mut upper)
            };
            if ok {
                Ok(Some((lower, upper)))
            } else {
                Err(self.query_error(format!("limits of property \"{name}\"")))
            }
        })
    }

    /// Allowed values of a property; empty when any value is accepted.
    pub fn allowed_property_values(&self, name: &str) -> MmResult<Vec<String>> {
        let cname = to_cstring(name)?;
        self.call(|vt, raw| {
            let count = unsafe { (vt.get_number_of_property_values)(raw, cname.as_ptr()) };
            (0..count)
                .map(|i: c_uint| {
                    let mut buf = StrBuffer::new();
                    let ok = unsafe {
                        (vt.get_property_value_at)(raw, cname.as_ptr(), i, buf.as_mut_ptr(), buf.len())
                    };
                    if ok {
                        Ok(buf.into_string())
                    } else {
                        Err(self.query_error(format!("allowed value {i} of property \"{name}\"")))
                    }
                })
                .collect()
        })
    }

    fn query_error(&self, item: String) -> MmError {
        MmError::Query {
            module: self.module_name().to_owned(),
            item: format!("{item} for device \"{}\"", self.label),
        }
    }

    // =========================================================================
    // Miscellaneous base operations
    // =========================================================================

    /// Text the device associates with a status code.
    pub fn error_text(&self, code: c_int) -> String {
        let mut buf = StrBuffer::new();
        let ok = self.call(|vt, raw| unsafe { (vt.get_error_text)(raw, code, buf.as_mut_ptr(), buf.len()) });
        if ok {
            buf.into_string()
        } else {
            format!("Unknown error code {code}")
        }
    }

    /// Action delay in milliseconds.
    pub fn delay_ms(&self) -> f64 {
        self.call(|vt, raw| unsafe { (vt.get_delay_ms)(raw) })
    }

    /// Set the action delay in milliseconds.
    pub fn set_delay_ms(&self, delay: f64) {
        self.call(|vt, raw| unsafe { (vt.set_delay_ms)(raw, delay) });
    }

    /// Whether the device honours the action delay.
    pub fn uses_delay(&self) -> bool {
        self.call(|vt, raw| unsafe { (vt.uses_delay)(raw) })
    }

    /// Parent ID stored in the native object.
    pub fn parent_id(&self) -> String {
        let mut buf = StrBuffer::new();
        self.call(|vt, raw| unsafe { (vt.get_parent_id)(raw, buf.as_mut_ptr(), buf.len()) });
        buf.into_string()
    }

    /// Label of the hub this device was declared under, if set explicitly.
    pub fn parent_label(&self) -> Option<String> {
        self.parent_label.read().clone()
    }

    /// Declare the hub this device belongs to. The label is also forwarded to
    /// the native object as its parent ID.
    pub fn set_parent_label(&self, label: &str) -> MmResult<()> {
        let cid = to_cstring(label)?;
        self.call(|vt, raw| unsafe { (vt.set_parent_id)(raw, cid.as_ptr()) });
        *self.parent_label.write() = (!label.is_empty()).then(|| label.to_owned());
        Ok(())
    }

    /// Whether the device can detect its own hardware.
    pub fn supports_detection(&self) -> bool {
        self.call(|vt, raw| unsafe { (vt.supports_device_detection)(raw) })
    }

    /// Run device detection.
    pub fn detect(&self) -> DetectionStatus {
        DetectionStatus::from_raw(self.call(|vt, raw| unsafe { (vt.detect_device)(raw) }))
    }

    // =========================================================================
    // Capability dispatch
    // =========================================================================

    /// Typed view of the device, chosen by its type tag.
    pub fn view(self: &Arc<Self>) -> DeviceView {
        DeviceView::of(Arc::clone(self))
    }

    /// Typed view for capability `C`.
    ///
    /// # Errors
    ///
    /// [`MmError::CapabilityMismatch`] if the device was not created as a
    /// `C::DEVICE_TYPE` device.
    pub fn capability<C: Capability>(self: &Arc<Self>) -> MmResult<C> {
        capability::bind(Arc::clone(self))
    }

    /// Camera view. See [`capability`](Self::capability).
    pub fn as_camera(self: &Arc<Self>) -> MmResult<Camera> {
        self.capability()
    }

    /// Focus stage view. See [`capability`](Self::capability).
    pub fn as_stage(self: &Arc<Self>) -> MmResult<Stage> {
        self.capability()
    }

    /// XY stage view. See [`capability`](Self::capability).
    pub fn as_xy_stage(self: &Arc<Self>) -> MmResult<XYStage> {
        self.capability()
    }

    /// Shutter view. See [`capability`](Self::capability).
    pub fn as_shutter(self: &Arc<Self>) -> MmResult<Shutter> {
        self.capability()
    }

    /// State device view. See [`capability`](Self::capability).
    pub fn as_state_device(self: &Arc<Self>) -> MmResult<StateDevice> {
        self.capability()
    }

    /// Hub view. See [`capability`](Self::capability).
    pub fn as_hub(self: &Arc<Self>) -> MmResult<Hub> {
        self.capability()
    }
}

impl fmt::Debug for DeviceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceInstance")
            .field("label", &self.label)
            .field("name", &self.name())
            .field("module", &self.module_name())
            .field("device_type", &self.device_type)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl Drop for DeviceInstance {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(label = %self.label, error = %err, "device shutdown failed during release");
        }
    }
}

// =============================================================================
// Scoped acquisition
// =============================================================================

/// An initialized device that is shut down when the guard is dropped.
///
/// The native object is deleted when the last reference to the instance goes
/// away, which is the guard itself unless views or clones were taken from it.
pub struct ScopedDevice {
    device: Arc<DeviceInstance>,
}

impl ScopedDevice {
    pub(crate) fn new(device: Arc<DeviceInstance>) -> Self {
        Self { device }
    }

    /// Shared reference to the underlying instance.
    pub fn instance(&self) -> &Arc<DeviceInstance> {
        &self.device
    }
}

impl Deref for ScopedDevice {
    type Target = Arc<DeviceInstance>;

    fn deref(&self) -> &Self::Target {
        &self.device
    }
}

impl fmt::Debug for ScopedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedDevice").field(&self.device).finish()
    }
}

impl Drop for ScopedDevice {
    fn drop(&mut self) {
        if let Err(err) = self.device.shutdown() {
            tracing::warn!(label = %self.device.label(), error = %err, "device shutdown failed during release");
        }
    }
}
