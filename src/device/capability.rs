//! Checked binding of a device instance to its capability function table.

use super::{
    AutoFocus, Camera, DeviceInstance, Galvo, Hub, ImageProcessor, Magnifier, Serial, Shutter,
    SignalIO, Slm, Stage, StateDevice, XYStage,
};
use crate::error::{MmError, MmResult};
use crate::types::DeviceType;
use mmdevice_sys::RawDevice;
use std::ptr::NonNull;
use std::sync::Arc;

/// A typed operation set for one device type.
///
/// Implemented by the capability views in this module ([`Camera`],
/// [`Stage`], ...). Obtain a view with [`DeviceInstance::capability`].
pub trait Capability: Sized {
    /// Type tag a device must carry to support this capability.
    const DEVICE_TYPE: DeviceType;

    /// Native function table behind the capability.
    #[doc(hidden)]
    type Vtable;

    #[doc(hidden)]
    fn from_bound(bound: Bound<Self::Vtable>) -> Self;
}

/// A device paired with its capability table. The table is only reachable
/// after the type tag was checked.
#[doc(hidden)]
pub struct Bound<V> {
    device: Arc<DeviceInstance>,
    table: NonNull<V>,
}

// SAFETY: the table is immutable static data inside the module, which stays
// mapped while `device` holds its adapter. Calls through it are serialized by
// the module lock.
unsafe impl<V> Send for Bound<V> {}
// SAFETY: shared access only reads the table pointer. Every call through it
// takes the module lock first, so concurrent `&Bound` users never overlap
// inside the module.
unsafe impl<V> Sync for Bound<V> {}

impl<V> Clone for Bound<V> {
    fn clone(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
            table: self.table,
        }
    }
}

impl<V> Bound<V> {
    pub(crate) fn device(&self) -> &Arc<DeviceInstance> {
        &self.device
    }

    /// Call into the capability table under the module lock.
    pub(crate) fn call<R>(&self, f: impl FnOnce(&V, *mut RawDevice) -> R) -> R {
        let _guard = self.device.adapter().lock();
        // SAFETY: `table` was taken from the device's own header after its
        // type tag matched `V`'s capability.
        let table = unsafe { self.table.as_ref() };
        f(table, self.device.handle().raw_ptr())
    }

    /// Run a status-returning native call and map the status.
    pub(crate) fn status(&self, f: impl FnOnce(&V, *mut RawDevice) -> i32) -> MmResult<()> {
        let code = self.call(f);
        self.device.check(code)
    }
}

pub(crate) fn bind<C: Capability>(device: Arc<DeviceInstance>) -> MmResult<C> {
    let actual = device.device_type();
    if actual != C::DEVICE_TYPE {
        return Err(MmError::CapabilityMismatch {
            label: device.label().to_owned(),
            expected: C::DEVICE_TYPE,
            actual,
        });
    }
    let table = NonNull::new(device.handle().capability_ptr() as *mut C::Vtable).ok_or_else(|| {
        MmError::InvalidDevice {
            module: device.module_name().to_owned(),
            name: device.name().to_owned(),
            reason: format!("no {actual} function table"),
        }
    })?;
    Ok(C::from_bound(Bound { device, table }))
}

/// Declares a capability view type bound to a function table.
macro_rules! capability_view {
    ($(#[$meta:meta])* $name:ident, $vtable:ty, $device_type:expr) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            inner: $crate::device::capability::Bound<$vtable>,
        }

        impl $crate::device::Capability for $name {
            const DEVICE_TYPE: $crate::types::DeviceType = $device_type;
            type Vtable = $vtable;

            fn from_bound(bound: $crate::device::capability::Bound<$vtable>) -> Self {
                Self { inner: bound }
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = ::std::sync::Arc<$crate::device::DeviceInstance>;

            fn deref(&self) -> &Self::Target {
                self.inner.device()
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_tuple(stringify!($name))
                    .field(&self.inner.device().label())
                    .finish()
            }
        }
    };
}

pub(crate) use capability_view;

/// A device resolved to the view matching its type tag.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum DeviceView {
    Camera(Camera),
    Stage(Stage),
    XYStage(XYStage),
    Shutter(Shutter),
    State(StateDevice),
    Serial(Serial),
    AutoFocus(AutoFocus),
    ImageProcessor(ImageProcessor),
    SignalIO(SignalIO),
    Magnifier(Magnifier),
    Slm(Slm),
    Galvo(Galvo),
    Hub(Hub),
    /// Devices with no capability table (generic and unknown types).
    Generic(Arc<DeviceInstance>),
}

impl DeviceView {
    pub(crate) fn of(device: Arc<DeviceInstance>) -> Self {
        let view = match device.device_type() {
            DeviceType::Camera => bind(Arc::clone(&device)).map(Self::Camera),
            DeviceType::Stage => bind(Arc::clone(&device)).map(Self::Stage),
            DeviceType::XYStage => bind(Arc::clone(&device)).map(Self::XYStage),
            DeviceType::Shutter => bind(Arc::clone(&device)).map(Self::Shutter),
            DeviceType::State => bind(Arc::clone(&device)).map(Self::State),
            DeviceType::Serial => bind(Arc::clone(&device)).map(Self::Serial),
            DeviceType::AutoFocus => bind(Arc::clone(&device)).map(Self::AutoFocus),
            DeviceType::ImageProcessor => bind(Arc::clone(&device)).map(Self::ImageProcessor),
            DeviceType::SignalIO => bind(Arc::clone(&device)).map(Self::SignalIO),
            DeviceType::Magnifier => bind(Arc::clone(&device)).map(Self::Magnifier),
            DeviceType::Slm => bind(Arc::clone(&device)).map(Self::Slm),
            DeviceType::Galvo => bind(Arc::clone(&device)).map(Self::Galvo),
            DeviceType::Hub => bind(Arc::clone(&device)).map(Self::Hub),
            _ => return Self::Generic(device),
        };
        view.unwrap_or(Self::Generic(device))
    }

    /// The instance behind the view.
    pub fn device(&self) -> &Arc<DeviceInstance> {
        match self {
            Self::Camera(v) => v,
            Self::Stage(v) => v,
            Self::XYStage(v) => v,
            Self::Shutter(v) => v,
            Self::State(v) => v,
            Self::Serial(v) => v,
            Self::AutoFocus(v) => v,
            Self::ImageProcessor(v) => v,
            Self::SignalIO(v) => v,
            Self::Magnifier(v) => v,
            Self::Slm(v) => v,
            Self::Galvo(v) => v,
            Self::Hub(v) => v,
            Self::Generic(device) => device,
        }
    }

    /// Type tag of the device behind the view.
    pub fn device_type(&self) -> DeviceType {
        self.device().device_type()
    }
}
