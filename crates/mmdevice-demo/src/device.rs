//! Device object layout and the base function table shared by all demo devices.

use crate::demo_camera::{Camera, CAMERA_VTABLE};
use crate::demo_hub::{Hub, HUB_VTABLE};
use crate::demo_optovar::{Optovar, MAGNIFIER_VTABLE};
use crate::demo_shutter::{Shutter, SHUTTER_VTABLE};
use crate::demo_stage::{Stage, XYStage, STAGE_VTABLE, XY_STAGE_VTABLE};
use crate::demo_wheel::{Wheel, STATE_VTABLE};
use crate::property::Property;
use crate::DeviceInfo;
use mmdevice_sys::*;
use std::ffi::{c_char, c_double, c_int, c_uint, c_void, CStr};

/// Device-specific state.
#[derive(Debug)]
pub(crate) enum Kind {
    Camera(Camera),
    Stage(Stage),
    XYStage(XYStage),
    Shutter(Shutter),
    Wheel(Wheel),
    Optovar(Optovar),
    Hub(Hub),
}

impl Kind {
    fn for_device(name: &str) -> Option<Self> {
        Some(match name {
            crate::names::CAMERA => Kind::Camera(Camera::new()),
            crate::names::STAGE => Kind::Stage(Stage::new()),
            crate::names::XY_STAGE => Kind::XYStage(XYStage::new()),
            crate::names::SHUTTER => Kind::Shutter(Shutter::new()),
            crate::names::WHEEL => Kind::Wheel(Wheel::new()),
            crate::names::OPTOVAR => Kind::Optovar(Optovar),
            crate::names::HUB => Kind::Hub(Hub::new()),
            _ => return None,
        })
    }

    pub(crate) fn device_type(&self) -> c_int {
        match self {
            Kind::Camera(_) => CAMERA_DEVICE,
            Kind::Stage(_) => STAGE_DEVICE,
            Kind::XYStage(_) => XY_STAGE_DEVICE,
            Kind::Shutter(_) => SHUTTER_DEVICE,
            Kind::Wheel(_) => STATE_DEVICE,
            Kind::Optovar(_) => MAGNIFIER_DEVICE,
            Kind::Hub(_) => HUB_DEVICE,
        }
    }

    fn capability(&self) -> *const c_void {
        match self {
            Kind::Camera(_) => std::ptr::addr_of!(CAMERA_VTABLE).cast(),
            Kind::Stage(_) => std::ptr::addr_of!(STAGE_VTABLE).cast(),
            Kind::XYStage(_) => std::ptr::addr_of!(XY_STAGE_VTABLE).cast(),
            Kind::Shutter(_) => std::ptr::addr_of!(SHUTTER_VTABLE).cast(),
            Kind::Wheel(_) => std::ptr::addr_of!(STATE_VTABLE).cast(),
            Kind::Optovar(_) => std::ptr::addr_of!(MAGNIFIER_VTABLE).cast(),
            Kind::Hub(_) => std::ptr::addr_of!(HUB_VTABLE).cast(),
        }
    }

    fn properties(&self) -> Vec<Property> {
        match self {
            Kind::Camera(_) => Camera::properties(),
            Kind::Shutter(_) => Shutter::properties(),
            Kind::Wheel(wheel) => wheel.properties(),
            Kind::Optovar(_) => Optovar::properties(),
            Kind::Stage(_) | Kind::XYStage(_) | Kind::Hub(_) => Vec::new(),
        }
    }

    /// Apply a validated property write to the device state.
    fn on_property(&mut self, name: &str, value: &str) -> c_int {
        match self {
            Kind::Camera(camera) => camera.on_property(name, value),
            Kind::Shutter(shutter) => shutter.on_property(name, value),
            Kind::Wheel(wheel) => wheel.on_property(name, value),
            _ => DEVICE_OK,
        }
    }

    /// Property values that mirror device state.
    fn property_values(&self) -> Vec<(&'static str, String)> {
        match self {
            Kind::Camera(camera) => camera.property_values(),
            Kind::Shutter(shutter) => shutter.property_values(),
            Kind::Wheel(wheel) => wheel.property_values(),
            _ => Vec::new(),
        }
    }

    fn uses_delay(&self) -> bool {
        matches!(self, Kind::Shutter(_) | Kind::Wheel(_))
    }
}

/// A device object handed out by `CreateDevice`.
///
/// `raw` must stay the first field: the host only ever sees a pointer to it and
/// every function in this crate casts that pointer back to the whole struct.
#[repr(C)]
#[derive(Debug)]
pub(crate) struct DemoDevice {
    raw: RawDevice,
    pub kind: Kind,
    pub properties: Vec<Property>,
    pub initialized: bool,
    delay_ms: f64,
    parent_id: String,
}

impl DemoDevice {
    pub fn create(info: &DeviceInfo) -> Option<Box<Self>> {
        let kind = Kind::for_device(info.name)?;
        let mut properties = vec![
            Property::string("Name", info.name).read_only(),
            Property::string("Description", info.description).read_only(),
        ];
        properties.extend(kind.properties());
        Some(Box::new(Self {
            raw: RawDevice {
                vtable: std::ptr::addr_of!(DEVICE_VTABLE),
                capability: kind.capability(),
            },
            kind,
            properties,
            initialized: false,
            delay_ms: 0.0,
            parent_id: String::new(),
        }))
    }

    pub fn into_raw(self: Box<Self>) -> *mut RawDevice {
        Box::into_raw(self).cast()
    }

    /// Reclaim a device previously released with [`DemoDevice::into_raw`].
    ///
    /// # Safety
    ///
    /// `dev` must come from `into_raw` and must not have been reclaimed before.
    pub unsafe fn from_raw(dev: *mut RawDevice) -> Box<Self> {
        Box::from_raw(dev.cast::<DemoDevice>())
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn set_property(&mut self, name: &str, value: &str) -> c_int {
        let Some(index) = self.properties.iter().position(|p| p.name == name) else {
            return DEVICE_INVALID_PROPERTY;
        };
        let property = &self.properties[index];
        if property.read_only || !property.accepts(value) {
            return DEVICE_INVALID_PROPERTY_VALUE;
        }
        let code = self.kind.on_property(name, value);
        if code == DEVICE_OK {
            self.properties[index].value = value.to_owned();
            self.sync_properties();
        }
        code
    }

    /// Copy state-backed values into the property table.
    pub fn sync_properties(&mut self) {
        for (name, value) in self.kind.property_values() {
            if let Some(property) = self.properties.iter_mut().find(|p| p.name == name) {
                property.value = value;
            }
        }
    }
}

/// Borrow the demo device behind a handle.
///
/// # Safety
///
/// `dev` must be null or a live handle returned by this module's `CreateDevice`.
pub(crate) unsafe fn demo<'a>(dev: *mut RawDevice) -> Option<&'a mut DemoDevice> {
    // SAFETY: every RawDevice handed out by this module is the first field of a
    // #[repr(C)] DemoDevice, so the cast recovers the original allocation.
    dev.cast::<DemoDevice>().as_mut()
}

/// Copy `value` into a caller-provided buffer, truncating and NUL-terminating.
///
/// # Safety
///
/// `buf` must be null or valid for writes of `len` bytes.
pub(crate) unsafe fn write_str(buf: *mut c_char, len: c_uint, value: &str) -> bool {
    if buf.is_null() || len == 0 {
        return false;
    }
    let bytes = value.as_bytes();
    let n = bytes.len().min(len as usize - 1);
    std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buf, n);
    *buf.add(n) = 0;
    true
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}

fn error_text(code: c_int) -> Option<&'static str> {
    Some(match code {
        DEVICE_ERR => "Unspecified device error",
        DEVICE_INVALID_PROPERTY => "Unknown property name",
        DEVICE_INVALID_PROPERTY_VALUE => "Property value rejected",
        DEVICE_INVALID_PROPERTY_TYPE => "Wrong property type",
        DEVICE_NOT_SUPPORTED => "Operation not supported by this device",
        DEVICE_UNKNOWN_LABEL => "Unknown position label",
        DEVICE_UNKNOWN_POSITION => "Position out of range",
        DEVICE_INVALID_INPUT_PARAM => "Invalid input parameter",
        DEVICE_BUFFER_OVERFLOW => "Buffer overflow",
        DEVICE_NONEXISTENT_CHANNEL => "No such channel",
        DEVICE_CAMERA_BUSY_ACQUIRING => "Camera is busy acquiring a sequence",
        DEVICE_NOT_YET_IMPLEMENTED => "Not yet implemented",
        _ => return None,
    })
}

// =============================================================================
// Base function table
// =============================================================================

pub(crate) static DEVICE_VTABLE: DeviceVtable = DeviceVtable {
    get_type,
    initialize,
    shutdown,
    busy,
    get_number_of_properties,
    get_property_name,
    has_property,
    get_property,
    set_property,
    get_property_type,
    get_property_read_only,
    has_property_limits,
    get_property_lower_limit,
    get_property_upper_limit,
    get_number_of_property_values,
    get_property_value_at,
    get_error_text,
    get_delay_ms,
    set_delay_ms,
    uses_delay,
    get_parent_id,
    set_parent_id,
    supports_device_detection,
    detect_device,
};

unsafe fn named_property<'a>(dev: *mut RawDevice, name: *const c_char) -> Option<&'a Property> {
    let device = demo(dev)?;
    let name = read_str(name)?;
    device.property(name)
}

unsafe extern "C" fn get_type(dev: *mut RawDevice) -> c_int {
    demo(dev).map_or(UNKNOWN_TYPE, |d| d.kind.device_type())
}

unsafe extern "C" fn initialize(dev: *mut RawDevice) -> c_int {
    let Some(device) = demo(dev) else {
        return DEVICE_ERR;
    };
    if device.initialized {
        return DEVICE_OK;
    }
    if let Kind::Hub(hub) = &mut device.kind {
        hub.detect();
    }
    device.initialized = true;
    DEVICE_OK
}

unsafe extern "C" fn shutdown(dev: *mut RawDevice) -> c_int {
    let Some(device) = demo(dev) else {
        return DEVICE_ERR;
    };
    if let Kind::Camera(camera) = &mut device.kind {
        camera.stop_sequence();
    }
    device.initialized = false;
    DEVICE_OK
}

unsafe extern "C" fn busy(_dev: *mut RawDevice) -> bool {
    false
}

unsafe extern "C" fn get_number_of_properties(dev: *mut RawDevice) -> c_uint {
    demo(dev).map_or(0, |d| d.properties.len() as c_uint)
}

unsafe extern "C" fn get_property_name(
    dev: *mut RawDevice,
    index: c_uint,
    name: *mut c_char,
    buf_len: c_uint,
) -> bool {
    match demo(dev).and_then(|d| d.properties.get(index as usize)) {
        Some(property) => write_str(name, buf_len, property.name),
        None => false,
    }
}

unsafe extern "C" fn has_property(dev: *mut RawDevice, name: *const c_char) -> bool {
    named_property(dev, name).is_some()
}

unsafe extern "C" fn get_property(
    dev: *mut RawDevice,
    name: *const c_char,
    value: *mut c_char,
    buf_len: c_uint,
) -> c_int {
    match named_property(dev, name) {
        Some(property) if write_str(value, buf_len, &property.value) => DEVICE_OK,
        Some(_) => DEVICE_BUFFER_OVERFLOW,
        None => DEVICE_INVALID_PROPERTY,
    }
}

unsafe extern "C" fn set_property(
    dev: *mut RawDevice,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    let (Some(device), Some(name), Some(value)) = (demo(dev), read_str(name), read_str(value))
    else {
        return DEVICE_INVALID_INPUT_PARAM;
    };
    device.set_property(name, value)
}

unsafe extern "C" fn get_property_type(
    dev: *mut RawDevice,
    name: *const c_char,
    property_type: *mut c_int,
) -> bool {
    match (named_property(dev, name), property_type.as_mut()) {
        (Some(property), Some(out)) => {
            *out = property.property_type;
            true
        }
        _ => false,
    }
}

unsafe extern "C" fn get_property_read_only(
    dev: *mut RawDevice,
    name: *const c_char,
    read_only: *mut bool,
) -> bool {
    match (named_property(dev, name), read_only.as_mut()) {
        (Some(property), Some(out)) => {
            *out = property.read_only;
            true
        }
        _ => false,
    }
}

unsafe extern "C" fn has_property_limits(dev: *mut RawDevice, name: *const c_char) -> bool {
    named_property(dev, name).is_some_and(|p| p.limits.is_some())
}

unsafe extern "C" fn get_property_lower_limit(
    dev: *mut RawDevice,
    name: *const c_char,
    limit: *mut c_double,
) -> bool {
    match (named_property(dev, name).and_then(|p| p.limits), limit.as_mut()) {
        (Some((lower, _)), Some(out)) => {
            *out = lower;
            true
        }
        _ => false,
    }
}

unsafe extern "C" fn get_property_upper_limit(
    dev: *mut RawDevice,
    name: *const c_char,
    limit: *mut c_double,
) -> bool {
    match (named_property(dev, name).and_then(|p| p.limits), limit.as_mut()) {
        (Some((_, upper)), Some(out)) => {
            *out = upper;
            true
        }
        _ => false,
    }
}

unsafe extern "C" fn get_number_of_property_values(
    dev: *mut RawDevice,
    name: *const c_char,
) -> c_uint {
    named_property(dev, name).map_or(0, |p| p.allowed.len() as c_uint)
}

unsafe extern "C" fn get_property_value_at(
    dev: *mut RawDevice,
    name: *const c_char,
    index: c_uint,
    value: *mut c_char,
    buf_len: c_uint,
) -> bool {
    match named_property(dev, name).and_then(|p| p.allowed.get(index as usize)) {
        Some(allowed) => write_str(value, buf_len, allowed),
        None => false,
    }
}

unsafe extern "C" fn get_error_text(
    _dev: *mut RawDevice,
    code: c_int,
    text: *mut c_char,
    buf_len: c_uint,
) -> bool {
    match error_text(code) {
        Some(message) => write_str(text, buf_len, message),
        None => false,
    }
}

unsafe extern "C" fn get_delay_ms(dev: *mut RawDevice) -> c_double {
    demo(dev).map_or(0.0, |d| d.delay_ms)
}

unsafe extern "C" fn set_delay_ms(dev: *mut RawDevice, delay: c_double) {
    if let Some(device) = demo(dev) {
        device.delay_ms = delay;
    }
}

unsafe extern "C" fn uses_delay(dev: *mut RawDevice) -> bool {
    demo(dev).is_some_and(|d| d.kind.uses_delay())
}

unsafe extern "C" fn get_parent_id(dev: *mut RawDevice, id: *mut c_char, buf_len: c_uint) {
    if let Some(device) = demo(dev) {
        write_str(id, buf_len, &device.parent_id);
    }
}

unsafe extern "C" fn set_parent_id(dev: *mut RawDevice, id: *const c_char) {
    if let (Some(device), Some(id)) = (demo(dev), read_str(id)) {
        device.parent_id = id.to_owned();
    }
}

unsafe extern "C" fn supports_device_detection(dev: *mut RawDevice) -> bool {
    demo(dev).is_some_and(|d| matches!(d.kind, Kind::Hub(_)))
}

unsafe extern "C" fn detect_device(dev: *mut RawDevice) -> c_int {
    match demo(dev) {
        Some(DemoDevice {
            kind: Kind::Hub(_), ..
        }) => DETECTION_CAN_COMMUNICATE,
        _ => DETECTION_UNIMPLEMENTED,
    }
}
