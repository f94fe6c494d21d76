//! Demonstration device module.
//!
//! Implements the module entry points of `mmdevice-sys` for a small set of
//! simulated devices:
//!
//! | Name       | Type      | Notes                                   |
//! |------------|-----------|-----------------------------------------|
//! | `DCam`     | Camera    | 512x512, 8-bit, binning 1/2/4/8, ROI    |
//! | `DStage`   | Stage     | 0 to 10 mm focus travel, 0.1 um steps   |
//! | `DXYStage` | XY stage  | +/-50 mm travel                         |
//! | `DShutter` | Shutter   |                                         |
//! | `DWheel`   | State     | 10 labelled positions                   |
//! | `DOptovar` | Magnifier | 1.0x, 1.6x, 2.0x                        |
//! | `DHub`     | Hub       | reports every other device as installed |
//!
//! Built as a `cdylib` the crate is a loadable module. Linked as an `rlib`,
//! [`module_functions`] returns the same entry points for in-process
//! registration with a host.

#![allow(unsafe_code)]
#![allow(non_snake_case)]

mod demo_camera;
mod demo_hub;
mod demo_optovar;
mod demo_shutter;
mod demo_stage;
mod demo_wheel;
mod device;
mod pattern;
mod property;

use device::{read_str, write_str, DemoDevice};
use mmdevice_sys::*;
use std::ffi::{c_char, c_int, c_long, c_uint};

/// Names of the devices this module provides.
pub mod names {
    /// Demo camera.
    pub const CAMERA: &str = "DCam";
    /// Demo focus stage.
    pub const STAGE: &str = "DStage";
    /// Demo XY stage.
    pub const XY_STAGE: &str = "DXYStage";
    /// Demo shutter.
    pub const SHUTTER: &str = "DShutter";
    /// Demo filter wheel.
    pub const WHEEL: &str = "DWheel";
    /// Demo magnifier.
    pub const OPTOVAR: &str = "DOptovar";
    /// Demo hub.
    pub const HUB: &str = "DHub";
}

/// Static device table, in declaration order.
#[derive(Debug)]
pub(crate) struct DeviceInfo {
    pub name: &'static str,
    pub device_type: c_int,
    pub description: &'static str,
}

pub(crate) static DEVICES: [DeviceInfo; 7] = [
    DeviceInfo {
        name: names::CAMERA,
        device_type: CAMERA_DEVICE,
        description: "Demo camera",
    },
    DeviceInfo {
        name: names::STAGE,
        device_type: STAGE_DEVICE,
        description: "Demo stage",
    },
    DeviceInfo {
        name: names::XY_STAGE,
        device_type: XY_STAGE_DEVICE,
        description: "Demo XY stage",
    },
    DeviceInfo {
        name: names::SHUTTER,
        device_type: SHUTTER_DEVICE,
        description: "Demo shutter",
    },
    DeviceInfo {
        name: names::WHEEL,
        device_type: STATE_DEVICE,
        description: "Demo filter wheel",
    },
    DeviceInfo {
        name: names::OPTOVAR,
        device_type: MAGNIFIER_DEVICE,
        description: "Demo optovar",
    },
    DeviceInfo {
        name: names::HUB,
        device_type: HUB_DEVICE,
        description: "DHub",
    },
];

fn find_device(name: &str) -> Option<&'static DeviceInfo> {
    DEVICES.iter().find(|info| info.name == name)
}

/// Entry points of this module as a function table.
pub fn module_functions() -> ModuleFunctions {
    ModuleFunctions {
        initialize_module_data: InitializeModuleData,
        create_device: CreateDevice,
        delete_device: DeleteDevice,
        get_module_version: GetModuleVersion,
        get_device_interface_version: GetDeviceInterfaceVersion,
        get_number_of_devices: GetNumberOfDevices,
        get_device_name: GetDeviceName,
        get_device_type: GetDeviceType,
        get_device_description: GetDeviceDescription,
    }
}

// =============================================================================
// Module entry points
// =============================================================================

/// The device table is static, so there is nothing to initialize.
#[no_mangle]
pub extern "C" fn InitializeModuleData() {}

/// Create the named device, or return null for an unknown name.
///
/// # Safety
///
/// `name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn CreateDevice(name: *const c_char) -> *mut RawDevice {
    read_str(name)
        .and_then(find_device)
        .and_then(DemoDevice::create)
        .map_or(std::ptr::null_mut(), DemoDevice::into_raw)
}

/// Destroy a device created by [`CreateDevice`].
///
/// # Safety
///
/// `device` must be null or a live handle from [`CreateDevice`]; it must not
/// be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn DeleteDevice(device: *mut RawDevice) {
    if !device.is_null() {
        drop(DemoDevice::from_raw(device));
    }
}

/// Module interface version this module was built against.
#[no_mangle]
pub extern "C" fn GetModuleVersion() -> c_long {
    MODULE_INTERFACE_VERSION
}

/// Device interface version this module was built against.
#[no_mangle]
pub extern "C" fn GetDeviceInterfaceVersion() -> c_long {
    DEVICE_INTERFACE_VERSION
}

/// Number of devices in the device table.
#[no_mangle]
pub extern "C" fn GetNumberOfDevices() -> c_int {
    DEVICES.len() as c_int
}

/// Copy the name of device `index` into `name`.
///
/// # Safety
///
/// `name` must be null or valid for writes of `buf_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn GetDeviceName(index: c_int, name: *mut c_char, buf_len: c_uint) -> bool {
    match usize::try_from(index).ok().and_then(|i| DEVICES.get(i)) {
        Some(info) => write_str(name, buf_len, info.name),
        None => false,
    }
}

/// Report the type of the named device.
///
/// # Safety
///
/// `name` must be null or NUL-terminated; `device_type` must be null or valid
/// for a write.
#[no_mangle]
pub unsafe extern "C" fn GetDeviceType(name: *const c_char, device_type: *mut c_int) -> bool {
    match (read_str(name).and_then(find_device), device_type.as_mut()) {
        (Some(info), Some(out)) => {
            *out = info.device_type;
            true
        }
        _ => false,
    }
}

/// Copy the description of the named device into `description`.
///
/// # Safety
///
/// `name` must be null or NUL-terminated; `description` must be null or valid
/// for writes of `buf_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn GetDeviceDescription(
    name: *const c_char,
    description: *mut c_char,
    buf_len: c_uint,
) -> bool {
    match read_str(name).and_then(find_device) {
        Some(info) => write_str(description, buf_len, info.description),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn unknown_names_create_nothing() {
        let name = CString::new("NoSuchDevice").unwrap();
        let dev = unsafe { CreateDevice(name.as_ptr()) };
        assert!(dev.is_null());
    }

    #[test]
    fn created_devices_expose_their_capability_table() {
        for info in DEVICES.iter() {
            let name = CString::new(info.name).unwrap();
            unsafe {
                let dev = CreateDevice(name.as_ptr());
                assert!(!dev.is_null());
                assert!(!(*dev).capability.is_null(), "{}", info.name);
                let reported = ((*(*dev).vtable).get_type)(dev);
                assert_eq!(reported, info.device_type);
                DeleteDevice(dev);
            }
        }
    }

    #[test]
    fn device_name_rejects_out_of_range_index() {
        let mut buf = [0 as c_char; MAX_STR_LENGTH];
        let ok = unsafe { GetDeviceName(DEVICES.len() as c_int, buf.as_mut_ptr(), buf.len() as c_uint) };
        assert!(!ok);
        let ok = unsafe { GetDeviceName(-1, buf.as_mut_ptr(), buf.len() as c_uint) };
        assert!(!ok);
    }
}
