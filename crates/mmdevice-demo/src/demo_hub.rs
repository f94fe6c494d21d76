//! Demo hub reporting the other demo devices as installed peripherals.

use crate::device::{demo, write_str, DemoDevice, Kind};
use crate::DEVICES;
use mmdevice_sys::*;
use std::ffi::{c_char, c_int, c_uint};

#[derive(Debug)]
pub(crate) struct Hub {
    installed: Vec<&'static str>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            installed: Vec::new(),
        }
    }

    pub fn detect(&mut self) {
        self.installed = DEVICES
            .iter()
            .filter(|info| info.device_type != HUB_DEVICE)
            .map(|info| info.name)
            .collect();
    }
}

unsafe fn with_hub<T>(dev: *mut RawDevice, fallback: T, f: impl FnOnce(&mut Hub) -> T) -> T {
    match demo(dev) {
        Some(DemoDevice {
            kind: Kind::Hub(hub),
            ..
        }) => f(hub),
        _ => fallback,
    }
}

pub(crate) static HUB_VTABLE: HubVtable = HubVtable {
    detect_installed_devices,
    get_number_of_installed_devices,
    get_installed_device_name,
};

unsafe extern "C" fn detect_installed_devices(dev: *mut RawDevice) -> c_int {
    with_hub(dev, DEVICE_ERR, |hub| {
        hub.detect();
        DEVICE_OK
    })
}

unsafe extern "C" fn get_number_of_installed_devices(dev: *mut RawDevice) -> c_uint {
    with_hub(dev, 0, |hub| hub.installed.len() as c_uint)
}

unsafe extern "C" fn get_installed_device_name(
    dev: *mut RawDevice,
    index: c_uint,
    name: *mut c_char,
    buf_len: c_uint,
) -> bool {
    match with_hub(dev, None, |hub| hub.installed.get(index as usize).copied()) {
        Some(peripheral) => write_str(name, buf_len, peripheral),
        None => false,
    }
}
