//! Demo shutter.

use crate::device::{demo, DemoDevice, Kind};
use crate::property::Property;
use mmdevice_sys::*;
use std::ffi::{c_double, c_int};

#[derive(Debug)]
pub(crate) struct Shutter {
    open: bool,
}

impl Shutter {
    pub fn new() -> Self {
        Self { open: false }
    }

    pub fn properties() -> Vec<Property> {
        vec![Property::integer("State", 0).with_allowed(["0", "1"])]
    }

    pub fn property_values(&self) -> Vec<(&'static str, String)> {
        vec![("State", u8::from(self.open).to_string())]
    }

    pub fn on_property(&mut self, name: &str, value: &str) -> c_int {
        if name == "State" {
            self.open = value.trim() == "1";
        }
        DEVICE_OK
    }
}

pub(crate) static SHUTTER_VTABLE: ShutterVtable = ShutterVtable {
    set_open,
    get_open,
    fire,
};

unsafe extern "C" fn set_open(dev: *mut RawDevice, open: bool) -> c_int {
    let Some(device) = demo(dev) else {
        return DEVICE_ERR;
    };
    let Kind::Shutter(shutter) = &mut device.kind else {
        return DEVICE_ERR;
    };
    shutter.open = open;
    device.sync_properties();
    DEVICE_OK
}

unsafe extern "C" fn get_open(dev: *mut RawDevice, open: *mut bool) -> c_int {
    match (demo(dev), open.as_mut()) {
        (
            Some(DemoDevice {
                kind: Kind::Shutter(shutter),
                ..
            }),
            Some(out),
        ) => {
            *out = shutter.open;
            DEVICE_OK
        }
        _ => DEVICE_ERR,
    }
}

unsafe extern "C" fn fire(_dev: *mut RawDevice, _delta_t: c_double) -> c_int {
    DEVICE_NOT_SUPPORTED
}
