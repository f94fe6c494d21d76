//! Demo optovar: a magnifier whose magnification is a property.

use crate::device::demo;
use crate::property::Property;
use mmdevice_sys::{MagnifierVtable, RawDevice};
use std::ffi::c_double;

#[derive(Debug)]
pub(crate) struct Optovar;

impl Optovar {
    pub fn properties() -> Vec<Property> {
        vec![Property::float("Magnification", 1.0).with_allowed(["1.0000", "1.6000", "2.0000"])]
    }
}

pub(crate) static MAGNIFIER_VTABLE: MagnifierVtable = MagnifierVtable { get_magnification };

unsafe extern "C" fn get_magnification(dev: *mut RawDevice) -> c_double {
    demo(dev)
        .and_then(|d| d.property("Magnification"))
        .and_then(|p| p.value.parse().ok())
        .unwrap_or(1.0)
}
