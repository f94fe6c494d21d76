//! Demo filter wheel: a ten-position state device with editable labels.

use crate::device::{demo, read_str, write_str, DemoDevice, Kind};
use crate::property::Property;
use mmdevice_sys::*;
use std::ffi::{c_char, c_int, c_long, c_uint, c_ulong};

const NUM_POSITIONS: usize = 10;

#[derive(Debug)]
pub(crate) struct Wheel {
    position: usize,
    labels: Vec<String>,
    gate_open: bool,
}

impl Wheel {
    pub fn new() -> Self {
        Self {
            position: 0,
            labels: (0..NUM_POSITIONS).map(|i| format!("State-{i}")).collect(),
            gate_open: true,
        }
    }

    pub fn properties(&self) -> Vec<Property> {
        vec![
            Property::integer("State", 0).with_limits(0.0, (NUM_POSITIONS - 1) as f64),
            Property::string("Label", self.labels[0].clone()),
        ]
    }

    pub fn property_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("State", self.position.to_string()),
            ("Label", self.labels[self.position].clone()),
        ]
    }

    pub fn on_property(&mut self, name: &str, value: &str) -> c_int {
        match name {
            "State" => match value.trim().parse::<c_long>() {
                Ok(position) => self.set_position(position),
                Err(_) => DEVICE_INVALID_PROPERTY_VALUE,
            },
            "Label" => match self.label_position(value) {
                Some(position) => {
                    self.position = position;
                    DEVICE_OK
                }
                None => DEVICE_UNKNOWN_LABEL,
            },
            _ => DEVICE_OK,
        }
    }

    fn set_position(&mut self, position: c_long) -> c_int {
        match usize::try_from(position) {
            Ok(p) if p < NUM_POSITIONS => {
                self.position = p;
                DEVICE_OK
            }
            _ => DEVICE_UNKNOWN_POSITION,
        }
    }

    fn label_position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

unsafe fn with_wheel<T>(dev: *mut RawDevice, fallback: T, f: impl FnOnce(&mut Wheel) -> T) -> T {
    match demo(dev) {
        Some(DemoDevice {
            kind: Kind::Wheel(wheel),
            ..
        }) => f(wheel),
        _ => fallback,
    }
}

unsafe fn update_wheel(dev: *mut RawDevice, f: impl FnOnce(&mut Wheel) -> c_int) -> c_int {
    let Some(device) = demo(dev) else {
        return DEVICE_ERR;
    };
    let Kind::Wheel(wheel) = &mut device.kind else {
        return DEVICE_ERR;
    };
    let code = f(wheel);
    device.sync_properties();
    code
}

pub(crate) static STATE_VTABLE: StateVtable = StateVtable {
    set_position,
    get_position,
    get_number_of_positions,
    get_position_label,
    set_position_label,
    get_label_position,
    set_gate_open,
    get_gate_open,
};

unsafe extern "C" fn set_position(dev: *mut RawDevice, pos: c_long) -> c_int {
    update_wheel(dev, |w| w.set_position(pos))
}

unsafe extern "C" fn get_position(dev: *mut RawDevice, pos: *mut c_long) -> c_int {
    match (with_wheel(dev, None, |w| Some(w.position)), pos.as_mut()) {
        (Some(position), Some(out)) => {
            *out = position as c_long;
            DEVICE_OK
        }
        _ => DEVICE_ERR,
    }
}

unsafe extern "C" fn get_number_of_positions(dev: *mut RawDevice) -> c_ulong {
    with_wheel(dev, 0, |w| w.labels.len() as c_ulong)
}

unsafe extern "C" fn get_position_label(
    dev: *mut RawDevice,
    pos: c_long,
    label: *mut c_char,
    buf_len: c_uint,
) -> c_int {
    let Some(text) = with_wheel(dev, None, |w| {
        usize::try_from(pos).ok().and_then(|p| w.labels.get(p).cloned())
    }) else {
        return DEVICE_UNKNOWN_POSITION;
    };
    if write_str(label, buf_len, &text) {
        DEVICE_OK
    } else {
        DEVICE_BUFFER_OVERFLOW
    }
}

unsafe extern "C" fn set_position_label(
    dev: *mut RawDevice,
    pos: c_long,
    label: *const c_char,
) -> c_int {
    let Some(label) = read_str(label) else {
        return DEVICE_INVALID_INPUT_PARAM;
    };
    update_wheel(dev, |w| match usize::try_from(pos).ok().and_then(|p| w.labels.get_mut(p)) {
        Some(slot) => {
            *slot = label.to_owned();
            DEVICE_OK
        }
        None => DEVICE_UNKNOWN_POSITION,
    })
}

unsafe extern "C" fn get_label_position(
    dev: *mut RawDevice,
    label: *const c_char,
    pos: *mut c_long,
) -> c_int {
    let Some(label) = read_str(label) else {
        return DEVICE_INVALID_INPUT_PARAM;
    };
    match (with_wheel(dev, None, |w| w.label_position(label)), pos.as_mut()) {
        (Some(position), Some(out)) => {
            *out = position as c_long;
            DEVICE_OK
        }
        (None, _) => DEVICE_UNKNOWN_LABEL,
        _ => DEVICE_ERR,
    }
}

unsafe extern "C" fn set_gate_open(dev: *mut RawDevice, open: bool) -> c_int {
    with_wheel(dev, DEVICE_ERR, |w| {
        w.gate_open = open;
        DEVICE_OK
    })
}

unsafe extern "C" fn get_gate_open(dev: *mut RawDevice, open: *mut bool) -> c_int {
    match (with_wheel(dev, None, |w| Some(w.gate_open)), open.as_mut()) {
        (Some(gate), Some(out)) => {
            *out = gate;
            DEVICE_OK
        }
        _ => DEVICE_ERR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_property_moves_the_wheel() {
        let mut wheel = Wheel::new();
        assert_eq!(wheel.on_property("Label", "State-3"), DEVICE_OK);
        assert_eq!(wheel.position, 3);
        assert_eq!(wheel.on_property("Label", "Nope"), DEVICE_UNKNOWN_LABEL);
        assert_eq!(wheel.set_position(10), DEVICE_UNKNOWN_POSITION);
    }
}
