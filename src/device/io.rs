//! Light path and signal capabilities: shutters, state devices, signal I/O,
//! magnifiers and serial ports.

use super::capability::capability_view;
use crate::error::{MmError, MmResult};
use crate::ffi::{to_cstring, StrBuffer};
use crate::types::DeviceType;
use mmdevice_sys::{MagnifierVtable, SerialVtable, ShutterVtable, SignalIOVtable, StateVtable};
use std::ffi::{c_long, c_ulong};

// SAFETY (every native call in this file): see `Bound::call`.

capability_view!(
    /// Shutter.
    Shutter,
    ShutterVtable,
    DeviceType::Shutter
);

impl Shutter {
    /// Open or close the shutter.
    pub fn set_open(&self, open: bool) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_open)(raw, open) })
    }

    /// Whether the shutter is open.
    pub fn is_open(&self) -> MmResult<bool> {
        let mut open = false;
        self.inner.status(|vt, raw| unsafe { (vt.get_open)(raw, &mut open) })?;
        Ok(open)
    }

    /// Open the shutter for `delta_t` milliseconds.
    pub fn fire(&self, delta_t: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.fire)(raw, delta_t) })
    }
}

capability_view!(
    /// Multi-position device such as a filter wheel or turret.
    StateDevice,
    StateVtable,
    DeviceType::State
);

fn to_position(pos: i64) -> MmResult<c_long> {
    c_long::try_from(pos).map_err(|_| MmError::InvalidArgument(format!("position {pos} out of range")))
}

impl StateDevice {
    /// Move to a numbered position.
    pub fn set_position(&self, pos: i64) -> MmResult<()> {
        let pos = to_position(pos)?;
        self.inner.status(|vt, raw| unsafe { (vt.set_position)(raw, pos) })
    }

    /// Current position.
    pub fn position(&self) -> MmResult<i64> {
        let mut pos: c_long = 0;
        self.inner.status(|vt, raw| unsafe { (vt.get_position)(raw, &mut pos) })?;
        Ok(i64::from(pos))
    }

    /// Number of positions.
    pub fn number_of_positions(&self) -> u64 {
        u64::from(self.inner.call(|vt, raw| unsafe { (vt.get_number_of_positions)(raw) }))
    }

    /// Label of a position.
    pub fn position_label(&self, pos: i64) -> MmResult<String> {
        let pos = to_position(pos)?;
        let mut buf = StrBuffer::new();
        self.inner.status(|vt, raw| unsafe {
            (vt.get_position_label)(raw, pos, buf.as_mut_ptr(), buf.len())
        })?;
        Ok(buf.into_string())
    }

    /// Rename a position.
    pub fn set_position_label(&self, pos: i64, label: &str) -> MmResult<()> {
        let pos = to_position(pos)?;
        let clabel = to_cstring(label)?;
        self.inner
            .status(|vt, raw| unsafe { (vt.set_position_label)(raw, pos, clabel.as_ptr()) })
    }

    /// Position carrying `label`.
    pub fn label_position(&self, label: &str) -> MmResult<i64> {
        let clabel = to_cstring(label)?;
        let mut pos: c_long = 0;
        self.inner
            .status(|vt, raw| unsafe { (vt.get_label_position)(raw, clabel.as_ptr(), &mut pos) })?;
        Ok(i64::from(pos))
    }

    /// Move to the position carrying `label`.
    pub fn set_position_by_label(&self, label: &str) -> MmResult<()> {
        self.set_position(self.label_position(label)?)
    }

    /// Open or close the gate.
    pub fn set_gate_open(&self, open: bool) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_gate_open)(raw, open) })
    }

    /// Whether the gate is open.
    pub fn gate_open(&self) -> MmResult<bool> {
        let mut open = false;
        self.inner.status(|vt, raw| unsafe { (vt.get_gate_open)(raw, &mut open) })?;
        Ok(open)
    }
}

capability_view!(
    /// Analog or digital signal output.
    SignalIO,
    SignalIOVtable,
    DeviceType::SignalIO
);

impl SignalIO {
    /// Open or close the gate.
    pub fn set_gate_open(&self, open: bool) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_gate_open)(raw, open) })
    }

    /// Whether the gate is open.
    pub fn gate_open(&self) -> MmResult<bool> {
        let mut open = false;
        self.inner.status(|vt, raw| unsafe { (vt.get_gate_open)(raw, &mut open) })?;
        Ok(open)
    }

    /// Set the output in volts.
    pub fn set_signal(&self, volts: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_signal)(raw, volts) })
    }

    /// Current signal in volts.
    pub fn signal(&self) -> MmResult<f64> {
        let mut volts = 0.0;
        self.inner.status(|vt, raw| unsafe { (vt.get_signal)(raw, &mut volts) })?;
        Ok(volts)
    }

    /// `(min, max)` signal range in volts.
    pub fn limits(&self) -> MmResult<(f64, f64)> {
        let (mut min, mut max) = (0.0, 0.0);
        self.inner.status(|vt, raw| unsafe { (vt.get_limits)(raw, &mut min, &mut max) })?;
        Ok((min, max))
    }
}

capability_view!(
    /// Magnification changer.
    Magnifier,
    MagnifierVtable,
    DeviceType::Magnifier
);

impl Magnifier {
    /// Current magnification factor.
    pub fn magnification(&self) -> f64 {
        self.inner.call(|vt, raw| unsafe { (vt.get_magnification)(raw) })
    }
}

capability_view!(
    /// Serial port.
    Serial,
    SerialVtable,
    DeviceType::Serial
);

impl Serial {
    /// Send `command` followed by `terminator`.
    pub fn set_command(&self, command: &str, terminator: &str) -> MmResult<()> {
        let ccommand = to_cstring(command)?;
        let cterm = to_cstring(terminator)?;
        self.inner.status(|vt, raw| unsafe {
            (vt.set_command)(raw, ccommand.as_ptr(), cterm.as_ptr())
        })
    }

    /// Read one answer up to `terminator`, which is not included.
    pub fn answer(&self, terminator: &str) -> MmResult<String> {
        let cterm = to_cstring(terminator)?;
        let mut buf = StrBuffer::new();
        self.inner.status(|vt, raw| unsafe {
            (vt.get_answer)(raw, buf.as_mut_ptr(), buf.len(), cterm.as_ptr())
        })?;
        Ok(buf.into_string())
    }

    /// Write raw bytes.
    pub fn write(&self, data: &[u8]) -> MmResult<()> {
        let len = c_ulong::try_from(data.len())
            .map_err(|_| MmError::InvalidArgument(format!("{} bytes is too long to write", data.len())))?;
        self.inner.status(|vt, raw| unsafe { (vt.write)(raw, data.as_ptr(), len) })
    }

    /// Read available bytes into `buf`, returning how many were read.
    pub fn read(&self, buf: &mut [u8]) -> MmResult<usize> {
        let capacity = c_ulong::try_from(buf.len()).unwrap_or(c_ulong::MAX);
        let mut read: c_ulong = 0;
        self.inner.status(|vt, raw| unsafe {
            (vt.read)(raw, buf.as_mut_ptr(), capacity, &mut read)
        })?;
        Ok(usize::try_from(read).unwrap_or(buf.len()).min(buf.len()))
    }

    /// Discard buffered input.
    pub fn purge(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.purge)(raw) })
    }
}
