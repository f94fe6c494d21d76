//! Hub capability.

use super::capability::capability_view;
use crate::error::{MmError, MmResult};
use crate::ffi::StrBuffer;
use crate::types::DeviceType;
use mmdevice_sys::HubVtable;

capability_view!(
    /// Hub owning peripheral devices.
    ///
    /// A hub reports which peripherals are physically present after
    /// [`detect_installed_devices`](Hub::detect_installed_devices). The names
    /// it reports are device names in the hub's own module.
    Hub,
    HubVtable,
    DeviceType::Hub
);

impl Hub {
    /// Scan for attached peripherals.
    pub fn detect_installed_devices(&self) -> MmResult<()> {
        // SAFETY: see `Bound::call`.
        self.inner.status(|vt, raw| unsafe { (vt.detect_installed_devices)(raw) })
    }

    /// Names found by the last detection, in the hub's order.
    pub fn installed_device_names(&self) -> MmResult<Vec<String>> {
        self.inner.call(|vt, raw| {
            // SAFETY: see `Bound::call`.
            let count = unsafe { (vt.get_number_of_installed_devices)(raw) };
            (0..count)
                .map(|i| {
                    let mut buf = StrBuffer::new();
                    // SAFETY: see `Bound::call`.
                    let ok = unsafe {
                        (vt.get_installed_device_name)(raw, i, buf.as_mut_ptr(), buf.len())
                    };
                    if ok {
                        Ok(buf.into_string())
                    } else {
                        Err(MmError::Query {
                            module: self.module_name().to_owned(),
                            item: format!("installed device {i} of hub \"{}\"", self.label()),
                        })
                    }
                })
                .collect()
        })
    }

    /// Run detection and list the peripherals it found.
    pub fn installed_peripheral_names(&self) -> MmResult<Vec<String>> {
        self.detect_installed_devices()?;
        let names = self.installed_device_names()?;
        tracing::debug!(label = %self.label(), count = names.len(), "hub peripherals detected");
        Ok(names)
    }
}
