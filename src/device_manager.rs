//! Registry of loaded devices by label.
//!
//! The [`DeviceManager`] owns one reference to every device it loaded and
//! resolves labels, type filters and hub/peripheral relations over them.
//! Labels are unique among registered devices; once a device is unloaded its
//! label can be reused.

use crate::adapter::DeviceAdapter;
use crate::device::{Camera, Capability, DeviceInstance, DeviceView, Stage};
use crate::error::{MmError, MmResult};
use crate::types::DeviceType;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;

/// Label-keyed registry of device instances, kept in load order.
#[derive(Default)]
pub struct DeviceManager {
    devices: RwLock<Vec<Arc<DeviceInstance>>>,
    /// Labels reserved by loads still inside the module.
    pending: Mutex<HashSet<String>>,
}

impl DeviceManager {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create device `device_name` from `adapter` and register it as `label`.
    ///
    /// The device is not initialized. The registry is not locked while the
    /// module creates the device, so callers holding the module lock can still
    /// look up devices.
    ///
    /// # Errors
    ///
    /// - [`MmError::InvalidArgument`] for an empty label
    /// - [`MmError::DuplicateLabel`] if `label` is registered; no device is
    ///   created in that case
    /// - any creation error from the adapter
    pub fn load_device(
        &self,
        adapter: &Arc<DeviceAdapter>,
        device_name: &str,
        label: &str,
    ) -> MmResult<Arc<DeviceInstance>> {
        if label.trim().is_empty() {
            return Err(MmError::InvalidArgument("device label must not be empty".to_owned()));
        }

        {
            let devices = self.devices.read();
            let mut pending = self.pending.lock();
            if devices.iter().any(|d| d.label() == label) || !pending.insert(label.to_owned()) {
                return Err(MmError::DuplicateLabel(label.to_owned()));
            }
        }

        let created = adapter.load_device(device_name, label);
        let mut devices = self.devices.write();
        self.pending.lock().remove(label);
        let device = created?;
        devices.push(Arc::clone(&device));
        drop(devices);

        tracing::info!(
            label,
            module = adapter.name(),
            device = device_name,
            device_type = %device.device_type(),
            "device loaded"
        );
        Ok(device)
    }

    /// Shut down and unregister the device at `label`.
    ///
    /// The native object is deleted once no other reference to the instance
    /// remains.
    pub fn unload_device(&self, label: &str) -> MmResult<()> {
        let device = {
            let mut devices = self.devices.write();
            let index = devices
                .iter()
                .position(|d| d.label() == label)
                .ok_or_else(|| MmError::NoSuchDevice(label.to_owned()))?;
            devices.remove(index)
        };
        let result = device.shutdown();
        tracing::info!(label, "device unloaded");
        result
    }

    /// Unload every device, peripherals before hubs.
    ///
    /// All devices are unregistered even if some fail to shut down; the first
    /// failure is returned.
    pub fn unload_all_devices(&self) -> MmResult<()> {
        let devices = std::mem::take(&mut *self.devices.write());
        let (hubs, others): (Vec<_>, Vec<_>) = devices
            .into_iter()
            .partition(|d| d.device_type() == DeviceType::Hub);

        let mut first_error = None;
        for device in others.into_iter().chain(hubs) {
            if let Err(err) = device.shutdown() {
                tracing::warn!(label = %device.label(), error = %err, "device shutdown failed");
                first_error.get_or_insert(err);
            }
            tracing::debug!(label = %device.label(), "device unloaded");
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Device registered as `label`.
    pub fn get_device(&self, label: &str) -> MmResult<Arc<DeviceInstance>> {
        find(&self.devices.read(), label)
    }

    /// Typed view of the device at `label`, checked against `device_type`.
    ///
    /// `DeviceType::Any` accepts every device.
    ///
    /// # Errors
    ///
    /// [`MmError::CapabilityMismatch`] if the device has a different type.
    pub fn get_device_of_type(&self, label: &str, device_type: DeviceType) -> MmResult<DeviceView> {
        let device = self.get_device(label)?;
        if !device_type.matches(device.device_type()) {
            return Err(MmError::CapabilityMismatch {
                label: label.to_owned(),
                expected: device_type,
                actual: device.device_type(),
            });
        }
        Ok(device.view())
    }

    /// Capability view `C` of the device at `label`.
    pub fn get_device_as<C: Capability>(&self, label: &str) -> MmResult<C> {
        self.get_device(label)?.capability()
    }

    /// Camera at `label`.
    pub fn get_camera(&self, label: &str) -> MmResult<Camera> {
        self.get_device_as(label)
    }

    /// Focus stage at `label`.
    pub fn get_stage(&self, label: &str) -> MmResult<Stage> {
        self.get_device_as(label)
    }

    /// Labels in load order, optionally restricted to one type.
    pub fn get_device_list(&self, filter: Option<DeviceType>) -> Vec<String> {
        self.devices
            .read()
            .iter()
            .filter(|d| filter.map_or(true, |t| t.matches(d.device_type())))
            .map(|d| d.label().to_owned())
            .collect()
    }

    /// Number of registered devices.
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Hub `device` belongs to.
    ///
    /// A hub is its own parent. Otherwise an explicit parent label wins, and
    /// failing that the single hub loaded from the same module is used. Returns
    /// `None` when no hub qualifies or the choice is ambiguous.
    pub fn get_parent_device(&self, device: &Arc<DeviceInstance>) -> Option<Arc<DeviceInstance>> {
        resolve_parent(&self.devices.read(), device)
    }

    /// Devices whose parent resolves to the hub at `hub_label`, in load order.
    /// The hub itself is not included.
    pub fn get_loaded_peripherals(&self, hub_label: &str) -> MmResult<Vec<Arc<DeviceInstance>>> {
        let devices = self.devices.read();
        let hub = find(&devices, hub_label)?;
        if hub.device_type() != DeviceType::Hub {
            return Err(MmError::CapabilityMismatch {
                label: hub_label.to_owned(),
                expected: DeviceType::Hub,
                actual: hub.device_type(),
            });
        }
        Ok(devices
            .iter()
            .filter(|d| !Arc::ptr_eq(d, &hub))
            .filter(|d| resolve_parent(&devices, d).is_some_and(|p| Arc::ptr_eq(&p, &hub)))
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field("devices", &self.get_device_list(None))
            .finish()
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        if let Err(err) = self.unload_all_devices() {
            tracing::warn!(error = %err, "device shutdown failed while dropping device manager");
        }
    }
}

fn find(devices: &[Arc<DeviceInstance>], label: &str) -> MmResult<Arc<DeviceInstance>> {
    devices
        .iter()
        .find(|d| d.label() == label)
        .cloned()
        .ok_or_else(|| MmError::NoSuchDevice(label.to_owned()))
}

fn resolve_parent(
    devices: &[Arc<DeviceInstance>],
    device: &Arc<DeviceInstance>,
) -> Option<Arc<DeviceInstance>> {
    if device.device_type() == DeviceType::Hub {
        return Some(Arc::clone(device));
    }
    if let Some(parent) = device.parent_label() {
        return devices
            .iter()
            .find(|d| d.label() == parent && d.device_type() == DeviceType::Hub)
            .cloned();
    }
    let mut hubs = devices.iter().filter(|d| {
        d.device_type() == DeviceType::Hub && Arc::ptr_eq(d.adapter(), device.adapter())
    });
    match (hubs.next(), hubs.next()) {
        (Some(hub), None) => Some(Arc::clone(hub)),
        _ => None,
    }
}
