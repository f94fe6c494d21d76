//! Shared fixtures: the demo device module registered in-process.

#![allow(dead_code)]

use mmdevice::{DeviceAdapter, PluginManager};
use std::sync::Arc;

/// Module name the demo module is registered under.
pub const DEMO_MODULE: &str = "DemoCamera";

/// Demo device names in declaration order.
pub const DEMO_DEVICES: [&str; 7] = [
    mmdevice_demo::names::CAMERA,
    mmdevice_demo::names::STAGE,
    mmdevice_demo::names::XY_STAGE,
    mmdevice_demo::names::SHUTTER,
    mmdevice_demo::names::WHEEL,
    mmdevice_demo::names::OPTOVAR,
    mmdevice_demo::names::HUB,
];

/// Plugin manager with the demo module registered as [`DEMO_MODULE`].
pub fn demo_manager() -> PluginManager {
    let manager = PluginManager::new();
    manager.register_static(DEMO_MODULE, mmdevice_demo::module_functions());
    manager
}

/// Stand-alone adapter over the demo module.
pub fn demo_adapter() -> Arc<DeviceAdapter> {
    Arc::new(
        DeviceAdapter::from_functions(DEMO_MODULE, mmdevice_demo::module_functions())
            .expect("demo module passes version validation"),
    )
}
