//! Adapter tests against the in-process demo module
//!
//! Covers interface version validation, device enumeration, creation and
//! deletion bookkeeping, and scoped device acquisition.

mod common;

use common::{demo_adapter, DEMO_DEVICES, DEMO_MODULE};
use mmdevice::{DeviceAdapter, DeviceType, MmError};
use mmdevice_sys::{ModuleFunctions, SHUTTER_DEVICE};
use std::ffi::{c_char, c_int, c_long};
use std::sync::Arc;
use std::time::Duration;

unsafe extern "C" fn old_module_version() -> c_long {
    9
}

unsafe extern "C" fn newer_device_interface_version() -> c_long {
    72
}

/// Advertises every device as a shutter.
unsafe extern "C" fn everything_is_a_shutter(_name: *const c_char, device_type: *mut c_int) -> bool {
    *device_type = SHUTTER_DEVICE;
    true
}

#[test]
fn test_module_version_mismatch_fails_construction() {
    let functions = ModuleFunctions {
        get_module_version: old_module_version,
        ..mmdevice_demo::module_functions()
    };
    match DeviceAdapter::from_functions("Old", functions) {
        Err(MmError::IncompatibleInterface {
            module,
            interface,
            required,
            found,
        }) => {
            assert_eq!(module, "Old");
            assert_eq!(interface, "module");
            assert_eq!(required, 10);
            assert_eq!(found, 9);
        }
        other => panic!("expected IncompatibleInterface, got {other:?}"),
    }
}

#[test]
fn test_device_interface_mismatch_fails_construction() {
    let functions = ModuleFunctions {
        get_device_interface_version: newer_device_interface_version,
        ..mmdevice_demo::module_functions()
    };
    let err = DeviceAdapter::from_functions("Newer", functions).unwrap_err();
    assert!(matches!(
        err,
        MmError::IncompatibleInterface {
            interface: "device",
            required: 71,
            found: 72,
            ..
        }
    ));
    let message = err.to_string();
    assert!(message.contains("Newer"), "{message}");
    assert!(message.contains("71") && message.contains("72"), "{message}");
}

#[test]
fn test_descriptor_reports_versions() {
    let adapter = demo_adapter();
    let descriptor = adapter.descriptor();
    assert_eq!(descriptor.name, DEMO_MODULE);
    assert_eq!(descriptor.path, None);
    assert_eq!(descriptor.module_version, 10);
    assert_eq!(descriptor.device_interface_version, 71);
}

#[test]
fn test_enumeration_follows_declaration_order() {
    let adapter = demo_adapter();
    assert_eq!(adapter.device_count().unwrap(), DEMO_DEVICES.len());
    assert_eq!(adapter.available_device_names().unwrap(), DEMO_DEVICES);
    // Stable across calls.
    assert_eq!(adapter.available_device_names().unwrap(), DEMO_DEVICES);

    let descriptors = adapter.descriptors().unwrap();
    assert_eq!(descriptors[0].index, 0);
    assert_eq!(descriptors[0].name, "DCam");
    assert_eq!(descriptors[0].device_type, DeviceType::Camera);
    assert_eq!(descriptors[0].description, "Demo camera");
    assert_eq!(descriptors[6].device_type, DeviceType::Hub);
}

#[test]
fn test_metadata_queries() {
    let adapter = demo_adapter();
    assert_eq!(adapter.device_type("DWheel").unwrap(), DeviceType::State);
    assert_eq!(adapter.device_type("DXYStage").unwrap(), DeviceType::XYStage);
    assert_eq!(adapter.device_description("DShutter").unwrap(), "Demo shutter");
}

#[test]
fn test_out_of_range_index_is_an_index_error() {
    let adapter = demo_adapter();
    match adapter.device_name(DEMO_DEVICES.len()) {
        Err(MmError::Index { index, count, .. }) => {
            assert_eq!(index, 7);
            assert_eq!(count, 7);
        }
        other => panic!("expected Index error, got {other:?}"),
    }
}

#[test]
fn test_unknown_name_is_a_query_error() {
    let adapter = demo_adapter();
    assert!(matches!(
        adapter.device_type("NoSuchDevice"),
        Err(MmError::Query { .. })
    ));
    assert!(matches!(
        adapter.device_description("NoSuchDevice"),
        Err(MmError::Query { .. })
    ));
    assert!(matches!(
        adapter.device_type("bad\0name"),
        Err(MmError::InvalidArgument(_))
    ));
}

#[test]
fn test_create_unknown_device_fails() {
    let adapter = demo_adapter();
    match adapter.create_device("NoSuchDevice") {
        Err(MmError::Creation { module, name }) => {
            assert_eq!(module, DEMO_MODULE);
            assert_eq!(name, "NoSuchDevice");
        }
        other => panic!("expected Creation error, got {other:?}"),
    }
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_handles_delete_exactly_once() {
    let adapter = demo_adapter();
    let camera = adapter.create_device("DCam").unwrap();
    let stage = adapter.create_device("DStage").unwrap();
    assert_eq!(adapter.live_devices(), 2);
    assert_eq!(camera.name(), "DCam");
    assert!(Arc::ptr_eq(camera.adapter(), &adapter));

    adapter.delete_device(camera).unwrap();
    assert_eq!(adapter.live_devices(), 1);

    drop(stage);
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_foreign_handle_is_rejected() {
    let owner = demo_adapter();
    let other = demo_adapter();
    let handle = owner.create_device("DShutter").unwrap();

    match other.delete_device(handle) {
        Err(MmError::ForeignHandle { module, owner: o, name }) => {
            assert_eq!(module, DEMO_MODULE);
            assert_eq!(o, DEMO_MODULE);
            assert_eq!(name, "DShutter");
        }
        other => panic!("expected ForeignHandle, got {other:?}"),
    }
    // The rejected handle was still released through its own adapter.
    assert_eq!(owner.live_devices(), 0);
    assert_eq!(other.live_devices(), 0);
}

#[test]
fn test_advertised_type_mismatch_is_rejected() {
    let functions = ModuleFunctions {
        get_device_type: everything_is_a_shutter,
        ..mmdevice_demo::module_functions()
    };
    let adapter = Arc::new(DeviceAdapter::from_functions("Liar", functions).unwrap());

    assert!(adapter.create_device("DShutter").is_ok());
    match adapter.create_device("DCam") {
        Err(MmError::InvalidDevice { name, reason, .. }) => {
            assert_eq!(name, "DCam");
            assert!(reason.contains("Camera"), "{reason}");
        }
        other => panic!("expected InvalidDevice, got {other:?}"),
    }
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_load_device_copies_description() {
    let adapter = demo_adapter();
    let device = adapter.load_device("DStage", "Z").unwrap();
    assert_eq!(device.label(), "Z");
    assert_eq!(device.name(), "DStage");
    assert_eq!(device.description(), "Demo stage");
    assert_eq!(device.device_type(), DeviceType::Stage);
    assert_eq!(device.module_name(), DEMO_MODULE);
    assert!(!device.is_initialized());

    drop(device);
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_acquire_initializes_and_releases() {
    let adapter = demo_adapter();
    {
        let shutter = adapter.acquire("DShutter", "Shutter").unwrap();
        assert!(shutter.is_initialized());
        assert_eq!(adapter.live_devices(), 1);
    }
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_with_device_releases_on_error() {
    let adapter = demo_adapter();
    let result: Result<(), MmError> = adapter.with_device("DCam", "Camera", |camera| {
        assert!(camera.is_initialized());
        camera.set_property("NoSuchProperty", "1")
    });
    assert!(matches!(result, Err(MmError::Device { code: 2, .. })));
    assert_eq!(adapter.live_devices(), 0);

    let binning = adapter
        .with_device("DCam", "Camera", |camera| camera.get_property("Binning"))
        .unwrap();
    assert_eq!(binning, "1");
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_acquire_unknown_device_leaks_nothing() {
    let adapter = demo_adapter();
    assert!(adapter.acquire("Ghost", "Ghost").is_err());
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_module_lock_is_reentrant_and_bounded() {
    let adapter = demo_adapter();
    let guard = adapter.lock();

    // The holder can keep calling into the module.
    assert_eq!(adapter.device_count().unwrap(), DEMO_DEVICES.len());
    assert!(adapter.try_lock_for(Duration::from_millis(1)).is_some());

    // Other threads time out while the lock is held.
    std::thread::scope(|s| {
        let blocked = s
            .spawn(|| adapter.try_lock_for(Duration::from_millis(20)).is_none())
            .join()
            .unwrap();
        assert!(blocked);
    });

    drop(guard);
    std::thread::scope(|s| {
        let acquired = s
            .spawn(|| adapter.try_lock_for(Duration::from_millis(20)).is_some())
            .join()
            .unwrap();
        assert!(acquired);
    });
}
