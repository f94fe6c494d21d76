//! Device registry tests
//!
//! Loads demo devices by label and checks lookup, type filtering, hub
//! resolution and unloading.

mod common;

use common::{demo_adapter, demo_manager, DEMO_MODULE};
use mmdevice::{
    DetectionStatus, DeviceManager, DeviceType, DeviceView, FocusDirection, MmError, StateDevice,
};
use std::sync::Arc;
use std::time::Duration;

/// Manager with a hub, a camera, a stage and a shutter loaded and initialized.
fn loaded_manager() -> (DeviceManager, Arc<mmdevice::DeviceAdapter>) {
    let adapter = demo_adapter();
    let manager = DeviceManager::new();
    for (name, label) in [
        ("DHub", "Hub"),
        ("DCam", "Camera"),
        ("DStage", "Z"),
        ("DShutter", "Shutter"),
    ] {
        manager
            .load_device(&adapter, name, label)
            .unwrap()
            .initialize()
            .unwrap();
    }
    (manager, adapter)
}

#[test]
fn test_labels_are_unique() {
    let adapter = demo_adapter();
    let manager = DeviceManager::new();
    manager.load_device(&adapter, "DCam", "Camera").unwrap();

    match manager.load_device(&adapter, "DStage", "Camera") {
        Err(MmError::DuplicateLabel(label)) => assert_eq!(label, "Camera"),
        other => panic!("expected DuplicateLabel, got {other:?}"),
    }
    // The rejected load never created a device.
    assert_eq!(adapter.live_devices(), 1);
    assert_eq!(manager.device_count(), 1);

    manager.unload_device("Camera").unwrap();
    manager.load_device(&adapter, "DStage", "Camera").unwrap();
    assert_eq!(manager.get_device("Camera").unwrap().device_type(), DeviceType::Stage);
}

#[test]
fn test_empty_label_is_rejected() {
    let adapter = demo_adapter();
    let manager = DeviceManager::new();
    assert!(matches!(
        manager.load_device(&adapter, "DCam", "  "),
        Err(MmError::InvalidArgument(_))
    ));
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_unknown_label() {
    let manager = DeviceManager::new();
    assert!(matches!(
        manager.get_device("Nothing"),
        Err(MmError::NoSuchDevice(label)) if label == "Nothing"
    ));
    assert!(matches!(
        manager.unload_device("Nothing"),
        Err(MmError::NoSuchDevice(_))
    ));
}

#[test]
fn test_device_list_filters_by_type() {
    let (manager, _adapter) = loaded_manager();

    assert_eq!(
        manager.get_device_list(None),
        ["Hub", "Camera", "Z", "Shutter"]
    );
    assert_eq!(manager.get_device_list(Some(DeviceType::Any)).len(), 4);
    assert_eq!(manager.get_device_list(Some(DeviceType::Camera)), ["Camera"]);
    assert!(manager.get_device_list(Some(DeviceType::XYStage)).is_empty());
}

#[test]
fn test_get_device_of_type() {
    let (manager, _adapter) = loaded_manager();

    assert!(matches!(
        manager.get_device_of_type("Camera", DeviceType::Camera),
        Ok(DeviceView::Camera(_))
    ));
    let view = manager.get_device_of_type("Z", DeviceType::Any).unwrap();
    assert_eq!(view.device_type(), DeviceType::Stage);
    assert_eq!(view.device().label(), "Z");

    match manager.get_device_of_type("Z", DeviceType::Camera) {
        Err(MmError::CapabilityMismatch {
            label,
            expected,
            actual,
        }) => {
            assert_eq!(label, "Z");
            assert_eq!(expected, DeviceType::Camera);
            assert_eq!(actual, DeviceType::Stage);
        }
        other => panic!("expected CapabilityMismatch, got {other:?}"),
    }
    assert!(manager.get_camera("Z").is_err());
    assert!(manager.get_stage("Z").is_ok());
    assert!(manager.get_device_as::<StateDevice>("Shutter").is_err());
}

#[test]
fn test_hub_is_its_own_parent() {
    let (manager, _adapter) = loaded_manager();
    let hub = manager.get_device("Hub").unwrap();
    let parent = manager.get_parent_device(&hub).unwrap();
    assert!(Arc::ptr_eq(&parent, &hub));
}

#[test]
fn test_parent_inferred_from_module() {
    let (manager, _adapter) = loaded_manager();
    let hub = manager.get_device("Hub").unwrap();
    let camera = manager.get_device("Camera").unwrap();

    let parent = manager.get_parent_device(&camera).unwrap();
    assert!(Arc::ptr_eq(&parent, &hub));

    let peripherals: Vec<String> = manager
        .get_loaded_peripherals("Hub")
        .unwrap()
        .iter()
        .map(|d| d.label().to_owned())
        .collect();
    assert_eq!(peripherals, ["Camera", "Z", "Shutter"]);
}

#[test]
fn test_no_parent_across_modules() {
    let (manager, _adapter) = loaded_manager();
    let other = demo_adapter();
    let wheel = manager.load_device(&other, "DWheel", "Wheel").unwrap();
    assert!(manager.get_parent_device(&wheel).is_none());

    let peripherals = manager.get_loaded_peripherals("Hub").unwrap();
    assert!(peripherals.iter().all(|d| d.label() != "Wheel"));
}

#[test]
fn test_explicit_parent_label_wins() {
    let adapter = demo_adapter();
    let manager = DeviceManager::new();
    manager.load_device(&adapter, "DHub", "HubA").unwrap();
    manager.load_device(&adapter, "DHub", "HubB").unwrap();
    let stage = manager.load_device(&adapter, "DStage", "Z").unwrap();

    // Two hubs from one module: nothing to infer.
    assert!(manager.get_parent_device(&stage).is_none());

    stage.set_parent_label("HubB").unwrap();
    assert_eq!(stage.parent_label().as_deref(), Some("HubB"));
    assert_eq!(stage.parent_id(), "HubB");
    let parent = manager.get_parent_device(&stage).unwrap();
    assert_eq!(parent.label(), "HubB");
    assert!(manager.get_loaded_peripherals("HubA").unwrap().is_empty());
    assert_eq!(manager.get_loaded_peripherals("HubB").unwrap().len(), 1);

    stage.set_parent_label("").unwrap();
    assert_eq!(stage.parent_label(), None);
}

#[test]
fn test_peripherals_of_a_non_hub() {
    let (manager, _adapter) = loaded_manager();
    assert!(matches!(
        manager.get_loaded_peripherals("Camera"),
        Err(MmError::CapabilityMismatch {
            expected: DeviceType::Hub,
            actual: DeviceType::Camera,
            ..
        })
    ));
    assert!(matches!(
        manager.get_loaded_peripherals("Nothing"),
        Err(MmError::NoSuchDevice(_))
    ));
}

#[test]
fn test_hub_reports_installed_peripherals() {
    let (manager, _adapter) = loaded_manager();
    let hub = manager.get_device("Hub").unwrap().as_hub().unwrap();

    assert!(hub.supports_detection());
    assert_eq!(hub.detect(), DetectionStatus::CanCommunicate);
    assert_eq!(
        hub.installed_peripheral_names().unwrap(),
        ["DCam", "DStage", "DXYStage", "DShutter", "DWheel", "DOptovar"]
    );

    let camera = manager.get_device("Camera").unwrap();
    assert!(!camera.supports_detection());
    assert_eq!(camera.detect(), DetectionStatus::Unimplemented);
}

#[test]
fn test_unload_all_devices() {
    let (manager, adapter) = loaded_manager();
    let camera = manager.get_device("Camera").unwrap();
    assert_eq!(adapter.live_devices(), 4);

    manager.unload_all_devices().unwrap();
    assert_eq!(manager.device_count(), 0);
    assert!(!camera.is_initialized());

    // The native object lives until the last reference goes.
    assert_eq!(adapter.live_devices(), 1);
    drop(camera);
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_lookup_while_another_thread_waits_on_the_module() {
    let adapter = demo_adapter();
    let manager = DeviceManager::new();
    manager.load_device(&adapter, "DCam", "Camera").unwrap();

    std::thread::scope(|s| {
        let guard = adapter.lock();
        let loader = s.spawn(|| {
            manager
                .load_device(&adapter, "DStage", "Z")
                .map(|device| device.label().to_owned())
        });
        // Let the loader block on the module lock.
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(manager.get_device("Camera").unwrap().label(), "Camera");
        assert_eq!(manager.get_device_list(None), ["Camera"]);
        drop(guard);
        assert_eq!(loader.join().unwrap().unwrap(), "Z");
    });
    assert_eq!(manager.get_device_list(None), ["Camera", "Z"]);
}

#[test]
fn test_dropping_the_manager_releases_devices() {
    let (manager, adapter) = loaded_manager();
    drop(manager);
    assert_eq!(adapter.live_devices(), 0);
}

#[test]
fn test_devices_from_the_plugin_manager() {
    let plugins = demo_manager();
    let adapter = plugins.get_device_adapter(DEMO_MODULE).unwrap();
    let manager = DeviceManager::new();

    let hub = manager.load_device(&adapter, "DHub", "Hub").unwrap();
    // The cache hands out the same adapter, so the hub is inferred.
    let again = plugins.get_device_adapter(DEMO_MODULE).unwrap();
    let wheel = manager.load_device(&again, "DWheel", "Wheel").unwrap();
    let parent = manager.get_parent_device(&wheel).unwrap();
    assert!(Arc::ptr_eq(&parent, &hub));
    assert_eq!(wheel.module_name(), DEMO_MODULE);
}

#[test]
fn test_stage_view() {
    let (manager, _adapter) = loaded_manager();
    let stage = manager.get_stage("Z").unwrap();

    stage.set_position_um(100.0).unwrap();
    assert_eq!(stage.position_um().unwrap(), 100.0);
    assert_eq!(stage.position_steps().unwrap(), 1000);

    stage.set_relative_position_um(-50.0).unwrap();
    assert_eq!(stage.position_um().unwrap(), 50.0);

    assert!(matches!(
        stage.set_position_um(20_000.0),
        Err(MmError::Device { code: 12, .. })
    ));
    assert_eq!(stage.position_um().unwrap(), 50.0);
    assert_eq!(stage.focus_direction(), FocusDirection::TowardSample);
    assert!(matches!(
        stage.move_velocity(1.0),
        Err(MmError::Device { code: 9, .. })
    ));
}

#[test]
fn test_xy_stage_view() {
    let adapter = demo_adapter();
    let manager = DeviceManager::new();
    let device = manager.load_device(&adapter, "DXYStage", "XY").unwrap();
    let xy = device.as_xy_stage().unwrap();

    xy.set_position_um(10.0, -20.0).unwrap();
    assert_eq!(xy.position_um().unwrap(), (10.0, -20.0));
    assert!(xy.set_position_um(60_000.0, 0.0).is_err());
}

#[test]
fn test_shutter_view() {
    let (manager, _adapter) = loaded_manager();
    let device = manager.get_device("Shutter").unwrap();
    let shutter = device.as_shutter().unwrap();

    assert!(!shutter.is_open().unwrap());
    shutter.set_open(true).unwrap();
    assert!(shutter.is_open().unwrap());
    assert_eq!(device.get_property("State").unwrap(), "1");
    assert!(device.uses_delay());
}

#[test]
fn test_state_device_view() {
    let adapter = demo_adapter();
    let manager = DeviceManager::new();
    let device = manager.load_device(&adapter, "DWheel", "Wheel").unwrap();
    let wheel = device.as_state_device().unwrap();

    assert_eq!(wheel.number_of_positions(), 10);
    wheel.set_position(3).unwrap();
    assert_eq!(wheel.position().unwrap(), 3);
    assert_eq!(wheel.position_label(3).unwrap(), "State-3");

    wheel.set_position_label(5, "GFP").unwrap();
    wheel.set_position_by_label("GFP").unwrap();
    assert_eq!(wheel.position().unwrap(), 5);
    assert!(matches!(
        wheel.label_position("Nope"),
        Err(MmError::Device { code: 10, .. })
    ));
    assert!(matches!(
        wheel.set_position(10),
        Err(MmError::Device { code: 12, .. })
    ));
}

#[test]
fn test_magnifier_view() {
    let adapter = demo_adapter();
    let manager = DeviceManager::new();
    let device = manager.load_device(&adapter, "DOptovar", "Optovar").unwrap();

    let DeviceView::Magnifier(optovar) = device.view() else {
        panic!("DOptovar should be a magnifier");
    };
    assert_eq!(optovar.magnification(), 1.0);
    device.set_property("Magnification", "1.6000").unwrap();
    assert_eq!(optovar.magnification(), 1.6);
}
