//! Plugin manager integration tests
//!
//! Module lookup, caching and unloading with the demo module registered
//! in-process, loader failures on files that are not device modules, and the
//! built demo library loaded from a search path.

mod common;

use common::{demo_manager, DEMO_DEVICES, DEMO_MODULE};
use mmdevice::plugin_manager::{LIBRARY_PREFIX, LIBRARY_SUFFIX};
use mmdevice::{global, MmError, PluginManager};
use serial_test::serial;
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing_test::traced_test;

#[test]
fn test_adapter_is_cached_per_name() {
    let manager = demo_manager();
    let first = manager.get_device_adapter(DEMO_MODULE).unwrap();
    let second = manager.get_device_adapter(DEMO_MODULE).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name(), DEMO_MODULE);
    assert_eq!(first.path(), None);
    assert_eq!(manager.loaded_modules(), [DEMO_MODULE]);
}

#[test]
fn test_unload_then_reload_gives_a_fresh_adapter() {
    let manager = demo_manager();
    let first = manager.get_device_adapter(DEMO_MODULE).unwrap();

    manager.unload_plugin_library(DEMO_MODULE).unwrap();
    assert!(manager.loaded_modules().is_empty());

    let second = manager.get_device_adapter(DEMO_MODULE).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
#[traced_test]
fn test_unload_with_live_devices_is_deferred() {
    let manager = demo_manager();
    let adapter = manager.get_device_adapter(DEMO_MODULE).unwrap();
    let camera = adapter.load_device("DCam", "Camera").unwrap();

    manager.unload_plugin_library(DEMO_MODULE).unwrap();
    assert!(logs_contain("library unload deferred"));

    // Devices created before the unload keep working.
    assert_eq!(camera.get_property("Binning").unwrap(), "1");
    drop(adapter);
    assert_eq!(camera.adapter().live_devices(), 1);
}

#[test]
fn test_reload_with_live_devices_keeps_one_module_lock() {
    let manager = demo_manager();
    let old = manager.get_device_adapter(DEMO_MODULE).unwrap();
    let camera = old.load_device("DCam", "Camera").unwrap();

    manager.unload_plugin_library(DEMO_MODULE).unwrap();
    let reloaded = manager.get_device_adapter(DEMO_MODULE).unwrap();
    assert!(Arc::ptr_eq(&old, &reloaded));
    assert_eq!(manager.loaded_modules(), [DEMO_MODULE]);

    // A thread holding the lock through the old device blocks the reloaded
    // adapter.
    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    std::thread::scope(|s| {
        let holder = camera.adapter();
        s.spawn(move || {
            let _guard = holder.lock();
            locked_tx.send(()).unwrap();
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
        });
        locked_rx.recv().unwrap();
        assert!(reloaded.try_lock_for(Duration::from_millis(50)).is_none());
        release_tx.send(()).unwrap();
    });
    assert!(reloaded.try_lock_for(Duration::from_millis(50)).is_some());
}

#[test]
fn test_reload_after_devices_are_released_is_fresh() {
    let manager = demo_manager();
    let old = manager.get_device_adapter(DEMO_MODULE).unwrap();
    let camera = old.load_device("DCam", "Camera").unwrap();

    manager.unload_plugin_library(DEMO_MODULE).unwrap();
    drop(camera);
    let weak = Arc::downgrade(&old);
    drop(old);

    let reloaded = manager.get_device_adapter(DEMO_MODULE).unwrap();
    assert!(weak.upgrade().is_none());
    assert_eq!(reloaded.live_devices(), 0);
}

#[test]
#[traced_test]
fn test_unload_without_references() {
    let manager = demo_manager();
    manager.get_device_adapter(DEMO_MODULE).unwrap();

    manager.unload_plugin_library(DEMO_MODULE).unwrap();
    assert!(logs_contain("device module unloaded"));
    assert!(!logs_contain("library unload deferred"));
}

#[test]
fn test_module_file_name_follows_platform_convention() {
    let manager = PluginManager::new();
    assert_eq!(
        manager.module_file_name("DemoCamera"),
        format!("{LIBRARY_PREFIX}DemoCamera{LIBRARY_SUFFIX}")
    );

    let custom = PluginManager::with_naming("mod_", ".bin");
    assert_eq!(custom.module_file_name("Stage"), "mod_Stage.bin");
}

#[test]
#[serial]
fn test_available_adapters_scans_search_paths() {
    let dir = tempfile::tempdir().unwrap();
    let manager = PluginManager::with_naming("mod_", ".bin");
    manager.register_static(DEMO_MODULE, mmdevice_demo::module_functions());

    for file in ["mod_Zeta.bin", "mod_Alpha.bin", "notes.txt", "mod_.bin"] {
        std::fs::write(dir.path().join(file), b"").unwrap();
    }
    std::fs::create_dir(dir.path().join("mod_Dir.bin")).unwrap();

    manager.set_search_paths([dir.path()]);
    assert_eq!(
        manager.available_device_adapters(),
        ["Alpha", DEMO_MODULE, "Zeta"]
    );

    // Rescanned on every call.
    std::fs::write(dir.path().join("mod_Beta.bin"), b"").unwrap();
    assert!(manager.available_device_adapters().contains(&"Beta".to_owned()));
}

#[test]
#[serial]
fn test_file_that_is_not_a_library_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let manager = PluginManager::new();
    let file_name = manager.module_file_name("Fake");
    std::fs::write(dir.path().join(&file_name), b"definitely not a shared library").unwrap();
    manager.add_search_path(dir.path());

    assert!(manager.available_device_adapters().contains(&"Fake".to_owned()));

    match manager.get_device_adapter("Fake") {
        Err(MmError::ModuleLoad {
            module,
            path,
            source,
        }) => {
            assert_eq!(module, "Fake");
            assert!(path.ends_with(&file_name), "{}", path.display());
            assert!(matches!(*source, MmError::Load { .. }));
        }
        other => panic!("expected ModuleLoad, got {other:?}"),
    }
    // Failures are not cached.
    assert!(manager.loaded_modules().is_empty());
}

#[test]
#[serial]
fn test_global_instance() {
    global::instance().register_static("GlobalDemo", mmdevice_demo::module_functions());
    assert!(global::get_available_device_adapters().contains(&"GlobalDemo".to_owned()));

    let adapter = global::get_device_adapter("GlobalDemo").unwrap();
    assert!(Arc::ptr_eq(&adapter, &global::get_device_adapter("GlobalDemo").unwrap()));
    assert_eq!(adapter.device_count().unwrap(), 7);

    global::unload_plugin_library("GlobalDemo").unwrap();
    assert!(matches!(
        global::unload_plugin_library("GlobalDemo"),
        Err(MmError::ModuleNotLoaded(_))
    ));
}

/// Demo module library cargo built next to this test binary.
#[cfg(target_os = "linux")]
fn built_demo_library() -> Option<std::path::PathBuf> {
    let deps = std::env::current_exe().ok()?.parent()?.to_path_buf();
    let exact = deps.join("libmmdevice_demo.so");
    if exact.is_file() {
        return Some(exact);
    }
    std::fs::read_dir(&deps)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("libmmdevice_demo") && name.ends_with(".so"))
        })
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_load_module_from_search_path() {
    let library = built_demo_library().expect("demo cdylib next to the test binary");
    let dir = tempfile::tempdir().unwrap();
    let manager = PluginManager::new();
    let file_name = manager.module_file_name(DEMO_MODULE);
    std::fs::copy(&library, dir.path().join(&file_name)).unwrap();
    manager.add_search_path(dir.path());

    assert_eq!(manager.available_device_adapters(), [DEMO_MODULE]);
    assert!(manager.find(&file_name).is_absolute());

    let adapter = manager.get_device_adapter(DEMO_MODULE).unwrap();
    assert!(Arc::ptr_eq(&adapter, &manager.get_device_adapter(DEMO_MODULE).unwrap()));
    assert!(adapter.path().unwrap().ends_with(&file_name));
    assert_eq!(adapter.descriptor().module_version, 10);
    assert_eq!(adapter.available_device_names().unwrap(), DEMO_DEVICES);

    let camera = adapter.acquire("DCam", "Camera").unwrap();
    let view = camera.as_camera().unwrap();
    view.set_binning(2).unwrap();
    view.snap_image().unwrap();
    let image = view.image().unwrap().unwrap();
    assert_eq!((image.width, image.height), (256, 256));
    drop(camera);
    assert_eq!(adapter.live_devices(), 0);
}
