//! Camera capability tests against the demo camera

mod common;

use common::demo_adapter;
use mmdevice::{Camera, DeviceType, MmError, PixelType, PropertyType, Roi, ScopedDevice};

fn camera(device: &ScopedDevice) -> Camera {
    device.as_camera().expect("DCam is a camera")
}

#[test]
fn test_binning_changes_frame_size() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    assert_eq!(camera.binning(), 1);
    assert_eq!((camera.image_width(), camera.image_height()), (512, 512));

    camera.set_binning(2).unwrap();
    assert_eq!(camera.binning(), 2);
    assert_eq!((camera.image_width(), camera.image_height()), (256, 256));
    assert_eq!(camera.image_buffer_size(), 256 * 256);

    camera.set_binning(1).unwrap();
    assert_eq!((camera.image_width(), camera.image_height()), (512, 512));
}

#[test]
fn test_invalid_binning_reports_device_error() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    match camera.set_binning(3) {
        Err(MmError::Device { label, code, message }) => {
            assert_eq!(label, "Camera");
            assert_eq!(code, 21);
            assert_eq!(message, "Invalid input parameter");
        }
        other => panic!("expected Device error, got {other:?}"),
    }
    assert_eq!(camera.binning(), 1);
}

#[test]
fn test_roi_round_trip() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    let roi = Roi::new(64, 64, 128, 128);
    camera.set_roi(roi).unwrap();
    assert_eq!(camera.roi().unwrap(), roi);
    assert_eq!((camera.image_width(), camera.image_height()), (128, 128));

    camera.clear_roi().unwrap();
    assert_eq!(camera.roi().unwrap(), Roi::new(0, 0, 512, 512));
}

#[test]
fn test_roi_outside_the_binned_frame_is_rejected() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    camera.set_binning(4).unwrap();
    assert!(matches!(
        camera.set_roi(Roi::new(64, 64, 128, 128)),
        Err(MmError::Device { code: 21, .. })
    ));
}

#[test]
fn test_snap_then_read_image() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    assert!(camera.image().unwrap().is_none());

    camera.snap_image().unwrap();
    let image = camera.image().unwrap().expect("image after snap");
    assert_eq!((image.width, image.height), (512, 512));
    assert_eq!(image.bytes_per_pixel, 1);
    assert_eq!(image.bit_depth, 8);
    assert_eq!(image.pixel_type(), Some(PixelType::U8));
    assert_eq!(image.data.len(), 512 * 512);
    assert_eq!(camera.pixel_type(), Some(PixelType::U8));
}

#[test]
fn test_geometry_change_discards_image() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    camera.snap_image().unwrap();
    assert!(camera.image().unwrap().is_some());

    camera.set_binning(2).unwrap();
    assert!(camera.image().unwrap().is_none());

    camera.snap_image().unwrap();
    let image = camera.image().unwrap().unwrap();
    assert_eq!((image.width, image.height), (256, 256));
}

#[test]
fn test_snap_is_refused_during_sequence() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    camera.start_sequence_acquisition(10, 0.0, true).unwrap();
    assert!(camera.is_capturing());
    assert!(matches!(
        camera.snap_image(),
        Err(MmError::Device { code: 30, .. })
    ));

    camera.stop_sequence_acquisition().unwrap();
    assert!(!camera.is_capturing());
    camera.snap_image().unwrap();
}

#[test]
fn test_channels() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    assert_eq!(camera.number_of_channels(), 1);
    assert_eq!(camera.number_of_components(), 1);
    assert_eq!(camera.channel_name(0).unwrap(), "Channel 0");
    assert!(camera.channel_name(1).is_err());

    camera.snap_image().unwrap();
    assert!(camera.channel_image(1).unwrap().is_none());
}

#[test]
fn test_exposure_and_pixel_size() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();
    let camera = camera(&device);

    camera.set_exposure(25.5);
    assert_eq!(camera.exposure(), 25.5);
    let exposure: f64 = camera.get_property("Exposure").unwrap().parse().unwrap();
    assert_eq!(exposure, 25.5);

    assert_eq!(camera.pixel_size_um(), 1.0);
    camera.set_binning(4).unwrap();
    assert_eq!(camera.pixel_size_um(), 4.0);
}

#[test]
fn test_camera_properties() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();

    let names = device.property_names().unwrap();
    assert_eq!(names, ["Binning", "Exposure", "PixelType"]);
    assert!(device.has_property("Binning").unwrap());
    assert!(!device.has_property("Gain").unwrap());

    assert_eq!(device.property_type("Exposure").unwrap(), PropertyType::Float);
    assert_eq!(device.property_limits("Exposure").unwrap(), Some((0.0, 10_000.0)));
    assert_eq!(device.property_limits("Binning").unwrap(), None);
    assert_eq!(
        device.allowed_property_values("Binning").unwrap(),
        ["1", "2", "4", "8"]
    );

    // Property writes go through the same state as the camera calls.
    device.set_property("Binning", "2").unwrap();
    assert_eq!(camera(&device).image_width(), 256);
    assert!(matches!(
        device.set_property("Binning", "3"),
        Err(MmError::Device { code: 3, .. })
    ));
}

#[test]
fn test_read_only_property_rejects_writes() {
    let adapter = demo_adapter();
    let device = adapter.acquire("DCam", "Camera").unwrap();

    assert!(device.is_property_read_only("PixelType").unwrap());
    assert_eq!(device.get_property("PixelType").unwrap(), "8bit");
    match device.set_property("PixelType", "16bit") {
        Err(MmError::Device { code, message, .. }) => {
            assert_eq!(code, 3);
            assert_eq!(message, "Property value rejected");
        }
        other => panic!("expected Device error, got {other:?}"),
    }
    assert_eq!(device.get_property("PixelType").unwrap(), "8bit");
}

#[test]
fn test_camera_view_is_refused_for_other_types() {
    let adapter = demo_adapter();
    let stage = adapter.acquire("DStage", "Z").unwrap();

    match stage.as_camera() {
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
}
