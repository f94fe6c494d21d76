//! Demo camera: 512x512 8-bit sensor with binning, ROI and sequence state.

use crate::device::{demo, write_str, DemoDevice, Kind};
use crate::pattern::generate_test_pattern;
use crate::property::{format_float, Property};
use mmdevice_sys::*;
use std::ffi::{c_char, c_double, c_int, c_long, c_uint};
use std::ptr;

pub(crate) const SENSOR_WIDTH: u32 = 512;
pub(crate) const SENSOR_HEIGHT: u32 = 512;
const BINNING_VALUES: [u32; 4] = [1, 2, 4, 8];
const PIXEL_SIZE_UM: f64 = 1.0;
const DEFAULT_EXPOSURE_MS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Roi {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

#[derive(Debug)]
pub(crate) struct Camera {
    binning: u32,
    exposure_ms: f64,
    /// In binned pixels; `None` means the full frame.
    roi: Option<Roi>,
    image: Option<Vec<u8>>,
    frame: u64,
    capturing: bool,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            binning: 1,
            exposure_ms: DEFAULT_EXPOSURE_MS,
            roi: None,
            image: None,
            frame: 0,
            capturing: false,
        }
    }

    pub fn properties() -> Vec<Property> {
        vec![
            Property::integer("Binning", 1)
                .with_allowed(BINNING_VALUES.iter().map(u32::to_string)),
            Property::float("Exposure", DEFAULT_EXPOSURE_MS).with_limits(0.0, 10_000.0),
            Property::string("PixelType", "8bit").read_only(),
        ]
    }

    pub fn property_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Binning", self.binning.to_string()),
            ("Exposure", format_float(self.exposure_ms)),
        ]
    }

    pub fn on_property(&mut self, name: &str, value: &str) -> c_int {
        match name {
            "Binning" => match value.trim().parse() {
                Ok(binning) => self.set_binning(binning),
                Err(_) => DEVICE_INVALID_PROPERTY_VALUE,
            },
            "Exposure" => match value.trim().parse() {
                Ok(exposure) => {
                    self.exposure_ms = exposure;
                    DEVICE_OK
                }
                Err(_) => DEVICE_INVALID_PROPERTY_VALUE,
            },
            _ => DEVICE_OK,
        }
    }

    fn full_width(&self) -> u32 {
        SENSOR_WIDTH / self.binning
    }

    fn full_height(&self) -> u32 {
        SENSOR_HEIGHT / self.binning
    }

    fn roi(&self) -> Roi {
        self.roi.unwrap_or(Roi {
            x: 0,
            y: 0,
            width: self.full_width(),
            height: self.full_height(),
        })
    }

    fn width(&self) -> u32 {
        self.roi().width
    }

    fn height(&self) -> u32 {
        self.roi().height
    }

    fn set_binning(&mut self, binning: u32) -> c_int {
        if self.capturing {
            return DEVICE_CAMERA_BUSY_ACQUIRING;
        }
        if !BINNING_VALUES.contains(&binning) {
            return DEVICE_INVALID_INPUT_PARAM;
        }
        self.binning = binning;
        self.roi = None;
        self.image = None;
        DEVICE_OK
    }

    fn set_roi(&mut self, x: u32, y: u32, width: u32, height: u32) -> c_int {
        if self.capturing {
            return DEVICE_CAMERA_BUSY_ACQUIRING;
        }
        let fits_x = x.checked_add(width).is_some_and(|end| end <= self.full_width());
        let fits_y = y.checked_add(height).is_some_and(|end| end <= self.full_height());
        if width == 0 || height == 0 || !fits_x || !fits_y {
            return DEVICE_INVALID_INPUT_PARAM;
        }
        let roi = Roi {
            x,
            y,
            width,
            height,
        };
        self.roi = (roi.width != self.full_width() || roi.height != self.full_height())
            .then_some(roi);
        self.image = None;
        DEVICE_OK
    }

    fn clear_roi(&mut self) -> c_int {
        if self.capturing {
            return DEVICE_CAMERA_BUSY_ACQUIRING;
        }
        self.roi = None;
        self.image = None;
        DEVICE_OK
    }

    fn snap(&mut self) -> c_int {
        if self.capturing {
            return DEVICE_CAMERA_BUSY_ACQUIRING;
        }
        self.frame += 1;
        let roi = self.roi();
        self.image = Some(generate_test_pattern(
            roi.width,
            roi.height,
            (roi.x, roi.y),
            self.frame,
        ));
        DEVICE_OK
    }

    pub fn stop_sequence(&mut self) {
        self.capturing = false;
    }
}

unsafe fn with_camera<T>(dev: *mut RawDevice, fallback: T, f: impl FnOnce(&mut Camera) -> T) -> T {
    match demo(dev) {
        Some(DemoDevice {
            kind: Kind::Camera(camera),
            ..
        }) => f(camera),
        _ => fallback,
    }
}

/// Run a state-changing camera call and refresh the mirrored properties.
unsafe fn update_camera(dev: *mut RawDevice, f: impl FnOnce(&mut Camera) -> c_int) -> c_int {
    let Some(device) = demo(dev) else {
        return DEVICE_ERR;
    };
    let Kind::Camera(camera) = &mut device.kind else {
        return DEVICE_ERR;
    };
    let code = f(camera);
    device.sync_properties();
    code
}

pub(crate) static CAMERA_VTABLE: CameraVtable = CameraVtable {
    snap_image,
    get_image_buffer,
    get_image_buffer_size,
    get_image_width,
    get_image_height,
    get_image_bytes_per_pixel,
    get_bit_depth,
    get_number_of_components,
    get_number_of_channels,
    get_channel_name,
    get_pixel_size_um,
    get_binning,
    set_binning,
    get_exposure,
    set_exposure,
    set_roi,
    get_roi,
    clear_roi,
    start_sequence_acquisition,
    stop_sequence_acquisition,
    is_capturing,
};

unsafe extern "C" fn snap_image(dev: *mut RawDevice) -> c_int {
    with_camera(dev, DEVICE_ERR, Camera::snap)
}

unsafe extern "C" fn get_image_buffer(dev: *mut RawDevice, channel: c_uint) -> *const u8 {
    if channel != 0 {
        return ptr::null();
    }
    with_camera(dev, ptr::null(), |c| {
        c.image.as_ref().map_or(ptr::null(), |image| image.as_ptr())
    })
}

unsafe extern "C" fn get_image_buffer_size(dev: *mut RawDevice) -> c_long {
    with_camera(dev, 0, |c| c_long::from(c.width()) * c_long::from(c.height()))
}

unsafe extern "C" fn get_image_width(dev: *mut RawDevice) -> c_uint {
    with_camera(dev, 0, |c| c.width())
}

unsafe extern "C" fn get_image_height(dev: *mut RawDevice) -> c_uint {
    with_camera(dev, 0, |c| c.height())
}

unsafe extern "C" fn get_image_bytes_per_pixel(_dev: *mut RawDevice) -> c_uint {
    1
}

unsafe extern "C" fn get_bit_depth(_dev: *mut RawDevice) -> c_uint {
    8
}

unsafe extern "C" fn get_number_of_components(_dev: *mut RawDevice) -> c_uint {
    1
}

unsafe extern "C" fn get_number_of_channels(_dev: *mut RawDevice) -> c_uint {
    1
}

unsafe extern "C" fn get_channel_name(
    _dev: *mut RawDevice,
    channel: c_uint,
    name: *mut c_char,
    buf_len: c_uint,
) -> c_int {
    if channel != 0 {
        return DEVICE_NONEXISTENT_CHANNEL;
    }
    if write_str(name, buf_len, "Channel 0") {
        DEVICE_OK
    } else {
        DEVICE_BUFFER_OVERFLOW
    }
}

unsafe extern "C" fn get_pixel_size_um(dev: *mut RawDevice) -> c_double {
    with_camera(dev, 0.0, |c| PIXEL_SIZE_UM * f64::from(c.binning))
}

unsafe extern "C" fn get_binning(dev: *mut RawDevice) -> c_int {
    with_camera(dev, 1, |c| c.binning as c_int)
}

unsafe extern "C" fn set_binning(dev: *mut RawDevice, binning: c_int) -> c_int {
    update_camera(dev, |c| match u32::try_from(binning) {
        Ok(binning) => c.set_binning(binning),
        Err(_) => DEVICE_INVALID_INPUT_PARAM,
    })
}

unsafe extern "C" fn get_exposure(dev: *mut RawDevice) -> c_double {
    with_camera(dev, 0.0, |c| c.exposure_ms)
}

unsafe extern "C" fn set_exposure(dev: *mut RawDevice, exposure_ms: c_double) {
    update_camera(dev, |c| {
        c.exposure_ms = exposure_ms.max(0.0);
        DEVICE_OK
    });
}

unsafe extern "C" fn set_roi(
    dev: *mut RawDevice,
    x: c_uint,
    y: c_uint,
    x_size: c_uint,
    y_size: c_uint,
) -> c_int {
    update_camera(dev, |c| c.set_roi(x, y, x_size, y_size))
}

unsafe extern "C" fn get_roi(
    dev: *mut RawDevice,
    x: *mut c_uint,
    y: *mut c_uint,
    x_size: *mut c_uint,
    y_size: *mut c_uint,
) -> c_int {
    let Some(roi) = with_camera(dev, None, |c| Some(c.roi())) else {
        return DEVICE_ERR;
    };
    for (out, value) in [(x, roi.x), (y, roi.y), (x_size, roi.width), (y_size, roi.height)] {
        if let Some(out) = out.as_mut() {
            *out = value;
        }
    }
    DEVICE_OK
}

unsafe extern "C" fn clear_roi(dev: *mut RawDevice) -> c_int {
    update_camera(dev, Camera::clear_roi)
}

unsafe extern "C" fn start_sequence_acquisition(
    dev: *mut RawDevice,
    _num_images: c_long,
    _interval_ms: c_double,
    _stop_on_overflow: bool,
) -> c_int {
    with_camera(dev, DEVICE_ERR, |c| {
        if c.capturing {
            return DEVICE_CAMERA_BUSY_ACQUIRING;
        }
        c.capturing = true;
        DEVICE_OK
    })
}

unsafe extern "C" fn stop_sequence_acquisition(dev: *mut RawDevice) -> c_int {
    with_camera(dev, DEVICE_ERR, |c| {
        c.stop_sequence();
        DEVICE_OK
    })
}

unsafe extern "C" fn is_capturing(dev: *mut RawDevice) -> bool {
    with_camera(dev, false, |c| c.capturing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binning_divides_the_sensor() {
        let mut camera = Camera::new();
        assert_eq!(camera.set_binning(2), DEVICE_OK);
        assert_eq!((camera.width(), camera.height()), (256, 256));
        assert_eq!(camera.set_binning(3), DEVICE_INVALID_INPUT_PARAM);
        assert_eq!(camera.set_binning(1), DEVICE_OK);
        assert_eq!((camera.width(), camera.height()), (512, 512));
    }

    #[test]
    fn roi_must_fit_the_binned_frame() {
        let mut camera = Camera::new();
        camera.set_binning(4);
        assert_eq!(camera.set_roi(64, 64, 128, 128), DEVICE_INVALID_INPUT_PARAM);
        assert_eq!(camera.set_roi(0, 0, 64, 64), DEVICE_OK);
        assert_eq!((camera.width(), camera.height()), (64, 64));
    }

    #[test]
    fn geometry_changes_discard_the_last_image() {
        let mut camera = Camera::new();
        camera.snap();
        assert!(camera.image.is_some());
        camera.set_binning(2);
        assert!(camera.image.is_none());
    }

    #[test]
    fn snap_is_refused_while_capturing() {
        let mut camera = Camera::new();
        camera.capturing = true;
        assert_eq!(camera.snap(), DEVICE_CAMERA_BUSY_ACQUIRING);
    }
}
