//! C ABI for native device modules.
//!
//! A device module is a shared library exporting the nine entry points named in
//! [`symbols`]. Devices created by a module are returned as pointers to a
//! [`RawDevice`] header: a base function table shared by every device type and
//! an untyped pointer to the function table of the device's capability
//! (camera, stage, shutter, ...). Which capability table `capability` points to
//! is determined solely by the device type reported through
//! [`DeviceVtable::get_type`]; hosts must check the type before casting.
//!
//! All device functions take the `RawDevice` pointer as their first argument
//! and, unless documented otherwise, return a status code where [`DEVICE_OK`]
//! means success.
//!
//! Modules are not assumed to be reentrant. Hosts serialize every call into a
//! module, including calls made through any device it created.

#![allow(unsafe_code)]
#![allow(missing_docs)]

use std::ffi::{c_char, c_double, c_int, c_long, c_uint, c_ulong, c_void};

// =============================================================================
// Interface Versions
// =============================================================================

/// Module interface version implemented by this ABI.
pub const MODULE_INTERFACE_VERSION: c_long = 10;

/// Device interface version implemented by this ABI.
pub const DEVICE_INTERFACE_VERSION: c_long = 71;

/// Size of every string buffer passed across the ABI, including the NUL.
pub const MAX_STR_LENGTH: usize = 1024;

// =============================================================================
// Device Types
// =============================================================================

pub const UNKNOWN_TYPE: c_int = 0;
pub const ANY_TYPE: c_int = 1;
pub const CAMERA_DEVICE: c_int = 2;
pub const SHUTTER_DEVICE: c_int = 3;
pub const STATE_DEVICE: c_int = 4;
pub const STAGE_DEVICE: c_int = 5;
pub const XY_STAGE_DEVICE: c_int = 6;
pub const SERIAL_DEVICE: c_int = 7;
pub const GENERIC_DEVICE: c_int = 8;
pub const AUTO_FOCUS_DEVICE: c_int = 9;
pub const CORE_DEVICE: c_int = 10;
pub const IMAGE_PROCESSOR_DEVICE: c_int = 11;
pub const SIGNAL_IO_DEVICE: c_int = 12;
pub const MAGNIFIER_DEVICE: c_int = 13;
pub const SLM_DEVICE: c_int = 14;
pub const HUB_DEVICE: c_int = 15;
pub const GALVO_DEVICE: c_int = 16;

// =============================================================================
// Property Types, Detection Status, Focus Direction
// =============================================================================

pub const PROPERTY_UNDEF: c_int = 0;
pub const PROPERTY_STRING: c_int = 1;
pub const PROPERTY_FLOAT: c_int = 2;
pub const PROPERTY_INTEGER: c_int = 3;

pub const DETECTION_UNIMPLEMENTED: c_int = -2;
pub const DETECTION_MISCONFIGURED: c_int = -1;
pub const DETECTION_CAN_NOT_COMMUNICATE: c_int = 0;
pub const DETECTION_CAN_COMMUNICATE: c_int = 1;

pub const FOCUS_DIRECTION_UNKNOWN: c_int = 0;
pub const FOCUS_DIRECTION_TOWARD_SAMPLE: c_int = 1;
pub const FOCUS_DIRECTION_AWAY_FROM_SAMPLE: c_int = 2;

// =============================================================================
// Status Codes
// =============================================================================

pub const DEVICE_OK: c_int = 0;
pub const DEVICE_ERR: c_int = 1;
pub const DEVICE_INVALID_PROPERTY: c_int = 2;
pub const DEVICE_INVALID_PROPERTY_VALUE: c_int = 3;
pub const DEVICE_INVALID_PROPERTY_TYPE: c_int = 5;
pub const DEVICE_NOT_SUPPORTED: c_int = 9;
pub const DEVICE_UNKNOWN_LABEL: c_int = 10;
pub const DEVICE_UNKNOWN_POSITION: c_int = 12;
pub const DEVICE_INVALID_INPUT_PARAM: c_int = 21;
pub const DEVICE_BUFFER_OVERFLOW: c_int = 22;
pub const DEVICE_NONEXISTENT_CHANNEL: c_int = 23;
pub const DEVICE_CAMERA_BUSY_ACQUIRING: c_int = 30;
pub const DEVICE_NOT_YET_IMPLEMENTED: c_int = 32;

// =============================================================================
// Module Entry Points
// =============================================================================

/// Exported symbol names, NUL-terminated for direct use with a dynamic loader.
pub mod symbols {
    pub const INITIALIZE_MODULE_DATA: &[u8] = b"InitializeModuleData\0";
    pub const CREATE_DEVICE: &[u8] = b"CreateDevice\0";
    pub const DELETE_DEVICE: &[u8] = b"DeleteDevice\0";
    pub const GET_MODULE_VERSION: &[u8] = b"GetModuleVersion\0";
    pub const GET_DEVICE_INTERFACE_VERSION: &[u8] = b"GetDeviceInterfaceVersion\0";
    pub const GET_NUMBER_OF_DEVICES: &[u8] = b"GetNumberOfDevices\0";
    pub const GET_DEVICE_NAME: &[u8] = b"GetDeviceName\0";
    pub const GET_DEVICE_TYPE: &[u8] = b"GetDeviceType\0";
    pub const GET_DEVICE_DESCRIPTION: &[u8] = b"GetDeviceDescription\0";

    /// Strip the trailing NUL for display.
    pub fn display(symbol: &'static [u8]) -> &'static str {
        let bytes = symbol.strip_suffix(b"\0").unwrap_or(symbol);
        std::str::from_utf8(bytes).unwrap_or("<non-utf8 symbol>")
    }
}

pub type InitializeModuleDataFn = unsafe extern "C" fn();
pub type CreateDeviceFn = unsafe extern "C" fn(name: *const c_char) -> *mut RawDevice;
pub type DeleteDeviceFn = unsafe extern "C" fn(device: *mut RawDevice);
pub type GetModuleVersionFn = unsafe extern "C" fn() -> c_long;
pub type GetDeviceInterfaceVersionFn = unsafe extern "C" fn() -> c_long;
pub type GetNumberOfDevicesFn = unsafe extern "C" fn() -> c_int;
pub type GetDeviceNameFn =
    unsafe extern "C" fn(index: c_int, name: *mut c_char, buf_len: c_uint) -> bool;
pub type GetDeviceTypeFn =
    unsafe extern "C" fn(name: *const c_char, device_type: *mut c_int) -> bool;
pub type GetDeviceDescriptionFn =
    unsafe extern "C" fn(name: *const c_char, description: *mut c_char, buf_len: c_uint) -> bool;

/// Resolved entry points of one module.
///
/// Produced either by looking the symbols up in a loaded library or, for
/// modules linked into the host, by taking the function items directly.
#[derive(Clone, Copy)]
pub struct ModuleFunctions {
    pub initialize_module_data: InitializeModuleDataFn,
    pub create_device: CreateDeviceFn,
    pub delete_device: DeleteDeviceFn,
    pub get_module_version: GetModuleVersionFn,
    pub get_device_interface_version: GetDeviceInterfaceVersionFn,
    pub get_number_of_devices: GetNumberOfDevicesFn,
    pub get_device_name: GetDeviceNameFn,
    pub get_device_type: GetDeviceTypeFn,
    pub get_device_description: GetDeviceDescriptionFn,
}

impl std::fmt::Debug for ModuleFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleFunctions").finish_non_exhaustive()
    }
}

// =============================================================================
// Device Object
// =============================================================================

/// Header of every device object handed out by `CreateDevice`.
///
/// Modules embed this as the first field of a `#[repr(C)]` device struct.
#[repr(C)]
#[derive(Debug)]
pub struct RawDevice {
    /// Base operations, valid for every device type.
    pub vtable: *const DeviceVtable,
    /// Capability table matching the device type, or null for generic devices.
    pub capability: *const c_void,
}

/// Base operations shared by every device type.
#[repr(C)]
pub struct DeviceVtable {
    pub get_type: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub initialize: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub shutdown: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub busy: unsafe extern "C" fn(dev: *mut RawDevice) -> bool,
    pub get_number_of_properties: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_property_name: unsafe extern "C" fn(
        dev: *mut RawDevice,
        index: c_uint,
        name: *mut c_char,
        buf_len: c_uint,
    ) -> bool,
    pub has_property: unsafe extern "C" fn(dev: *mut RawDevice, name: *const c_char) -> bool,
    pub get_property: unsafe extern "C" fn(
        dev: *mut RawDevice,
        name: *const c_char,
        value: *mut c_char,
        buf_len: c_uint,
    ) -> c_int,
    pub set_property:
        unsafe extern "C" fn(dev: *mut RawDevice, name: *const c_char, value: *const c_char) -> c_int,
    pub get_property_type: unsafe extern "C" fn(
        dev: *mut RawDevice,
        name: *const c_char,
        property_type: *mut c_int,
    ) -> bool,
    pub get_property_read_only:
        unsafe extern "C" fn(dev: *mut RawDevice, name: *const c_char, read_only: *mut bool) -> bool,
    pub has_property_limits: unsafe extern "C" fn(dev: *mut RawDevice, name: *const c_char) -> bool,
    pub get_property_lower_limit:
        unsafe extern "C" fn(dev: *mut RawDevice, name: *const c_char, limit: *mut c_double) -> bool,
    pub get_property_upper_limit:
        unsafe extern "C" fn(dev: *mut RawDevice, name: *const c_char, limit: *mut c_double) -> bool,
    pub get_number_of_property_values:
        unsafe extern "C" fn(dev: *mut RawDevice, name: *const c_char) -> c_uint,
    pub get_property_value_at: unsafe extern "C" fn(
        dev: *mut RawDevice,
        name: *const c_char,
        index: c_uint,
        value: *mut c_char,
        buf_len: c_uint,
    ) -> bool,
    pub get_error_text: unsafe extern "C" fn(
        dev: *mut RawDevice,
        code: c_int,
        text: *mut c_char,
        buf_len: c_uint,
    ) -> bool,
    pub get_delay_ms: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub set_delay_ms: unsafe extern "C" fn(dev: *mut RawDevice, delay: c_double),
    pub uses_delay: unsafe extern "C" fn(dev: *mut RawDevice) -> bool,
    pub get_parent_id: unsafe extern "C" fn(dev: *mut RawDevice, id: *mut c_char, buf_len: c_uint),
    pub set_parent_id: unsafe extern "C" fn(dev: *mut RawDevice, id: *const c_char),
    pub supports_device_detection: unsafe extern "C" fn(dev: *mut RawDevice) -> bool,
    pub detect_device: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
}

// =============================================================================
// Capability Tables
// =============================================================================

#[repr(C)]
pub struct CameraVtable {
    pub snap_image: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    /// Returns null when no image has been acquired.
    pub get_image_buffer: unsafe extern "C" fn(dev: *mut RawDevice, channel: c_uint) -> *const u8,
    pub get_image_buffer_size: unsafe extern "C" fn(dev: *mut RawDevice) -> c_long,
    pub get_image_width: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_image_height: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_image_bytes_per_pixel: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_bit_depth: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_number_of_components: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_number_of_channels: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_channel_name: unsafe extern "C" fn(
        dev: *mut RawDevice,
        channel: c_uint,
        name: *mut c_char,
        buf_len: c_uint,
    ) -> c_int,
    pub get_pixel_size_um: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub get_binning: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub set_binning: unsafe extern "C" fn(dev: *mut RawDevice, binning: c_int) -> c_int,
    pub get_exposure: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub set_exposure: unsafe extern "C" fn(dev: *mut RawDevice, exposure_ms: c_double),
    pub set_roi: unsafe extern "C" fn(
        dev: *mut RawDevice,
        x: c_uint,
        y: c_uint,
        x_size: c_uint,
        y_size: c_uint,
    ) -> c_int,
    pub get_roi: unsafe extern "C" fn(
        dev: *mut RawDevice,
        x: *mut c_uint,
        y: *mut c_uint,
        x_size: *mut c_uint,
        y_size: *mut c_uint,
    ) -> c_int,
    pub clear_roi: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub start_sequence_acquisition: unsafe extern "C" fn(
        dev: *mut RawDevice,
        num_images: c_long,
        interval_ms: c_double,
        stop_on_overflow: bool,
    ) -> c_int,
    pub stop_sequence_acquisition: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub is_capturing: unsafe extern "C" fn(dev: *mut RawDevice) -> bool,
}

#[repr(C)]
pub struct ShutterVtable {
    pub set_open: unsafe extern "C" fn(dev: *mut RawDevice, open: bool) -> c_int,
    pub get_open: unsafe extern "C" fn(dev: *mut RawDevice, open: *mut bool) -> c_int,
    pub fire: unsafe extern "C" fn(dev: *mut RawDevice, delta_t: c_double) -> c_int,
}

#[repr(C)]
pub struct StageVtable {
    pub set_position_um: unsafe extern "C" fn(dev: *mut RawDevice, pos: c_double) -> c_int,
    pub set_relative_position_um: unsafe extern "C" fn(dev: *mut RawDevice, d: c_double) -> c_int,
    pub get_position_um: unsafe extern "C" fn(dev: *mut RawDevice, pos: *mut c_double) -> c_int,
    pub set_position_steps: unsafe extern "C" fn(dev: *mut RawDevice, steps: c_long) -> c_int,
    pub get_position_steps: unsafe extern "C" fn(dev: *mut RawDevice, steps: *mut c_long) -> c_int,
    pub set_origin: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub set_adapter_origin_um: unsafe extern "C" fn(dev: *mut RawDevice, d: c_double) -> c_int,
    pub get_limits: unsafe extern "C" fn(
        dev: *mut RawDevice,
        lower: *mut c_double,
        upper: *mut c_double,
    ) -> c_int,
    pub move_velocity: unsafe extern "C" fn(dev: *mut RawDevice, velocity: c_double) -> c_int,
    pub stop: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub home: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub get_focus_direction: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub set_focus_direction: unsafe extern "C" fn(dev: *mut RawDevice, direction: c_int),
    pub is_continuous_focus_drive: unsafe extern "C" fn(dev: *mut RawDevice) -> bool,
}

#[repr(C)]
pub struct XYStageVtable {
    pub set_position_um:
        unsafe extern "C" fn(dev: *mut RawDevice, x: c_double, y: c_double) -> c_int,
    pub set_relative_position_um:
        unsafe extern "C" fn(dev: *mut RawDevice, dx: c_double, dy: c_double) -> c_int,
    pub get_position_um:
        unsafe extern "C" fn(dev: *mut RawDevice, x: *mut c_double, y: *mut c_double) -> c_int,
    pub set_position_steps: unsafe extern "C" fn(dev: *mut RawDevice, x: c_long, y: c_long) -> c_int,
    pub get_position_steps:
        unsafe extern "C" fn(dev: *mut RawDevice, x: *mut c_long, y: *mut c_long) -> c_int,
    pub set_origin: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub set_adapter_origin_um:
        unsafe extern "C" fn(dev: *mut RawDevice, x: c_double, y: c_double) -> c_int,
    pub get_limits_um: unsafe extern "C" fn(
        dev: *mut RawDevice,
        x_min: *mut c_double,
        x_max: *mut c_double,
        y_min: *mut c_double,
        y_max: *mut c_double,
    ) -> c_int,
    pub get_step_size_x_um: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub get_step_size_y_um: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub stop: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub home: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
}

#[repr(C)]
pub struct StateVtable {
    pub set_position: unsafe extern "C" fn(dev: *mut RawDevice, pos: c_long) -> c_int,
    pub get_position: unsafe extern "C" fn(dev: *mut RawDevice, pos: *mut c_long) -> c_int,
    pub get_number_of_positions: unsafe extern "C" fn(dev: *mut RawDevice) -> c_ulong,
    pub get_position_label: unsafe extern "C" fn(
        dev: *mut RawDevice,
        pos: c_long,
        label: *mut c_char,
        buf_len: c_uint,
    ) -> c_int,
    pub set_position_label:
        unsafe extern "C" fn(dev: *mut RawDevice, pos: c_long, label: *const c_char) -> c_int,
    pub get_label_position:
        unsafe extern "C" fn(dev: *mut RawDevice, label: *const c_char, pos: *mut c_long) -> c_int,
    pub set_gate_open: unsafe extern "C" fn(dev: *mut RawDevice, open: bool) -> c_int,
    pub get_gate_open: unsafe extern "C" fn(dev: *mut RawDevice, open: *mut bool) -> c_int,
}

#[repr(C)]
pub struct SerialVtable {
    pub set_command:
        unsafe extern "C" fn(dev: *mut RawDevice, command: *const c_char, term: *const c_char) -> c_int,
    pub get_answer: unsafe extern "C" fn(
        dev: *mut RawDevice,
        answer: *mut c_char,
        buf_len: c_uint,
        term: *const c_char,
    ) -> c_int,
    pub write: unsafe extern "C" fn(dev: *mut RawDevice, buf: *const u8, len: c_ulong) -> c_int,
    pub read: unsafe extern "C" fn(
        dev: *mut RawDevice,
        buf: *mut u8,
        buf_len: c_ulong,
        read: *mut c_ulong,
    ) -> c_int,
    pub purge: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
}

#[repr(C)]
pub struct AutoFocusVtable {
    pub set_continuous_focusing: unsafe extern "C" fn(dev: *mut RawDevice, state: bool) -> c_int,
    pub get_continuous_focusing: unsafe extern "C" fn(dev: *mut RawDevice, state: *mut bool) -> c_int,
    pub is_continuous_focus_locked: unsafe extern "C" fn(dev: *mut RawDevice) -> bool,
    pub full_focus: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub incremental_focus: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub get_last_focus_score: unsafe extern "C" fn(dev: *mut RawDevice, score: *mut c_double) -> c_int,
    pub get_current_focus_score:
        unsafe extern "C" fn(dev: *mut RawDevice, score: *mut c_double) -> c_int,
    pub auto_set_parameters: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub get_offset: unsafe extern "C" fn(dev: *mut RawDevice, offset: *mut c_double) -> c_int,
    pub set_offset: unsafe extern "C" fn(dev: *mut RawDevice, offset: c_double) -> c_int,
}

#[repr(C)]
pub struct ImageProcessorVtable {
    pub process: unsafe extern "C" fn(
        dev: *mut RawDevice,
        buffer: *mut u8,
        width: c_uint,
        height: c_uint,
        byte_depth: c_uint,
    ) -> c_int,
}

#[repr(C)]
pub struct SignalIOVtable {
    pub set_gate_open: unsafe extern "C" fn(dev: *mut RawDevice, open: bool) -> c_int,
    pub get_gate_open: unsafe extern "C" fn(dev: *mut RawDevice, open: *mut bool) -> c_int,
    pub set_signal: unsafe extern "C" fn(dev: *mut RawDevice, volts: c_double) -> c_int,
    pub get_signal: unsafe extern "C" fn(dev: *mut RawDevice, volts: *mut c_double) -> c_int,
    pub get_limits: unsafe extern "C" fn(
        dev: *mut RawDevice,
        min_volts: *mut c_double,
        max_volts: *mut c_double,
    ) -> c_int,
}

#[repr(C)]
pub struct MagnifierVtable {
    pub get_magnification: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
}

#[repr(C)]
pub struct SlmVtable {
    pub set_image: unsafe extern "C" fn(dev: *mut RawDevice, pixels: *const u8) -> c_int,
    pub display_image: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub set_pixels_to: unsafe extern "C" fn(dev: *mut RawDevice, intensity: u8) -> c_int,
    pub set_exposure: unsafe extern "C" fn(dev: *mut RawDevice, interval_ms: c_double) -> c_int,
    pub get_exposure: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub get_width: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_height: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_number_of_components: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_bytes_per_pixel: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
}

#[repr(C)]
pub struct GalvoVtable {
    pub point_and_fire:
        unsafe extern "C" fn(dev: *mut RawDevice, x: c_double, y: c_double, time_us: c_double) -> c_int,
    pub set_spot_interval: unsafe extern "C" fn(dev: *mut RawDevice, interval_us: c_double) -> c_int,
    pub set_position: unsafe extern "C" fn(dev: *mut RawDevice, x: c_double, y: c_double) -> c_int,
    pub get_position:
        unsafe extern "C" fn(dev: *mut RawDevice, x: *mut c_double, y: *mut c_double) -> c_int,
    pub set_illumination_state: unsafe extern "C" fn(dev: *mut RawDevice, on: bool) -> c_int,
    pub get_x_range: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub get_x_minimum: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub get_y_range: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub get_y_minimum: unsafe extern "C" fn(dev: *mut RawDevice) -> c_double,
    pub add_polygon_vertex:
        unsafe extern "C" fn(dev: *mut RawDevice, index: c_int, x: c_double, y: c_double) -> c_int,
    pub delete_polygons: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub load_polygons: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub set_polygon_repetitions: unsafe extern "C" fn(dev: *mut RawDevice, repetitions: c_int) -> c_int,
    pub run_polygons: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub run_sequence: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub stop_sequence: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub get_channel:
        unsafe extern "C" fn(dev: *mut RawDevice, name: *mut c_char, buf_len: c_uint) -> c_int,
}

#[repr(C)]
pub struct HubVtable {
    pub detect_installed_devices: unsafe extern "C" fn(dev: *mut RawDevice) -> c_int,
    pub get_number_of_installed_devices: unsafe extern "C" fn(dev: *mut RawDevice) -> c_uint,
    pub get_installed_device_name: unsafe extern "C" fn(
        dev: *mut RawDevice,
        index: c_uint,
        name: *mut c_char,
        buf_len: c_uint,
    ) -> bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_names_are_nul_terminated() {
        for symbol in [
            symbols::INITIALIZE_MODULE_DATA,
            symbols::CREATE_DEVICE,
            symbols::DELETE_DEVICE,
            symbols::GET_MODULE_VERSION,
            symbols::GET_DEVICE_INTERFACE_VERSION,
            symbols::GET_NUMBER_OF_DEVICES,
            symbols::GET_DEVICE_NAME,
            symbols::GET_DEVICE_TYPE,
            symbols::GET_DEVICE_DESCRIPTION,
        ] {
            assert_eq!(symbol.last(), Some(&0));
            assert!(!symbols::display(symbol).contains('\0'));
        }
        assert_eq!(symbols::display(symbols::CREATE_DEVICE), "CreateDevice");
    }
}
