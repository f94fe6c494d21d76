//! Value types shared across the device layer: device type tags, property and
//! detection enums, and module/device descriptors.

use mmdevice_sys as sys;
use serde::{Deserialize, Serialize};
use std::ffi::c_int;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Device type tag reported by a module for each device.
///
/// The tag decides which capability view a device supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Unrecognized or unreported type.
    Unknown,
    /// Wildcard used in filters; never reported by a device.
    Any,
    /// Image-producing camera.
    Camera,
    /// Light shutter.
    Shutter,
    /// Multi-position device such as a filter wheel or turret.
    State,
    /// Single-axis (focus) stage.
    Stage,
    /// Two-axis stage.
    XYStage,
    /// Serial port.
    Serial,
    /// Device with properties only.
    Generic,
    /// Autofocus device.
    AutoFocus,
    /// Host core; never produced by a module.
    Core,
    /// In-place image processor.
    ImageProcessor,
    /// Analog or digital signal input/output.
    SignalIO,
    /// Magnification changer.
    Magnifier,
    /// Spatial light modulator.
    Slm,
    /// Hub owning peripheral devices.
    Hub,
    /// Galvo scanner.
    Galvo,
}

impl DeviceType {
    /// All concrete tags, in ABI order.
    pub const ALL: [DeviceType; 17] = [
        DeviceType::Unknown,
        DeviceType::Any,
        DeviceType::Camera,
        DeviceType::Shutter,
        DeviceType::State,
        DeviceType::Stage,
        DeviceType::XYStage,
        DeviceType::Serial,
        DeviceType::Generic,
        DeviceType::AutoFocus,
        DeviceType::Core,
        DeviceType::ImageProcessor,
        DeviceType::SignalIO,
        DeviceType::Magnifier,
        DeviceType::Slm,
        DeviceType::Hub,
        DeviceType::Galvo,
    ];

    /// Convert a native tag; unrecognized values map to `Unknown`.
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            sys::ANY_TYPE => DeviceType::Any,
            sys::CAMERA_DEVICE => DeviceType::Camera,
            sys::SHUTTER_DEVICE => DeviceType::Shutter,
            sys::STATE_DEVICE => DeviceType::State,
            sys::STAGE_DEVICE => DeviceType::Stage,
            sys::XY_STAGE_DEVICE => DeviceType::XYStage,
            sys::SERIAL_DEVICE => DeviceType::Serial,
            sys::GENERIC_DEVICE => DeviceType::Generic,
            sys::AUTO_FOCUS_DEVICE => DeviceType::AutoFocus,
            sys::CORE_DEVICE => DeviceType::Core,
            sys::IMAGE_PROCESSOR_DEVICE => DeviceType::ImageProcessor,
            sys::SIGNAL_IO_DEVICE => DeviceType::SignalIO,
            sys::MAGNIFIER_DEVICE => DeviceType::Magnifier,
            sys::SLM_DEVICE => DeviceType::Slm,
            sys::HUB_DEVICE => DeviceType::Hub,
            sys::GALVO_DEVICE => DeviceType::Galvo,
            _ => DeviceType::Unknown,
        }
    }

    /// Native tag value.
    pub fn as_raw(self) -> c_int {
        match self {
            DeviceType::Unknown => sys::UNKNOWN_TYPE,
            DeviceType::Any => sys::ANY_TYPE,
            DeviceType::Camera => sys::CAMERA_DEVICE,
            DeviceType::Shutter => sys::SHUTTER_DEVICE,
            DeviceType::State => sys::STATE_DEVICE,
            DeviceType::Stage => sys::STAGE_DEVICE,
            DeviceType::XYStage => sys::XY_STAGE_DEVICE,
            DeviceType::Serial => sys::SERIAL_DEVICE,
            DeviceType::Generic => sys::GENERIC_DEVICE,
            DeviceType::AutoFocus => sys::AUTO_FOCUS_DEVICE,
            DeviceType::Core => sys::CORE_DEVICE,
            DeviceType::ImageProcessor => sys::IMAGE_PROCESSOR_DEVICE,
            DeviceType::SignalIO => sys::SIGNAL_IO_DEVICE,
            DeviceType::Magnifier => sys::MAGNIFIER_DEVICE,
            DeviceType::Slm => sys::SLM_DEVICE,
            DeviceType::Hub => sys::HUB_DEVICE,
            DeviceType::Galvo => sys::GALVO_DEVICE,
        }
    }

    /// Whether devices of this type must provide a capability function table.
    pub fn has_capability_table(self) -> bool {
        !matches!(
            self,
            DeviceType::Unknown | DeviceType::Any | DeviceType::Generic | DeviceType::Core
        )
    }

    /// Whether this tag, used as a filter, selects devices of type `other`.
    pub fn matches(self, other: DeviceType) -> bool {
        self == DeviceType::Any || self == other
    }

    fn name(self) -> &'static str {
        match self {
            DeviceType::Unknown => "Unknown",
            DeviceType::Any => "Any",
            DeviceType::Camera => "Camera",
            DeviceType::Shutter => "Shutter",
            DeviceType::State => "State",
            DeviceType::Stage => "Stage",
            DeviceType::XYStage => "XYStage",
            DeviceType::Serial => "Serial",
            DeviceType::Generic => "Generic",
            DeviceType::AutoFocus => "AutoFocus",
            DeviceType::Core => "Core",
            DeviceType::ImageProcessor => "ImageProcessor",
            DeviceType::SignalIO => "SignalIO",
            DeviceType::Magnifier => "Magnifier",
            DeviceType::Slm => "SLM",
            DeviceType::Hub => "Hub",
            DeviceType::Galvo => "Galvo",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    /// Case-insensitive parse of the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown device type '{s}'"))
    }
}

/// Value type of a device property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyType {
    /// Not reported.
    Undef,
    /// Free text.
    String,
    /// Floating point.
    Float,
    /// Integer.
    Integer,
}

impl PropertyType {
    pub(crate) fn from_raw(raw: c_int) -> Self {
        match raw {
            sys::PROPERTY_STRING => PropertyType::String,
            sys::PROPERTY_FLOAT => PropertyType::Float,
            sys::PROPERTY_INTEGER => PropertyType::Integer,
            _ => PropertyType::Undef,
        }
    }
}

/// Result of a device's self-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionStatus {
    /// The device does not implement detection.
    Unimplemented,
    /// Detection ran but the device is configured incorrectly.
    Misconfigured,
    /// The device did not respond.
    CanNotCommunicate,
    /// The device responded.
    CanCommunicate,
}

impl DetectionStatus {
    pub(crate) fn from_raw(raw: c_int) -> Self {
        match raw {
            sys::DETECTION_MISCONFIGURED => DetectionStatus::Misconfigured,
            sys::DETECTION_CAN_NOT_COMMUNICATE => DetectionStatus::CanNotCommunicate,
            sys::DETECTION_CAN_COMMUNICATE => DetectionStatus::CanCommunicate,
            _ => DetectionStatus::Unimplemented,
        }
    }
}

/// Direction a focus stage moves for increasing positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FocusDirection {
    /// Not reported.
    Unknown,
    /// Positive moves go toward the sample.
    TowardSample,
    /// Positive moves go away from the sample.
    AwayFromSample,
}

impl FocusDirection {
    pub(crate) fn from_raw(raw: c_int) -> Self {
        match raw {
            sys::FOCUS_DIRECTION_TOWARD_SAMPLE => FocusDirection::TowardSample,
            sys::FOCUS_DIRECTION_AWAY_FROM_SAMPLE => FocusDirection::AwayFromSample,
            _ => FocusDirection::Unknown,
        }
    }

    pub(crate) fn as_raw(self) -> c_int {
        match self {
            FocusDirection::Unknown => sys::FOCUS_DIRECTION_UNKNOWN,
            FocusDirection::TowardSample => sys::FOCUS_DIRECTION_TOWARD_SAMPLE,
            FocusDirection::AwayFromSample => sys::FOCUS_DIRECTION_AWAY_FROM_SAMPLE,
        }
    }
}

/// Metadata of one device declared by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    /// Position in the module's declaration order.
    pub index: usize,
    /// Device name used for creation.
    pub name: String,
    /// Advertised type tag.
    pub device_type: DeviceType,
    /// Human-readable description.
    pub description: String,
}

/// Identity and interface versions of a loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    /// Logical module name.
    pub name: String,
    /// Library file, or `None` for modules registered in-process.
    pub path: Option<PathBuf>,
    /// Module interface version.
    pub module_version: i64,
    /// Device interface version.
    pub device_interface_version: i64,
}
