//! Camera capability.

use super::capability::capability_view;
use crate::error::{MmError, MmResult};
use crate::ffi::StrBuffer;
use crate::types::DeviceType;
use mmdevice_sys::CameraVtable;
use serde::Serialize;
use std::ffi::c_long;

capability_view!(
    /// Camera view of a device.
    ///
    /// Image geometry follows the current binning and ROI: a 512×512 sensor
    /// binned by 2 reports 256×256. The image buffer holds defined contents
    /// only after [`snap_image`](Camera::snap_image); any binning or ROI change
    /// invalidates it again.
    Camera,
    CameraVtable,
    DeviceType::Camera
);

/// Region of interest in binned pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Roi {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Roi {
    /// Construct a region from its origin and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Pixel storage type, from the number of bytes per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelType {
    /// One byte.
    U8,
    /// Two bytes.
    U16,
    /// Four bytes.
    U32,
    /// Eight bytes.
    U64,
}

impl PixelType {
    /// Pixel type for a byte depth; `None` for unsupported depths.
    pub fn from_bytes_per_pixel(bytes: u32) -> Option<Self> {
        match bytes {
            1 => Some(PixelType::U8),
            2 => Some(PixelType::U16),
            4 => Some(PixelType::U32),
            8 => Some(PixelType::U64),
            _ => None,
        }
    }

    /// Bytes per pixel.
    pub fn bytes(self) -> usize {
        match self {
            PixelType::U8 => 1,
            PixelType::U16 => 2,
            PixelType::U32 => 4,
            PixelType::U64 => 8,
        }
    }
}

/// An owned copy of the camera's last acquired image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per pixel.
    pub bytes_per_pixel: u32,
    /// Significant bits per pixel.
    pub bit_depth: u32,
    /// Row-major pixel data, `width * height * bytes_per_pixel` bytes.
    pub data: Vec<u8>,
}

impl Image {
    /// Storage type of the pixels, if the byte depth is a supported one.
    pub fn pixel_type(&self) -> Option<PixelType> {
        PixelType::from_bytes_per_pixel(self.bytes_per_pixel)
    }
}

impl Camera {
    /// Acquire one image. Blocks until the exposure completes.
    pub fn snap_image(&self) -> MmResult<()> {
        // SAFETY (all calls below): see `Bound::call`.
        self.inner.status(|vt, raw| unsafe { (vt.snap_image)(raw) })?;
        self.set_image_ready(true);
        Ok(())
    }

    /// Copy of the last snapped image, or `None` if nothing has been acquired
    /// since the last geometry change.
    pub fn image(&self) -> MmResult<Option<Image>> {
        self.channel_image(0)
    }

    /// Like [`image`](Self::image), for one channel of a multi-channel camera.
    pub fn channel_image(&self, channel: u32) -> MmResult<Option<Image>> {
        if !self.image_ready() {
            return Ok(None);
        }
        self.inner.call(|vt, raw| {
            let (width, height, bytes_per_pixel, bit_depth) = unsafe {
                (
                    (vt.get_image_width)(raw),
                    (vt.get_image_height)(raw),
                    (vt.get_image_bytes_per_pixel)(raw),
                    (vt.get_bit_depth)(raw),
                )
            };
            let ptr = unsafe { (vt.get_image_buffer)(raw, channel) };
            if ptr.is_null() {
                return Ok(None);
            }
            let len = width as usize * height as usize * bytes_per_pixel as usize;
            let reported = unsafe { (vt.get_image_buffer_size)(raw) };
            if usize::try_from(reported).map_or(true, |size| size < len) {
                return Err(MmError::Query {
                    module: self.module_name().to_owned(),
                    item: format!(
                        "image buffer of {len} bytes for \"{}\" (module reported {reported})",
                        self.label()
                    ),
                });
            }
            // SAFETY: the module reported a buffer of at least `len` bytes,
            // valid until the next acquisition; the module lock is held.
            let data = unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec();
            Ok(Some(Image {
                width,
                height,
                bytes_per_pixel,
                bit_depth,
                data,
            }))
        })
    }

    /// Size in bytes of the current image buffer.
    pub fn image_buffer_size(&self) -> usize {
        let size = self.inner.call(|vt, raw| unsafe { (vt.get_image_buffer_size)(raw) });
        usize::try_from(size).unwrap_or(0)
    }

    /// Image width in pixels at the current binning and ROI.
    pub fn image_width(&self) -> u32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_image_width)(raw) })
    }

    /// Image height in pixels at the current binning and ROI.
    pub fn image_height(&self) -> u32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_image_height)(raw) })
    }

    /// Bytes per pixel.
    pub fn bytes_per_pixel(&self) -> u32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_image_bytes_per_pixel)(raw) })
    }

    /// Pixel storage type, if the byte depth is a supported one.
    pub fn pixel_type(&self) -> Option<PixelType> {
        PixelType::from_bytes_per_pixel(self.bytes_per_pixel())
    }

    /// Significant bits per pixel.
    pub fn bit_depth(&self) -> u32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_bit_depth)(raw) })
    }

    /// Color components per pixel.
    pub fn number_of_components(&self) -> u32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_number_of_components)(raw) })
    }

    /// Number of simultaneously acquired channels.
    pub fn number_of_channels(&self) -> u32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_number_of_channels)(raw) })
    }

    /// Name of one channel.
    pub fn channel_name(&self, channel: u32) -> MmResult<String> {
        let mut buf = StrBuffer::new();
        self.inner.status(|vt, raw| unsafe {
            (vt.get_channel_name)(raw, channel, buf.as_mut_ptr(), buf.len())
        })?;
        Ok(buf.into_string())
    }

    /// Pixel size in micrometres at the current binning.
    pub fn pixel_size_um(&self) -> f64 {
        self.inner.call(|vt, raw| unsafe { (vt.get_pixel_size_um)(raw) })
    }

    /// Current binning factor.
    pub fn binning(&self) -> i32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_binning)(raw) })
    }

    /// Set the binning factor. Invalidates the last image.
    pub fn set_binning(&self, binning: i32) -> MmResult<()> {
        let result = self.inner.status(|vt, raw| unsafe { (vt.set_binning)(raw, binning) });
        self.set_image_ready(false);
        result
    }

    /// Exposure time in milliseconds.
    pub fn exposure(&self) -> f64 {
        self.inner.call(|vt, raw| unsafe { (vt.get_exposure)(raw) })
    }

    /// Set the exposure time in milliseconds.
    pub fn set_exposure(&self, exposure_ms: f64) {
        self.inner.call(|vt, raw| unsafe { (vt.set_exposure)(raw, exposure_ms) });
    }

    /// Set the region of interest. Invalidates the last image.
    pub fn set_roi(&self, roi: Roi) -> MmResult<()> {
        let result = self.inner.status(|vt, raw| unsafe {
            (vt.set_roi)(raw, roi.x, roi.y, roi.width, roi.height)
        });
        self.set_image_ready(false);
        result
    }

    /// Current region of interest.
    pub fn roi(&self) -> MmResult<Roi> {
        let (mut x, mut y, mut width, mut height) = (0, 0, 0, 0);
        self.inner.status(|vt, raw| unsafe {
            (vt.get_roi)(raw, &mut x, &mut y, &mut width, &mut height)
        })?;
        Ok(Roi::new(x, y, width, height))
    }

    /// Reset the region of interest to the full sensor. Invalidates the last
    /// image.
    pub fn clear_roi(&self) -> MmResult<()> {
        let result = self.inner.status(|vt, raw| unsafe { (vt.clear_roi)(raw) });
        self.set_image_ready(false);
        result
    }

    /// Start acquiring `num_images` images at `interval_ms`.
    pub fn start_sequence_acquisition(
        &self,
        num_images: i64,
        interval_ms: f64,
        stop_on_overflow: bool,
    ) -> MmResult<()> {
        let num_images = c_long::try_from(num_images)
            .map_err(|_| MmError::InvalidArgument(format!("image count {num_images} out of range")))?;
        self.inner.status(|vt, raw| unsafe {
            (vt.start_sequence_acquisition)(raw, num_images, interval_ms, stop_on_overflow)
        })
    }

    /// Stop a running sequence acquisition.
    pub fn stop_sequence_acquisition(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.stop_sequence_acquisition)(raw) })
    }

    /// Whether a sequence acquisition is running.
    pub fn is_capturing(&self) -> bool {
        self.inner.call(|vt, raw| unsafe { (vt.is_capturing)(raw) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_type_from_byte_depth() {
        assert_eq!(PixelType::from_bytes_per_pixel(1), Some(PixelType::U8));
        assert_eq!(PixelType::from_bytes_per_pixel(2), Some(PixelType::U16));
        assert_eq!(PixelType::from_bytes_per_pixel(8).map(PixelType::bytes), Some(8));
        assert_eq!(PixelType::from_bytes_per_pixel(3), None);
    }
}
