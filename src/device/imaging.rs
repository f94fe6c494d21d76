//! Image processors and spatial light modulators.

use super::capability::capability_view;
use super::camera::Image;
use crate::error::{MmError, MmResult};
use crate::types::DeviceType;
use mmdevice_sys::{ImageProcessorVtable, SlmVtable};

// SAFETY (every native call in this file): see `Bound::call`.

capability_view!(
    /// In-place image processor.
    ImageProcessor,
    ImageProcessorVtable,
    DeviceType::ImageProcessor
);

impl ImageProcessor {
    /// Run the processor over `image`, modifying its pixels in place.
    pub fn process(&self, image: &mut Image) -> MmResult<()> {
        let expected = image.width as usize * image.height as usize * image.bytes_per_pixel as usize;
        if image.data.len() < expected {
            return Err(MmError::InvalidArgument(format!(
                "image holds {} bytes, {expected} required",
                image.data.len()
            )));
        }
        let (width, height, depth) = (image.width, image.height, image.bytes_per_pixel);
        let data = image.data.as_mut_ptr();
        self.inner
            .status(|vt, raw| unsafe { (vt.process)(raw, data, width, height, depth) })
    }
}

capability_view!(
    /// Spatial light modulator.
    Slm,
    SlmVtable,
    DeviceType::Slm
);

impl Slm {
    /// Upload a frame. `pixels` must cover the full device frame.
    pub fn set_image(&self, pixels: &[u8]) -> MmResult<()> {
        let required = self.frame_len();
        if pixels.len() < required {
            return Err(MmError::InvalidArgument(format!(
                "SLM frame holds {} bytes, {required} required",
                pixels.len()
            )));
        }
        self.inner.status(|vt, raw| unsafe { (vt.set_image)(raw, pixels.as_ptr()) })
    }

    /// Show the uploaded frame.
    pub fn display_image(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.display_image)(raw) })
    }

    /// Set every pixel to `intensity` and display.
    pub fn set_pixels_to(&self, intensity: u8) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_pixels_to)(raw, intensity) })
    }

    /// Set the display interval in milliseconds.
    pub fn set_exposure(&self, interval_ms: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_exposure)(raw, interval_ms) })
    }

    /// Display interval in milliseconds.
    pub fn exposure(&self) -> f64 {
        self.inner.call(|vt, raw| unsafe { (vt.get_exposure)(raw) })
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.inner
            .call(|vt, raw| unsafe { ((vt.get_width)(raw), (vt.get_height)(raw)) })
    }

    /// Color components per pixel.
    pub fn number_of_components(&self) -> u32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_number_of_components)(raw) })
    }

    /// Bytes per pixel.
    pub fn bytes_per_pixel(&self) -> u32 {
        self.inner.call(|vt, raw| unsafe { (vt.get_bytes_per_pixel)(raw) })
    }

    /// Bytes in one full frame.
    pub fn frame_len(&self) -> usize {
        self.inner.call(|vt, raw| unsafe {
            (vt.get_width)(raw) as usize
                * (vt.get_height)(raw) as usize
                * (vt.get_bytes_per_pixel)(raw) as usize
        })
    }
}
