use super::encode::encode_rgba;
use super::ImageEncoding;
use crate::error::CaptureError;
use crate::frame::{CropRect, Size};
use image::{imageops, RgbaImage};

/// A 2D surface a frame region can be drawn into and exported from
pub trait RasterTarget: Send + Sync {
    /// Resize and clear the surface
    fn resize(&mut self, size: Size);

    fn size(&self) -> Size;

    /// Copy `region` of `frame` to the surface origin at 1:1 scale
    fn draw_region(&mut self, frame: &RgbaImage, region: CropRect);

    fn export(&self, encoding: ImageEncoding) -> Result<Vec<u8>, CaptureError>;
}

/// In-memory raster surface
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(0, 0),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterTarget for Canvas {
    fn resize(&mut self, size: Size) {
        self.pixels = RgbaImage::new(size.width, size.height);
    }

    fn size(&self) -> Size {
        Size::new(self.pixels.width(), self.pixels.height())
    }

    fn draw_region(&mut self, frame: &RgbaImage, region: CropRect) {
        let (x, y, width, height) =
            region.pixel_bounds(Size::new(frame.width(), frame.height()));
        if width == 0 || height == 0 {
            return;
        }
        let cropped = imageops::crop_imm(frame, x, y, width, height).to_image();
        imageops::replace(&mut self.pixels, &cropped, 0, 0);
    }

    fn export(&self, encoding: ImageEncoding) -> Result<Vec<u8>, CaptureError> {
        if self.pixels.width() == 0 || self.pixels.height() == 0 {
            return Err(CaptureError::Encoding {
                details: "canvas is empty".to_string(),
            });
        }
        encode_rgba(&self.pixels, encoding)
    }
}
