use crate::error::CaptureError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Compressed format of exported stills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ImageEncoding {
    Jpeg { quality: u8 },
    Png,
}

impl ImageEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "jpg",
            ImageEncoding::Png => "png",
        }
    }
}

impl Default for ImageEncoding {
    fn default() -> Self {
        ImageEncoding::Jpeg { quality: 92 }
    }
}

/// Encode an RGBA surface. JPEG drops the alpha channel.
pub(crate) fn encode_rgba(
    pixels: &RgbaImage,
    encoding: ImageEncoding,
) -> Result<Vec<u8>, CaptureError> {
    let image = DynamicImage::ImageRgba8(pixels.clone());
    let mut output = Vec::new();

    match encoding {
        ImageEncoding::Jpeg { quality } => {
            let mut encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));
            encoder
                .encode_image(&image.to_rgb8())
                .map_err(|e| CaptureError::Encoding {
                    details: format!("JPEG: {}", e),
                })?;
        }
        ImageEncoding::Png => {
            image
                .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
                .map_err(|e| CaptureError::Encoding {
                    details: format!("PNG: {}", e),
                })?;
        }
    }

    Ok(output)
}
