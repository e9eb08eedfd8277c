use super::{ImageEncoding, RasterTarget};
use crate::error::CaptureError;
use crate::frame::{compute_crop, FrameSource, Size};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// An encoded still. Immutable once produced; clones share the bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    data: Arc<Vec<u8>>,
    width: u32,
    height: u32,
    encoding: ImageEncoding,
    captured_at: SystemTime,
}

impl CapturedImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, encoding: ImageEncoding) -> Self {
        Self {
            data: Arc::new(data),
            width,
            height,
            encoding,
            captured_at: SystemTime::now(),
        }
    }

    pub fn data(&self) -> &Arc<Vec<u8>> {
        &self.data
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn mime_type(&self) -> &'static str {
        self.encoding.mime_type()
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// `data:<mime>;base64,<payload>`, the string form a web host displays
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(self.bytes()))
    }
}

/// Take a still of `source` center-cropped to the aspect ratio of `target`.
///
/// `Ok(None)` means the capture is not ready yet: the source has no frame or
/// either size is still unknown.
pub fn capture_frame<S: FrameSource + ?Sized>(
    source: &S,
    target: Size,
    raster: &mut dyn RasterTarget,
    encoding: ImageEncoding,
) -> Result<Option<CapturedImage>, CaptureError> {
    let natural = source.natural_size();
    let Some(crop) = compute_crop(natural, target) else {
        debug!("Capture not ready (source {}, target {})", natural, target);
        return Ok(None);
    };
    let Some(frame) = source.current_frame() else {
        debug!("Capture not ready, no frame decoded yet");
        return Ok(None);
    };

    let (_, _, width, height) = crop.pixel_bounds(Size::new(frame.width(), frame.height()));
    if width == 0 || height == 0 {
        return Ok(None);
    }
    debug!(
        "Cropping {} source at ({:.2}, {:.2}) size {:.2}x{:.2} for {} target",
        natural, crop.x, crop.y, crop.width, crop.height, target
    );

    raster.resize(Size::new(width, height));
    raster.draw_region(&frame, crop);
    let data = raster.export(encoding)?;

    Ok(Some(CapturedImage::new(data, width, height, encoding)))
}
