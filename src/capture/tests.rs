use super::*;
use crate::error::CaptureError;
use crate::frame::{CropRect, FrameSource, Size};
use image::{Rgba, RgbaImage};

/// Frame source holding one fixed frame
struct StillFrame {
    frame: Option<RgbaImage>,
}

impl StillFrame {
    fn gradient(width: u32, height: u32) -> Self {
        Self {
            frame: Some(RgbaImage::from_fn(width, height, |x, y| {
                Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255])
            })),
        }
    }

    fn empty() -> Self {
        Self { frame: None }
    }
}

impl FrameSource for StillFrame {
    fn natural_size(&self) -> Size {
        self.frame
            .as_ref()
            .map(|f| Size::new(f.width(), f.height()))
            .unwrap_or_default()
    }

    fn current_frame(&self) -> Option<RgbaImage> {
        self.frame.clone()
    }
}

/// Raster target that cannot export
struct BrokenRaster;

impl RasterTarget for BrokenRaster {
    fn resize(&mut self, _size: Size) {}

    fn size(&self) -> Size {
        Size::default()
    }

    fn draw_region(&mut self, _frame: &RgbaImage, _region: CropRect) {}

    fn export(&self, _encoding: ImageEncoding) -> Result<Vec<u8>, CaptureError> {
        Err(CaptureError::Encoding {
            details: "export disabled".to_string(),
        })
    }
}

fn decoded_size(image: &CapturedImage) -> (u32, u32) {
    let decoded = image::load_from_memory(image.bytes()).unwrap();
    (decoded.width(), decoded.height())
}

#[test]
fn test_landscape_source_into_portrait_container() {
    let source = StillFrame::gradient(1920, 1080);
    let mut canvas = Canvas::new();

    let image = capture_frame(
        &source,
        Size::new(400, 800),
        &mut canvas,
        ImageEncoding::default(),
    )
    .unwrap()
    .unwrap();

    assert_eq!(image.size(), Size::new(540, 1080));
    assert_eq!(decoded_size(&image), (540, 1080));
    assert_eq!(image.mime_type(), "image/jpeg");
    assert_eq!(canvas.size(), Size::new(540, 1080));
}

#[test]
fn test_fractional_crop_truncates_canvas() {
    let source = StillFrame::gradient(1920, 1080);
    let mut canvas = Canvas::new();

    let image = capture_frame(&source, Size::new(450, 800), &mut canvas, ImageEncoding::Png)
        .unwrap()
        .unwrap();

    assert_eq!(image.size(), Size::new(607, 1080));
    // origin 656.25 floors to column 656
    assert_eq!(canvas.pixels().get_pixel(0, 0), &Rgba([(656 % 256) as u8, 0, 7, 255]));
}

#[test]
fn test_portrait_constrained_source_crops_rows() {
    let source = StillFrame::gradient(640, 480);
    let mut canvas = Canvas::new();

    let image = capture_frame(&source, Size::new(1920, 1080), &mut canvas, ImageEncoding::Png)
        .unwrap()
        .unwrap();

    assert_eq!(image.size(), Size::new(640, 360));
    assert_eq!(decoded_size(&image), (640, 360));
    assert_eq!(canvas.pixels().get_pixel(0, 0), &Rgba([0, 60, 7, 255]));
    assert_eq!(canvas.pixels().get_pixel(10, 359), &Rgba([10, 163, 7, 255]));
}

#[test]
fn test_png_export_is_lossless() {
    let source = StillFrame::gradient(100, 50);
    let mut canvas = Canvas::new();

    let image = capture_frame(&source, Size::new(1, 1), &mut canvas, ImageEncoding::Png)
        .unwrap()
        .unwrap();

    let decoded = image::load_from_memory(image.bytes()).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (50, 50));
    assert_eq!(decoded.get_pixel(0, 0), &Rgba([25, 0, 7, 255]));
    assert_eq!(decoded.get_pixel(49, 49), &Rgba([74, 49, 7, 255]));
}

#[test]
fn test_unknown_source_size_is_not_ready() {
    let mut canvas = Canvas::new();
    let result = capture_frame(
        &StillFrame::empty(),
        Size::new(400, 800),
        &mut canvas,
        ImageEncoding::default(),
    )
    .unwrap();
    assert!(result.is_none());
    assert_eq!(canvas.size(), Size::new(0, 0));
}

#[test]
fn test_unknown_target_size_is_not_ready() {
    let mut canvas = Canvas::new();
    let result = capture_frame(
        &StillFrame::gradient(64, 64),
        Size::new(0, 0),
        &mut canvas,
        ImageEncoding::default(),
    )
    .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_export_failure_is_an_error() {
    let err = capture_frame(
        &StillFrame::gradient(64, 64),
        Size::new(10, 10),
        &mut BrokenRaster,
        ImageEncoding::Png,
    )
    .unwrap_err();
    assert!(matches!(err, CaptureError::Encoding { .. }));
}

#[test]
fn test_empty_canvas_refuses_export() {
    assert!(Canvas::new().export(ImageEncoding::Png).is_err());
}

#[test]
fn test_clones_share_bytes() {
    let image = CapturedImage::new(vec![1, 2, 3], 1, 1, ImageEncoding::Png);
    let copy = image.clone();
    assert!(std::sync::Arc::ptr_eq(image.data(), copy.data()));
    assert_eq!(copy.len(), 3);
}

#[test]
fn test_data_url_decodes_to_the_still() {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let source = StillFrame::gradient(64, 32);
    let mut canvas = Canvas::new();
    let image = capture_frame(
        &source,
        Size::new(2, 1),
        &mut canvas,
        ImageEncoding::Jpeg { quality: 90 },
    )
    .unwrap()
    .unwrap();

    let url = image.to_data_url();
    let payload = url.strip_prefix("data:image/jpeg;base64,").unwrap();
    let bytes = STANDARD.decode(payload).unwrap();
    assert_eq!(bytes, image.bytes());

    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 32));
}

#[test]
fn test_data_url_carries_png_mime_type() {
    let image = CapturedImage::new(vec![0xff, 0x00, 0x10], 1, 1, ImageEncoding::Png);
    assert_eq!(image.to_data_url(), "data:image/png;base64,/wAQ");
}
