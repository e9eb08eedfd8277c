use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimensions of a frame, container or output surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height; `None` for an empty size
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Size {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("Invalid size '{}'. Use WIDTHxHEIGHT (e.g. 400x800)", s))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| format!("Invalid width '{}' in size", w))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| format!("Invalid height '{}' in size", h))?;
        Ok(Size::new(width, height))
    }
}

/// Region of the source frame that is kept by a capture, in source pixels.
///
/// Coordinates are fractional; rasterisation decides how they land on whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Whole-pixel bounds `(x, y, width, height)` clamped inside `source`.
    ///
    /// Origins are floored and extents truncated, the way a 2D canvas sizes
    /// itself from fractional dimensions. Extents never drop below one pixel
    /// unless `source` itself is empty.
    pub fn pixel_bounds(&self, source: Size) -> (u32, u32, u32, u32) {
        if source.is_empty() {
            return (0, 0, 0, 0);
        }
        let x = (snap(self.x).max(0.0).floor() as u32).min(source.width.saturating_sub(1));
        let y = (snap(self.y).max(0.0).floor() as u32).min(source.height.saturating_sub(1));
        let width = (snap(self.width) as u32).clamp(1, source.width - x);
        let height = (snap(self.height) as u32).clamp(1, source.height - y);
        (x, y, width, height)
    }
}

/// Values within 1e-6 of a whole number count as that number
fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-6 {
        rounded
    } else {
        value
    }
}

/// Center-crop `source` so the kept region has the aspect ratio of `target`.
///
/// A relatively wider source keeps its full height and loses columns on both
/// sides; otherwise it keeps its full width and loses rows top and bottom.
/// Returns `None` while either size is still unknown (zero).
pub fn compute_crop(source: Size, target: Size) -> Option<CropRect> {
    let source_ar = source.aspect_ratio()?;
    let target_ar = target.aspect_ratio()?;

    let source_w = source.width as f64;
    let source_h = source.height as f64;

    let rect = if source_ar > target_ar {
        let width = source_h * target_ar;
        CropRect {
            x: (source_w - width) / 2.0,
            y: 0.0,
            width,
            height: source_h,
        }
    } else {
        let height = source_w / target_ar;
        CropRect {
            x: 0.0,
            y: (source_h - height) / 2.0,
            width: source_w,
            height,
        }
    };

    Some(rect)
}

/// A live picture whose current frame can be sampled, e.g. the preview of a stream.
pub trait FrameSource: Send + Sync {
    /// Natural pixel size of the current frame; empty until the first frame arrives
    fn natural_size(&self) -> Size;

    /// Copy of the current frame
    fn current_frame(&self) -> Option<RgbaImage>;
}
