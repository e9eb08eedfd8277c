mod canvas;
mod core;
mod encode;
#[cfg(test)]
mod tests;

pub use canvas::{Canvas, RasterTarget};
pub use self::core::{capture_frame, CapturedImage};
pub use encode::ImageEncoding;
