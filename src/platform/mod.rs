//! Host platform seam.
//!
//! Everything the camera core needs from the outside world goes through the
//! traits in this module, so the core runs unchanged against a browser
//! binding, a native backend or the [`synthetic`] platform used in tests.

pub mod synthetic;

use crate::config::CameraConfig;
use crate::device::Device;
use crate::error::PlatformError;
use crate::frame::Size;
use crate::stream::{FacingMode, Selector};
use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Whether the platform offers a capture API at all.
#[derive(Clone)]
pub enum PlatformCapabilities {
    Available(Arc<dyn MediaDevices>),
    Unavailable,
}

impl PlatformCapabilities {
    pub fn available(devices: Arc<dyn MediaDevices>) -> Self {
        Self::Available(devices)
    }

    pub fn media_devices(&self) -> Option<&Arc<dyn MediaDevices>> {
        match self {
            PlatformCapabilities::Available(devices) => Some(devices),
            PlatformCapabilities::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PlatformCapabilities::Available(_))
    }
}

impl fmt::Debug for PlatformCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformCapabilities::Available(_) => f.write_str("Available"),
            PlatformCapabilities::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Device enumeration and stream acquisition
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// All media devices in platform order, any kind
    async fn enumerate_devices(&self) -> Result<Vec<Device>, PlatformError>;

    /// Open a video stream matching `constraints`
    async fn get_user_media(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn MediaStream>, PlatformError>;
}

/// A granted stream. Tracks keep the hardware engaged until stopped.
pub trait MediaStream: Send + Sync {
    fn id(&self) -> &str;

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    /// Device the platform actually opened, when it reports one
    fn device_id(&self) -> Option<String>;

    /// Size of the latest frame; empty before the first frame or after the tracks stop
    fn frame_size(&self) -> Size;

    /// Latest decoded frame; `None` before the first frame or after the tracks stop
    fn latest_frame(&self) -> Option<RgbaImage>;
}

pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    /// Stop the track; stopping twice is a no-op
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Video constraints for one acquisition request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConstraints {
    /// Exact device to open
    pub device_id: Option<String>,
    pub facing_mode: Option<FacingMode>,
    pub ideal: Size,
    pub min: Size,
    /// Ideal aspect ratio, only sent with facing-mode requests
    pub aspect_ratio: Option<f64>,
}

impl StreamConstraints {
    pub fn for_selector(selector: &Selector, camera: &CameraConfig) -> Self {
        let facing_mode = selector.facing_mode();
        Self {
            device_id: selector.device_id().map(str::to_string),
            facing_mode,
            ideal: camera.ideal_size(),
            min: camera.min_size(),
            aspect_ratio: facing_mode.map(|_| camera.facing_aspect_ratio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapcamConfig;

    #[test]
    fn test_device_constraints_have_no_aspect_hint() {
        let config = SnapcamConfig::default();
        let constraints =
            StreamConstraints::for_selector(&Selector::device("cam-1"), &config.camera);
        assert_eq!(constraints.device_id.as_deref(), Some("cam-1"));
        assert_eq!(constraints.facing_mode, None);
        assert_eq!(constraints.aspect_ratio, None);
        assert_eq!(constraints.ideal, Size::new(1920, 1080));
        assert_eq!(constraints.min, Size::new(640, 400));
    }

    #[test]
    fn test_facing_constraints_carry_aspect_hint() {
        let config = SnapcamConfig::default();
        let constraints = StreamConstraints::for_selector(
            &Selector::facing(FacingMode::Environment),
            &config.camera,
        );
        assert_eq!(constraints.device_id, None);
        assert_eq!(constraints.facing_mode, Some(FacingMode::Environment));
        let ratio = constraints.aspect_ratio.unwrap();
        assert!((ratio - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_unavailable_capabilities_have_no_devices() {
        let caps = PlatformCapabilities::Unavailable;
        assert!(!caps.is_available());
        assert!(caps.media_devices().is_none());
        assert_eq!(format!("{:?}", caps), "Unavailable");
    }
}
