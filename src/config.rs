use crate::capture::ImageEncoding;
use crate::error::Result;
use crate::frame::Size;
use crate::stream::FacingMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SnapcamConfig {
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub messages: MessagesConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Preferred stream resolution (width, height)
    #[serde(default = "default_ideal_resolution")]
    pub ideal_resolution: (u32, u32),

    /// Smallest acceptable stream resolution (width, height)
    #[serde(default = "default_min_resolution")]
    pub min_resolution: (u32, u32),

    /// Aspect ratio hint sent with facing-mode requests
    #[serde(default = "default_facing_aspect_ratio")]
    pub facing_aspect_ratio: f64,

    /// Facing mode used when no device is chosen
    #[serde(default)]
    pub default_facing_mode: FacingMode,

    /// Device to open on mount instead of the first enumerated one
    #[serde(default)]
    pub device_id: Option<String>,

    /// Whether switching cycles device ids or toggles facing mode
    #[serde(default)]
    pub switch_mode: SwitchMode,

    /// Re-enumerate after the first grant so labels become visible
    #[serde(default = "default_refresh_devices_on_grant")]
    pub refresh_devices_on_grant: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SwitchMode {
    #[default]
    Device,
    FacingMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    #[default]
    Jpeg,
    Png,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Encoding of captured stills
    #[serde(default)]
    pub format: CaptureFormat,

    /// JPEG quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

/// Host-supplied guidance texts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MessagesConfig {
    #[serde(default = "default_no_camera_accessible")]
    pub no_camera_accessible: String,

    #[serde(default = "default_permission_denied")]
    pub permission_denied: String,

    #[serde(default = "default_switch_camera")]
    pub switch_camera: String,

    #[serde(default = "default_canvas")]
    pub canvas: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Log every published event at debug level
    #[serde(default)]
    pub debug_events: bool,
}

impl CameraConfig {
    pub fn ideal_size(&self) -> Size {
        Size::new(self.ideal_resolution.0, self.ideal_resolution.1)
    }

    pub fn min_size(&self) -> Size {
        Size::new(self.min_resolution.0, self.min_resolution.1)
    }
}

impl CaptureConfig {
    pub fn encoding(&self) -> ImageEncoding {
        match self.format {
            CaptureFormat::Jpeg => ImageEncoding::Jpeg {
                quality: self.jpeg_quality,
            },
            CaptureFormat::Png => ImageEncoding::Png,
        }
    }
}

impl SnapcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from_file("snapcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "camera.ideal_resolution",
                vec![default_ideal_resolution().0, default_ideal_resolution().1],
            )?
            .set_default(
                "camera.min_resolution",
                vec![default_min_resolution().0, default_min_resolution().1],
            )?
            .set_default("camera.facing_aspect_ratio", default_facing_aspect_ratio())?
            .set_default("camera.default_facing_mode", "user")?
            .set_default("camera.switch_mode", "device")?
            .set_default(
                "camera.refresh_devices_on_grant",
                default_refresh_devices_on_grant(),
            )?
            .set_default("capture.format", "jpeg")?
            .set_default("capture.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("messages.no_camera_accessible", default_no_camera_accessible())?
            .set_default("messages.permission_denied", default_permission_denied())?
            .set_default("messages.switch_camera", default_switch_camera())?
            .set_default("messages.canvas", default_canvas())?
            .set_default(
                "session.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("session.debug_events", false)?
            .add_source(File::with_name(&path_str).required(false))
            // SNAPCAM__CAMERA__DEVICE_ID=...
            .add_source(Environment::with_prefix("SNAPCAM").separator("__"))
            .build()?;

        let config: SnapcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let (ideal_w, ideal_h) = self.camera.ideal_resolution;
        let (min_w, min_h) = self.camera.min_resolution;

        if ideal_w == 0 || ideal_h == 0 || min_w == 0 || min_h == 0 {
            return Err(ConfigError::Message(
                "Camera resolutions must be greater than 0".to_string(),
            ));
        }

        if min_w > ideal_w || min_h > ideal_h {
            return Err(ConfigError::Message(format!(
                "Minimum resolution {}x{} exceeds ideal resolution {}x{}",
                min_w, min_h, ideal_w, ideal_h
            )));
        }

        if !(self.camera.facing_aspect_ratio.is_finite() && self.camera.facing_aspect_ratio > 0.0)
        {
            return Err(ConfigError::Message(
                "Facing aspect ratio must be a positive number".to_string(),
            ));
        }

        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::Message(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.capture.jpeg_quality
            )));
        }

        if self.session.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for SnapcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                ideal_resolution: default_ideal_resolution(),
                min_resolution: default_min_resolution(),
                facing_aspect_ratio: default_facing_aspect_ratio(),
                default_facing_mode: FacingMode::default(),
                device_id: None,
                switch_mode: SwitchMode::default(),
                refresh_devices_on_grant: default_refresh_devices_on_grant(),
            },
            capture: CaptureConfig {
                format: CaptureFormat::default(),
                jpeg_quality: default_jpeg_quality(),
            },
            messages: MessagesConfig::default(),
            session: SessionConfig {
                event_bus_capacity: default_event_bus_capacity(),
                debug_events: false,
            },
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            no_camera_accessible: default_no_camera_accessible(),
            permission_denied: default_permission_denied(),
            switch_camera: default_switch_camera(),
            canvas: default_canvas(),
        }
    }
}

// Default value functions
fn default_ideal_resolution() -> (u32, u32) {
    (1920, 1080)
}
fn default_min_resolution() -> (u32, u32) {
    (640, 400)
}
fn default_facing_aspect_ratio() -> f64 {
    16.0 / 9.0
}
fn default_refresh_devices_on_grant() -> bool {
    true
}

fn default_jpeg_quality() -> u8 {
    92
}

fn default_no_camera_accessible() -> String {
    "No camera device accessible. Please connect your camera or try a different browser."
        .to_string()
}
fn default_permission_denied() -> String {
    "Permission denied. Please refresh and give camera permission.".to_string()
}
fn default_switch_camera() -> String {
    "It is not possible to switch camera to different one because there is only one video device accessible."
        .to_string()
}
fn default_canvas() -> String {
    "Canvas is not supported.".to_string()
}

fn default_event_bus_capacity() -> usize {
    64
}
