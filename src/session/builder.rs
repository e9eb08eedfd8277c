use super::{CameraSession, FirstFrameCallback};
use crate::capture::{Canvas, RasterTarget};
use crate::config::SnapcamConfig;
use crate::device::DeviceRegistry;
use crate::error::{Result, SnapcamError};
use crate::events::EventBus;
use crate::frame::Size;
use crate::gallery::ImageGallery;
use crate::platform::PlatformCapabilities;
use crate::preview::{PreviewSink, VideoPreview};
use crate::stream::StreamSession;
use parking_lot::Mutex;
use std::sync::Arc;

/// Builder for [`CameraSession`]
pub struct CameraSessionBuilder {
    config: Option<SnapcamConfig>,
    capabilities: Option<PlatformCapabilities>,
    preview: Option<Arc<dyn PreviewSink>>,
    raster: Option<Box<dyn RasterTarget>>,
    raster_supported: bool,
    container: Size,
    on_first_frame: Option<FirstFrameCallback>,
    on_device_count: Option<Arc<dyn Fn(usize) + Send + Sync>>,
}

impl CameraSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            capabilities: None,
            preview: None,
            raster: None,
            raster_supported: true,
            container: Size::default(),
            on_first_frame: None,
            on_device_count: None,
        }
    }

    pub fn config(mut self, config: SnapcamConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Preview sink; a [`VideoPreview`] is used when none is given
    pub fn preview(mut self, preview: Arc<dyn PreviewSink>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Raster target; an in-memory [`Canvas`] is used when none is given
    pub fn raster(mut self, raster: Box<dyn RasterTarget>) -> Self {
        self.raster = Some(raster);
        self.raster_supported = true;
        self
    }

    /// Build without any raster target, as on a host that has no 2D surface
    pub fn without_raster(mut self) -> Self {
        self.raster = None;
        self.raster_supported = false;
        self
    }

    pub fn container_size(mut self, size: Size) -> Self {
        self.container = size;
        self
    }

    /// Called once per stream when the preview shows its first frame
    pub fn on_first_frame<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_first_frame = Some(Arc::new(callback));
        self
    }

    /// Called with the camera count after every enumeration
    pub fn on_device_count<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_device_count = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<CameraSession> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let capabilities = self.capabilities.ok_or_else(|| {
            SnapcamError::system("Platform capabilities must be specified")
        })?;

        let registry = Arc::new(match self.on_device_count {
            Some(callback) => DeviceRegistry::with_count_callback(callback),
            None => DeviceRegistry::new(),
        });

        let events = if config.session.debug_events {
            EventBus::with_debug_logging(config.session.event_bus_capacity)
        } else {
            EventBus::new(config.session.event_bus_capacity)
        };

        let preview = self
            .preview
            .unwrap_or_else(|| Arc::new(VideoPreview::new()) as Arc<dyn PreviewSink>);

        let raster = if self.raster_supported {
            Some(Mutex::new(
                self.raster
                    .unwrap_or_else(|| Box::new(Canvas::new()) as Box<dyn RasterTarget>),
            ))
        } else {
            None
        };

        let stream = StreamSession::new(
            capabilities,
            config.camera.clone(),
            preview,
            registry,
            events.clone(),
        );

        Ok(CameraSession {
            config,
            stream,
            gallery: Mutex::new(ImageGallery::new()),
            raster,
            container: Mutex::new(self.container),
            on_first_frame: self.on_first_frame,
            events,
        })
    }
}

impl Default for CameraSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
