//! The camera session a presentation layer drives.
//!
//! [`CameraSession`] ties the device registry, the stream session, photo
//! capture and the image gallery together behind one command API, and
//! announces every change on its [`EventBus`].

mod builder;

pub use builder::CameraSessionBuilder;

use crate::capture::{capture_frame, CapturedImage, RasterTarget};
use crate::config::{SnapcamConfig, SwitchMode};
use crate::device::Device;
use crate::error::{CaptureError, StreamError};
use crate::events::{EventBus, EventFilter, EventReceiver, SessionEvent};
use crate::frame::Size;
use crate::gallery::ImageGallery;
use crate::stream::{AcquireOutcome, CapabilityFlags, FacingMode, Selector, StreamSession};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub(crate) type FirstFrameCallback = Arc<dyn Fn() + Send + Sync>;

/// A message the presentation layer should keep showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Guidance {
    NoCameraAccessible(String),
    PermissionDenied(String),
}

impl Guidance {
    pub fn message(&self) -> &str {
        match self {
            Guidance::NoCameraAccessible(message) | Guidance::PermissionDenied(message) => message,
        }
    }
}

pub struct CameraSession {
    config: SnapcamConfig,
    stream: StreamSession,
    gallery: Mutex<ImageGallery>,
    raster: Option<Mutex<Box<dyn RasterTarget>>>,
    container: Mutex<Size>,
    on_first_frame: Option<FirstFrameCallback>,
    events: EventBus,
}

impl CameraSession {
    pub fn builder() -> CameraSessionBuilder {
        CameraSessionBuilder::new()
    }

    /// Enumerate devices and open the initial camera.
    ///
    /// The configured device wins when it is known; otherwise the first
    /// enumerated device, or the default facing mode when nothing is listed.
    pub async fn mount(&self) -> AcquireOutcome {
        let devices = self.refresh_devices().await;
        let selector = self.initial_selector(&devices);
        info!("Mounting camera session with {}", selector);
        self.stream.acquire(selector).await
    }

    fn initial_selector(&self, devices: &[Device]) -> Selector {
        let camera = &self.config.camera;
        if let Some(id) = &camera.device_id {
            if devices.iter().any(|d| &d.id == id) {
                return Selector::device(id.clone());
            }
            warn!("Configured camera '{}' is not available", id);
        }
        if camera.switch_mode == SwitchMode::FacingMode {
            return Selector::facing(camera.default_facing_mode);
        }
        match devices.first() {
            Some(device) => Selector::device(device.id.clone()),
            None => Selector::facing(camera.default_facing_mode),
        }
    }

    /// Re-run device enumeration
    pub async fn refresh_devices(&self) -> Vec<Device> {
        let devices = self
            .stream
            .registry()
            .refresh(self.stream.capabilities())
            .await;
        self.events.notify(SessionEvent::DevicesChanged {
            count: devices.len(),
        });
        devices
    }

    pub async fn acquire(&self, selector: Selector) -> AcquireOutcome {
        self.stream.acquire(selector).await
    }

    pub fn release(&self) -> bool {
        self.stream.release()
    }

    /// Switch to another camera; fails with the configured message when fewer than two are known
    pub async fn switch_device(&self) -> Result<AcquireOutcome, StreamError> {
        self.stream
            .switch_device(&self.config.messages.switch_camera)
            .await
    }

    pub async fn select_device(&self, device_id: &str) -> Result<AcquireOutcome, StreamError> {
        self.stream.select_device(device_id).await
    }

    pub async fn set_facing_mode(&self, mode: FacingMode) -> AcquireOutcome {
        self.stream.set_facing_mode(mode).await
    }

    /// Size of the element the preview is shown in; captures match its aspect ratio
    pub fn set_container_size(&self, size: Size) {
        debug!("Container resized to {}", size);
        *self.container.lock() = size;
    }

    pub fn container_size(&self) -> Size {
        *self.container.lock()
    }

    /// Take a still of the live preview cropped to the container's aspect ratio.
    ///
    /// `Ok(None)` while the stream is warming up or sizes are unknown. The
    /// still is not added to the gallery.
    pub fn capture(&self) -> Result<Option<CapturedImage>, CaptureError> {
        let raster = self
            .raster
            .as_ref()
            .ok_or_else(|| CaptureError::RasterUnsupported {
                message: self.config.messages.canvas.clone(),
            })?;

        if !self.stream.has_stream() {
            debug!("Capture requested without a live stream");
            return Ok(None);
        }

        let target = self.container_size();
        let image = {
            let mut raster = raster.lock();
            capture_frame(
                &**self.stream.preview(),
                target,
                &mut **raster,
                self.config.capture.encoding(),
            )?
        };

        if let Some(image) = &image {
            info!(
                "Captured {}x{} still ({} bytes)",
                image.width(),
                image.height(),
                image.len()
            );
            self.events.notify(SessionEvent::PhotoCaptured {
                width: image.width(),
                height: image.height(),
                bytes: image.len(),
            });
        }
        Ok(image)
    }

    /// Capture and append the still when one was produced
    pub fn capture_and_add(&self) -> Result<Option<CapturedImage>, CaptureError> {
        let image = self.capture()?;
        if let Some(image) = &image {
            self.add_image(image.clone());
        }
        Ok(image)
    }

    pub fn add_image(&self, image: CapturedImage) {
        let count = {
            let mut gallery = self.gallery.lock();
            gallery.add(image);
            gallery.len()
        };
        self.events.notify(SessionEvent::ImagesChanged { count });
    }

    /// Remove by position; out-of-range indexes are ignored
    pub fn remove_image(&self, index: usize) -> Option<CapturedImage> {
        let (removed, count) = {
            let mut gallery = self.gallery.lock();
            let removed = gallery.remove_at(index);
            (removed, gallery.len())
        };
        if removed.is_some() {
            self.events.notify(SessionEvent::ImagesChanged { count });
        }
        removed
    }

    pub fn clear_images(&self) {
        self.gallery.lock().clear();
        self.events.notify(SessionEvent::ImagesChanged { count: 0 });
    }

    pub fn images(&self) -> Vec<CapturedImage> {
        self.gallery.lock().to_vec()
    }

    pub fn image_count(&self) -> usize {
        self.gallery.lock().len()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.stream.registry().devices()
    }

    pub fn device_count(&self) -> usize {
        self.stream.registry().count()
    }

    pub fn active_selector(&self) -> Option<Selector> {
        self.stream.active_selector()
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.stream.flags()
    }

    pub fn not_supported(&self) -> bool {
        self.stream.not_supported()
    }

    pub fn permission_denied(&self) -> bool {
        self.stream.permission_denied()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.has_stream()
    }

    pub fn stream_id(&self) -> Option<String> {
        self.stream.stream_id()
    }

    /// Messages for the failure flags currently raised
    pub fn guidance(&self) -> Vec<Guidance> {
        let flags = self.flags();
        let messages = &self.config.messages;
        let mut guidance = Vec::new();
        if flags.not_supported {
            guidance.push(Guidance::NoCameraAccessible(
                messages.no_camera_accessible.clone(),
            ));
        }
        if flags.permission_denied {
            guidance.push(Guidance::PermissionDenied(messages.permission_denied.clone()));
        }
        guidance
    }

    /// Called by the presentation layer whenever the preview decodes a frame
    pub fn notify_frame_ready(&self) {
        if self.stream.notify_frame_ready() {
            if let Some(callback) = &self.on_first_frame {
                callback();
            }
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_filtered<S: Into<String>>(&self, filter: EventFilter, name: S) -> EventReceiver {
        self.events.subscribe_filtered(filter, name)
    }

    pub fn config(&self) -> &SnapcamConfig {
        &self.config
    }

    /// Hand the images to the host and stop the camera.
    ///
    /// Works through a shared reference, so a session behind an `Arc` can be
    /// ended while other holders still have acquisitions in flight; those
    /// come back superseded.
    pub fn finish(&self) -> Vec<CapturedImage> {
        let images = self.gallery.lock().take_all();
        self.stream.release();
        info!("Camera session finished with {} image(s)", images.len());
        self.events.notify(SessionEvent::SessionFinished {
            image_count: images.len(),
        });
        images
    }

    /// Discard the images and stop the camera
    pub fn cancel(&self) {
        let discarded = {
            let mut gallery = self.gallery.lock();
            let count = gallery.len();
            gallery.clear();
            count
        };
        self.stream.release();
        info!("Camera session cancelled, {} image(s) discarded", discarded);
        self.events.notify(SessionEvent::SessionCancelled);
    }
}
