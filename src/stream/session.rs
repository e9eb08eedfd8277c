use super::{FacingMode, Selector, StreamHandle};
use crate::config::{CameraConfig, SwitchMode};
use crate::device::DeviceRegistry;
use crate::error::{FailureKind, StreamError};
use crate::events::{EventBus, SessionEvent};
use crate::platform::{PlatformCapabilities, StreamConstraints};
use crate::preview::PreviewSink;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persistent failure classes shown to the user until the next acquisition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub not_supported: bool,
    pub permission_denied: bool,
}

impl CapabilityFlags {
    fn raise(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::NotSupported => self.not_supported = true,
            FailureKind::PermissionDenied => self.permission_denied = true,
        }
    }
}

/// Result of one acquisition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { stream_id: String },
    NotSupported,
    PermissionDenied,
    /// A newer request or a release happened while this one was pending
    Superseded,
}

impl AcquireOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, AcquireOutcome::Acquired { .. })
    }
}

struct StreamState {
    active_selector: Option<Selector>,
    handle: Option<StreamHandle>,
    flags: CapabilityFlags,
    first_frame_reported: bool,
    /// Bumped by every acquire and release; results for an older value are stale
    token: u64,
}

/// Owner of the single live camera stream.
///
/// The previous stream is always stopped and unbound from the preview before a
/// new request is sent, and a stream that arrives for a superseded request is
/// stopped without ever being shown.
pub struct StreamSession {
    capabilities: PlatformCapabilities,
    camera: CameraConfig,
    preview: Arc<dyn PreviewSink>,
    registry: Arc<DeviceRegistry>,
    state: Mutex<StreamState>,
    requests: AtomicU64,
    events: EventBus,
}

impl StreamSession {
    pub fn new(
        capabilities: PlatformCapabilities,
        camera: CameraConfig,
        preview: Arc<dyn PreviewSink>,
        registry: Arc<DeviceRegistry>,
        events: EventBus,
    ) -> Self {
        Self {
            capabilities,
            camera,
            preview,
            registry,
            state: Mutex::new(StreamState {
                active_selector: None,
                handle: None,
                flags: CapabilityFlags::default(),
                first_frame_reported: false,
                token: 0,
            }),
            requests: AtomicU64::new(0),
            events,
        }
    }

    /// Release the current stream, then request one matching `selector`.
    ///
    /// Platform failures never surface as errors: they raise a capability flag
    /// and are reported through the outcome.
    pub async fn acquire(&self, selector: Selector) -> AcquireOutcome {
        let (token, released) = {
            let mut state = self.state.lock();
            let token = self.next_token(&mut state);
            let released = self.release_locked(&mut state);
            state.active_selector = Some(selector.clone());
            state.flags = CapabilityFlags::default();
            state.first_frame_reported = false;
            (token, released)
        };
        if let Some(stream_id) = released {
            self.events.notify(SessionEvent::StreamReleased { stream_id });
        }

        let media = match self.capabilities.media_devices() {
            Some(media) => Arc::clone(media),
            None => {
                warn!("Camera capture API is not available on this platform");
                return self.fail(
                    token,
                    FailureKind::NotSupported,
                    "capture API unavailable".to_string(),
                );
            }
        };

        info!("Requesting camera stream ({})", selector);
        self.events.notify(SessionEvent::AcquisitionStarted {
            selector: selector.clone(),
        });

        let constraints = StreamConstraints::for_selector(&selector, &self.camera);
        debug!("Stream constraints: {:?}", constraints);

        match media.get_user_media(&constraints).await {
            Ok(stream) => {
                let mut handle = StreamHandle::new(stream, selector.clone());
                let stream_id = handle.id().to_string();
                {
                    let mut state = self.state.lock();
                    if state.token != token {
                        drop(state);
                        info!("Discarding stream {} from a superseded request", stream_id);
                        handle.stop();
                        self.events
                            .notify(SessionEvent::AcquisitionSuperseded { stream_id });
                        return AcquireOutcome::Superseded;
                    }
                    self.preview.attach(Arc::clone(handle.stream()));
                    state.handle = Some(handle);
                    state.flags = CapabilityFlags::default();
                }

                info!("Camera stream {} acquired ({})", stream_id, selector);
                self.events.notify(SessionEvent::StreamAcquired {
                    stream_id: stream_id.clone(),
                    selector,
                });

                if self.camera.refresh_devices_on_grant && self.registry.needs_relabel() {
                    debug!("Re-enumerating devices after grant");
                    let devices = self.registry.refresh(&self.capabilities).await;
                    self.events.notify(SessionEvent::DevicesChanged {
                        count: devices.len(),
                    });
                }

                AcquireOutcome::Acquired { stream_id }
            }
            Err(e) => {
                warn!("Camera stream request failed: {}", e);
                self.fail(token, e.kind(), e.to_string())
            }
        }
    }

    fn fail(&self, token: u64, kind: FailureKind, reason: String) -> AcquireOutcome {
        {
            let mut state = self.state.lock();
            if state.token != token {
                debug!("Ignoring failure of a superseded request: {}", reason);
                return AcquireOutcome::Superseded;
            }
            state.flags.raise(kind);
        }
        self.events
            .notify(SessionEvent::AcquisitionFailed { kind, reason });
        match kind {
            FailureKind::NotSupported => AcquireOutcome::NotSupported,
            FailureKind::PermissionDenied => AcquireOutcome::PermissionDenied,
        }
    }

    /// Stop the current stream and unbind the preview.
    ///
    /// Pending acquisitions become stale. Returns whether a stream was stopped.
    pub fn release(&self) -> bool {
        let released = {
            let mut state = self.state.lock();
            self.next_token(&mut state);
            self.release_locked(&mut state)
        };
        match released {
            Some(stream_id) => {
                self.events.notify(SessionEvent::StreamReleased { stream_id });
                true
            }
            None => {
                debug!("Release requested with no active stream");
                false
            }
        }
    }

    fn next_token(&self, state: &mut StreamState) -> u64 {
        let token = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        state.token = token;
        token
    }

    fn release_locked(&self, state: &mut StreamState) -> Option<String> {
        let mut handle = state.handle.take()?;
        self.preview.detach();
        handle.stop();
        info!("Camera stream {} released", handle.id());
        Some(handle.id().to_string())
    }

    /// Move to another camera.
    ///
    /// In device mode the next known device in platform order is opened; with
    /// two devices that is simply the other one. When the platform does not
    /// report which device it opened, a facing selector is toggled instead and
    /// anything else is an error. In facing-mode mode the facing preference is
    /// toggled. Fewer than two known devices is an error and leaves everything
    /// untouched.
    pub async fn switch_device(
        &self,
        unavailable_message: &str,
    ) -> Result<AcquireOutcome, StreamError> {
        let available = self.registry.count();
        if available < 2 {
            warn!("Camera switch requested with {} known device(s)", available);
            return Err(StreamError::SwitchUnavailable {
                available,
                message: unavailable_message.to_string(),
            });
        }

        let next = match self.camera.switch_mode {
            SwitchMode::Device => match self.current_device_id() {
                Some(current) => {
                    let device = self.registry.next_after(&current).ok_or_else(|| {
                        warn!("Open camera {} is not among the known devices", current);
                        StreamError::SwitchUnavailable {
                            available,
                            message: unavailable_message.to_string(),
                        }
                    })?;
                    Selector::device(device.id)
                }
                // The platform did not say which camera it opened
                None => match self.active_selector().and_then(|s| s.facing_mode()) {
                    Some(facing) => {
                        debug!("Open camera unknown, toggling facing mode instead");
                        Selector::facing(facing.opposite())
                    }
                    None => {
                        warn!("Camera switch requested but the open camera is unknown");
                        return Err(StreamError::SwitchUnavailable {
                            available,
                            message: unavailable_message.to_string(),
                        });
                    }
                },
            },
            SwitchMode::FacingMode => {
                let current = self
                    .active_selector()
                    .and_then(|s| s.facing_mode())
                    .unwrap_or(self.camera.default_facing_mode);
                Selector::facing(current.opposite())
            }
        };

        info!("Switching camera to {}", next);
        Ok(self.acquire(next).await)
    }

    /// Open a specific enumerated device
    pub async fn select_device(&self, device_id: &str) -> Result<AcquireOutcome, StreamError> {
        if self.registry.get(device_id).is_none() {
            return Err(StreamError::DeviceNotFound {
                device_id: device_id.to_string(),
            });
        }
        Ok(self.acquire(Selector::device(device_id)).await)
    }

    /// Reopen with a facing preference instead of a device id
    pub async fn set_facing_mode(&self, mode: FacingMode) -> AcquireOutcome {
        self.acquire(Selector::facing(mode)).await
    }

    /// Record that the preview has decoded a frame.
    ///
    /// Returns true only the first time per stream, once the preview reports
    /// a real size.
    pub fn notify_frame_ready(&self) -> bool {
        let stream_id = {
            let mut state = self.state.lock();
            if state.first_frame_reported || self.preview.natural_size().is_empty() {
                return false;
            }
            let Some(handle) = state.handle.as_ref() else {
                return false;
            };
            let stream_id = handle.id().to_string();
            state.first_frame_reported = true;
            stream_id
        };
        debug!("First frame from stream {}", stream_id);
        self.events.notify(SessionEvent::PreviewReady { stream_id });
        true
    }

    pub fn active_selector(&self) -> Option<Selector> {
        self.state.lock().active_selector.clone()
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.state.lock().flags
    }

    pub fn not_supported(&self) -> bool {
        self.state.lock().flags.not_supported
    }

    pub fn permission_denied(&self) -> bool {
        self.state.lock().flags.permission_denied
    }

    pub fn has_stream(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    pub fn stream_id(&self) -> Option<String> {
        self.state
            .lock()
            .handle
            .as_ref()
            .map(|h| h.id().to_string())
    }

    /// Device of the live stream, falling back to the selector's device
    pub fn current_device_id(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .handle
            .as_ref()
            .and_then(|h| h.stream().device_id())
            .or_else(|| {
                state
                    .active_selector
                    .as_ref()
                    .and_then(|s| s.device_id().map(str::to_string))
            })
    }

    pub fn capabilities(&self) -> &PlatformCapabilities {
        &self.capabilities
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn preview(&self) -> &Arc<dyn PreviewSink> {
        &self.preview
    }

    pub fn camera_config(&self) -> &CameraConfig {
        &self.camera
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(mut handle) = state.handle.take() {
            self.preview.detach();
            handle.stop();
            debug!("Stream {} stopped on session drop", handle.id());
        }
    }
}
