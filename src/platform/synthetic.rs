//! In-process platform that fabricates cameras.
//!
//! Used by the test suites and by the CLI when no real backend is wired in.
//! Frames are a deterministic gradient at each device's resolution.

use super::{MediaDevices, MediaStream, MediaTrack, StreamConstraints};
use crate::device::Device;
use crate::error::PlatformError;
use crate::frame::Size;
use crate::stream::FacingMode;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A fabricated camera
#[derive(Debug, Clone)]
pub struct SyntheticDevice {
    pub id: String,
    pub label: String,
    pub resolution: Size,
    pub facing: Option<FacingMode>,
    /// Time `get_user_media` takes to open this device
    pub latency: Duration,
    /// Streams from this device wait for [`SyntheticPlatform::deliver_frames`]
    pub delayed_frames: bool,
    /// Streams say which device they came from
    pub reports_device_id: bool,
}

impl SyntheticDevice {
    pub fn new<I: Into<String>, L: Into<String>>(id: I, label: L) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            resolution: Size::new(1280, 720),
            facing: None,
            latency: Duration::ZERO,
            delayed_frames: false,
            reports_device_id: true,
        }
    }

    pub fn with_resolution(mut self, resolution: Size) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_facing(mut self, facing: FacingMode) -> Self {
        self.facing = Some(facing);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_delayed_frames(mut self) -> Self {
        self.delayed_frames = true;
        self
    }

    /// Streams from this device leave `device_id()` empty
    pub fn without_device_id(mut self) -> Self {
        self.reports_device_id = false;
        self
    }
}

/// How the platform answers stream requests
#[derive(Debug, Clone, Default)]
pub enum PermissionBehavior {
    #[default]
    Grant,
    Deny,
    Fail(PlatformError),
}

pub struct SyntheticPlatform {
    devices: RwLock<Vec<SyntheticDevice>>,
    others: RwLock<Vec<Device>>,
    labels_granted: AtomicBool,
    permission: RwLock<PermissionBehavior>,
    enumeration_error: RwLock<Option<PlatformError>>,
    next_stream: AtomicU64,
    streams: Mutex<Vec<Arc<SyntheticStream>>>,
    requests: Mutex<Vec<StreamConstraints>>,
}

impl SyntheticPlatform {
    pub fn new(devices: Vec<SyntheticDevice>) -> Self {
        Self {
            devices: RwLock::new(devices),
            others: RwLock::new(Vec::new()),
            labels_granted: AtomicBool::new(false),
            permission: RwLock::new(PermissionBehavior::Grant),
            enumeration_error: RwLock::new(None),
            next_stream: AtomicU64::new(1),
            streams: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Add a non-camera device such as a microphone
    pub fn add_other_device(&self, device: Device) {
        self.others.write().push(device);
    }

    pub fn add_device(&self, device: SyntheticDevice) {
        self.devices.write().push(device);
    }

    pub fn remove_device(&self, id: &str) {
        self.devices.write().retain(|d| d.id != id);
    }

    /// Reveal labels without opening a stream
    pub fn grant_labels(&self) {
        self.labels_granted.store(true, Ordering::SeqCst);
    }

    pub fn set_permission(&self, behavior: PermissionBehavior) {
        *self.permission.write() = behavior;
    }

    pub fn fail_enumeration(&self, error: PlatformError) {
        *self.enumeration_error.write() = Some(error);
    }

    /// Mark the first frame as decoded on every delayed stream
    pub fn deliver_frames(&self) {
        for stream in self.streams.lock().iter() {
            stream.frames_ready.store(true, Ordering::SeqCst);
        }
    }

    /// Tracks currently holding a device
    pub fn live_track_count(&self) -> usize {
        self.streams
            .lock()
            .iter()
            .filter(|s| s.track.is_live())
            .count()
    }

    /// Streams granted so far, live or not
    pub fn opened_stream_count(&self) -> usize {
        self.streams.lock().len()
    }

    /// Device behind every granted stream, in grant order
    pub fn opened_devices(&self) -> Vec<String> {
        self.streams
            .lock()
            .iter()
            .map(|s| s.device_id.clone())
            .collect()
    }

    /// Constraints of every `get_user_media` call, in call order
    pub fn requests(&self) -> Vec<StreamConstraints> {
        self.requests.lock().clone()
    }

    fn resolve(&self, constraints: &StreamConstraints) -> Result<SyntheticDevice, PlatformError> {
        let devices = self.devices.read();
        if let Some(id) = &constraints.device_id {
            return devices.iter().find(|d| &d.id == id).cloned().ok_or_else(|| {
                PlatformError::OverConstrained(format!("No device matches id '{}'", id))
            });
        }
        if let Some(facing) = constraints.facing_mode {
            if let Some(device) = devices.iter().find(|d| d.facing == Some(facing)) {
                return Ok(device.clone());
            }
        }
        devices
            .first()
            .cloned()
            .ok_or_else(|| PlatformError::NotFound("Requested device not found".to_string()))
    }
}

#[async_trait]
impl MediaDevices for SyntheticPlatform {
    async fn enumerate_devices(&self) -> Result<Vec<Device>, PlatformError> {
        if let Some(error) = self.enumeration_error.read().clone() {
            return Err(error);
        }
        let reveal = self.labels_granted.load(Ordering::SeqCst);
        let mut listed: Vec<Device> = self
            .devices
            .read()
            .iter()
            .map(|d| Device::video_input(d.id.clone(), if reveal { d.label.clone() } else { String::new() }))
            .collect();
        listed.extend(self.others.read().iter().cloned());
        Ok(listed)
    }

    async fn get_user_media(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn MediaStream>, PlatformError> {
        self.requests.lock().push(constraints.clone());

        match self.permission.read().clone() {
            PermissionBehavior::Grant => {}
            PermissionBehavior::Deny => {
                return Err(PlatformError::PermissionDenied(
                    "Permission denied".to_string(),
                ))
            }
            PermissionBehavior::Fail(error) => return Err(error),
        }

        let device = self.resolve(constraints)?;
        if !device.latency.is_zero() {
            tokio::time::sleep(device.latency).await;
        }

        let number = self.next_stream.fetch_add(1, Ordering::SeqCst);
        let stream = Arc::new(SyntheticStream {
            id: format!("stream-{}", number),
            device_id: device.id.clone(),
            reports_device_id: device.reports_device_id,
            resolution: device.resolution,
            frames_ready: AtomicBool::new(!device.delayed_frames),
            track: Arc::new(SyntheticTrack {
                id: format!("track-{}", number),
                live: AtomicBool::new(true),
            }),
        });
        self.labels_granted.store(true, Ordering::SeqCst);
        self.streams.lock().push(Arc::clone(&stream));
        debug!("Synthetic stream {} opened on {}", stream.id, device.id);
        Ok(stream)
    }
}

pub struct SyntheticStream {
    id: String,
    device_id: String,
    reports_device_id: bool,
    resolution: Size,
    frames_ready: AtomicBool,
    track: Arc<SyntheticTrack>,
}

impl SyntheticStream {
    fn producing(&self) -> bool {
        self.track.is_live() && self.frames_ready.load(Ordering::SeqCst)
    }
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![Arc::clone(&self.track) as Arc<dyn MediaTrack>]
    }

    fn device_id(&self) -> Option<String> {
        self.reports_device_id.then(|| self.device_id.clone())
    }

    fn frame_size(&self) -> Size {
        if self.producing() {
            self.resolution
        } else {
            Size::default()
        }
    }

    fn latest_frame(&self) -> Option<RgbaImage> {
        if !self.producing() || self.resolution.is_empty() {
            return None;
        }
        let Size { width, height } = self.resolution;
        Some(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
                255,
            ])
        }))
    }
}

pub struct SyntheticTrack {
    id: String,
    live: AtomicBool,
}

impl MediaTrack for SyntheticTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapcamConfig;
    use crate::stream::Selector;

    fn constraints(selector: Selector) -> StreamConstraints {
        StreamConstraints::for_selector(&selector, &SnapcamConfig::default().camera)
    }

    #[tokio::test]
    async fn test_labels_revealed_after_grant() {
        let platform = SyntheticPlatform::new(vec![SyntheticDevice::new("cam", "Cam")]);
        let before = platform.enumerate_devices().await.unwrap();
        assert!(before[0].label.is_empty());

        platform
            .get_user_media(&constraints(Selector::device("cam")))
            .await
            .unwrap();
        let after = platform.enumerate_devices().await.unwrap();
        assert_eq!(after[0].label, "Cam");
    }

    #[tokio::test]
    async fn test_facing_request_prefers_matching_device() {
        let platform = SyntheticPlatform::new(vec![
            SyntheticDevice::new("front", "Front").with_facing(FacingMode::User),
            SyntheticDevice::new("back", "Back").with_facing(FacingMode::Environment),
        ]);
        let stream = platform
            .get_user_media(&constraints(Selector::facing(FacingMode::Environment)))
            .await
            .unwrap();
        assert_eq!(stream.device_id().as_deref(), Some("back"));
    }

    #[tokio::test]
    async fn test_unknown_device_is_over_constrained() {
        let platform = SyntheticPlatform::new(vec![SyntheticDevice::new("cam", "Cam")]);
        let err = platform
            .get_user_media(&constraints(Selector::device("nope")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PlatformError::OverConstrained(_)));
    }

    #[tokio::test]
    async fn test_denied_permission() {
        let platform = SyntheticPlatform::new(vec![SyntheticDevice::new("cam", "Cam")]);
        platform.set_permission(PermissionBehavior::Deny);
        let err = platform
            .get_user_media(&constraints(Selector::device("cam")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PlatformError::PermissionDenied(_)));
        assert_eq!(platform.requests().len(), 1);
        assert_eq!(platform.opened_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_delayed_frames_until_delivered() {
        let platform = SyntheticPlatform::new(vec![SyntheticDevice::new("cam", "Cam")
            .with_resolution(Size::new(64, 48))
            .with_delayed_frames()]);
        let stream = platform
            .get_user_media(&constraints(Selector::device("cam")))
            .await
            .unwrap();
        assert!(stream.frame_size().is_empty());
        assert!(stream.latest_frame().is_none());

        platform.deliver_frames();
        assert_eq!(stream.frame_size(), Size::new(64, 48));
        assert!(stream.latest_frame().is_some());

        stream.tracks()[0].stop();
        assert!(stream.frame_size().is_empty());
    }
}
