use crate::platform::PlatformCapabilities;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Kind of media device reported by enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// A media device as reported by the platform.
///
/// `label` may be empty until the user has granted camera access once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub label: String,
    pub kind: DeviceKind,
}

impl Device {
    pub fn video_input<I: Into<String>, L: Into<String>>(id: I, label: L) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
        }
    }

    pub fn has_label(&self) -> bool {
        !self.label.is_empty()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_label() {
            write!(f, "{} ({})", self.label, self.id)
        } else {
            write!(f, "<unlabelled> ({})", self.id)
        }
    }
}

type CountCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Cached snapshot of the video inputs the platform knows about.
///
/// Every refresh replaces the whole snapshot, so overlapping refreshes are harmless.
pub struct DeviceRegistry {
    devices: RwLock<Vec<Device>>,
    on_count: Option<CountCallback>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
            on_count: None,
        }
    }

    /// Registry that reports the device count after every refresh
    pub fn with_count_callback(callback: CountCallback) -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
            on_count: Some(callback),
        }
    }

    /// Query the platform and keep only video inputs, in platform order.
    ///
    /// Enumeration failures are not errors: the snapshot becomes empty.
    pub async fn refresh(&self, capabilities: &PlatformCapabilities) -> Vec<Device> {
        let listed = match capabilities.media_devices() {
            Some(media) => match media.enumerate_devices().await {
                Ok(all) => all,
                Err(e) => {
                    warn!("Device enumeration failed, treating as no cameras: {}", e);
                    Vec::new()
                }
            },
            None => {
                debug!("Capture API unavailable, no devices to enumerate");
                Vec::new()
            }
        };

        let videos: Vec<Device> = listed
            .into_iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .collect();

        info!(
            "Enumerated {} video input(s){}",
            videos.len(),
            if videos.iter().any(|d| !d.has_label()) {
                " (labels hidden until permission is granted)"
            } else {
                ""
            }
        );

        *self.devices.write() = videos.clone();

        if let Some(callback) = &self.on_count {
            callback(videos.len());
        }

        videos
    }

    pub fn devices(&self) -> Vec<Device> {
        self.devices.read().clone()
    }

    pub fn count(&self) -> usize {
        self.devices.read().len()
    }

    pub fn get(&self, id: &str) -> Option<Device> {
        self.devices.read().iter().find(|d| d.id == id).cloned()
    }

    pub fn first(&self) -> Option<Device> {
        self.devices.read().first().cloned()
    }

    /// True when the snapshot is empty or any label is still hidden
    pub fn needs_relabel(&self) -> bool {
        let devices = self.devices.read();
        devices.is_empty() || devices.iter().any(|d| !d.has_label())
    }

    /// The device after `current` in platform order, wrapping around.
    ///
    /// `None` when `current` is not in the snapshot.
    pub fn next_after(&self, current: &str) -> Option<Device> {
        let devices = self.devices.read();
        let index = devices.iter().position(|d| d.id == current)?;
        devices.get((index + 1) % devices.len()).cloned()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::platform::synthetic::{SyntheticDevice, SyntheticPlatform};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn two_camera_platform() -> Arc<SyntheticPlatform> {
        Arc::new(SyntheticPlatform::new(vec![
            SyntheticDevice::new("front", "Front Camera"),
            SyntheticDevice::new("back", "Back Camera"),
        ]))
    }

    #[tokio::test]
    async fn test_refresh_keeps_only_video_inputs_in_order() {
        let platform = two_camera_platform();
        platform.add_other_device(Device {
            id: "mic".to_string(),
            label: "Microphone".to_string(),
            kind: DeviceKind::AudioInput,
        });
        platform.grant_labels();

        let registry = DeviceRegistry::new();
        let devices = registry
            .refresh(&PlatformCapabilities::available(platform))
            .await;

        let ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["front", "back"]);
        assert_eq!(registry.count(), 2);
        assert!(!registry.needs_relabel());
    }

    #[tokio::test]
    async fn test_labels_hidden_before_grant() {
        let registry = DeviceRegistry::new();
        registry
            .refresh(&PlatformCapabilities::available(two_camera_platform()))
            .await;

        assert_eq!(registry.count(), 2);
        assert!(registry.devices().iter().all(|d| d.label.is_empty()));
        assert!(registry.needs_relabel());
    }

    #[tokio::test]
    async fn test_enumeration_failure_yields_empty_snapshot() {
        let platform = two_camera_platform();
        platform.fail_enumeration(PlatformError::PermissionDenied("blocked".to_string()));

        let registry = DeviceRegistry::new();
        let devices = registry
            .refresh(&PlatformCapabilities::available(platform))
            .await;

        assert!(devices.is_empty());
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_platform_yields_empty_snapshot() {
        let registry = DeviceRegistry::new();
        let devices = registry.refresh(&PlatformCapabilities::Unavailable).await;
        assert!(devices.is_empty());
    }

    #[tokio::test]
    async fn test_count_callback_fires_on_refresh() {
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let seen_cb = Arc::clone(&seen);
        let registry = DeviceRegistry::with_count_callback(Arc::new(move |n| {
            seen_cb.store(n, Ordering::SeqCst);
        }));

        registry
            .refresh(&PlatformCapabilities::available(two_camera_platform()))
            .await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_next_after_wraps() {
        let platform = Arc::new(SyntheticPlatform::new(vec![
            SyntheticDevice::new("a", "A"),
            SyntheticDevice::new("b", "B"),
            SyntheticDevice::new("c", "C"),
        ]));
        let registry = DeviceRegistry::new();
        registry
            .refresh(&PlatformCapabilities::available(platform))
            .await;

        assert_eq!(registry.next_after("a").unwrap().id, "b");
        assert_eq!(registry.next_after("c").unwrap().id, "a");
        assert!(registry.next_after("zzz").is_none());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(
            Device::video_input("cam-1", "Front").to_string(),
            "Front (cam-1)"
        );
        assert_eq!(
            Device::video_input("cam-1", "").to_string(),
            "<unlabelled> (cam-1)"
        );
    }
}
