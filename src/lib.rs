pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod frame;
pub mod gallery;
pub mod platform;
pub mod preview;
pub mod session;
pub mod stream;

pub use capture::{capture_frame, Canvas, CapturedImage, ImageEncoding, RasterTarget};
pub use config::{CaptureFormat, SnapcamConfig, SwitchMode};
pub use device::{Device, DeviceKind, DeviceRegistry};
pub use error::{
    CaptureError, EventBusError, FailureKind, PlatformError, Result, SnapcamError, StreamError,
};
pub use events::{EventBus, EventFilter, EventReceiver, SessionEvent};
pub use frame::{compute_crop, CropRect, FrameSource, Size};
pub use gallery::ImageGallery;
pub use platform::{MediaDevices, MediaStream, MediaTrack, PlatformCapabilities, StreamConstraints};
pub use preview::{PreviewSink, VideoPreview};
pub use session::{CameraSession, CameraSessionBuilder, Guidance};
pub use stream::{
    AcquireOutcome, CapabilityFlags, FacingMode, Selector, StreamHandle, StreamSession,
};
