use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },
}

impl SnapcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapcamError>;

/// Failures the platform reports when enumerating or opening cameras.
///
/// Classified once where the platform hands the failure over; nothing
/// downstream inspects error names again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("camera access denied: {0}")]
    PermissionDenied(String),

    #[error("no camera matches the request: {0}")]
    NotFound(String),

    #[error("camera could not be started: {0}")]
    NotReadable(String),

    #[error("requested constraints cannot be satisfied: {0}")]
    OverConstrained(String),

    #[error("camera capture not supported: {0}")]
    NotSupported(String),

    #[error("platform error: {0}")]
    Other(String),
}

impl PlatformError {
    /// Classify a browser `DOMException` by its `name`.
    pub fn from_dom_name(name: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                Self::PermissionDenied(message)
            }
            "NotFoundError" | "DevicesNotFoundError" => Self::NotFound(message),
            "NotReadableError" | "TrackStartError" | "AbortError" => Self::NotReadable(message),
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                Self::OverConstrained(message)
            }
            "NotSupportedError" | "TypeError" => Self::NotSupported(message),
            _ => Self::Other(format!("{}: {}", name, message)),
        }
    }

    /// Which capability flag this failure raises.
    pub fn kind(&self) -> FailureKind {
        match self {
            PlatformError::PermissionDenied(_) => FailureKind::PermissionDenied,
            _ => FailureKind::NotSupported,
        }
    }
}

/// The two persistent failure classes surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    NotSupported,
    PermissionDenied,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("{message} ({available} camera(s) known)")]
    SwitchUnavailable { available: usize, message: String },

    #[error("Camera device not found: {device_id}")]
    DeviceNotFound { device_id: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("{message}")]
    RasterUnsupported { message: String },

    #[error("Image encoding failed: {details}")]
    Encoding { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}
