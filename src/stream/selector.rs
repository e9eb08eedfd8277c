use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Front ("user") or rear ("environment") camera preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

impl FacingMode {
    pub fn opposite(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "front" => Ok(FacingMode::User),
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            other => Err(format!(
                "Unknown facing mode '{}'. Use 'user' or 'environment'",
                other
            )),
        }
    }
}

/// Criteria for requesting a camera stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Device(String),
    Facing(FacingMode),
    DeviceAndFacing(String, FacingMode),
}

impl Selector {
    pub fn device<S: Into<String>>(id: S) -> Self {
        Selector::Device(id.into())
    }

    pub fn facing(mode: FacingMode) -> Self {
        Selector::Facing(mode)
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            Selector::Device(id) | Selector::DeviceAndFacing(id, _) => Some(id),
            Selector::Facing(_) => None,
        }
    }

    pub fn facing_mode(&self) -> Option<FacingMode> {
        match self {
            Selector::Facing(mode) | Selector::DeviceAndFacing(_, mode) => Some(*mode),
            Selector::Device(_) => None,
        }
    }

    /// Same selector with the facing preference replaced or added
    pub fn with_facing(&self, mode: FacingMode) -> Self {
        match self.device_id() {
            Some(id) => Selector::DeviceAndFacing(id.to_string(), mode),
            None => Selector::Facing(mode),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Device(id) => write!(f, "device={}", id),
            Selector::Facing(mode) => write!(f, "facing={}", mode),
            Selector::DeviceAndFacing(id, mode) => write!(f, "device={} facing={}", id, mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_accessors() {
        let both = Selector::DeviceAndFacing("cam".to_string(), FacingMode::User);
        assert_eq!(both.device_id(), Some("cam"));
        assert_eq!(both.facing_mode(), Some(FacingMode::User));

        assert_eq!(Selector::device("cam").facing_mode(), None);
        assert_eq!(Selector::facing(FacingMode::Environment).device_id(), None);
    }

    #[test]
    fn test_with_facing_keeps_device() {
        assert_eq!(
            Selector::device("cam").with_facing(FacingMode::Environment),
            Selector::DeviceAndFacing("cam".to_string(), FacingMode::Environment)
        );
        assert_eq!(
            Selector::facing(FacingMode::User).with_facing(FacingMode::Environment),
            Selector::facing(FacingMode::Environment)
        );
    }

    #[test]
    fn test_facing_mode_parse() {
        assert_eq!("user".parse::<FacingMode>().unwrap(), FacingMode::User);
        assert_eq!("Rear".parse::<FacingMode>().unwrap(), FacingMode::Environment);
        assert!("sideways".parse::<FacingMode>().is_err());
        assert_eq!(FacingMode::User.opposite(), FacingMode::Environment);
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(Selector::device("cam").to_string(), "device=cam");
        assert_eq!(
            Selector::facing(FacingMode::Environment).to_string(),
            "facing=environment"
        );
    }
}
