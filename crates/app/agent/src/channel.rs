//! Push delivery channel.

use herald_core::{Platform, ValidationError};

/// Native mobile platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativePlatform {
    Android,
    Ios,
}

/// How this device receives pushes. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushChannel {
    /// Native app with a platform push bridge.
    Native(NativePlatform),
    /// Browser / PWA.
    Web,
}

impl PushChannel {
    /// Platform reported to the server.
    pub fn platform(self) -> Platform {
        match self {
            Self::Native(NativePlatform::Android) => Platform::Android,
            Self::Native(NativePlatform::Ios) => Platform::Ios,
            Self::Web => Platform::Web,
        }
    }
}

impl From<Platform> for PushChannel {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Android => Self::Native(NativePlatform::Android),
            Platform::Ios => Self::Native(NativePlatform::Ios),
            Platform::Web => Self::Web,
        }
    }
}

impl std::str::FromStr for PushChannel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Platform>().map(Self::from)
    }
}
