//! Client platforms and broadcast targeting.

use crate::ValidationError;

/// Platform that issued a device token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Web,
}

impl Platform {
    /// Storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Web => "web",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            "web" => Ok(Self::Web),
            other => Err(ValidationError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Which active tokens a broadcast goes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetFilter {
    /// Restrict to one platform; `None` targets every platform.
    pub platform: Option<Platform>,
    /// Cap on the number of tokens, most recently seen first.
    pub limit: Option<usize>,
}

impl TargetFilter {
    /// Every active token.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a filter from loosely typed request fields.
    ///
    /// `"all"` or an absent platform means no platform restriction, and a
    /// zero limit means no cap.
    pub fn parse(platform: Option<&str>, limit: Option<usize>) -> Result<Self, ValidationError> {
        let platform = match platform {
            None | Some("all") | Some("") => None,
            Some(p) => Some(p.parse()?),
        };

        Ok(Self {
            platform,
            limit: limit.filter(|&l| l > 0),
        })
    }

    /// Restrict to one platform.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Cap the number of tokens.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
