use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewportParseError {
    #[error("Expected WIDTHxHEIGHT or a device name, got {0:?}")]
    Malformed(String),
    #[error("Viewport {0:?} has a zero dimension")]
    ZeroSize(String),
    #[error("Unknown device preset: {0}")]
    UnknownDevice(String),
}

impl Viewport {
    /// `1280x720`; the separator is case-insensitive
    pub fn parse_size(text: &str) -> Option<Self> {
        let (width, height) = text.trim().split_once(['x', 'X'])?;
        Some(Viewport {
            width: width.parse().ok()?,
            height: height.parse().ok()?,
        })
    }
}

/// Either `WIDTHxHEIGHT` or a preset name such as `mobile-small`
impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(viewport) = Viewport::parse_size(s) else {
            return match s.parse::<DevicePreset>() {
                Ok(preset) => Ok(preset.viewport()),
                Err(_) if s.bytes().any(|b| b.is_ascii_digit()) => {
                    Err(ViewportParseError::Malformed(s.to_string()))
                }
                Err(e) => Err(e),
            };
        };
        if viewport.width == 0 || viewport.height == 0 {
            return Err(ViewportParseError::ZeroSize(s.to_string()));
        }
        Ok(viewport)
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Named window sizes accepted by the tool protocol and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevicePreset {
    Desktop,
    Laptop,
    TabletLandscape,
    TabletPortrait,
    MobileLarge,
    MobileMedium,
    MobileSmall,
}

impl DevicePreset {
    pub const ALL: [DevicePreset; 7] = [
        DevicePreset::Desktop,
        DevicePreset::Laptop,
        DevicePreset::TabletLandscape,
        DevicePreset::TabletPortrait,
        DevicePreset::MobileLarge,
        DevicePreset::MobileMedium,
        DevicePreset::MobileSmall,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DevicePreset::Desktop => "desktop",
            DevicePreset::Laptop => "laptop",
            DevicePreset::TabletLandscape => "tablet-landscape",
            DevicePreset::TabletPortrait => "tablet-portrait",
            DevicePreset::MobileLarge => "mobile-large",
            DevicePreset::MobileMedium => "mobile-medium",
            DevicePreset::MobileSmall => "mobile-small",
        }
    }

    pub fn viewport(self) -> Viewport {
        let (width, height) = match self {
            DevicePreset::Desktop => (1920, 1080),
            DevicePreset::Laptop => (1366, 768),
            DevicePreset::TabletLandscape => (1024, 768),
            DevicePreset::TabletPortrait => (768, 1024),
            DevicePreset::MobileLarge => (428, 926),
            DevicePreset::MobileMedium => (390, 844),
            DevicePreset::MobileSmall => (375, 667),
        };
        Viewport { width, height }
    }
}

impl FromStr for DevicePreset {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| ViewportParseError::UnknownDevice(s.to_string()))
    }
}

impl std::fmt::Display for DevicePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_or_preset() {
        assert_eq!(
            "1280X720".parse::<Viewport>(),
            Ok(Viewport {
                width: 1280,
                height: 720
            })
        );
        assert_eq!(
            "tablet-portrait".parse::<Viewport>(),
            Ok(DevicePreset::TabletPortrait.viewport())
        );
    }

    #[test]
    fn test_parse_rejects_bad_sizes() {
        assert_eq!(
            "1440".parse::<Viewport>(),
            Err(ViewportParseError::Malformed("1440".to_string()))
        );
        assert_eq!(
            "800x-1".parse::<Viewport>(),
            Err(ViewportParseError::Malformed("800x-1".to_string()))
        );
        assert_eq!(
            "0x900".parse::<Viewport>(),
            Err(ViewportParseError::ZeroSize("0x900".to_string()))
        );
        assert_eq!(
            "phablet".parse::<Viewport>(),
            Err(ViewportParseError::UnknownDevice("phablet".to_string()))
        );
    }

    #[test]
    fn test_default_is_tablet_landscape() {
        assert_eq!(Viewport::default(), DevicePreset::TabletLandscape.viewport());
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            DevicePreset::Desktop.viewport(),
            Viewport {
                width: 1920,
                height: 1080
            }
        );
        assert_eq!(
            "Mobile-Small".parse::<DevicePreset>().unwrap().viewport(),
            Viewport {
                width: 375,
                height: 667
            }
        );
        assert!("watch".parse::<DevicePreset>().is_err());
    }

    #[test]
    fn test_preset_names_round_trip_through_serde() {
        for preset in DevicePreset::ALL {
            let json = serde_json::to_string(&preset).unwrap();
            assert_eq!(json, format!("\"{}\"", preset.name()));
        }
    }
}
