//! Capture settings
//!
//! Defaults match the window placement the drivers use. Every value can be
//! overridden from the environment (`PAGESHOT_*`) and again from CLI flags.

use crate::geometry::WindowLayout;
use crate::validate::MIN_CAPTURE_BYTES;
use std::path::PathBuf;
use std::time::Duration;

/// Directory used when a request does not name an output path
pub const DEFAULT_OUTPUT_DIR: &str = "./screenshots";

/// Pause after zooming so the page can re-layout before geometry is read
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub output_dir: PathBuf,
    pub layout: WindowLayout,
    pub min_capture_bytes: u64,
    pub settle_delay: Duration,
    /// Overall per-request deadline, unless the request carries its own
    pub deadline: Option<Duration>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            layout: WindowLayout::default(),
            min_capture_bytes: MIN_CAPTURE_BYTES,
            settle_delay: DEFAULT_SETTLE_DELAY,
            deadline: None,
        }
    }
}

impl CaptureSettings {
    /// Defaults with `PAGESHOT_*` environment overrides applied
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(dir) = lookup("PAGESHOT_OUTPUT_DIR").filter(|d| !d.trim().is_empty()) {
            settings.output_dir = PathBuf::from(dir);
        }
        if let Some(x) = parse_var(&lookup, "PAGESHOT_WINDOW_X") {
            settings.layout.origin_x = x;
        }
        if let Some(y) = parse_var(&lookup, "PAGESHOT_WINDOW_Y") {
            settings.layout.origin_y = y;
        }
        if let Some(h) = parse_var(&lookup, "PAGESHOT_CHROME_HEIGHT") {
            settings.layout.chrome_height = h;
        }
        if let Some(min) = parse_var(&lookup, "PAGESHOT_MIN_BYTES") {
            settings.min_capture_bytes = min;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PAGESHOT_DEADLINE_SECS") {
            settings.deadline = (secs > 0).then(|| Duration::from_secs(secs));
        }

        settings
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(vars: &[(&str, &str)]) -> CaptureSettings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CaptureSettings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = CaptureSettings::default();
        assert_eq!(settings.output_dir, PathBuf::from("./screenshots"));
        assert_eq!(settings.layout, WindowLayout::default());
        assert_eq!(settings.min_capture_bytes, 1000);
        assert!(settings.deadline.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let settings = settings_with(&[
            ("PAGESHOT_OUTPUT_DIR", "/tmp/shots"),
            ("PAGESHOT_WINDOW_X", "0"),
            ("PAGESHOT_CHROME_HEIGHT", "28"),
            ("PAGESHOT_DEADLINE_SECS", "45"),
        ]);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/shots"));
        assert_eq!(settings.layout.origin_x, 0);
        assert_eq!(settings.layout.origin_y, 100);
        assert_eq!(settings.layout.chrome_height, 28);
        assert_eq!(settings.deadline, Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let settings = settings_with(&[
            ("PAGESHOT_WINDOW_Y", "top"),
            ("PAGESHOT_MIN_BYTES", "-5"),
            ("PAGESHOT_DEADLINE_SECS", "0"),
        ]);
        assert_eq!(settings.layout.origin_y, 100);
        assert_eq!(settings.min_capture_bytes, 1000);
        assert!(settings.deadline.is_none());
    }
}
