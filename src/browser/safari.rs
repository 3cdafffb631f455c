//! Safari render driver for macOS
//!
//! Everything goes through `osascript`. Multi-line scripts are written to a
//! temporary `.scpt` file which is removed after each run, success or not.

use super::{RenderDriver, SessionHandle, WindowBounds, WindowHandle};
use crate::error::{CaptureError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;

const PERMISSION_PROBE: &str = r#"tell application "System Events"
  set processList to name of every process
  return processList
end tell"#;

static SCRIPT_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct SafariDriver {
    program: String,
}

impl Default for SafariDriver {
    fn default() -> Self {
        Self::new("osascript")
    }
}

impl SafariDriver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run an AppleScript and return its trimmed stdout
    async fn run(&self, script: &str) -> std::result::Result<String, String> {
        let script_path = temp_script_path();
        tokio::fs::write(&script_path, script)
            .await
            .map_err(|e| format!("Failed to write script {:?}: {}", script_path, e))?;

        let output = Command::new(&self.program).arg(&script_path).output().await;

        if let Err(e) = tokio::fs::remove_file(&script_path).await {
            log::debug!("Could not remove script {:?}: {}", script_path, e);
        }

        let output = output.map_err(|e| format!("Failed to run {}: {}", self.program, e))?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            });
        }
        if !stderr.is_empty() {
            log::debug!("AppleScript output: {}", stderr);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn temp_script_path() -> PathBuf {
    let n = SCRIPT_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pageshot-{}-{}.scpt", std::process::id(), n))
}

/// Quote `value` as an AppleScript string literal
pub fn applescript_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn open_script(url: &str) -> String {
    format!(
        r#"tell application "Safari"
  close every window
  make new document
  set URL of document 1 to {url}
  activate
  return id of window 1
end tell"#,
        url = applescript_string(url)
    )
}

pub fn bounds_script(bounds: WindowBounds) -> String {
    let right = bounds.x + bounds.width as i64;
    let bottom = bounds.y + bounds.height as i64;
    format!(
        "tell application \"Safari\" to set bounds of window 1 to {{{}, {}, {}, {}}}",
        bounds.x, bounds.y, right, bottom
    )
}

pub fn javascript_script(expression: &str) -> String {
    format!(
        "tell application \"Safari\" to do JavaScript {} in document 1",
        applescript_string(expression)
    )
}

const WINDOW_ID_SCRIPT: &str = "tell application \"Safari\" to return id of window 1";
const CLOSE_SCRIPT: &str = "tell application \"Safari\" to close every window";

#[async_trait]
impl RenderDriver for SafariDriver {
    fn name(&self) -> &'static str {
        "safari"
    }

    async fn probe(&self) -> Result<()> {
        self.run(PERMISSION_PROBE).await.map(|_| ()).map_err(|e| {
            log::error!("System Events permission error: {}", e);
            CaptureError::PermissionDenied(format!(
                "{}. Grant Accessibility access to your terminal under \
                 System Settings > Privacy & Security > Accessibility",
                e
            ))
        })
    }

    async fn open(&self, url: &str) -> Result<SessionHandle> {
        let id = self
            .run(&open_script(url))
            .await
            .map_err(CaptureError::RenderUnavailable)?;
        if id.is_empty() {
            return Err(CaptureError::RenderUnavailable(
                "Could not get Safari window ID".to_string(),
            ));
        }
        Ok(SessionHandle(id))
    }

    async fn set_window_bounds(&self, bounds: WindowBounds) -> Result<()> {
        self.run(&bounds_script(bounds))
            .await
            .map(|_| ())
            .map_err(CaptureError::RenderUnavailable)
    }

    async fn evaluate_script(&self, expression: &str) -> Result<serde_json::Value> {
        self.run(&javascript_script(expression))
            .await
            .map(serde_json::Value::String)
            .map_err(CaptureError::ScriptEvaluation)
    }

    async fn window_handle(&self) -> Result<WindowHandle> {
        let raw = self
            .run(WINDOW_ID_SCRIPT)
            .await
            .map_err(CaptureError::RenderUnavailable)?;
        raw.parse().map(WindowHandle).map_err(|_| {
            CaptureError::RenderUnavailable(format!("Unexpected Safari window id {:?}", raw))
        })
    }

    async fn close(&self) -> Result<()> {
        self.run(CLOSE_SCRIPT)
            .await
            .map(|_| ())
            .map_err(CaptureError::RenderUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applescript_string_escaping() {
        assert_eq!(applescript_string("plain"), "\"plain\"");
        assert_eq!(
            applescript_string(r#"say "hi" \ bye"#),
            r#""say \"hi\" \\ bye""#
        );
    }

    #[test]
    fn test_bounds_script_uses_right_and_bottom_edges() {
        let script = bounds_script(WindowBounds {
            x: 100,
            y: 100,
            width: 1024,
            height: 768,
        });
        assert!(script.ends_with("{100, 100, 1124, 868}"));
    }

    #[test]
    fn test_open_script_quotes_url() {
        let script = open_script("https://example.com/?q=\"x\"");
        assert!(script.contains(r#"set URL of document 1 to "https://example.com/?q=\"x\"""#));
        assert!(script.contains("close every window"));
    }

    #[test]
    fn test_temp_script_paths_are_unique() {
        assert_ne!(temp_script_path(), temp_script_path());
    }

    #[tokio::test]
    async fn test_missing_osascript_maps_to_typed_errors() {
        let driver = SafariDriver::new("pageshot-no-such-osascript");
        let err = driver.probe().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PermissionDenied);

        let err = driver.evaluate_script("1 + 1").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ScriptEvaluation);

        assert!(driver.close().await.is_err());
    }
}
