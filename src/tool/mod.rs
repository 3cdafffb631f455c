//! Tool protocol
//!
//! Transport-agnostic request/response envelopes. The stdio and HTTP
//! transports only move lines and bodies; everything else happens in
//! [`ToolHandler`].

pub mod http;
pub mod prompt;
pub mod stdio;

use crate::error::{CaptureError, Result};
use crate::orchestrator::Screenshotter;
use crate::request::{CaptureRequest, OutputTarget};
use crate::viewport::{DevicePreset, Viewport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Name the capture operation is advertised under
pub const TOOL_NAME: &str = "take_screenshot";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub device: Option<DevicePreset>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, alias = "zoomLevel")]
    pub zoom: Option<f64>,
    /// Seconds
    #[serde(default, alias = "waitTime")]
    pub wait: Option<f64>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub full_page: bool,
}

impl ToolRequest {
    /// Preset first, then explicit width/height on top
    pub fn viewport(&self) -> Viewport {
        let base = self.device.map(DevicePreset::viewport).unwrap_or_default();
        Viewport {
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
        }
    }

    fn wait_duration(&self) -> Result<Option<Duration>> {
        match self.wait {
            None => Ok(None),
            Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
            Some(secs) => Err(CaptureError::InvalidRequest(format!(
                "wait must be a non-negative number of seconds, got {}",
                secs
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl ToolResponse {
    pub fn saved(path: String) -> Self {
        Self {
            message: format!("Screenshot saved to: {}", path),
            success: true,
            path: Some(path),
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            path: None,
            message: format!("Error: {}", error),
        }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::error!("Failed to encode tool response: {}", e);
            r#"{"success":false,"message":"Error: failed to encode response"}"#.to_string()
        })
    }
}

pub struct ToolHandler {
    screenshotter: Arc<Screenshotter>,
}

impl ToolHandler {
    pub fn new(screenshotter: Arc<Screenshotter>) -> Self {
        Self { screenshotter }
    }

    /// Translate a tool request into a capture request, filling in the default path
    pub fn capture_request(&self, request: &ToolRequest) -> Result<CaptureRequest> {
        let output = match request.output_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => self.screenshotter.default_output_path(&request.url)?,
        };

        let viewport = request.viewport();
        let mut capture = CaptureRequest::new(request.url.trim(), OutputTarget::File(output))
            .with_viewport(viewport.width, viewport.height)
            .with_full_page(request.full_page);
        if let Some(zoom) = request.zoom {
            capture = capture.with_zoom(zoom);
        }
        if let Some(wait) = request.wait_duration()? {
            capture = capture.with_wait(wait);
        }
        if let Some(selector) = &request.selector {
            capture = capture.with_selector(selector.clone());
        }
        Ok(capture)
    }

    pub async fn handle(&self, request: ToolRequest) -> ToolResponse {
        log::info!("Tool request for {}", request.url);

        let capture = match self.capture_request(&request) {
            Ok(capture) => capture,
            Err(e) => return ToolResponse::failure(e),
        };

        match self.screenshotter.take_screenshot(capture).await {
            Ok(result) => match result.path() {
                Some(path) => ToolResponse::saved(path.display().to_string()),
                None => ToolResponse::failure("capture produced no file"),
            },
            Err(e) => ToolResponse::failure(e),
        }
    }

    /// One line of input in, one JSON line out. Blank lines produce nothing.
    ///
    /// A line starting with `{` is a JSON tool request; anything else is read
    /// as a natural-language prompt.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request = if line.starts_with('{') {
            serde_json::from_str::<ToolRequest>(line)
                .map_err(|e| CaptureError::InvalidRequest(format!("malformed request: {}", e)))
        } else {
            prompt::parse_prompt(line)
        };

        let response = match request {
            Ok(request) => self.handle(request).await,
            Err(e) => ToolResponse::failure(e),
        };
        Some(response.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_aliases() {
        let req: ToolRequest = serde_json::from_str(
            r#"{"url":"https://example.com","zoomLevel":1.5,"waitTime":2,"outputPath":"/tmp/a.png"}"#,
        )
        .unwrap();
        assert_eq!(req.zoom, Some(1.5));
        assert_eq!(req.wait, Some(2.0));
        assert_eq!(req.output_path.as_deref(), Some("/tmp/a.png"));
        assert!(!req.full_page);
    }

    #[test]
    fn test_viewport_preset_then_override() {
        let req: ToolRequest =
            serde_json::from_str(r#"{"url":"https://example.com","device":"mobile-small"}"#)
                .unwrap();
        assert_eq!(req.viewport(), Viewport { width: 375, height: 667 });

        let req = ToolRequest {
            width: Some(400),
            ..req
        };
        assert_eq!(req.viewport(), Viewport { width: 400, height: 667 });

        assert_eq!(ToolRequest::default().viewport(), Viewport::default());
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        let parsed = serde_json::from_str::<ToolRequest>(
            r#"{"url":"https://example.com","device":"smartwatch"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_negative_wait_is_invalid() {
        let req = ToolRequest {
            wait: Some(-1.0),
            ..Default::default()
        };
        let err = req.wait_duration().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_response_shape() {
        let ok = serde_json::to_value(ToolResponse::saved("shots/a.png".to_string())).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["path"], "shots/a.png");
        assert_eq!(ok["message"], "Screenshot saved to: shots/a.png");

        let err = serde_json::to_value(ToolResponse::failure("boom")).unwrap();
        assert_eq!(err["success"], false);
        assert!(err.get("path").is_none());
        assert_eq!(err["message"], "Error: boom");
    }
}
