//! Capture requests and results

use crate::error::{CaptureError, Result};
use crate::viewport::Viewport;
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_WAIT: Duration = Duration::from_secs(3);

/// Where the captured image ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Bytes,
    DataUri,
}

/// What part of the page gets captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureMode {
    Viewport,
    /// Whole window captured by handle instead of by rectangle
    WholeWindow,
    FullPage,
    Element(String),
}

impl CaptureMode {
    /// Modes that capture the window itself and need the automation layer
    pub fn captures_window(&self) -> bool {
        !matches!(self, CaptureMode::Element(_))
    }
}

#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub url: String,
    pub output: OutputTarget,
    pub viewport: Viewport,
    pub wait: Duration,
    pub zoom: f64,
    pub selector: Option<String>,
    pub full_page: bool,
    pub whole_window: bool,
    /// Let the user pick the area instead of capturing the resolved region
    pub interactive: bool,
    pub deadline: Option<Duration>,
}

impl CaptureRequest {
    pub fn new(url: impl Into<String>, output: OutputTarget) -> Self {
        Self {
            url: url.into(),
            output,
            viewport: Viewport::default(),
            wait: DEFAULT_WAIT,
            zoom: 1.0,
            selector: None,
            full_page: false,
            whole_window: false,
            interactive: false,
            deadline: None,
        }
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_full_page(mut self, full_page: bool) -> Self {
        self.full_page = full_page;
        self
    }

    pub fn with_whole_window(mut self, whole_window: bool) -> Self {
        self.whole_window = whole_window;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The selector wins over full-page, full-page wins over whole-window
    pub fn mode(&self) -> CaptureMode {
        match &self.selector {
            Some(selector) => CaptureMode::Element(selector.clone()),
            None if self.full_page => CaptureMode::FullPage,
            None if self.whole_window => CaptureMode::WholeWindow,
            None => CaptureMode::Viewport,
        }
    }

    /// Check the request before any browser state is touched
    pub fn validate(&self) -> Result<Url> {
        let url = parse_target_url(&self.url)?;

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(CaptureError::InvalidRequest(format!(
                "viewport must be non-empty, got {}",
                self.viewport
            )));
        }
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(CaptureError::InvalidRequest(format!(
                "zoom must be a positive number, got {}",
                self.zoom
            )));
        }
        if let Some(selector) = &self.selector {
            if selector.trim().is_empty() {
                return Err(CaptureError::InvalidRequest(
                    "selector must not be empty".to_string(),
                ));
            }
        }
        if let OutputTarget::File(path) = &self.output {
            if path.as_os_str().is_empty() {
                return Err(CaptureError::InvalidRequest(
                    "output path must not be empty".to_string(),
                ));
            }
        }

        Ok(url)
    }
}

/// Parse an absolute http(s) URL
pub fn parse_target_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::InvalidRequest("url is required".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| CaptureError::InvalidRequest(format!("invalid url {:?}: {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        "http" | "https" => Err(CaptureError::InvalidRequest(format!(
            "url has no host: {}",
            trimmed
        ))),
        other => Err(CaptureError::InvalidRequest(format!(
            "unsupported url scheme {:?}, expected http or https",
            other
        ))),
    }
}

/// `<dir>/<hostname>-<epoch-millis>.png`
pub fn default_output_path(dir: &Path, url: &Url, epoch_millis: i64) -> PathBuf {
    let host = url.host_str().unwrap_or("page");
    dir.join(format!("{}-{}.png", host, epoch_millis))
}

/// Captured image in the form the caller asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum Payload {
    File(PathBuf),
    #[serde(serialize_with = "serialize_as_base64")]
    Bytes(Vec<u8>),
    DataUri(String),
}

fn serialize_as_base64<S: serde::Serializer>(bytes: &[u8], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&general_purpose::STANDARD.encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub success: bool,
    pub byte_length: u64,
    pub payload: Payload,
}

impl CaptureResult {
    pub fn path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::File(path) => Some(path),
            _ => None,
        }
    }
}

pub fn png_data_uri(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(bytes)
    )
}
