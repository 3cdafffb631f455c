pub mod chrome;
pub mod safari;
pub mod scripts;

pub use chrome::{ChromeDriver, ConnectionMode};
pub use safari::SafariDriver;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Opaque identifier of the window/target a driver opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle(pub String);

/// Native window identifier, used for whole-window capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowHandle(pub i64);

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outer window rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowBounds {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// One live render surface bound to a URL
#[derive(Debug, Clone)]
pub struct RenderSession {
    pub handle: SessionHandle,
    pub url: String,
    pub bounds: WindowBounds,
    pub zoom: f64,
}

/// Control surface of a page-rendering process
///
/// A driver owns at most one session at a time. Callers serialize access;
/// implementations do not retry internally.
#[async_trait]
pub trait RenderDriver: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Cheap call against the automation layer; fails when permission is missing
    async fn probe(&self) -> Result<()>;

    /// Load `url` in a fresh or reset window
    async fn open(&self, url: &str) -> Result<SessionHandle>;

    /// Fixed-delay load heuristic. Best effort: there is no "visually ready" signal.
    async fn wait_for_load(&self, wait: Duration) -> Result<()> {
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        Ok(())
    }

    async fn set_window_bounds(&self, bounds: WindowBounds) -> Result<()>;

    /// Evaluate an expression in the page and return its value
    async fn evaluate_script(&self, expression: &str) -> Result<serde_json::Value>;

    async fn window_handle(&self) -> Result<WindowHandle>;

    /// Close every window of the session. Safe to call repeatedly.
    async fn close(&self) -> Result<()>;
}
