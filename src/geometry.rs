//! Capture region resolution
//!
//! Translates "the viewport", "the whole scrollable page" or "this element"
//! into an absolute screen rectangle. Window placement is not measured: the
//! drivers put the window at [`WindowLayout`]'s origin and the same constants
//! are used here to translate page coordinates.

use crate::browser::scripts::{self, ClientRect};
use crate::browser::{RenderDriver, WindowBounds, WindowHandle};
use crate::error::Result;
use crate::request::CaptureMode;
use crate::viewport::Viewport;
use serde::Serialize;

pub const DEFAULT_WINDOW_X: i64 = 100;
pub const DEFAULT_WINDOW_Y: i64 = 100;
/// Title bar height above the page content
pub const DEFAULT_CHROME_HEIGHT: i64 = 22;

/// Where the render window is placed and how tall its title bar is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    pub origin_x: i64,
    pub origin_y: i64,
    pub chrome_height: i64,
}

impl Default for WindowLayout {
    fn default() -> Self {
        Self {
            origin_x: DEFAULT_WINDOW_X,
            origin_y: DEFAULT_WINDOW_Y,
            chrome_height: DEFAULT_CHROME_HEIGHT,
        }
    }
}

impl WindowLayout {
    pub fn window_bounds(&self, width: u32, height: u32) -> WindowBounds {
        WindowBounds {
            x: self.origin_x,
            y: self.origin_y,
            width,
            height,
        }
    }

    /// Screen position of the page's (0, 0)
    pub fn content_origin(&self) -> (i64, i64) {
        (self.origin_x, self.origin_y + self.chrome_height)
    }

    pub fn to_screen(&self, rect: ClientRect) -> Rect {
        let (x, y) = self.content_origin();
        Rect {
            x: rect.x + x,
            y: rect.y + y,
            width: rect.width,
            height: rect.height,
        }
    }

    /// Inverse of [`WindowLayout::to_screen`]
    pub fn to_page(&self, rect: Rect) -> ClientRect {
        let (x, y) = self.content_origin();
        ClientRect {
            x: rect.x - x,
            y: rect.y - y,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// Absolute screen rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureRegion {
    Rect(Rect),
    Window(WindowHandle),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryResolver {
    layout: WindowLayout,
}

impl GeometryResolver {
    pub fn new(layout: WindowLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> WindowLayout {
        self.layout
    }

    /// Viewport-sized rect at the content origin. The window's outer height is
    /// the viewport height, so the rect's bottom `chrome_height` rows extend
    /// below the window edge; that strip is part of the capture.
    pub fn viewport_region(&self, viewport: Viewport) -> Rect {
        let (x, y) = self.layout.content_origin();
        Rect {
            x,
            y,
            width: viewport.width,
            height: viewport.height,
        }
    }

    /// Viewport region stretched to the content height, never shorter than the viewport
    pub fn full_page_region(&self, viewport: Viewport, content_height: Option<u32>) -> Rect {
        let mut rect = self.viewport_region(viewport);
        rect.height = content_height.map_or(viewport.height, |h| h.max(viewport.height));
        rect
    }

    pub fn element_region(&self, rect: ClientRect) -> Rect {
        self.layout.to_screen(rect)
    }

    /// Compute the region for `mode` against the open session
    pub async fn resolve(
        &self,
        driver: &dyn RenderDriver,
        viewport: Viewport,
        mode: &CaptureMode,
    ) -> Result<CaptureRegion> {
        let region = match mode {
            CaptureMode::Viewport => CaptureRegion::Rect(self.viewport_region(viewport)),
            CaptureMode::WholeWindow => CaptureRegion::Window(driver.window_handle().await?),
            CaptureMode::FullPage => {
                let content_height = self.content_height(driver).await;
                CaptureRegion::Rect(self.full_page_region(viewport, content_height))
            }
            CaptureMode::Element(selector) => {
                let rect = self.locate_element(driver, selector).await?;
                CaptureRegion::Rect(self.element_region(rect))
            }
        };
        log::debug!("Resolved capture region for {:?}: {:?}", mode, region);
        Ok(region)
    }

    /// Check the element is present, visible and non-empty, then read its rectangle
    pub async fn locate_element(
        &self,
        driver: &dyn RenderDriver,
        selector: &str,
    ) -> Result<ClientRect> {
        let answer = driver
            .evaluate_script(&scripts::check_element(selector))
            .await?;
        scripts::element_check_outcome(&scripts::as_text(&answer)?, selector)?;

        let value = driver.evaluate_script(&scripts::element_rect(selector)).await?;
        let rect: ClientRect = scripts::decode_json(&value)?;
        log::debug!("Element {} at {:?} (page coordinates)", selector, rect);
        Ok(rect)
    }

    /// `scrollHeight` of the document, `None` when the probe fails
    async fn content_height(&self, driver: &dyn RenderDriver) -> Option<u32> {
        let value = match driver.evaluate_script(scripts::SCROLL_HEIGHT).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Could not read scroll height, using viewport height: {}", e);
                return None;
            }
        };
        let parsed = scripts::as_text(&value)
            .ok()
            .and_then(|text| text.trim().parse::<f64>().ok())
            .filter(|h| h.is_finite() && *h >= 0.0);
        if parsed.is_none() {
            log::warn!("Scroll height probe returned {}, using viewport height", value);
        }
        parsed.map(|h| h.round().min(u32::MAX as f64) as u32)
    }
}
