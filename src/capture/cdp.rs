//! Capture through `Page.captureScreenshot`
//!
//! Regions arrive in screen coordinates; they are mapped back to page
//! coordinates with the same layout the geometry resolver used.

use super::CaptureBackend;
use crate::browser::ChromeDriver;
use crate::error::{CaptureError, Result};
use crate::geometry::{CaptureRegion, WindowLayout};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub struct CdpCaptureBackend {
    driver: Arc<ChromeDriver>,
    layout: WindowLayout,
}

impl CdpCaptureBackend {
    pub fn new(driver: Arc<ChromeDriver>, layout: WindowLayout) -> Self {
        Self { driver, layout }
    }
}

#[async_trait]
impl CaptureBackend for CdpCaptureBackend {
    fn name(&self) -> &'static str {
        "cdp"
    }

    async fn capture(
        &self,
        region: &CaptureRegion,
        destination: &Path,
        interactive: bool,
    ) -> Result<()> {
        if interactive {
            log::warn!("Interactive capture is not available over CDP, capturing directly");
        }

        let clip = match region {
            CaptureRegion::Rect(rect) => Some(self.layout.to_page(*rect)),
            CaptureRegion::Window(_) => None,
        };
        let png = self.driver.capture_png(clip).await?;

        tokio::fs::write(destination, &png).await.map_err(|e| {
            CaptureError::CaptureExecutionFailed(format!(
                "Failed to write screenshot to {:?}: {}",
                destination, e
            ))
        })
    }
}
