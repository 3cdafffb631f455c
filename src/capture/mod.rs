//! Capture execution
//!
//! The executor owns destination-directory creation and clears any file left
//! at the destination; backends only write the image for a resolved region.

pub mod cdp;
pub mod screencapture;

pub use cdp::CdpCaptureBackend;
pub use screencapture::ScreencaptureBackend;

use crate::error::{CaptureError, Result};
use crate::geometry::CaptureRegion;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// External region-capture primitive
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write an image of `region` to `destination`
    async fn capture(
        &self,
        region: &CaptureRegion,
        destination: &Path,
        interactive: bool,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct CaptureExecutor {
    backend: Arc<dyn CaptureBackend>,
}

impl CaptureExecutor {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self { backend }
    }

    pub async fn capture(
        &self,
        region: &CaptureRegion,
        destination: &Path,
        interactive: bool,
    ) -> Result<()> {
        ensure_parent_dir(destination).await?;
        remove_stale(destination).await?;
        log::info!(
            "Capturing {:?} with {} into {:?}",
            region,
            self.backend.name(),
            destination
        );
        self.backend.capture(region, destination, interactive).await
    }
}

async fn ensure_parent_dir(destination: &Path) -> Result<()> {
    match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                CaptureError::CaptureExecutionFailed(format!(
                    "Failed to create output directory {:?}: {}",
                    dir, e
                ))
            })
        }
        _ => Ok(()),
    }
}

/// Only this capture's output may reach validation
async fn remove_stale(destination: &Path) -> Result<()> {
    match tokio::fs::remove_file(destination).await {
        Ok(()) => {
            log::debug!("Removed existing file at {:?}", destination);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CaptureError::CaptureExecutionFailed(format!(
            "Cannot replace existing file {:?}: {}",
            destination, e
        ))),
    }
}
