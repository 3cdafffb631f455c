//! Guaranteed cleanup of render state
//!
//! One guard per request. `release` closes the session exactly once and never
//! fails; a guard dropped without `release` (the request future was cancelled)
//! hands the same cleanup to the runtime. The guard owns the render-surface
//! lease, so the next request cannot start until cleanup has finished.

use crate::browser::RenderDriver;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

pub type SurfaceLease = OwnedMutexGuard<()>;

pub struct SessionGuard {
    driver: Arc<dyn RenderDriver>,
    lease: Option<SurfaceLease>,
    temp_files: Vec<PathBuf>,
    released: bool,
}

impl SessionGuard {
    pub fn new(driver: Arc<dyn RenderDriver>, lease: SurfaceLease) -> Self {
        Self {
            driver,
            lease: Some(lease),
            temp_files: Vec::new(),
            released: false,
        }
    }

    /// Remove `path` during cleanup
    pub fn track_temp_file(&mut self, path: PathBuf) {
        self.temp_files.push(path);
    }

    pub async fn release(mut self) {
        self.released = true;
        let temp_files = std::mem::take(&mut self.temp_files);
        cleanup(self.driver.clone(), temp_files, self.lease.take()).await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let driver = self.driver.clone();
        let temp_files = std::mem::take(&mut self.temp_files);
        let lease = self.lease.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::warn!("Capture cancelled, cleaning up {} session", driver.name());
                handle.spawn(cleanup(driver, temp_files, lease));
            }
            Err(_) => log::warn!(
                "Capture abandoned outside a runtime; {} session left open",
                driver.name()
            ),
        }
    }
}

async fn cleanup(
    driver: Arc<dyn RenderDriver>,
    temp_files: Vec<PathBuf>,
    lease: Option<SurfaceLease>,
) {
    if let Err(e) = driver.close().await {
        log::warn!("Ignoring {} cleanup error: {}", driver.name(), e);
    }
    for path in temp_files {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => log::debug!("Removed temporary capture {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove temporary capture {:?}: {}", path, e),
        }
    }
    // The surface is free only once the session is gone
    drop(lease);
}
