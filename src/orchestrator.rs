//! Capture orchestration
//!
//! Runs one request through permission check, open, window placement, load
//! wait, zoom, geometry, capture and validation. Cleanup always runs before
//! the request returns, and the first failing step's error is what the caller
//! sees. Nothing is retried here.

use crate::browser::{scripts, RenderDriver, RenderSession};
use crate::capture::{CaptureBackend, CaptureExecutor};
use crate::config::CaptureSettings;
use crate::error::{CaptureError, Result};
use crate::geometry::{CaptureRegion, GeometryResolver};
use crate::request::{
    default_output_path, parse_target_url, png_data_uri, CaptureMode, CaptureRequest,
    CaptureResult, OutputTarget, Payload,
};
use crate::session::SessionGuard;
use crate::validate::ResultValidator;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

static TEMP_CAPTURE_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct Screenshotter {
    driver: Arc<dyn RenderDriver>,
    executor: CaptureExecutor,
    resolver: GeometryResolver,
    validator: ResultValidator,
    settings: CaptureSettings,
    // The render surface supports one automation session at a time
    surface: Arc<Mutex<()>>,
}

impl Screenshotter {
    pub fn new(
        driver: Arc<dyn RenderDriver>,
        backend: Arc<dyn CaptureBackend>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            driver,
            executor: CaptureExecutor::new(backend),
            resolver: GeometryResolver::new(settings.layout),
            validator: ResultValidator::new(settings.min_capture_bytes),
            settings,
            surface: Arc::new(Mutex::new(())),
        }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// `<output_dir>/<hostname>-<epoch-millis>.png` for `url`
    pub fn default_output_path(&self, url: &str) -> Result<PathBuf> {
        let url = parse_target_url(url)?;
        Ok(default_output_path(
            &self.settings.output_dir,
            &url,
            chrono::Utc::now().timestamp_millis(),
        ))
    }

    /// Capture one page or element. Requests are served one at a time.
    pub async fn take_screenshot(&self, request: CaptureRequest) -> Result<CaptureResult> {
        let lease = self.surface.clone().lock_owned().await;
        let mut guard = SessionGuard::new(self.driver.clone(), lease);

        let outcome = match request.deadline.or(self.settings.deadline) {
            Some(limit) => {
                match tokio::time::timeout(limit, self.run(&request, &mut guard)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(CaptureError::DeadlineExceeded(limit)),
                }
            }
            None => self.run(&request, &mut guard).await,
        };

        guard.release().await;

        match &outcome {
            Ok(result) => log::info!(
                "Screenshot of {} captured ({} bytes)",
                request.url,
                result.byte_length
            ),
            Err(e) => log::error!("Screenshot of {} failed: {}", request.url, e),
        }
        outcome
    }

    async fn run(&self, request: &CaptureRequest, guard: &mut SessionGuard) -> Result<CaptureResult> {
        let url = request.validate()?;
        let mode = request.mode();
        let driver = self.driver.as_ref();

        if mode.captures_window() {
            log::debug!("Probing {} automation permission", driver.name());
            driver.probe().await.map_err(|e| match e {
                CaptureError::PermissionDenied(_) => e,
                other => CaptureError::PermissionDenied(other.to_string()),
            })?;
        }

        log::info!("Opening {} in {}", url, driver.name());
        let handle = driver.open(url.as_str()).await?;

        let layout = self.resolver.layout();
        let bounds = layout.window_bounds(request.viewport.width, request.viewport.height);
        driver.set_window_bounds(bounds).await?;

        let mut session = RenderSession {
            handle,
            url: url.to_string(),
            bounds,
            zoom: 1.0,
        };

        log::debug!("Waiting {:?} for page load", request.wait);
        driver.wait_for_load(request.wait).await?;

        if (request.zoom - 1.0).abs() > f64::EPSILON {
            driver.evaluate_script(&scripts::set_zoom(request.zoom)).await?;
            session.zoom = request.zoom;
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        let region = self
            .resolver
            .resolve(driver, request.viewport, &mode)
            .await?;

        if let (CaptureMode::FullPage, CaptureRegion::Rect(rect)) = (&mode, &region) {
            if rect.height > session.bounds.height {
                let grown = layout.window_bounds(rect.width, rect.height);
                driver.set_window_bounds(grown).await?;
                session.bounds = grown;
            }
        }
        log::debug!("Session {:?}", session);

        let destination = match &request.output {
            OutputTarget::File(path) => path.clone(),
            OutputTarget::Bytes | OutputTarget::DataUri => {
                let path = temp_capture_path();
                guard.track_temp_file(path.clone());
                path
            }
        };

        self.executor
            .capture(&region, &destination, request.interactive)
            .await?;
        let byte_length = self.validator.validate_file(&destination).await?;

        let payload = match &request.output {
            OutputTarget::File(path) => Payload::File(path.clone()),
            OutputTarget::Bytes => Payload::Bytes(read_capture(&destination).await?),
            OutputTarget::DataUri => {
                Payload::DataUri(png_data_uri(&read_capture(&destination).await?))
            }
        };

        Ok(CaptureResult {
            success: true,
            byte_length,
            payload,
        })
    }
}

fn temp_capture_path() -> PathBuf {
    let n = TEMP_CAPTURE_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pageshot-capture-{}-{}.png", std::process::id(), n))
}

async fn read_capture(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        CaptureError::CaptureExecutionFailed(format!("Failed to read capture {:?}: {}", path, e))
    })
}
