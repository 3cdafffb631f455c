// spider_chrome re-exports chromiumoxide API
use super::scripts::ClientRect;
use super::{RenderDriver, SessionHandle, WindowBounds, WindowHandle};
use crate::error::{CaptureError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    Bounds, GetWindowForTargetParams, SetWindowBoundsParams, WindowState,
};
use chromiumoxide::cdp::browser_protocol::emulation::{
    ClearDeviceMetricsOverrideParams, SetDeviceMetricsOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, EventLoadEventFired, NavigateParams,
    Viewport as ClipViewport,
};
use chromiumoxide::cdp::browser_protocol::target::CloseTargetParams;
use chromiumoxide::page::Page;
use chromiumoxide_fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOAD_EVENT_TIMEOUT: Duration = Duration::from_secs(30);

const CHROME_NOT_FOUND_HELP: &str = "\n\n\
    Chrome not found. You can:\n\
    - Install Chrome: https://www.google.com/chrome/\n\
    - Ubuntu/Debian: sudo apt install chromium-browser\n\
    - Fedora: sudo dnf install chromium\n\
    - macOS: brew install --cask google-chrome\n\
    - Or specify path: --chrome-path /path/to/chrome\n\
    - Linux sandbox issue? Try: --no-sandbox";

const CI_VARIABLES: [&str; 5] = ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "JENKINS_HOME", "CIRCLECI"];

/// Whether this process runs under a CI system, where Chrome needs headless
/// mode and `--no-sandbox`
pub fn running_in_ci() -> bool {
    ci_detected(|name| std::env::var_os(name).is_some())
}

fn ci_detected(is_set: impl Fn(&str) -> bool) -> bool {
    CI_VARIABLES.iter().any(|name| is_set(name))
}

/// Render driver speaking the Chrome DevTools Protocol
pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
    headless: bool,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Sandboxed mode - launches Chrome using system installation
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Advanced mode - connects to existing Chrome on debug port
    DebugPort(u16),
}

impl ChromeDriver {
    /// Helper method to get the current active page, excluding Chrome's new-tab-page
    async fn get_active_page(&self) -> Result<Page> {
        let pages = self.browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::RenderUnavailable(format!("Failed to create page: {}", e)))
    }

    /// Create new ChromeDriver with specified connection mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir, headless) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory per launch so concurrent processes never share state
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos();
                let temp_dir = std::env::temp_dir().join(format!("pageshot-chrome-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    CaptureError::RenderUnavailable(format!(
                        "Failed to create temp directory: {}",
                        e
                    ))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                config = config.user_data_dir(&temp_dir);

                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                } else {
                    match Self::ensure_chrome_installed().await {
                        Ok(path) => {
                            config = config.chrome_executable(path);
                        }
                        Err(e) => {
                            // Let chromiumoxide look for a system Chrome instead
                            log::warn!("Auto-download failed ({}), trying system Chrome...", e);
                        }
                    }
                }

                let config = config.build().map_err(|e| {
                    CaptureError::RenderUnavailable(format!("{}.{}", e, CHROME_NOT_FOUND_HELP))
                })?;

                let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
                    CaptureError::RenderUnavailable(format!("{}.{}", e, CHROME_NOT_FOUND_HELP))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, Some(temp_dir), headless)
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    CaptureError::RenderUnavailable(format!(
                        "Failed to connect to Chrome on port {}. \
                             Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, None, false)
            }
        };

        Ok(Self {
            browser,
            temp_dir,
            headless,
        })
    }

    /// Navigate the single session page to `url`, closing any extra tabs
    async fn navigate(&self, url: &str) -> Result<Page> {
        log::info!("Starting navigation to: {}", url);

        let pages = self.browser.pages().await?;
        for (i, p) in pages.iter().enumerate() {
            if i > 0 {
                log::debug!("Closing extra page {}", i);
                let _ = p.execute(CloseTargetParams::new(p.target_id().clone())).await;
            }
        }

        let page = match self.browser.pages().await?.into_iter().next() {
            Some(page) => page,
            None => self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| CaptureError::RenderUnavailable(e.to_string()))?,
        };

        let params = NavigateParams::builder().url(url).build().map_err(|e| {
            CaptureError::RenderUnavailable(format!("Invalid URL {}: {}", url, e))
        })?;

        // Subscribe before navigating so the load event cannot be missed
        let mut load_events = page
            .event_listener::<EventLoadEventFired>()
            .await
            .map_err(|e| CaptureError::RenderUnavailable(e.to_string()))?;

        let response = page.execute(params).await.map_err(|e| {
            let error_str = e.to_string();

            // "oneshot canceled" means the browser connection is gone
            if error_str.contains("oneshot canceled") {
                CaptureError::RenderUnavailable(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                CaptureError::RenderUnavailable(format!("Failed to navigate to {}: {}", url, e))
            }
        })?;

        if let Some(error_text) = &response.result.error_text {
            return Err(CaptureError::RenderUnavailable(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(LOAD_EVENT_TIMEOUT, load_events.next()).await {
            Ok(Some(_)) => log::debug!("Page load event fired"),
            Ok(None) => log::warn!("Load event stream ended before {} loaded", url),
            Err(_) => {
                return Err(CaptureError::RenderUnavailable(format!(
                    "Timed out after {:?} waiting for {} to load",
                    LOAD_EVENT_TIMEOUT, url
                )));
            }
        }

        Ok(page)
    }

    async fn window_id(&self, page: &Page) -> Result<chromiumoxide::cdp::browser_protocol::browser::WindowId> {
        let window = page
            .execute(GetWindowForTargetParams {
                target_id: Some(page.target_id().clone()),
            })
            .await
            .map_err(|e| CaptureError::RenderUnavailable(format!("Failed to get window: {}", e)))?;
        Ok(window.result.window_id.clone())
    }

    /// PNG of the current page, optionally clipped to a page-relative rectangle
    pub async fn capture_png(&self, clip: Option<ClientRect>) -> Result<Vec<u8>> {
        use base64::{engine::general_purpose, Engine as _};

        let page = self.get_active_page().await?;
        let mut params = CaptureScreenshotParams::builder().format(CaptureScreenshotFormat::Png);
        if let Some(rect) = clip {
            let viewport = ClipViewport::builder()
                .x(rect.x as f64)
                .y(rect.y as f64)
                .width(rect.width as f64)
                .height(rect.height as f64)
                .scale(1.0)
                .build()
                .map_err(|e| CaptureError::CaptureExecutionFailed(format!("Invalid clip: {}", e)))?;
            params = params.clip(viewport).capture_beyond_viewport(true);
        }

        let response = page.execute(params.build()).await.map_err(|e| {
            CaptureError::CaptureExecutionFailed(format!("Failed to take screenshot: {}", e))
        })?;

        general_purpose::STANDARD
            .decode(&response.data)
            .map_err(|e| {
                CaptureError::CaptureExecutionFailed(format!(
                    "Failed to decode screenshot data: {}",
                    e
                ))
            })
    }

    /// Check if the browser is still alive and responsive
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => {
                if let Some(page) = pages.first() {
                    matches!(
                        tokio::time::timeout(Duration::from_secs(2), page.url()).await,
                        Ok(Ok(_))
                    )
                } else {
                    true
                }
            }
            Err(_) => false,
        }
    }

    /// Terminate the browser process
    pub async fn shutdown(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| CaptureError::RenderUnavailable(e.to_string()))?;
        Ok(())
    }

    /// Ensure Chrome is installed, downloading if necessary
    async fn ensure_chrome_installed() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| {
                CaptureError::RenderUnavailable("Cannot determine cache directory".to_string())
            })?
            .join("pageshot")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir).await.map_err(|e| {
            CaptureError::RenderUnavailable(format!("Failed to create cache dir: {}", e))
        })?;

        let revision_info_path = cache_dir.join(".downloaded");
        if revision_info_path.exists() {
            if let Some(executable) = Self::find_chrome_in_cache(&cache_dir).await {
                return Ok(executable);
            }
        }

        log::info!("Downloading Chrome for Testing (first time only, ~150MB)...");
        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&cache_dir)
                .build()
                .map_err(|e| {
                    CaptureError::RenderUnavailable(format!("Fetcher config failed: {}", e))
                })?,
        );

        let info = fetcher.fetch().await.map_err(|e| {
            CaptureError::RenderUnavailable(format!("Chrome download failed: {}", e))
        })?;

        tokio::fs::write(&revision_info_path, "downloaded")
            .await
            .map_err(|e| {
                CaptureError::RenderUnavailable(format!("Failed to write marker: {}", e))
            })?;

        log::info!("Chrome downloaded to {:?}", info.executable_path);

        Ok(info.executable_path)
    }

    async fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
        let possible_paths = [
            cache_dir.join("chrome"),
            cache_dir.join("chrome.exe"),
            cache_dir.join("Google Chrome.app/Contents/MacOS/Google Chrome"),
            cache_dir.join("chrome-linux/chrome"),
            cache_dir.join("chrome-mac/Chromium.app/Contents/MacOS/Chromium"),
            cache_dir.join("chrome-win/chrome.exe"),
        ];

        possible_paths.into_iter().find(|path| path.exists())
    }
}

#[async_trait]
impl RenderDriver for ChromeDriver {
    fn name(&self) -> &'static str {
        "chrome"
    }

    async fn probe(&self) -> Result<()> {
        if self.is_alive().await {
            Ok(())
        } else {
            Err(CaptureError::PermissionDenied(
                "Chrome DevTools connection is not responding".to_string(),
            ))
        }
    }

    async fn open(&self, url: &str) -> Result<SessionHandle> {
        let page = self.navigate(url).await?;
        Ok(SessionHandle(page.target_id().inner().clone()))
    }

    async fn set_window_bounds(&self, bounds: WindowBounds) -> Result<()> {
        let page = self.get_active_page().await?;

        let placed = async {
            let window_id = self.window_id(&page).await?;
            let window_bounds = Bounds {
                left: Some(bounds.x),
                top: Some(bounds.y),
                width: Some(bounds.width as i64),
                height: Some(bounds.height as i64),
                window_state: Some(WindowState::Normal),
            };
            page.execute(SetWindowBoundsParams {
                window_id,
                bounds: window_bounds,
            })
            .await
            .map_err(|e| {
                CaptureError::RenderUnavailable(format!("Failed to set window bounds: {}", e))
            })?;
            Ok::<(), CaptureError>(())
        }
        .await;

        match placed {
            Ok(()) => log::debug!("Window placed at {:?}", bounds),
            // Headless shells have no real window to move
            Err(e) if self.headless => log::debug!("Ignoring window placement in headless mode: {}", e),
            Err(e) => return Err(e),
        }

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(bounds.width as i64)
            .height(bounds.height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| CaptureError::RenderUnavailable(format!("Invalid viewport: {}", e)))?;
        page.execute(metrics).await.map_err(|e| {
            CaptureError::RenderUnavailable(format!("Failed to set viewport size: {}", e))
        })?;

        Ok(())
    }

    async fn evaluate_script(&self, expression: &str) -> Result<serde_json::Value> {
        let page = self.get_active_page().await?;

        let result = page
            .evaluate(expression)
            .await
            .map_err(|e| CaptureError::ScriptEvaluation(format!("Script execution failed: {}", e)))?;

        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    async fn window_handle(&self) -> Result<WindowHandle> {
        let page = self.get_active_page().await?;
        let window_id = self.window_id(&page).await?;
        Ok(WindowHandle(*window_id.inner()))
    }

    async fn close(&self) -> Result<()> {
        // Reset rather than quit: the browser is reused by the next request
        let pages = self.browser.pages().await?;
        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                let _ = page
                    .execute(CloseTargetParams::new(page.target_id().clone()))
                    .await;
            }
        }

        if let Some(page) = pages.first() {
            page.execute(ClearDeviceMetricsOverrideParams::default()).await?;
            page.goto("about:blank").await?;
        }

        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ci_detected_from_any_known_variable() {
        for var in CI_VARIABLES {
            assert!(ci_detected(|name| name == var), "{} not detected", var);
        }
    }

    #[test]
    fn test_ci_not_detected_without_variables() {
        assert!(!ci_detected(|_| false));
        assert!(!ci_detected(|name| name == "TRAVIS_BUILD"));
    }
}
