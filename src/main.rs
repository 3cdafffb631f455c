use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pageshot::browser::{chrome, ChromeDriver, ConnectionMode, RenderDriver, SafariDriver};
use pageshot::capture::{CaptureBackend, CdpCaptureBackend, ScreencaptureBackend};
use pageshot::tool::{http, stdio, ToolHandler};
use pageshot::{
    CaptureRequest, CaptureSettings, DevicePreset, OutputTarget, Payload, Screenshotter, Viewport,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Capture screenshots of web pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture one page or element
    Capture(CaptureArgs),
    /// Serve capture requests over HTTP or stdio
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = http::DEFAULT_PORT)]
        port: u16,

        /// Read requests from stdin instead of listening on a port
        #[arg(long = "stdio")]
        over_stdio: bool,
    },
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// URL to capture
    url: String,

    /// Output path (default: <output-dir>/<hostname>-<epoch-millis>.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Named viewport preset
    #[arg(long, conflicts_with_all = ["width", "height"])]
    device: Option<DevicePreset>,

    /// Viewport as WIDTHxHEIGHT (e.g. 1280x720) or a preset name
    #[arg(long, conflicts_with_all = ["device", "width", "height"])]
    viewport: Option<Viewport>,

    #[arg(long, default_value_t = 1024)]
    width: u32,

    #[arg(long, default_value_t = 768)]
    height: u32,

    /// Seconds to wait for the page to load
    #[arg(long, default_value_t = 3.0)]
    wait: f64,

    /// Zoom factor (1 = 100%)
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// CSS selector of a single element to capture
    #[arg(short, long)]
    selector: Option<String>,

    /// Capture the full scrollable page
    #[arg(short, long)]
    full_page: bool,

    /// Capture the whole browser window by its handle
    #[arg(long)]
    whole_window: bool,

    /// Let the user pick the capture area (screencapture only)
    #[arg(short, long)]
    interactive: bool,

    /// How the image is returned
    #[arg(long, value_enum, default_value_t = Format::File)]
    format: Format,

    /// Abort the capture after this many seconds
    #[arg(long)]
    deadline: Option<u64>,
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// Browser to drive
    #[arg(long, value_enum, global = true, default_value_t = DriverKind::Chrome)]
    driver: DriverKind,

    /// Capture primitive
    #[arg(long, value_enum, global = true, default_value_t = BackendKind::Cdp)]
    capture: BackendKind,

    /// Run Chrome headless
    #[arg(long, global = true)]
    headless: bool,

    /// Disable the Chrome sandbox
    #[arg(long, global = true)]
    no_sandbox: bool,

    /// Path to a Chrome executable
    #[arg(long, global = true)]
    chrome_path: Option<String>,

    /// Connect to a Chrome already listening on this debug port
    #[arg(long, global = true)]
    debug_port: Option<u16>,

    /// Directory for default output paths
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Screen x of the browser window
    #[arg(long, global = true)]
    window_x: Option<i64>,

    /// Screen y of the browser window
    #[arg(long, global = true)]
    window_y: Option<i64>,

    /// Title bar height added between window and content origin
    #[arg(long, global = true)]
    chrome_height: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    Chrome,
    Safari,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Cdp,
    Screencapture,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    File,
    Binary,
    DataUri,
}

impl BackendArgs {
    fn settings(&self) -> CaptureSettings {
        let mut settings = CaptureSettings::from_env();
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(x) = self.window_x {
            settings.layout.origin_x = x;
        }
        if let Some(y) = self.window_y {
            settings.layout.origin_y = y;
        }
        if let Some(h) = self.chrome_height {
            settings.layout.chrome_height = h;
        }
        settings
    }

    fn connection_mode(&self) -> ConnectionMode {
        self.connection_mode_with(chrome::running_in_ci())
    }

    fn connection_mode_with(&self, in_ci: bool) -> ConnectionMode {
        match self.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => {
                if in_ci {
                    log::info!("CI environment detected, launching Chrome headless without sandbox");
                }
                ConnectionMode::Sandboxed {
                    chrome_path: self.chrome_path.clone(),
                    no_sandbox: self.no_sandbox || in_ci,
                    headless: self.headless || in_ci,
                }
            }
        }
    }
}

/// Driver and capture backend wired together, plus the Chrome handle for shutdown
struct Backends {
    driver: Arc<dyn RenderDriver>,
    capture: Arc<dyn CaptureBackend>,
    chrome: Option<Arc<ChromeDriver>>,
}

async fn build_backends(args: &BackendArgs, settings: &CaptureSettings) -> anyhow::Result<Backends> {
    match (args.driver, args.capture) {
        (DriverKind::Safari, BackendKind::Cdp) => {
            bail!("--capture cdp needs --driver chrome; use --capture screencapture with safari")
        }
        (DriverKind::Safari, BackendKind::Screencapture) => Ok(Backends {
            driver: Arc::new(SafariDriver::default()),
            capture: Arc::new(ScreencaptureBackend::default()),
            chrome: None,
        }),
        (DriverKind::Chrome, backend) => {
            log::info!("Starting Chrome...");
            let chrome = Arc::new(
                ChromeDriver::new(args.connection_mode())
                    .await
                    .context("Failed to start Chrome")?,
            );
            let capture: Arc<dyn CaptureBackend> = match backend {
                BackendKind::Cdp => Arc::new(CdpCaptureBackend::new(chrome.clone(), settings.layout)),
                BackendKind::Screencapture => Arc::new(ScreencaptureBackend::default()),
            };
            Ok(Backends {
                driver: chrome.clone(),
                capture,
                chrome: Some(chrome),
            })
        }
    }
}

async fn shutdown_chrome(chrome: Option<Arc<ChromeDriver>>) {
    let Some(chrome) = chrome else { return };
    match Arc::try_unwrap(chrome) {
        Ok(chrome) => {
            if let Err(e) = chrome.shutdown().await {
                log::warn!("Chrome did not shut down cleanly: {}", e);
            }
        }
        Err(_) => log::warn!("Chrome still in use at exit, leaving it to drop"),
    }
}

fn build_request(args: &CaptureArgs, screenshotter: &Screenshotter) -> pageshot::Result<CaptureRequest> {
    let output = match args.format {
        Format::File => OutputTarget::File(match &args.output {
            Some(path) => path.clone(),
            None => screenshotter.default_output_path(&args.url)?,
        }),
        Format::Binary => OutputTarget::Bytes,
        Format::DataUri => OutputTarget::DataUri,
    };

    let viewport = args
        .viewport
        .or(args.device.map(DevicePreset::viewport))
        .unwrap_or(Viewport {
            width: args.width,
            height: args.height,
        });

    if !args.wait.is_finite() || args.wait < 0.0 {
        return Err(pageshot::CaptureError::InvalidRequest(format!(
            "wait must be a non-negative number of seconds, got {}",
            args.wait
        )));
    }

    let mut request = CaptureRequest::new(args.url.clone(), output)
        .with_viewport(viewport.width, viewport.height)
        .with_wait(Duration::from_secs_f64(args.wait))
        .with_zoom(args.zoom)
        .with_full_page(args.full_page)
        .with_whole_window(args.whole_window)
        .with_interactive(args.interactive);
    if let Some(selector) = &args.selector {
        request = request.with_selector(selector.clone());
    }
    if let Some(secs) = args.deadline {
        request = request.with_deadline(Duration::from_secs(secs));
    }
    Ok(request)
}

async fn run_capture(args: &CaptureArgs, screenshotter: &Screenshotter) -> ExitCode {
    let request = match build_request(args, screenshotter) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.kind().exit_code());
        }
    };

    match screenshotter.take_screenshot(request).await {
        Ok(result) => {
            let written = match &result.payload {
                Payload::File(path) => {
                    println!("Screenshot saved to: {}", path.display());
                    Ok(())
                }
                Payload::Bytes(bytes) => std::io::stdout().lock().write_all(bytes),
                Payload::DataUri(uri) => {
                    println!("{}", uri);
                    Ok(())
                }
            };
            match written {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: failed to write image to stdout: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.kind().exit_code())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let settings = cli.backend.settings();
    let backends = match build_backends(&cli.backend, &settings).await {
        Ok(backends) => backends,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let screenshotter = Arc::new(Screenshotter::new(
        backends.driver,
        backends.capture,
        settings,
    ));

    let code = match cli.command {
        Command::Capture(args) => run_capture(&args, &screenshotter).await,
        Command::Serve { port, over_stdio } => {
            let handler = Arc::new(ToolHandler::new(screenshotter.clone()));
            let served = if over_stdio {
                stdio::serve_stdio(&handler).await
            } else {
                http::serve_http(handler, port).await
            };
            match served {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) if over_stdio => {
                    log::error!("stdio transport failed: {}", e);
                    ExitCode::FAILURE
                }
                Err(e) => {
                    log::error!("Failed to bind to port {}: {}", port, e);
                    eprintln!("Error: Port {} is already in use or unavailable.", port);
                    ExitCode::FAILURE
                }
            }
        }
    };

    drop(screenshotter);
    shutdown_chrome(backends.chrome).await;
    code
}
