pub mod browser;
pub mod capture;
pub mod config;
pub mod error;
pub mod geometry;
pub mod orchestrator;
pub mod request;
pub mod session;
pub mod tool;
pub mod validate;
pub mod viewport;

//  Re-export commonly used items
pub use browser::{
    ChromeDriver, ConnectionMode, RenderDriver, RenderSession, SafariDriver, SessionHandle,
    WindowBounds, WindowHandle,
};
pub use capture::{CaptureBackend, CaptureExecutor, CdpCaptureBackend, ScreencaptureBackend};
pub use config::CaptureSettings;
pub use error::{CaptureError, ElementProblem, ErrorKind, Result};
pub use geometry::{CaptureRegion, GeometryResolver, Rect, WindowLayout};
pub use orchestrator::Screenshotter;
pub use request::{CaptureMode, CaptureRequest, CaptureResult, OutputTarget, Payload};
pub use tool::{ToolHandler, ToolRequest, ToolResponse};
pub use validate::ResultValidator;
pub use viewport::{DevicePreset, Viewport};
