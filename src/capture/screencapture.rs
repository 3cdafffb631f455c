//! OS screen capture through the macOS `screencapture` tool

use super::CaptureBackend;
use crate::error::{CaptureError, Result};
use crate::geometry::CaptureRegion;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

pub struct ScreencaptureBackend {
    program: String,
}

impl Default for ScreencaptureBackend {
    fn default() -> Self {
        Self::new("screencapture")
    }
}

impl ScreencaptureBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for one capture
    pub fn arguments(region: &CaptureRegion, destination: &Path, interactive: bool) -> Vec<String> {
        // -x: no sound, no interaction; -i: let the user pick
        let mut args = vec![if interactive { "-i" } else { "-x" }.to_string()];
        match region {
            CaptureRegion::Rect(rect) => args.push(format!("-R{}", rect)),
            CaptureRegion::Window(handle) => args.push(format!("-l{}", handle)),
        }
        args.push(destination.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl CaptureBackend for ScreencaptureBackend {
    fn name(&self) -> &'static str {
        "screencapture"
    }

    async fn capture(
        &self,
        region: &CaptureRegion,
        destination: &Path,
        interactive: bool,
    ) -> Result<()> {
        let args = Self::arguments(region, destination, interactive);
        log::debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                CaptureError::CaptureExecutionFailed(format!(
                    "Failed to run {}: {}",
                    self.program, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::CaptureExecutionFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
