use std::fmt;
use thiserror::Error;

/// Why an element could not be used as a capture target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementProblem {
    /// No node matched the selector
    Missing,
    /// The node exists but has no offset parent
    NotVisible,
    /// The node's bounding box has zero width or height
    ZeroSize,
}

impl fmt::Display for ElementProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ElementProblem::Missing => "Element not found",
            ElementProblem::NotVisible => "Element is not visible",
            ElementProblem::ZeroSize => "Element has no dimensions",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Automation permission denied: {0}")]
    PermissionDenied(String),

    #[error("Render process unavailable: {0}")]
    RenderUnavailable(String),

    #[error("Script evaluation failed: {0}")]
    ScriptEvaluation(String),

    #[error("{problem}: {selector}")]
    ElementNotFound {
        selector: String,
        problem: ElementProblem,
    },

    #[error("Screenshot appears to be empty or too small ({bytes} bytes, need at least {threshold})")]
    EmptyCapture { bytes: u64, threshold: u64 },

    #[error("Capture command failed: {0}")]
    CaptureExecutionFailed(String),

    #[error("Capture did not finish within {0:?}")]
    DeadlineExceeded(std::time::Duration),
}

/// Fieldless discriminant of [`CaptureError`], used by front-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    PermissionDenied,
    RenderUnavailable,
    ScriptEvaluation,
    ElementNotFound,
    EmptyCapture,
    CaptureExecutionFailed,
    DeadlineExceeded,
}

impl ErrorKind {
    /// Process exit code used by the command-line front-end
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidRequest => 2,
            ErrorKind::PermissionDenied => 3,
            ErrorKind::RenderUnavailable => 4,
            ErrorKind::ScriptEvaluation => 5,
            ErrorKind::ElementNotFound => 6,
            ErrorKind::EmptyCapture => 7,
            ErrorKind::CaptureExecutionFailed => 8,
            ErrorKind::DeadlineExceeded => 9,
        }
    }
}

impl CaptureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            CaptureError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            CaptureError::RenderUnavailable(_) => ErrorKind::RenderUnavailable,
            CaptureError::ScriptEvaluation(_) => ErrorKind::ScriptEvaluation,
            CaptureError::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            CaptureError::EmptyCapture { .. } => ErrorKind::EmptyCapture,
            CaptureError::CaptureExecutionFailed(_) => ErrorKind::CaptureExecutionFailed,
            CaptureError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for CaptureError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        CaptureError::RenderUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
