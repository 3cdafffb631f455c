//! Blank-capture guard
//!
//! A capture smaller than the threshold is treated as a black or blank frame.
//! This is a plausibility check, not an image format check.

use crate::error::{CaptureError, Result};
use std::path::Path;

/// Smallest accepted artifact size; exactly this many bytes passes
pub const MIN_CAPTURE_BYTES: u64 = 1000;

#[derive(Debug, Clone, Copy)]
pub struct ResultValidator {
    threshold: u64,
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::new(MIN_CAPTURE_BYTES)
    }
}

impl ResultValidator {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn check_len(&self, bytes: u64) -> Result<u64> {
        if bytes < self.threshold {
            return Err(CaptureError::EmptyCapture {
                bytes,
                threshold: self.threshold,
            });
        }
        Ok(bytes)
    }

    pub fn validate_bytes(&self, data: &[u8]) -> Result<u64> {
        self.check_len(data.len() as u64)
    }

    /// Size of the artifact at `path`; a missing file counts as empty
    pub async fn validate_file(&self, path: &Path) -> Result<u64> {
        let len = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                log::warn!("Capture artifact {:?} unreadable: {}", path, e);
                0
            }
        };
        self.check_len(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        let validator = ResultValidator::default();
        match validator.check_len(999) {
            Err(CaptureError::EmptyCapture { bytes, threshold }) => {
                assert_eq!(bytes, 999);
                assert_eq!(threshold, 1000);
            }
            other => panic!("999 bytes should be rejected, got {:?}", other),
        }
        assert_eq!(validator.check_len(1000).unwrap(), 1000);
        assert!(validator.check_len(0).is_err());
    }

    #[test]
    fn test_validate_bytes() {
        let validator = ResultValidator::new(4);
        assert!(validator.validate_bytes(b"abc").is_err());
        assert_eq!(validator.validate_bytes(b"abcd").unwrap(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_capture() {
        let validator = ResultValidator::default();
        let err = validator
            .validate_file(Path::new("/nonexistent/pageshot/capture.png"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::EmptyCapture);
    }
}
