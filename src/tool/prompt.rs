//! Natural-language capture prompts
//!
//! "Take a screenshot of https://example.com on mobile-small at 150% zoom,
//! wait 5 seconds"

use super::ToolRequest;
use crate::error::{CaptureError, Result};
use crate::viewport::{DevicePreset, Viewport};

pub fn parse_prompt(input: &str) -> Result<ToolRequest> {
    let url = find_url(input)
        .ok_or_else(|| CaptureError::InvalidRequest("No URL found in input".to_string()))?;

    let lower = input.to_lowercase();
    let mut request = ToolRequest {
        url: url.to_string(),
        ..Default::default()
    };

    // Later presets in the list win when several are mentioned
    for preset in DevicePreset::ALL {
        if lower.contains(preset.name()) {
            request.device = Some(preset);
        }
    }
    if let Some(size) = find_size(input) {
        request.width = Some(size.width);
        request.height = Some(size.height);
    }
    if let Some(percent) = find_zoom_percent(&lower) {
        request.zoom = Some(percent as f64 / 100.0);
    }
    if let Some(secs) = find_wait_seconds(&lower) {
        request.wait = Some(secs as f64);
    }

    Ok(request)
}

fn find_url(input: &str) -> Option<&str> {
    input.split_whitespace().find_map(|token| {
        let start = match (token.find("http://"), token.find("https://")) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => return None,
        };
        Some(&token[start..])
    })
}

/// A standalone `1280x720` token
fn find_size(input: &str) -> Option<Viewport> {
    input
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter_map(Viewport::parse_size)
        .find(|size| size.width > 0 && size.height > 0)
}

/// Digits ending at byte offset `end`
fn digits_before(text: &str, end: usize) -> Option<u32> {
    let head = &text[..end];
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    head[start..].parse().ok()
}

/// Digits starting at the beginning of `text`, and the rest after them
fn leading_digits(text: &str) -> Option<(u32, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    Some((text[..end].parse().ok()?, &text[end..]))
}

/// `NNN% zoom`
fn find_zoom_percent(text: &str) -> Option<u32> {
    text.match_indices('%').find_map(|(at, _)| {
        let after = text[at + 1..].trim_start();
        if !after.starts_with("zoom") {
            return None;
        }
        digits_before(text, at)
    })
}

/// `wait N second(s)`
fn find_wait_seconds(text: &str) -> Option<u32> {
    text.match_indices("wait").find_map(|(at, word)| {
        let after = text[at + word.len()..].trim_start();
        let (secs, rest) = leading_digits(after)?;
        rest.trim_start().starts_with("second").then_some(secs)
    })
}
