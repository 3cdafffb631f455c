//! In-page expressions used while preparing a capture
//!
//! Every expression evaluates to a string so drivers that only see stdout
//! (AppleScript `do JavaScript`) and drivers with typed results (CDP) agree.

use crate::error::{CaptureError, ElementProblem, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Quote `value` as a JavaScript string literal
pub fn js_string(value: &str) -> String {
    // JSON string syntax is valid JavaScript apart from U+2028/U+2029
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

pub fn set_zoom(zoom: f64) -> String {
    let percent = zoom * 100.0;
    format!(
        "(function() {{ document.body.style.zoom = '{}%'; return String(document.body.style.zoom); }})()",
        percent
    )
}

pub const SCROLL_HEIGHT: &str = "(function() { \
    var root = document.documentElement; \
    var body = document.body; \
    return String(Math.max(root ? root.scrollHeight : 0, body ? body.scrollHeight : 0)); \
})()";

pub fn check_element(selector: &str) -> String {
    format!(
        r#"(function() {{
  const el = document.querySelector({sel});
  if (!el) return 'Element not found';
  if (!el.offsetParent) return 'Element is not visible';
  const rect = el.getBoundingClientRect();
  if (rect.width === 0 || rect.height === 0) return 'Element has no dimensions';
  return 'ok';
}})()"#,
        sel = js_string(selector)
    )
}

pub fn element_rect(selector: &str) -> String {
    format!(
        r#"(function() {{
  const rect = document.querySelector({sel}).getBoundingClientRect();
  return JSON.stringify({{
    x: Math.round(rect.left),
    y: Math.round(rect.top),
    width: Math.round(rect.width),
    height: Math.round(rect.height)
  }});
}})()"#,
        sel = js_string(selector)
    )
}

/// Page-relative rectangle reported by [`element_rect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ClientRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Map the element check's answer onto an outcome
pub fn element_check_outcome(answer: &str, selector: &str) -> Result<()> {
    let problem = match answer.trim() {
        "ok" => return Ok(()),
        "Element not found" => ElementProblem::Missing,
        "Element is not visible" => ElementProblem::NotVisible,
        "Element has no dimensions" => ElementProblem::ZeroSize,
        other => {
            return Err(CaptureError::ScriptEvaluation(format!(
                "unexpected element check result: {:?}",
                other
            )))
        }
    };
    Err(CaptureError::ElementNotFound {
        selector: selector.to_string(),
        problem,
    })
}

/// Unwrap a script value into text
pub fn as_text(value: &serde_json::Value) -> Result<String> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(CaptureError::ScriptEvaluation(format!(
            "expected a string result, got {}",
            other
        ))),
    }
}

/// Decode a JSON document returned as a string
pub fn decode_json<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T> {
    let parsed = match value {
        serde_json::Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| CaptureError::ScriptEvaluation(format!("malformed script result: {}", e)))
}
