//! HTTP transport
//!
//! `GET /health`, `GET /devices` and `POST /screenshot` with a tool request
//! body. Every screenshot reply is a `ToolResponse`, including malformed bodies.

use super::{ToolHandler, ToolRequest, ToolResponse, TOOL_NAME};
use crate::error::CaptureError;
use crate::viewport::DevicePreset;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

pub const DEFAULT_PORT: u16 = 9669;

#[derive(Debug, Serialize)]
struct DeviceInfo {
    name: &'static str,
    width: u32,
    height: u32,
}

pub fn routes(
    handler: Arc<ToolHandler>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health").and(warp::get()).map(|| {
        warp::reply::json(&serde_json::json!({ "status": "ok", "tool": TOOL_NAME }))
    });

    let devices = warp::path("devices").and(warp::get()).map(|| {
        let list: Vec<DeviceInfo> = DevicePreset::ALL
            .into_iter()
            .map(|preset| {
                let viewport = preset.viewport();
                DeviceInfo {
                    name: preset.name(),
                    width: viewport.width,
                    height: viewport.height,
                }
            })
            .collect();
        warp::reply::json(&list)
    });

    let handler_filter = warp::any().map(move || handler.clone());

    let screenshot = warp::path("screenshot")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(handler_filter)
        .and_then(handle_screenshot);

    health.or(devices).or(screenshot)
}

async fn handle_screenshot(
    body: warp::hyper::body::Bytes,
    handler: Arc<ToolHandler>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = match serde_json::from_slice::<ToolRequest>(&body) {
        Ok(request) => handler.handle(request).await,
        Err(e) => {
            log::warn!("Rejected malformed screenshot request: {}", e);
            ToolResponse::failure(CaptureError::InvalidRequest(format!("malformed request: {}", e)))
        }
    };
    Ok(warp::reply::json(&response))
}

/// Bind `127.0.0.1:<port>` and serve until the process exits
pub async fn serve_http(handler: Arc<ToolHandler>, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);

    warp::serve(routes(handler))
        .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
        .await;
    Ok(())
}
