//! Live captures through headless Chrome
//!
//! These need a Chrome installation (or network access to download one) and
//! are ignored by default:
//!
//! ```text
//! cargo test --test chrome_capture_test -- --ignored
//! ```


use pageshot::capture::CdpCaptureBackend;
use pageshot::{
    CaptureError, CaptureRequest, CaptureSettings, ChromeDriver, ConnectionMode, ElementProblem,
    OutputTarget, Payload, Screenshotter,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_server::TestServer;

const PNG_SIGNATURE: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

async fn headless_screenshotter(dir: &TempDir) -> anyhow::Result<Screenshotter> {
    let chrome = Arc::new(
        ChromeDriver::new(ConnectionMode::Sandboxed {
            chrome_path: None,
            no_sandbox: true,
            headless: true,
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to launch Chrome: {}", e))?,
    );

    let settings = CaptureSettings {
        output_dir: dir.path().to_path_buf(),
        settle_delay: Duration::from_millis(200),
        ..CaptureSettings::default()
    };
    let backend = Arc::new(CdpCaptureBackend::new(chrome.clone(), settings.layout));
    Ok(Screenshotter::new(chrome, backend, settings))
}

fn request(url: &str, output: OutputTarget) -> CaptureRequest {
    CaptureRequest::new(url, output).with_wait(Duration::from_millis(300))
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_viewport_capture_writes_png() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let dir = TempDir::new()?;
    let shooter = headless_screenshotter(&dir).await?;

    let path = dir.path().join("viewport.png");
    let result = shooter
        .take_screenshot(request(&server.url(), OutputTarget::File(path.clone())).with_viewport(800, 600))
        .await?;

    assert!(result.byte_length >= 1000);
    let data = tokio::fs::read(&path).await?;
    assert_eq!(&data[..4], &PNG_SIGNATURE);
    Ok(())
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_element_and_full_page_capture() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let dir = TempDir::new()?;
    let shooter = headless_screenshotter(&dir).await?;

    let element = shooter
        .take_screenshot(request(&server.url(), OutputTarget::Bytes).with_selector("#card"))
        .await?;
    match &element.payload {
        Payload::Bytes(data) => assert_eq!(&data[..4], &PNG_SIGNATURE),
        other => panic!("expected bytes, got {:?}", other),
    }

    let long = format!("{}/long", server.url());
    let full = shooter
        .take_screenshot(request(&long, OutputTarget::DataUri).with_full_page(true))
        .await?;
    match &full.payload {
        Payload::DataUri(uri) => assert!(uri.starts_with("data:image/png;base64,iVBOR")),
        other => panic!("expected data uri, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_element_problems_reported_by_chrome() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let dir = TempDir::new()?;
    let shooter = headless_screenshotter(&dir).await?;

    let cases = [
        ("#missing", ElementProblem::Missing),
        ("#ghost", ElementProblem::NotVisible),
        ("#flat", ElementProblem::ZeroSize),
    ];
    for (selector, expected) in cases {
        match shooter
            .take_screenshot(request(&server.url(), OutputTarget::Bytes).with_selector(selector))
            .await
        {
            Err(CaptureError::ElementNotFound { problem, .. }) => assert_eq!(problem, expected),
            other => panic!("expected ElementNotFound for {}, got {:?}", selector, other),
        }
    }
    Ok(())
}
