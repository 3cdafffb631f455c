//! Checks on the test fixtures themselves
//!
//! The fixture server and the scripted backends are exercised here so the
//! capture tests can rely on them.


use mock_backend::{FailPoint, MockCapture, MockDriver};
use pageshot::browser::{scripts, RenderDriver};
use pageshot::capture::CaptureBackend;
use pageshot::{CaptureRegion, ErrorKind, Rect};
use test_server::TestServer;

#[tokio::test]
async fn meta_test_server_serves_fixtures() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;

    let body = reqwest::get(server.url()).await?.text().await?;
    assert!(body.contains("id=\"card\""));
    assert!(body.contains("id=\"ghost\""));

    let long = reqwest::get(format!("{}/long", server.url())).await?;
    assert!(long.status().is_success());
    Ok(())
}

#[tokio::test]
async fn meta_test_multiple_servers_different_ports() {
    let server1 = TestServer::start().await;
    let server2 = TestServer::start().await;
    assert_ne!(server1.addr().port(), server2.addr().port());
}

#[tokio::test]
async fn meta_test_mock_driver_default_page() -> anyhow::Result<()> {
    let driver = MockDriver::new();
    assert_eq!(driver.evaluate_script(scripts::SCROLL_HEIGHT).await?, "2400");
    assert_eq!(driver.evaluate_script(&scripts::check_element("#x")).await?, "ok");
    let rect: scripts::ClientRect =
        scripts::decode_json(&driver.evaluate_script(&scripts::element_rect("#x")).await?)?;
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (10, 20, 300, 150));
    Ok(())
}

#[tokio::test]
async fn meta_test_mock_driver_fail_points() {
    let driver = MockDriver::new().fail_at(FailPoint::Open);
    assert!(driver.probe().await.is_ok());
    let err = driver.open("https://example.com").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RenderUnavailable);
    assert!(driver.close().await.is_ok());
    assert!(driver.close().await.is_ok());
    assert_eq!(driver.closes(), 2);
}

#[tokio::test]
async fn meta_test_mock_capture_writes_requested_size() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let capture = MockCapture::new(1234);
    let dest = dir.path().join("x.png");
    let region = CaptureRegion::Rect(Rect {
        x: 0,
        y: 0,
        width: 1,
        height: 1,
    });

    capture.capture(&region, &dest, false).await?;
    assert_eq!(std::fs::metadata(&dest)?.len(), 1234);
    assert_eq!(capture.count(), 1);
    assert_eq!(capture.regions(), vec![region]);
    Ok(())
}
