//! Tool protocol handler and its stdio/HTTP transports


use mock_backend::{screenshotter, MockCapture, MockDriver};
use pageshot::tool::{http, stdio, ToolHandler, ToolRequest, ToolResponse};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    driver: Arc<MockDriver>,
    capture: Arc<MockCapture>,
    handler: Arc<ToolHandler>,
}

fn harness(driver: MockDriver) -> Harness {
    let dir = TempDir::new().unwrap();
    let driver = Arc::new(driver);
    let capture = Arc::new(MockCapture::new(50_000));
    let handler = Arc::new(ToolHandler::new(Arc::new(screenshotter(
        &driver,
        &capture,
        dir.path(),
    ))));
    Harness {
        dir,
        driver,
        capture,
        handler,
    }
}

fn parse(line: &str) -> ToolResponse {
    serde_json::from_str(line).unwrap()
}

#[tokio::test]
async fn test_handle_saves_to_requested_path() {
    let h = harness(MockDriver::new());
    let path = h.dir.path().join("out").join("page.png");

    let response = h
        .handler
        .handle(ToolRequest {
            url: "https://example.com".to_string(),
            wait: Some(0.0),
            output_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        })
        .await;

    assert!(response.success, "{}", response.message);
    assert_eq!(response.path.as_deref(), Some(path.to_str().unwrap()));
    assert_eq!(response.message, format!("Screenshot saved to: {}", path.display()));
    assert!(path.exists());
}

#[tokio::test]
async fn test_handle_line_json_with_device_preset() {
    let h = harness(MockDriver::new());

    let reply = h
        .handler
        .handle_line(r#"{"url":"https://example.com","device":"mobile-medium","waitTime":0}"#)
        .await
        .unwrap();
    let response = parse(&reply);

    assert!(response.success, "{}", response.message);
    let path = response.path.unwrap();
    assert!(path.starts_with(h.dir.path().to_str().unwrap()), "{}", path);
    assert!(path.contains("example.com-"), "{}", path);

    let bounds = h.driver.bounds_history();
    assert_eq!((bounds[0].width, bounds[0].height), (390, 844));
}

#[tokio::test]
async fn test_handle_line_natural_language() {
    let h = harness(MockDriver::new());

    let reply = h
        .handler
        .handle_line("Take a screenshot of https://example.com on desktop at 150% zoom, wait 0 seconds")
        .await
        .unwrap();
    let response = parse(&reply);

    assert!(response.success, "{}", response.message);
    let bounds = h.driver.bounds_history();
    assert_eq!((bounds[0].width, bounds[0].height), (1920, 1080));
    assert!(h
        .driver
        .script_history()
        .iter()
        .any(|script| script.contains("'150%'")));
}

#[tokio::test]
async fn test_handle_line_errors_become_envelopes() {
    let h = harness(MockDriver::new());

    assert_eq!(h.handler.handle_line("   ").await, None);

    let response = parse(&h.handler.handle_line("{not json").await.unwrap());
    assert!(!response.success);
    assert!(response.message.starts_with("Error: Invalid request"), "{}", response.message);
    assert_eq!(response.path, None);

    let response = parse(&h.handler.handle_line("screenshot please").await.unwrap());
    assert!(!response.success);
    assert!(response.message.contains("No URL found"), "{}", response.message);

    let response = parse(&h.handler.handle_line(r#"{"device":"desktop"}"#).await.unwrap());
    assert!(!response.success);
    assert!(response.message.contains("url is required"), "{}", response.message);

    assert_eq!(h.driver.opens(), 0);
    assert_eq!(h.capture.count(), 0);
}

#[tokio::test]
async fn test_capture_failure_is_reported() {
    let h = harness(MockDriver::with_element_answer("Element not found"));

    let reply = h
        .handler
        .handle_line(r##"{"url":"https://example.com","selector":"#missing","wait":0}"##)
        .await
        .unwrap();
    let response = parse(&reply);

    assert!(!response.success);
    assert_eq!(response.message, "Error: Element not found: #missing");
    assert_eq!(h.driver.closes(), 1);
}

#[tokio::test]
async fn test_stdio_transport_answers_each_line() -> anyhow::Result<()> {
    let h = harness(MockDriver::new());
    let input = "{\"url\":\"https://example.com\",\"wait\":0}\n\nno url here\n";
    let mut output = Vec::new();

    stdio::serve_lines(&h.handler, input.as_bytes(), &mut output).await?;

    let text = String::from_utf8(output)?;
    let replies: Vec<ToolResponse> = text.lines().map(parse).collect();
    assert_eq!(replies.len(), 2);
    assert!(replies[0].success);
    assert!(!replies[1].success);
    Ok(())
}

#[tokio::test]
async fn test_http_health_and_devices() {
    let h = harness(MockDriver::new());
    let routes = http::routes(h.handler.clone());

    let res = warp::test::request().path("/health").reply(&routes).await;
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["status"], "ok");

    let res = warp::test::request().path("/devices").reply(&routes).await;
    assert_eq!(res.status(), 200);
    let devices: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 7);
    assert_eq!(devices[0]["name"], "desktop");
    assert_eq!(devices[0]["width"], 1920);
    assert_eq!(devices[6]["name"], "mobile-small");
}

#[tokio::test]
async fn test_http_screenshot() {
    let h = harness(MockDriver::new());
    let routes = http::routes(h.handler.clone());
    let path = h.dir.path().join("http.png");

    let res = warp::test::request()
        .method("POST")
        .path("/screenshot")
        .json(&serde_json::json!({
            "url": "https://example.com",
            "width": 800,
            "height": 600,
            "wait": 0,
            "outputPath": path,
        }))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 200);
    let response: ToolResponse = serde_json::from_slice(res.body()).unwrap();
    assert!(response.success, "{}", response.message);
    assert!(path.exists());

    let res = warp::test::request()
        .method("POST")
        .path("/screenshot")
        .body("not json")
        .reply(&routes)
        .await;
    let response: ToolResponse = serde_json::from_slice(res.body()).unwrap();
    assert!(!response.success);
    assert_eq!(h.capture.count(), 1);
}
