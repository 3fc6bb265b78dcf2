use std::sync::Mutex;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xray_editor_bootstrap::{FetchError, HttpFetcher, ModuleFetcher, SchemaSource};

fn module_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
    bytes.resize(len, 0xAB);
    bytes
}

#[tokio::test]
async fn test_fetch_module_reports_progress() {
    let server = MockServer::start().await;
    let body = module_bytes(256 * 1024);

    Mock::given(method("GET"))
        .and(path("/main.wasm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_default_timeout(&server.uri()).unwrap();
    let progress = Mutex::new(Vec::new());
    let record = |p: f64| progress.lock().unwrap().push(p);

    let binary = fetcher.fetch("main.wasm", &record).await.unwrap();
    assert_eq!(binary.as_bytes(), body.as_slice());

    let progress = progress.into_inner().unwrap();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(progress.first().copied(), Some(0.0));
    assert_eq!(progress.last().copied(), Some(1.0));
    assert_eq!(progress.iter().filter(|p| **p == 1.0).count(), 1);
}

#[tokio::test]
async fn test_fetch_module_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/main.wasm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_default_timeout(&server.uri()).unwrap();
    let progress = Mutex::new(Vec::new());
    let record = |p: f64| progress.lock().unwrap().push(p);

    let result = fetcher.fetch("main.wasm", &record).await;
    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    assert!(progress.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_module_connection_refused() {
    // Nothing listens on the TCP port multiplexer port.
    let fetcher = HttpFetcher::with_default_timeout("http://127.0.0.1:1/").unwrap();
    let result = fetcher.fetch("main.wasm", &|_: f64| {}).await;
    assert!(matches!(result, Err(FetchError::Http(_))));
}

#[tokio::test]
async fn test_fetch_module_oversized_content_length() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 9000000000000000\r\n\r\n\0asm")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let fetcher = HttpFetcher::with_default_timeout(&format!("http://{addr}/")).unwrap();
    let result = fetcher.fetch("main.wasm", &|_: f64| {}).await;
    assert!(matches!(result, Err(FetchError::Http(_))));

    server.await.unwrap();
}

#[tokio::test]
async fn test_fetch_schema_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xray.schema.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Xray config",
            "type": "object"
        })))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_default_timeout(&server.uri()).unwrap();
    let schema = fetcher.fetch_schema("xray.schema.json").await.unwrap();
    assert_eq!(schema["title"], "Xray config");
}

#[tokio::test]
async fn test_fetch_schema_invalid_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xray.schema.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_default_timeout(&server.uri()).unwrap();
    let result = fetcher.fetch_schema("xray.schema.json").await;
    assert!(matches!(result, Err(FetchError::Json(_))));
}
