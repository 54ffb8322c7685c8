//! HTTP engines and the page provider against a local HTTP server.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use a11ymatrix_core::{
    normalize_payload, Adapter, AdapterError, AdapterRegistry, AdapterSettings, BrowserProvider,
    ExecutionUnit, Outcome, RawPayload, RunConfig, Scheduler, UnitContext,
    ViewportProfile,
};
use a11ymatrix_engines::{CssValidatorAdapter, HttpPageProvider, W3cAdapter, WaveAdapter};
use reqwest::Client;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// -------------------------------------------------------------------------
// Local server
// -------------------------------------------------------------------------

#[derive(Clone)]
struct Route {
    status: u16,
    content_type: &'static str,
    body: String,
}

struct TestServer {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Serve `routes` keyed by path (query string excluded). Unknown paths get 404.
    async fn start(routes: BTreeMap<&'static str, Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        let routes = Arc::new(routes);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&buf).to_string();
                    let target = head
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/")
                        .to_string();
                    log.lock().unwrap().push(target.clone());

                    let path = target.split('?').next().unwrap_or("/");
                    let route = routes.get(path).cloned().unwrap_or(Route {
                        status: 404,
                        content_type: "text/plain",
                        body: "not found".into(),
                    });
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        route.status,
                        route.content_type,
                        route.body.len(),
                        route.body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self { base, requests }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn json_route(status: u16, body: serde_json::Value) -> Route {
    Route {
        status,
        content_type: "application/json",
        body: body.to_string(),
    }
}

fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

fn context(adapter: &str, url: &str) -> UnitContext {
    UnitContext {
        unit: ExecutionUnit::new(url, "chromium", ViewportProfile::desktop(), adapter),
        url: url.to_string(),
        session: None,
        deadline: tokio::time::Instant::now() + Duration::from_secs(10),
        attempt: 1,
    }
}

fn settings(endpoint: String) -> AdapterSettings {
    AdapterSettings {
        endpoint: Some(endpoint),
        ..AdapterSettings::default()
    }
}

// -------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------

#[tokio::test]
async fn w3c_report_is_fetched_and_normalized() {
    let server = TestServer::start(BTreeMap::from([(
        "/nu/",
        json_route(
            200,
            json!({"messages": [
                {"type": "error", "lastLine": 3, "firstColumn": 1, "lastColumn": 9,
                 "message": "Duplicate ID “nav”."}
            ]}),
        ),
    )]))
    .await;
    let adapter = W3cAdapter::with_client(client(), &settings(server.url("/nu/")));

    let payload = adapter
        .invoke(&context("w3c", "https://site.test/about"))
        .await
        .unwrap();
    assert!(matches!(payload, RawPayload::W3c(_)));
    let issues = normalize_payload("w3c", &payload).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].outcome, Outcome::Failed);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("doc=https%3A%2F%2Fsite.test%2Fabout"));
    assert!(requests[0].contains("out=json"));
}

#[tokio::test]
async fn css_validator_report_is_fetched_and_normalized() {
    let server = TestServer::start(BTreeMap::from([
        (
            "/css-validator/validator",
            json_route(
                200,
                json!({"cssvalidation": {
                    "validity": false,
                    "errors": [{"source": "https://site.test/site.css", "line": 7,
                                "context": " nav a ", "type": "value",
                                "message": "Value Error : outline-width  Unknown dimension"}],
                    "warnings": [{"source": "https://site.test/site.css", "line": 2,
                                  "type": "vendor-extension", "message": "-moz-appearance is a vendor extension"}]
                }}),
            ),
        ),
        ("/not-css", json_route(200, json!({"messages": []}))),
    ]))
    .await;
    let mut css_settings = settings(server.url("/css-validator/validator"));
    css_settings
        .options
        .insert("profile".into(), json!("css3svg"));
    let adapter = CssValidatorAdapter::with_client(client(), &css_settings);

    let payload = adapter
        .invoke(&context("w3c-css", "https://site.test/"))
        .await
        .unwrap();
    assert!(matches!(payload, RawPayload::W3cCss(_)));
    let issues = normalize_payload("w3c-css", &payload).unwrap();
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].outcome, Outcome::Failed);
    assert_eq!(issues[1].outcome, Outcome::Incomplete);

    let request = &server.requests()[0];
    assert!(request.contains("uri=https%3A%2F%2Fsite.test%2F"));
    assert!(request.contains("profile=css3svg"));
    assert!(request.contains("output=json"));

    let wrong = CssValidatorAdapter::with_client(client(), &settings(server.url("/not-css")));
    let err = wrong
        .invoke(&context("w3c-css", "https://site.test/"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::InvalidOutput(_)));
}

#[tokio::test]
async fn server_errors_are_transient_client_errors_are_not() {
    let server = TestServer::start(BTreeMap::from([(
        "/busy",
        json_route(503, json!({"error": "busy"})),
    )]))
    .await;

    let busy = W3cAdapter::with_client(client(), &settings(server.url("/busy")));
    let err = busy
        .invoke(&context("w3c", "https://site.test/"))
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::HttpStatus { status: 503 });
    assert!(err.is_transient());

    let missing = W3cAdapter::with_client(client(), &settings(server.url("/gone")));
    let err = missing
        .invoke(&context("w3c", "https://site.test/"))
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::HttpStatus { status: 404 });
    assert!(!err.is_transient());
}

#[tokio::test]
async fn wave_sends_key_and_rejects_failed_status() {
    const KEY_VAR: &str = "A11YMATRIX_HTTP_TEST_WAVE_KEY";
    std::env::set_var(KEY_VAR, "k-123");

    let server = TestServer::start(BTreeMap::from([
        (
            "/ok",
            json_route(
                200,
                json!({
                    "status": {"success": true},
                    "categories": {
                        "error": {"description": "Errors", "count": 1, "items": {
                            "alt_missing": {"id": "alt_missing", "description": "Missing alternative text",
                                            "count": 1, "selectors": ["img#logo"]}
                        }}
                    }
                }),
            ),
        ),
        (
            "/rejected",
            json_route(200, json!({"status": {"success": false, "error": "Out of credits"}})),
        ),
    ]))
    .await;

    let ok = WaveAdapter::with_client(
        client(),
        &AdapterSettings {
            endpoint: Some(server.url("/ok")),
            credential_env: Some(KEY_VAR.into()),
            ..AdapterSettings::default()
        },
    );
    let payload = ok
        .invoke(&context("wave", "https://site.test/"))
        .await
        .unwrap();
    let issues = normalize_payload("wave", &payload).unwrap();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].wcag_criteria.contains("1.1.1"));
    assert!(server.requests()[0].contains("key=k-123"));

    let rejected = WaveAdapter::with_client(
        client(),
        &AdapterSettings {
            endpoint: Some(server.url("/rejected")),
            credential_env: Some(KEY_VAR.into()),
            ..AdapterSettings::default()
        },
    );
    let err = rejected
        .invoke(&context("wave", "https://site.test/"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::InvalidOutput(msg) if msg.contains("Out of credits")));
}

#[tokio::test]
async fn page_provider_fetches_html_with_content_type() {
    let server = TestServer::start(BTreeMap::from([(
        "/index.html",
        Route {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: "<html lang=\"ja\"><body><h1>ようこそ</h1></body></html>".into(),
        },
    )]))
    .await;
    let provider = HttpPageProvider::with_client(client());
    let session = provider
        .launch("firefox", &ViewportProfile::tablet())
        .await
        .unwrap();

    let snapshot = session.snapshot(&server.url("/index.html")).await.unwrap();
    assert!(snapshot.html.contains("ようこそ"));
    assert_eq!(
        snapshot.content_type.as_deref(),
        Some("text/html; charset=utf-8")
    );
    assert_eq!(snapshot.viewport, ViewportProfile::tablet());

    let err = session.snapshot(&server.url("/missing")).await.unwrap_err();
    assert_eq!(err, AdapterError::HttpStatus { status: 404 });
}

#[tokio::test]
async fn scheduler_drives_http_engine_across_viewports() {
    let server = TestServer::start(BTreeMap::from([(
        "/nu/",
        json_route(
            200,
            json!({"messages": [{"type": "error", "lastLine": 1, "message": "Stray end tag “div”."}]}),
        ),
    )]))
    .await;
    let registry = AdapterRegistry::new().with(Arc::new(W3cAdapter::with_client(
        client(),
        &settings(server.url("/nu/")),
    )));
    let config = RunConfig {
        urls: vec!["https://site.test/".into()],
        browsers: vec!["chromium".into()],
        viewports: vec![ViewportProfile::mobile(), ViewportProfile::desktop()],
        adapters: vec!["w3c".into()],
        max_retries: 0,
        ..RunConfig::default()
    };

    let outcome = Scheduler::new(registry).run(&config).await.unwrap();
    let report = outcome.report();
    assert_eq!(report.summary.units, 2);
    assert_eq!(report.summary.total_errors(), 0);
    assert_eq!(report.summary.failed(), 2);
    assert_eq!(server.requests().len(), 2);
}
