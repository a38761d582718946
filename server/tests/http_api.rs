//! End-to-end tests: the real router on an ephemeral port, with the LLM,
//! news search, and RSS feed all served by wiremock.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracker_core::config::ApiKeys;
use tracker_core::{Tracker, TrackerConfig};
use tracker_server::AppState;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>World</title>
  <item>
    <title>Ministers walk out of alliance summit</title>
    <description>Talks collapsed on Tuesday.</description>
    <link>https://news.example/summit</link>
    <pubDate>Tue, 03 Jun 2025 09:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Second item is never read</title>
    <description>x</description>
  </item>
</channel></rss>"#;

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

async fn upstream() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("evaluate the status"))
        .respond_with(completion("Achieved"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("On a scale from 0 to 100"))
        .respond_with(completion("82"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Classify this article"))
        .respond_with(completion("Media Subversion"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "articles": [
                { "title": "Agency overhaul", "description": "Staff reassigned", "url": "https://news.example/a" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .mount(&server)
        .await;

    server
}

fn config_for(upstream: &MockServer) -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.llm.base_url = upstream.uri();
    config.llm.score_cache_ttl_secs = 0;
    config.news.base_url = format!("{}/v2/everything", upstream.uri());
    config.rss.feeds = vec![format!("{}/rss.xml", upstream.uri())];
    config
}

async fn spawn_app(config: &TrackerConfig) -> String {
    let keys = ApiKeys {
        openai: Some("sk-test".to_string()),
        news: Some("news-key".to_string()),
    };
    let tracker = Tracker::from_config(config, &keys).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(tracker_server::serve(
        listener,
        AppState::new(tracker),
        std::future::pending(),
    ));
    format!("http://{addr}")
}

async fn get_json(url: &str) -> Value {
    let response = reqwest::get(url).await.unwrap();
    assert_eq!(response.status(), 200, "GET {url}");
    response.json().await.unwrap()
}

async fn post_json(url: &str) -> Value {
    let response = reqwest::Client::new().post(url).send().await.unwrap();
    assert_eq!(response.status(), 200, "POST {url}");
    response.json().await.unwrap()
}

#[tokio::test]
async fn health_echoes_or_generates_request_id() {
    let upstream = upstream().await;
    let base = spawn_app(&config_for(&upstream)).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/health")).send().await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "status": "healthy" }));

    let response = client
        .get(format!("{base}/health"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn scoring_updates_predictions_and_scorecard() {
    let upstream = upstream().await;
    let base = spawn_app(&config_for(&upstream)).await;

    let before = get_json(&format!("{base}/api/predictions")).await;
    let predictions = before["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 7);
    assert!(predictions.iter().all(|p| p["result"] == "Not Started"));
    assert!(before.get("message").is_none());

    let scored = post_json(&format!("{base}/api/predictions/score")).await;
    assert_eq!(scored["message"], "Scoring complete");
    let first = &scored["predictions"][0];
    assert_eq!(first["id"], 0);
    assert_eq!(first["timeframe"], "Jan-Mar 2025");
    assert_eq!(first["result"], "Achieved");
    assert_eq!(first["news_match"], "Agency overhaul. Staff reassigned");

    let scorecard = get_json(&format!("{base}/api/predictions/scorecard")).await;
    assert_eq!(scorecard["total"], 7);
    assert_eq!(scorecard["counts"][0], json!({ "status": "Achieved", "count": 7 }));
}

#[tokio::test]
async fn analysis_drives_progress_and_alerts() {
    let upstream = upstream().await;
    let base = spawn_app(&config_for(&upstream)).await;

    let initial = get_json(&format!("{base}/api/progress")).await;
    assert!(initial["items"].as_array().unwrap().iter().all(|i| i["progress"] == 50));
    let alerts = get_json(&format!("{base}/api/alerts")).await;
    assert_eq!(alerts, json!({ "triggered": false, "reason": "" }));

    let analyzed = post_json(&format!("{base}/api/progress/analyze")).await;
    let items = analyzed["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[0]["title"], "Federal Agency Capture");
    assert!(items.iter().all(|i| i["progress"] == 82));
    assert_eq!(
        items[0]["articles"],
        json!([{ "title": "Agency overhaul", "url": "https://news.example/a" }])
    );

    let alerts = get_json(&format!("{base}/api/alerts")).await;
    assert_eq!(alerts["triggered"], true);
    assert_eq!(
        alerts["reason"],
        "Federal agency capture exceeds safe threshold. | \
         Unconstitutional judicial defiance observed. | \
         Active suppression of dissent detected."
    );
}

#[tokio::test]
async fn geopolitical_feed_is_tagged() {
    let upstream = upstream().await;
    let base = spawn_app(&config_for(&upstream)).await;

    let feed = get_json(&format!("{base}/api/geopolitical")).await;
    assert_eq!(
        feed,
        json!({
            "articles": [{
                "title": "Ministers walk out of alliance summit",
                "date": "2025-06-03",
                "summary": "Talks collapsed on Tuesday.",
                "link": "https://news.example/summit",
                "tags": ["Media Subversion"]
            }]
        })
    );
}

#[tokio::test]
async fn unreachable_feed_yields_empty_list() {
    let upstream = upstream().await;
    let mut config = config_for(&upstream);
    config.rss.feeds = vec![format!("{}/missing.xml", upstream.uri())];
    let base = spawn_app(&config).await;

    let feed = get_json(&format!("{base}/api/geopolitical")).await;
    assert_eq!(feed, json!({ "articles": [] }));
}

#[tokio::test]
async fn report_is_a_pdf_attachment() {
    let upstream = upstream().await;
    let base = spawn_app(&config_for(&upstream)).await;

    let response = reqwest::get(format!("{base}/api/report/pdf")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"project2025_report.pdf\""
    );
    let body = response.bytes().await.unwrap();
    assert!(body.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let upstream = upstream().await;
    let base = spawn_app(&config_for(&upstream)).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/api/alerts"))
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn graceful_shutdown_stops_the_server() {
    let upstream = upstream().await;
    let tracker = Tracker::from_config(&config_for(&upstream), &ApiKeys::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(tracker_server::serve(
        listener,
        AppState::new(tracker),
        async move {
            let _ = rx.await;
        },
    ));

    tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
