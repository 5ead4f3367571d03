//! Shared helpers: a mock upstream (reply API + search API) and a gateway runner.

#![allow(dead_code)]

use axum::{
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use lib::config::Config;
use lib::gateway;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const SECRET: &str = "integration-secret";
pub const ACCESS_TOKEN: &str = "integration-token";
pub const API_KEY: &str = "integration-key";

/// Reply token the mock reply API rejects, like an already-used token.
pub const SPENT_TOKEN: &str = "spent-token";

pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

#[derive(Clone, Default)]
struct Recorded {
    replies: Arc<Mutex<Vec<Value>>>,
    authorizations: Arc<Mutex<Vec<String>>>,
    search_queries: Arc<Mutex<Vec<String>>>,
}

/// Mock LINE reply API and Hot Pepper search API on one port.
/// Search prefixes: `/ok` returns shops, `/empty` returns none, `/broken` returns 500.
pub struct MockUpstream {
    pub base_url: String,
    recorded: Recorded,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let recorded = Recorded::default();
        let app = Router::new()
            .route("/v2/bot/message/reply", post(mock_reply))
            .route("/ok/gourmet/v1/", get(mock_search_ok))
            .route("/empty/gourmet/v1/", get(mock_search_empty))
            .route("/broken/gourmet/v1/", get(mock_search_broken))
            .with_state(recorded.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock upstream");
        let addr = listener.local_addr().expect("mock local_addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            base_url: format!("http://{}", addr),
            recorded,
        }
    }

    pub async fn replies(&self) -> Vec<Value> {
        self.recorded.replies.lock().await.clone()
    }

    pub async fn authorizations(&self) -> Vec<String> {
        self.recorded.authorizations.lock().await.clone()
    }

    pub async fn search_queries(&self) -> Vec<String> {
        self.recorded.search_queries.lock().await.clone()
    }
}

async fn mock_reply(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    rec.authorizations.lock().await.push(auth);
    let spent = body.get("replyToken").and_then(|v| v.as_str()) == Some(SPENT_TOKEN);
    rec.replies.lock().await.push(body);
    if spent {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid reply token" })),
        );
    }
    (StatusCode::OK, Json(json!({})))
}

pub fn long_address() -> String {
    "東京都千代田区丸の内一丁目九番一号".repeat(5)
}

async fn mock_search_ok(State(rec): State<Recorded>, RawQuery(query): RawQuery) -> Json<Value> {
    rec.search_queries.lock().await.push(query.unwrap_or_default());
    Json(json!({
        "results": {
            "api_version": "1.30",
            "results_available": 2,
            "shop": [
                {
                    "id": "J001",
                    "name": "Sushi Marunouchi",
                    "address": long_address(),
                    "photo": { "mobile": { "l": "https://img.example/J001_l.jpg", "s": "https://img.example/J001_s.jpg" } },
                    "urls": { "pc": "https://www.hotpepper.jp/strJ001/" }
                },
                {
                    "id": "J002",
                    "name": "Tempura Ginza",
                    "address": "東京都中央区銀座4-1",
                    "photo": { "mobile": { "l": "https://img.example/J002_l.jpg" } },
                    "urls": { "pc": "https://www.hotpepper.jp/strJ002/" }
                }
            ]
        }
    }))
}

async fn mock_search_empty(State(rec): State<Recorded>, RawQuery(query): RawQuery) -> Json<Value> {
    rec.search_queries.lock().await.push(query.unwrap_or_default());
    Json(json!({ "results": { "api_version": "1.30", "results_available": 0, "shop": [] } }))
}

async fn mock_search_broken(
    State(rec): State<Recorded>,
    RawQuery(query): RawQuery,
) -> (StatusCode, &'static str) {
    rec.search_queries.lock().await.push(query.unwrap_or_default());
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

/// Gateway config wired to the mock; `search_base` is the search API base URL.
pub fn test_config(port: u16, line_api_base: &str, search_base: &str) -> Config {
    let mut config = Config::default();
    config.gateway.port = port;
    config.gateway.bind = "127.0.0.1".to_string();
    config.gateway.upstream_timeout_secs = 3;
    config.channels.line.channel_secret = Some(SECRET.to_string());
    config.channels.line.channel_access_token = Some(ACCESS_TOKEN.to_string());
    config.channels.line.api_base = Some(line_api_base.to_string());
    config.search.api_key = Some(API_KEY.to_string());
    config.search.base_url = Some(search_base.to_string());
    config
}

/// Running gateway under test. The server task is left running when the test ends.
pub struct TestGateway {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestGateway {
    /// Spawn `run_gateway` and wait until `GET /` answers (up to 5s).
    pub async fn start(config: Config) -> Self {
        let port = config.gateway.port;
        tokio::spawn(async move {
            let _ = gateway::run_gateway(config).await;
        });
        let base_url = format!("http://127.0.0.1:{}", port);
        let client = reqwest::Client::new();
        let mut last_err = None;
        for _ in 0..100 {
            match client.get(format!("{}/", base_url)).send().await {
                Ok(resp) if resp.status().is_success() => return Self { base_url, client },
                Ok(_) => {}
                Err(e) => last_err = Some(e),
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!(
            "gateway on port {} did not come up within 5s; last error: {:?}",
            port, last_err
        );
    }

    /// POST /callback with the given signature header (None = header absent).
    pub async fn post_callback(&self, body: &str, signature: Option<String>) -> reqwest::Response {
        let mut req = self
            .client
            .post(format!("{}/callback", self.base_url))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(sig) = signature {
            req = req.header("X-Line-Signature", sig);
        }
        req.send().await.expect("POST /callback")
    }

    /// POST /callback signed with the shared secret.
    pub async fn post_signed(&self, body: &str) -> reqwest::Response {
        let sig = lib::channels::sign_body(SECRET, body.as_bytes());
        self.post_callback(body, Some(sig)).await
    }
}

pub fn text_event(reply_token: &str, text: &str) -> Value {
    json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1700000000000u64,
        "source": { "type": "user", "userId": "U4af4980629" },
        "webhookEventId": "01FZ74A0TDDPYRVKNK77XKC3ZR",
        "deliveryContext": { "isRedelivery": false },
        "replyToken": reply_token,
        "message": { "id": "444573844083572737", "type": "text", "quoteToken": "q", "text": text }
    })
}

pub fn location_event(reply_token: &str, latitude: f64, longitude: f64) -> Value {
    json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1700000000000u64,
        "source": { "type": "user", "userId": "U4af4980629" },
        "replyToken": reply_token,
        "message": {
            "id": "325708",
            "type": "location",
            "title": "my location",
            "address": "日本、〒100-0005 東京都千代田区丸の内１丁目",
            "latitude": latitude,
            "longitude": longitude
        }
    })
}

pub fn payload(events: Vec<Value>) -> String {
    json!({ "destination": "Uxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx", "events": events }).to_string()
}
