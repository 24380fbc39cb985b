//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router,
//! a `MockUpstream` that stands in for both the Coze and WeCom APIs, and
//! helpers for building signed callback requests.
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] to run a router on a random port; the relay's
//! HTTP clients talk to the mock upstream through it.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{self, HeaderMap, Method, Request, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use relay_server::api::{create_router, AppState};
use relay_server::config::Config;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tower::ServiceExt;
use wecom_crypto::{CallbackCrypto, Envelope};

/// Agent id carried by every test message.
pub const AGENT_ID: i64 = 1_000_002;

// ============================================================================
// Test App
// ============================================================================

/// Full router plus the codec a WeCom server would use against it.
pub struct TestApp {
    pub router: Router,
    pub config: Arc<Config>,
    pub crypto: CallbackCrypto,
}

impl TestApp {
    /// Create a test app whose upstream APIs are unreachable.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test())
    }

    /// Create a test app whose Coze and WeCom clients point at `upstream_url`.
    pub fn with_upstream(upstream_url: &str) -> Self {
        let mut config = Config::default_for_test();
        config.coze_api_base = upstream_url.to_string();
        config.wecom_api_base = upstream_url.to_string();
        Self::with_config(config)
    }

    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        let crypto = CallbackCrypto::new(
            &config.wecom_token,
            &config.wecom_encoding_aes_key,
            &config.wecom_corp_id,
        )
        .expect("Invalid test credentials");
        let state = AppState::from_config(&config).expect("Failed to build app state");

        Self {
            router: create_router(state),
            config: Arc::new(config),
            crypto,
        }
    }

    /// Build a request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// URL-verification request for an encrypted `challenge`.
    pub fn handshake_request(&self, challenge: &str) -> Request<Body> {
        let sealed = self.crypto.seal(challenge, "1409659589", "263014780");
        let url = reqwest::Url::parse_with_params(
            "http://localhost/wechat/coze",
            &[
                ("msg_signature", sealed.signature.as_str()),
                ("timestamp", sealed.timestamp.as_str()),
                ("nonce", sealed.nonce.as_str()),
                ("echostr", sealed.ciphertext.as_str()),
            ],
        )
        .expect("valid url");

        Self::request(Method::GET, &path_and_query(&url))
            .body(Body::empty())
            .expect("valid request")
    }

    /// Signed message callback carrying `plaintext`.
    pub fn callback_request(&self, plaintext: &str) -> Request<Body> {
        let sealed = self.crypto.seal(plaintext, "1409659813", "1372623149");
        callback_request_for(&sealed, &self.config.wecom_corp_id)
    }
}

/// Message callback for an already sealed envelope.
pub fn callback_request_for(sealed: &Envelope, to_user: &str) -> Request<Body> {
    let url = reqwest::Url::parse_with_params(
        "http://localhost/wechat/coze",
        &[
            ("msg_signature", sealed.signature.as_str()),
            ("timestamp", sealed.timestamp.as_str()),
            ("nonce", sealed.nonce.as_str()),
        ],
    )
    .expect("valid url");
    let body = format!(
        "<xml><ToUserName><![CDATA[{to_user}]]></ToUserName>\
         <Encrypt><![CDATA[{}]]></Encrypt>\
         <AgentID><![CDATA[{AGENT_ID}]]></AgentID></xml>",
        sealed.ciphertext
    );

    TestApp::request(Method::POST, &path_and_query(&url))
        .header(http::header::CONTENT_TYPE, "text/xml")
        .body(Body::from(body))
        .expect("valid request")
}

fn path_and_query(url: &reqwest::Url) -> String {
    format!("{}?{}", url.path(), url.query().unwrap_or_default())
}

/// Decrypted text message from `from_user`.
pub fn text_message(from_user: &str, content: &str) -> String {
    format!(
        "<xml><ToUserName><![CDATA[wx5823bf96d3bd56c7]]></ToUserName>\
         <FromUserName><![CDATA[{from_user}]]></FromUserName>\
         <CreateTime>1409659813</CreateTime>\
         <MsgType><![CDATA[text]]></MsgType>\
         <Content><![CDATA[{content}]]></Content>\
         <MsgId>4561255354251345929</MsgId>\
         <AgentID>{AGENT_ID}</AgentID></xml>"
    )
}

/// Decrypted event message from `from_user`.
pub fn event_message(from_user: &str, event: &str) -> String {
    format!(
        "<xml><ToUserName><![CDATA[wx5823bf96d3bd56c7]]></ToUserName>\
         <FromUserName><![CDATA[{from_user}]]></FromUserName>\
         <CreateTime>1409659813</CreateTime>\
         <MsgType><![CDATA[event]]></MsgType>\
         <Event><![CDATA[{event}]]></Event>\
         <AgentID>{AGENT_ID}</AgentID></xml>"
    )
}

/// Decrypted message of an arbitrary `msg_type` without content.
pub fn other_message(from_user: &str, msg_type: &str) -> String {
    format!(
        "<xml><ToUserName><![CDATA[wx5823bf96d3bd56c7]]></ToUserName>\
         <FromUserName><![CDATA[{from_user}]]></FromUserName>\
         <CreateTime>1409659813</CreateTime>\
         <MsgType><![CDATA[{msg_type}]]></MsgType>\
         <AgentID>{AGENT_ID}</AgentID></xml>"
    )
}

// ============================================================================
// Encrypted reply
// ============================================================================

/// Fields of the encrypted acknowledgement.
#[derive(Debug, Deserialize)]
pub struct ReplyXml {
    #[serde(rename = "Encrypt")]
    pub encrypt: String,
    #[serde(rename = "MsgSignature")]
    pub msg_signature: String,
    #[serde(rename = "TimeStamp")]
    pub timestamp: String,
    #[serde(rename = "Nonce")]
    pub nonce: String,
}

impl ReplyXml {
    pub fn parse(xml: &str) -> Self {
        quick_xml::de::from_str(xml).expect("reply is valid XML")
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope {
            ciphertext: self.encrypt,
            signature: self.msg_signature,
            timestamp: self.timestamp,
            nonce: self.nonce,
        }
    }
}

// ============================================================================
// Mock upstream (Coze + WeCom)
// ============================================================================

/// Access token issued by the mock WeCom API.
pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

/// Recorded traffic and scripted answers of the mock upstream.
#[derive(Clone)]
pub struct MockUpstream {
    /// Bodies of `POST /cgi-bin/message/send`, in arrival order.
    pub sent: Arc<Mutex<Vec<Value>>>,
    /// Bodies of `POST /v3/chat`.
    pub chat_requests: Arc<Mutex<Vec<Value>>>,
    /// `Authorization` headers seen by the Coze endpoints.
    pub coze_auth: Arc<Mutex<Vec<String>>>,
    pub token_fetches: Arc<AtomicU32>,
    pub status_polls: Arc<AtomicU32>,
    /// Retrieve calls answered `in_progress` before `completed`.
    pub polls_until_done: u32,
    /// Assistant answer listed for every chat.
    pub answer: Arc<String>,
    /// Send attempts (1-based) rejected with an API error.
    pub fail_send_at: Option<usize>,
    send_attempts: Arc<AtomicU32>,
}

impl MockUpstream {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            sent: Arc::default(),
            chat_requests: Arc::default(),
            coze_auth: Arc::default(),
            token_fetches: Arc::default(),
            status_polls: Arc::default(),
            polls_until_done: 2,
            answer: Arc::new(answer.into()),
            fail_send_at: None,
            send_attempts: Arc::default(),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/cgi-bin/gettoken", get(mock_gettoken))
            .route("/cgi-bin/message/send", post(mock_send))
            .route("/v3/chat", post(mock_create_chat))
            .route("/v3/chat/retrieve", get(mock_retrieve_chat))
            .route("/v3/chat/message/list", get(mock_list_messages))
            .with_state(self.clone())
    }

    /// Snapshot of delivered message bodies.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().expect("lock").clone()
    }

    /// Wait until `count` messages have been delivered.
    pub async fn wait_for_sends(&self, count: usize) -> Vec<Value> {
        for _ in 0..300 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} delivered messages, got {:?}",
            self.sent()
        );
    }

    /// Wait for `count` deliveries, then make sure no more arrive.
    pub async fn settle_at(&self, count: usize) -> Vec<Value> {
        self.wait_for_sends(count).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let sent = self.sent();
        assert_eq!(sent.len(), count, "unexpected extra deliveries: {sent:?}");
        sent
    }
}

async fn mock_gettoken(State(mock): State<MockUpstream>) -> Json<Value> {
    mock.token_fetches.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "errcode": 0,
        "errmsg": "ok",
        "access_token": MOCK_ACCESS_TOKEN,
        "expires_in": 7200
    }))
}

#[derive(Deserialize)]
struct AccessTokenQuery {
    access_token: String,
}

async fn mock_send(
    State(mock): State<MockUpstream>,
    Query(query): Query<AccessTokenQuery>,
    Json(body): Json<Value>,
) -> Json<Value> {
    if query.access_token != MOCK_ACCESS_TOKEN {
        return Json(json!({"errcode": 40014, "errmsg": "invalid access_token"}));
    }
    let attempt = mock.send_attempts.fetch_add(1, Ordering::SeqCst) as usize + 1;
    if mock.fail_send_at.is_some_and(|n| attempt >= n) {
        return Json(json!({"errcode": 45009, "errmsg": "api freq out of limit"}));
    }
    mock.sent.lock().expect("lock").push(body);
    Json(json!({"errcode": 0, "errmsg": "ok", "invaliduser": ""}))
}

fn record_auth(mock: &MockUpstream, headers: &HeaderMap) {
    let auth = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    mock.coze_auth.lock().expect("lock").push(auth);
}

async fn mock_create_chat(
    State(mock): State<MockUpstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record_auth(&mock, &headers);
    mock.chat_requests.lock().expect("lock").push(body);
    Json(json!({
        "code": 0,
        "msg": "",
        "data": {
            "id": "chat-1",
            "conversation_id": "conv-1",
            "bot_id": "test-bot",
            "status": "created"
        }
    }))
}

async fn mock_retrieve_chat(State(mock): State<MockUpstream>, headers: HeaderMap) -> Json<Value> {
    record_auth(&mock, &headers);
    let n = mock.status_polls.fetch_add(1, Ordering::SeqCst) + 1;
    let status = if n >= mock.polls_until_done {
        "completed"
    } else {
        "in_progress"
    };
    Json(json!({
        "code": 0,
        "msg": "",
        "data": {
            "id": "chat-1",
            "conversation_id": "conv-1",
            "status": status
        }
    }))
}

async fn mock_list_messages(State(mock): State<MockUpstream>, headers: HeaderMap) -> Json<Value> {
    record_auth(&mock, &headers);
    Json(json!({
        "code": 0,
        "msg": "",
        "data": [
            {"role": "user", "type": "question", "content": "question"},
            {"role": "assistant", "type": "verbose", "content": "{\"msg_type\":\"generate_answer_finish\"}"},
            {"role": "assistant", "type": "answer", "content": mock.answer.as_str()},
            {"role": "assistant", "type": "follow_up", "content": "Anything else?"}
        ]
    }))
}

// ============================================================================
// Test Server
// ============================================================================

/// A running test server bound to a random port.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    /// Handle to the server task for cleanup.
    _handle: JoinHandle<()>,
}

/// Spawn a real HTTP server on a random port.
///
/// # Example
///
/// ```ignore
/// let mock = MockUpstream::new("hello");
/// let server = spawn_test_server(mock.router()).await;
/// let app = TestApp::with_upstream(&server.url);
/// ```
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

// ============================================================================
// Body helpers
// ============================================================================

/// Collect a response body as UTF-8 text.
pub async fn body_to_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> Value {
    let text = body_to_string(response).await;
    serde_json::from_str(&text).unwrap_or_else(|e| {
        panic!("Failed to parse response as JSON: {e}\nBody: {text}")
    })
}
