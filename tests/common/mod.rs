#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use larder::prompt::ChatMessage;
use larder::provider::{CompletionProvider, ProviderError};
use tokio::task::JoinHandle;

/// Sets environment variables for the life of the guard and restores the
/// previous values on drop.
pub struct EnvGuard {
    saved: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            saved: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.save(key);
        std::env::set_var(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.save(key);
        std::env::remove_var(key);
    }

    fn save(&mut self, key: &str) {
        self.saved
            .entry(key.to_string())
            .or_insert_with(|| std::env::var(key).ok());
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain() {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// In-process provider that replays a canned reply and counts calls.
pub struct FakeProvider {
    reply: Result<String, (u16, String)>,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
    last_api_key: Mutex<Option<String>>,
}

impl FakeProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
            last_api_key: Mutex::new(None),
        })
    }

    pub fn failing(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err((status, body.to_string())),
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
            last_api_key: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }

    pub fn last_api_key(&self) -> Option<String> {
        self.last_api_key.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        *self.last_api_key.lock().unwrap() = Some(api_key.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, body)) => Err(ProviderError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// A request captured by the mock chat-completion server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    reply: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct MockProvider {
    pub addr: SocketAddr,
    pub captured: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockProvider {
    pub fn url(&self) -> String {
        format!("http://{}/v1/chat/completions", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spin up a chat-completion endpoint that answers every request with
/// `status` and the raw `reply` body.
pub async fn spawn_mock_provider(status: StatusCode, reply: String) -> MockProvider {
    async fn chat(
        State(state): State<MockState>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, String) {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        state
            .captured
            .lock()
            .unwrap()
            .push(CapturedRequest { authorization, body });
        (state.status, state.reply.clone())
    }

    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        status,
        reply,
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockProvider {
        addr,
        captured,
        handle,
    }
}

/// Wrap `content` in a chat-completion envelope.
pub fn completion_envelope(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
    .to_string()
}
