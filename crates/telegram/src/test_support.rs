//! In-process stand-in for the Telegram Bot API.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    axum::{Json, Router, body::Bytes, extract::State, http::Uri, routing::post},
    serde::{Deserialize, Serialize},
    serde_json::json,
    teloxide::types::Message,
    tokio::sync::oneshot,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TelegramApiMethod {
    SendMessage,
    SendChatAction,
    SendAudio,
    GetUpdates,
    Other(String),
}

impl TelegramApiMethod {
    fn from_path(path: &str) -> Self {
        let method = path.rsplit('/').next().unwrap_or_default();
        match method {
            "SendMessage" => Self::SendMessage,
            "SendChatAction" => Self::SendChatAction,
            "SendAudio" => Self::SendAudio,
            "GetUpdates" => Self::GetUpdates,
            _ => Self::Other(method.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CapturedTelegramRequest {
    SendMessage(SendMessageRequest),
    SendChatAction(SendChatActionRequest),
    /// Multipart upload; only the raw body is kept.
    SendAudio {
        raw_body: String,
    },
    GetUpdates,
    Other {
        method: TelegramApiMethod,
        raw_body: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SendChatActionRequest {
    pub chat_id: i64,
    pub action: String,
}

#[derive(Debug, Serialize)]
struct TelegramApiResponse {
    ok: bool,
    result: TelegramApiResult,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum TelegramApiResult {
    Message(TelegramMessageResult),
    Updates(Vec<serde_json::Value>),
    Bool(bool),
}

#[derive(Debug, Serialize)]
struct TelegramChat {
    id: i64,
    #[serde(rename = "type")]
    chat_type: String,
}

#[derive(Debug, Serialize)]
struct TelegramMessageResult {
    message_id: i64,
    date: i64,
    chat: TelegramChat,
    text: String,
}

/// How the mock answers.
#[derive(Debug, Default)]
pub(crate) struct MockBehavior {
    /// Hold every `sendAudio` answer this long.
    pub audio_delay: Option<Duration>,
    /// Served one per `getUpdates` call; an empty queue answers `[]`.
    pub updates: Vec<serde_json::Value>,
}

#[derive(Clone)]
struct MockTelegramApi {
    requests: Arc<Mutex<Vec<CapturedTelegramRequest>>>,
    audio_delay: Option<Duration>,
    updates: Arc<Mutex<VecDeque<serde_json::Value>>>,
}

fn message_result() -> TelegramApiResponse {
    TelegramApiResponse {
        ok: true,
        result: TelegramApiResult::Message(TelegramMessageResult {
            message_id: 1,
            date: 0,
            chat: TelegramChat {
                id: 42,
                chat_type: "private".to_string(),
            },
            text: "ok".to_string(),
        }),
    }
}

async fn telegram_api_handler(
    State(state): State<MockTelegramApi>,
    uri: Uri,
    body: Bytes,
) -> Json<TelegramApiResponse> {
    let method = TelegramApiMethod::from_path(uri.path());
    let raw_body = String::from_utf8_lossy(&body).to_string();

    let captured = match method.clone() {
        TelegramApiMethod::SendMessage => {
            match serde_json::from_slice::<SendMessageRequest>(&body) {
                Ok(req) => CapturedTelegramRequest::SendMessage(req),
                Err(_) => CapturedTelegramRequest::Other { method, raw_body },
            }
        },
        TelegramApiMethod::SendChatAction => {
            match serde_json::from_slice::<SendChatActionRequest>(&body) {
                Ok(req) => CapturedTelegramRequest::SendChatAction(req),
                Err(_) => CapturedTelegramRequest::Other { method, raw_body },
            }
        },
        TelegramApiMethod::SendAudio => CapturedTelegramRequest::SendAudio { raw_body },
        TelegramApiMethod::GetUpdates => CapturedTelegramRequest::GetUpdates,
        TelegramApiMethod::Other(_) => CapturedTelegramRequest::Other { method, raw_body },
    };

    state.requests.lock().expect("lock requests").push(captured);

    match TelegramApiMethod::from_path(uri.path()) {
        TelegramApiMethod::SendMessage => Json(message_result()),
        TelegramApiMethod::SendAudio => {
            if let Some(delay) = state.audio_delay {
                tokio::time::sleep(delay).await;
            }
            Json(message_result())
        },
        TelegramApiMethod::GetUpdates => {
            let next = state.updates.lock().expect("lock updates").pop_front();
            let updates = match next {
                Some(update) => vec![update],
                None => {
                    // Stand in for the long-poll wait so the loop does not spin.
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Vec::new()
                },
            };
            Json(TelegramApiResponse {
                ok: true,
                result: TelegramApiResult::Updates(updates),
            })
        },
        TelegramApiMethod::SendChatAction | TelegramApiMethod::Other(_) => {
            Json(TelegramApiResponse {
                ok: true,
                result: TelegramApiResult::Bool(true),
            })
        },
    }
}

pub(crate) struct MockServer {
    requests: Arc<Mutex<Vec<CapturedTelegramRequest>>>,
    pub api_url: reqwest::Url,
    pub bot: teloxide::Bot,
    shutdown: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with(MockBehavior::default()).await
    }

    pub async fn start_with(behavior: MockBehavior) -> Self {
        let requests = Arc::new(Mutex::new(Vec::<CapturedTelegramRequest>::new()));
        let mock_api = MockTelegramApi {
            requests: Arc::clone(&requests),
            audio_delay: behavior.audio_delay,
            updates: Arc::new(Mutex::new(behavior.updates.into())),
        };
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(mock_api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).expect("parse api url");
        let bot = teloxide::Bot::new("test-token").set_api_url(api_url.clone());
        Self {
            requests,
            api_url,
            bot,
            shutdown,
            server,
        }
    }

    pub fn requests(&self) -> Vec<CapturedTelegramRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Texts sent with `sendMessage`, in order.
    pub fn texts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                CapturedTelegramRequest::SendMessage(body) => Some(body.text),
                _ => None,
            })
            .collect()
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.server.await.expect("server join");
    }
}

/// A private-chat message from chat 42 with `body` merged in.
pub(crate) fn message_json(body: serde_json::Value) -> serde_json::Value {
    let mut base = json!({
        "message_id": 1,
        "date": 1,
        "chat": { "id": 42, "type": "private", "first_name": "Alice" },
        "from": {
            "id": 1001,
            "is_bot": false,
            "first_name": "Alice",
            "username": "alice"
        }
    });
    let map = base.as_object_mut().expect("object");
    for (key, value) in body.as_object().expect("object") {
        map.insert(key.clone(), value.clone());
    }
    base
}

pub(crate) fn message(body: serde_json::Value) -> Message {
    serde_json::from_value(message_json(body)).expect("deserialize message")
}
