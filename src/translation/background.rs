//! Serialized owner of the quota state
//!
//! Every session, popup or CLI command reaches the counter through one task
//! that owns the [`QuotaStore`]. Requests are processed one at a time, so a
//! read-modify-write on a key can never interleave with another. The task
//! also runs a daily tick that rolls stale month records over to zero.
//!
//! Requests and responses share the JSON shape of the extension messaging
//! protocol, e.g. `{"action":"checkCharacterLimit","count":12,"apiKey":"k"}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::translation::error::{helpers::messaging_error, TranslationError, TranslationResult};
use crate::translation::storage::{current_month, LimitCheck, QuotaStore};

const ROLLOVER_PERIOD: Duration = Duration::from_secs(60 * 60 * 24);
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BackgroundRequest {
    UpdateCharacterCount {
        count: u64,
        #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },
    CheckCharacterLimit {
        count: u64,
        #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },
    GetCharacterCount {
        #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },
    #[serde(rename = "translate-page")]
    TranslatePage,
}

/// Wire response; the first matching shape wins when decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundResponse {
    Error { error: String },
    Updated { success: bool },
    Limit(LimitCheck),
    Count { count: u64 },
    Dispatched { dispatched: bool },
}

impl BackgroundResponse {
    fn from_error(error: &TranslationError) -> Self {
        BackgroundResponse::Error {
            error: error.to_string(),
        }
    }
}

type Envelope = (BackgroundRequest, oneshot::Sender<BackgroundResponse>);

/// Cloneable client side of the background task
#[derive(Debug, Clone)]
pub struct BackgroundHandle {
    sender: mpsc::Sender<Envelope>,
}

impl BackgroundHandle {
    pub async fn request(&self, request: BackgroundRequest) -> TranslationResult<BackgroundResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send((request, reply_tx))
            .await
            .map_err(|_| messaging_error("background task has stopped"))?;
        reply_rx
            .await
            .map_err(|_| messaging_error("background task dropped the reply"))
    }

    /// Decodes a raw JSON request and encodes the response
    pub async fn handle_json(&self, message: &str) -> String {
        let response = match serde_json::from_str::<BackgroundRequest>(message) {
            Ok(request) => match self.request(request).await {
                Ok(response) => response,
                Err(e) => BackgroundResponse::from_error(&e),
            },
            Err(e) => BackgroundResponse::Error {
                error: format!("invalid request: {e}"),
            },
        };

        serde_json::to_string(&response)
            .unwrap_or_else(|e| format!(r#"{{"error":"unencodable response: {e}"}}"#))
    }

    pub async fn check_limit(&self, count: u64, api_key: Option<&str>) -> TranslationResult<LimitCheck> {
        let request = BackgroundRequest::CheckCharacterLimit {
            count,
            api_key: api_key.map(str::to_string),
        };
        match self.request(request).await? {
            BackgroundResponse::Limit(check) => Ok(check),
            other => Err(unexpected(other)),
        }
    }

    pub async fn update_count(&self, count: u64, api_key: Option<&str>) -> TranslationResult<()> {
        let request = BackgroundRequest::UpdateCharacterCount {
            count,
            api_key: api_key.map(str::to_string),
        };
        match self.request(request).await? {
            BackgroundResponse::Updated { success: true } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn count(&self, api_key: Option<&str>) -> TranslationResult<u64> {
        let request = BackgroundRequest::GetCharacterCount {
            api_key: api_key.map(str::to_string),
        };
        match self.request(request).await? {
            BackgroundResponse::Count { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: BackgroundResponse) -> TranslationError {
    match response {
        BackgroundResponse::Error { error } => TranslationError::StorageError(error),
        other => messaging_error(format!("unexpected response {other:?}")),
    }
}

/// The background task and the handles used to reach it
pub struct Background {
    handle: BackgroundHandle,
    task: JoinHandle<()>,
}

impl Background {
    /// Spawns the owner task on the current runtime
    pub fn spawn(store: QuotaStore) -> Self {
        Self::spawn_with_trigger(store, None)
    }

    /// Like [`spawn`](Self::spawn); `translate-page` requests are forwarded to `page_trigger`
    pub fn spawn_with_trigger(store: QuotaStore, page_trigger: Option<mpsc::UnboundedSender<()>>) -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(run(store, receiver, page_trigger));
        Self {
            handle: BackgroundHandle { sender },
            task,
        }
    }

    pub fn handle(&self) -> BackgroundHandle {
        self.handle.clone()
    }

    /// Stops accepting requests once every handle is dropped, then waits
    pub async fn shutdown(self) {
        let Background { handle, task } = self;
        drop(handle);
        if let Err(e) = task.await {
            tracing::error!("background task failed: {}", e);
        }
    }
}

async fn run(
    store: QuotaStore,
    mut receiver: mpsc::Receiver<Envelope>,
    page_trigger: Option<mpsc::UnboundedSender<()>>,
) {
    let mut rollover = interval(ROLLOVER_PERIOD);
    rollover.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = receiver.recv() => {
                let Some((request, reply)) = message else {
                    break;
                };
                let response = process(&store, page_trigger.as_ref(), request);
                // The requester may have given up waiting
                let _ = reply.send(response);
            }
            _ = rollover.tick() => {
                if let Err(e) = store.rollover_all(&current_month()) {
                    tracing::warn!("daily usage rollover failed: {}", e);
                }
            }
        }
    }

    tracing::debug!("background task finished");
}

fn process(
    store: &QuotaStore,
    page_trigger: Option<&mpsc::UnboundedSender<()>>,
    request: BackgroundRequest,
) -> BackgroundResponse {
    let result = match request {
        BackgroundRequest::UpdateCharacterCount { count, api_key } => store
            .increment(api_key.as_deref(), count)
            .map(|_| BackgroundResponse::Updated { success: true }),
        BackgroundRequest::CheckCharacterLimit { count, api_key } => store
            .check_limit(api_key.as_deref(), count)
            .map(BackgroundResponse::Limit),
        BackgroundRequest::GetCharacterCount { api_key } => store
            .get(api_key.as_deref())
            .map(|count| BackgroundResponse::Count { count }),
        BackgroundRequest::TranslatePage => {
            let dispatched = page_trigger.is_some_and(|trigger| trigger.send(()).is_ok());
            Ok(BackgroundResponse::Dispatched { dispatched })
        }
    };

    result.unwrap_or_else(|e| {
        tracing::warn!("background request failed: {}", e);
        BackgroundResponse::from_error(&e)
    })
}
