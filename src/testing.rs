//! Test doubles for provider calls
//!
//! `ScriptedService` returns queued results in order and records every
//! request it receives, so tests can assert on prompts without I/O.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{Notify, Semaphore};

/// Provider double that replays queued results
pub struct ScriptedService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    requests: Mutex<Vec<LlmRequest>>,
    /// When set, each call waits for one `release()` before answering
    gate: Option<Semaphore>,
    started: Notify,
}

impl ScriptedService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
            gate: None,
            started: Notify::new(),
        }
    }

    /// Calls block until `release()` is called, one release per call
    pub fn gated(model_id: impl Into<String>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(model_id)
        }
    }

    /// Queue a successful response carrying `text`
    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(LlmResponse {
            text: text.into(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
            },
        });
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Wait until a call has been received and recorded
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Let one gated call answer
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl LlmService for ScriptedService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No scripted response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// JSON for a deck whose cards have the given titles
pub fn deck_json(titles: &[&str]) -> String {
    let cards: Vec<_> = titles
        .iter()
        .map(|t| serde_json::json!({ "title": t, "body": format!("{t} details"), "kind": "step" }))
        .collect();
    serde_json::json!({ "cards": cards }).to_string()
}

/// JSON for a single follow-up card
pub fn follow_up_json(title: &str, body: &str) -> String {
    serde_json::json!({ "card": { "title": title, "body": body, "kind": "info" } }).to_string()
}
