//! JSON Lines record of user requests, model output and failures
//!
//! One object per line. Writing is best effort: a failed append is reported
//! through `tracing` and never reaches the caller.

use crate::config::LoggingConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Which operation an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Generate,
    Followup,
}

/// Caller input as received, before provider resolution
#[derive(Debug, Serialize)]
pub struct UserInput<'a> {
    pub prompt: &'a str,
    pub system_prompt: &'a str,
    pub provider: Option<&'a str>,
    pub model: Option<&'a str>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Raw model text with what produced it
#[derive(Debug, Serialize)]
pub struct ModelOutput<'a> {
    pub text: &'a str,
    pub provider: &'a str,
    pub model: &'a str,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail<'a> {
    pub error_type: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Payload<'a> {
    UserInput(UserInput<'a>),
    ModelOutput(ModelOutput<'a>),
    Error(ErrorDetail<'a>),
}

impl Payload<'_> {
    fn event(&self) -> &'static str {
        match self {
            Payload::UserInput(_) => "request",
            Payload::ModelOutput(_) => "response",
            Payload::Error(_) => "error",
        }
    }
}

#[derive(Debug, Serialize)]
struct Entry<'a> {
    timestamp: DateTime<Utc>,
    request_id: Uuid,
    request_type: RequestType,
    event: &'static str,
    #[serde(flatten)]
    payload: Payload<'a>,
}

/// Append-only interaction log; a no-op when disabled
#[derive(Debug)]
pub struct InteractionLog {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl InteractionLog {
    pub fn new(config: &LoggingConfig) -> Self {
        if config.enabled {
            Self::to_file(config.path.clone())
        } else {
            Self::disabled()
        }
    }

    pub fn to_file(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            write_lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn request(
        &self,
        request_id: Uuid,
        request_type: RequestType,
        input: UserInput<'_>,
    ) {
        self.write(request_id, request_type, Payload::UserInput(input)).await;
    }

    pub async fn response(
        &self,
        request_id: Uuid,
        request_type: RequestType,
        output: ModelOutput<'_>,
    ) {
        self.write(request_id, request_type, Payload::ModelOutput(output)).await;
    }

    pub async fn error(
        &self,
        request_id: Uuid,
        request_type: RequestType,
        error: ErrorDetail<'_>,
    ) {
        self.write(request_id, request_type, Payload::Error(error)).await;
    }

    async fn write(&self, request_id: Uuid, request_type: RequestType, payload: Payload<'_>) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = Entry {
            timestamp: Utc::now(),
            request_id,
            request_type,
            event: payload.event(),
            payload,
        };
        let mut line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize interaction log entry");
                return;
            }
        };
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Err(e) = append(path, line.as_bytes()).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write interaction log");
        }
    }
}

async fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}
