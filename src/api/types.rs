//! API request and response types

use crate::cards::Card;
use crate::conversation::{CardView, ConversationView, FollowUp, SequenceId};
use crate::engine::{FollowUpMeta, GenerateMeta, UsageInfo};
use crate::llm::ProviderInfo;
use crate::session::ModelOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::engine::{FollowUpParams as FollowUpRequest, GenerateParams as GenerateRequest};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Body of every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_type: &'static str,
    pub meta: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub default_provider: &'static str,
    pub providers: Vec<ProviderInfo>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub cards: Vec<Card>,
    pub usage: UsageInfo,
    pub raw_text: String,
    pub meta: GenerateMeta,
}

#[derive(Debug, Serialize)]
pub struct FollowUpResponse {
    pub card: Card,
    pub usage: UsageInfo,
    pub raw_text: String,
    pub meta: FollowUpMeta,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub view: ConversationView,
}

#[derive(Debug, Deserialize)]
pub struct SessionGenerateRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub options: ModelOptions,
}

#[derive(Debug, Deserialize)]
pub struct SessionFollowUpRequest {
    pub question: String,
    #[serde(flatten)]
    pub options: ModelOptions,
}

#[derive(Debug, Serialize)]
pub struct SessionGenerateResponse {
    pub sequence_id: SequenceId,
    pub cards: Vec<Card>,
    pub usage: UsageInfo,
    pub raw_text: String,
    pub meta: GenerateMeta,
    pub view: ConversationView,
}

#[derive(Debug, Serialize)]
pub struct SessionFollowUpResponse {
    pub follow_up: FollowUp,
    pub usage: UsageInfo,
    pub raw_text: String,
    pub meta: FollowUpMeta,
    pub view: ConversationView,
}

#[derive(Debug, Serialize)]
pub struct CardsResponse {
    pub cards: Vec<CardView>,
    pub view: ConversationView,
}
