//! Per-conversation orchestration
//!
//! A [`Session`] owns one [`ConversationState`] behind a mutex. The mutex is
//! never held across a provider call: a follow-up captures its parent card
//! before the call and re-validates it when the answer arrives.

use crate::conversation::{
    CardView, ConversationState, ConversationView, FollowUp, SequenceId, SequenceSource, StateError,
};
use crate::engine::{
    CardEngine, FollowUpOutcome, FollowUpParams, GenerateOutcome, GenerateParams,
    DEFAULT_FOLLOW_UP_MAX_TOKENS, DEFAULT_GENERATE_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::error::CardError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Provider selection and sampling for one call; absent fields use defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Extra system instruction; only used for generation
    pub system: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionGenerate {
    pub sequence_id: SequenceId,
    pub outcome: GenerateOutcome,
}

#[derive(Debug, Clone)]
pub struct SessionFollowUp {
    pub follow_up: FollowUp,
    pub outcome: FollowUpOutcome,
}

pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    engine: Arc<CardEngine>,
    state: Mutex<ConversationState>,
}

impl Session {
    pub fn new(engine: Arc<CardEngine>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            engine,
            state: Mutex::new(ConversationState::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Decompose `prompt` and make the result the current sequence.
    ///
    /// On any failure the conversation is left exactly as it was.
    pub async fn generate(
        &self,
        prompt: &str,
        options: &ModelOptions,
    ) -> Result<SessionGenerate, CardError> {
        let params = GenerateParams {
            prompt: prompt.to_string(),
            provider: options.provider.clone(),
            model: options.model.clone(),
            system: options.system.clone(),
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_GENERATE_MAX_TOKENS),
        };
        let outcome = self.engine.generate(&params).await?;

        let sequence_id = self.state.lock().await.apply_new_sequence(
            outcome.deck.clone(),
            SequenceSource::Prompt {
                text: prompt.trim().to_string(),
            },
        );
        tracing::info!(session = %self.id, sequence = %sequence_id, "Started new card sequence");

        Ok(SessionGenerate {
            sequence_id,
            outcome,
        })
    }

    /// Ask `question` about the card that is active right now.
    ///
    /// Fails with a stale-context error if the user navigated away before
    /// the answer arrived; the answer is then discarded.
    pub async fn follow_up(
        &self,
        question: &str,
        options: &ModelOptions,
    ) -> Result<SessionFollowUp, CardError> {
        let (parent, card) = {
            let state = self.state.lock().await;
            match (state.current_ref(), state.current_card()) {
                (Some(parent), Some(card)) => (parent, card.clone()),
                _ => return Err(StateError::NoActiveCard.into()),
            }
        };

        let mut params = FollowUpParams::new(&card, question);
        params.provider.clone_from(&options.provider);
        params.model.clone_from(&options.model);
        params.temperature = options.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        params.max_tokens = options.max_tokens.unwrap_or(DEFAULT_FOLLOW_UP_MAX_TOKENS);
        let outcome = self.engine.follow_up(&params).await?;

        let mut state = self.state.lock().await;
        match state.attach_follow_up(parent, outcome.card.clone()) {
            Ok(follow_up) => {
                let follow_up = follow_up.clone();
                tracing::info!(session = %self.id, parent = %parent, "Attached follow-up");
                Ok(SessionFollowUp { follow_up, outcome })
            }
            Err(e) => {
                tracing::info!(session = %self.id, error = %e, "Discarded follow-up answer");
                Err(e.into())
            }
        }
    }

    pub async fn next(&self) -> ConversationView {
        let mut state = self.state.lock().await;
        state.next();
        state.snapshot()
    }

    pub async fn back(&self) -> ConversationView {
        let mut state = self.state.lock().await;
        state.back();
        state.snapshot()
    }

    pub async fn view(&self) -> ConversationView {
        self.state.lock().await.snapshot()
    }

    pub async fn view_all(&self) -> Vec<CardView> {
        self.state.lock().await.view_all()
    }
}

/// Live sessions keyed by id. Sessions share nothing but the engine.
pub struct SessionManager {
    engine: Arc<CardEngine>,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(engine: Arc<CardEngine>) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<CardEngine> {
        &self.engine
    }

    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(Arc::clone(&self.engine)));
        self.sessions
            .write()
            .await
            .insert(session.id(), Arc::clone(&session));
        tracing::info!(session = %session.id(), "Created session");
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Returns whether a session was removed
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "Ended session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
