//! HTTP transport for the card engine
//!
//! Stateless `/v1` operations mirror the two core calls; `/api/sessions`
//! adds server-held conversations with navigation.

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::engine::CardEngine;
use crate::session::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CardEngine>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(engine: CardEngine) -> Self {
        let engine = Arc::new(engine);
        Self {
            sessions: Arc::new(SessionManager::new(Arc::clone(&engine))),
            engine,
        }
    }
}
