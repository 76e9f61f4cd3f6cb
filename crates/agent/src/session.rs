//! Per-connection conversation state
//!
//! Owned by the connection task; nothing here is shared across sessions.

use uuid::Uuid;

use snow_paws_core::{Language, Turn};

/// Turns kept per session; older ones are dropped first
pub const MAX_HISTORY_TURNS: usize = 50;

/// History and language affinity for one connection
#[derive(Debug, Clone)]
pub struct SessionState {
    id: String,
    turns: Vec<Turn>,
    language: Option<Language>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
            language: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Recorded turns, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Language of the previous turn, if any
    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = Some(language);
    }

    pub fn record(&mut self, turn: Turn) {
        self.turns.push(turn);
        if self.turns.len() > MAX_HISTORY_TURNS {
            let excess = self.turns.len() - MAX_HISTORY_TURNS;
            self.turns.drain(..excess);
        }
    }
}
