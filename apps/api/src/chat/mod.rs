//! LAKS, the general career assistant.

pub mod handlers;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::{ChatCompletion, ChatMessage, ChatRole};

pub const LAKS_SYSTEM: &str = "You are LAKS, a friendly assistant on a recruiting portal. \
    You help job seekers with careers, coding, interview preparation and job searching. \
    Answer clearly and concisely.";

/// Conversation kept in the session, as a sliding window over the most
/// recent turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatTranscript {
    turns: VecDeque<ChatMessage>,
}

impl ChatTranscript {
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &ChatMessage> {
        self.turns.iter()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Evicts oldest turns until at most `max_turns` remain and the window
    /// opens with a user turn.
    fn trim(&mut self, max_turns: usize) {
        while self.turns.len() > max_turns {
            self.turns.pop_front();
        }
        while self
            .turns
            .front()
            .is_some_and(|m| m.role != ChatRole::User)
        {
            self.turns.pop_front();
        }
    }

    /// Sends `message` with the current window to the assistant, records both
    /// turns and returns the reply. On failure the transcript is unchanged.
    pub async fn ask(
        &mut self,
        llm: &dyn ChatCompletion,
        message: &str,
        max_turns: usize,
    ) -> Result<String, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }

        let snapshot = self.turns.clone();
        self.turns.push_back(ChatMessage::user(message));
        // Leave room for the reply in the window we send.
        self.trim(max_turns.saturating_sub(1).max(1));

        let mut request = Vec::with_capacity(self.turns.len() + 1);
        request.push(ChatMessage::system(LAKS_SYSTEM));
        request.extend(self.turns.iter().cloned());

        match llm.complete(&request).await {
            Ok(reply) => {
                self.turns.push_back(ChatMessage::assistant(reply.clone()));
                self.trim(max_turns);
                Ok(reply)
            }
            Err(e) => {
                self.turns = snapshot;
                Err(e.into())
            }
        }
    }
}
