//! Conversation lifecycle.
//!
//! A session talks to exactly one counterpart through at most one remote
//! conversation. The thread is opened lazily on the first persisted send and
//! reused afterwards.

use std::sync::Arc;

use chrono::Utc;
use pawchat_core::types::{Conversation, ConversationId, UserId};
use tokio::sync::OnceCell;

use crate::error::ChatError;
use crate::remote::{ChatBackend, StartConversationRequest};

/// Owns the identity of the session's remote conversation.
pub struct ConversationManager {
    backend: Arc<dyn ChatBackend>,
    counterpart_id: UserId,
    held: OnceCell<Conversation>,
}

impl ConversationManager {
    pub fn new(backend: Arc<dyn ChatBackend>, counterpart_id: UserId) -> Self {
        Self {
            backend,
            counterpart_id,
            held: OnceCell::new(),
        }
    }

    pub fn counterpart_id(&self) -> UserId {
        self.counterpart_id
    }

    /// The conversation opened so far, if any.
    pub fn current(&self) -> Option<&Conversation> {
        self.held.get()
    }

    /// Return the held conversation id, opening the conversation if needed.
    ///
    /// Concurrent callers share a single in-flight creation. A failed
    /// creation caches nothing, so the next call tries again.
    pub async fn ensure_conversation(&self, user_id: UserId) -> Result<ConversationId, ChatError> {
        let conversation = self
            .held
            .get_or_try_init(|| self.open(user_id))
            .await?;
        Ok(conversation.id.clone())
    }

    async fn open(&self, user_id: UserId) -> Result<Conversation, ChatError> {
        let request = StartConversationRequest {
            user_id: user_id.0,
            admin_id: self.counterpart_id.0,
        };
        match self.backend.start_conversation(&request).await {
            Ok(id) => {
                tracing::info!(
                    user_id = %user_id,
                    counterpart_id = %self.counterpart_id,
                    conversation_id = %id,
                    "Conversation started"
                );
                Ok(Conversation {
                    id,
                    participant: user_id,
                    counterpart: self.counterpart_id,
                    created_at: Utc::now(),
                })
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Starting conversation failed");
                Err(ChatError::ConversationCreationFailed(e.to_string()))
            }
        }
    }
}
