//! In-memory `ChatBackend` for tests and offline demos.
//!
//! `ScriptedBackend` behaves like a tiny conversation store: saved messages
//! become visible to later fetches under a server-assigned id. Failures,
//! latency, and truncated pages can be switched on per call kind, and every
//! call is recorded in order.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pawchat_core::types::{ConversationId, UserId};

use crate::error::RemoteError;
use crate::remote::{
    ChatBackend, RemoteAdmin, RemoteMessage, SaveMessageRequest, StartConversationRequest, WireId,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    FetchMessages(UserId),
    StartConversation(StartConversationRequest),
    SaveMessage(SaveMessageRequest),
    ListAdmins,
}

#[derive(Default)]
struct ScriptState {
    messages: Vec<RemoteMessage>,
    admins: Vec<RemoteAdmin>,
    calls: Vec<BackendCall>,
    fail_fetch: bool,
    fail_start: bool,
    fail_save: bool,
    page_limit: Option<usize>,
    start_delay: Option<Duration>,
    save_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
    next_conversation: i64,
    next_message: i64,
}

/// Scriptable in-memory conversation store.
pub struct ScriptedBackend {
    state: Mutex<ScriptState>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptState {
                next_conversation: 100,
                next_message: 1000,
                ..ScriptState::default()
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ScriptState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Add a record to the store, as if another client had written it.
    pub fn push_remote(&self, message: RemoteMessage) {
        self.with_state(|s| s.messages.push(message));
    }

    pub fn push_admin(&self, admin: RemoteAdmin) {
        self.with_state(|s| s.admins.push(admin));
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.with_state(|s| s.fail_fetch = fail);
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.with_state(|s| s.fail_start = fail);
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.with_state(|s| s.fail_save = fail);
    }

    /// Return at most `limit` records per fetch.
    pub fn set_page_limit(&self, limit: Option<usize>) {
        self.with_state(|s| s.page_limit = limit);
    }

    pub fn set_start_delay(&self, delay: Duration) {
        self.with_state(|s| s.start_delay = Some(delay));
    }

    pub fn set_save_delay(&self, delay: Duration) {
        self.with_state(|s| s.save_delay = Some(delay));
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.with_state(|s| s.fetch_delay = Some(delay));
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn fetch_count(&self) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, BackendCall::FetchMessages(_)))
                .count()
        })
    }

    pub fn start_conversation_count(&self) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, BackendCall::StartConversation(_)))
                .count()
        })
    }

    pub fn save_requests(&self) -> Vec<SaveMessageRequest> {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter_map(|c| match c {
                    BackendCall::SaveMessage(request) => Some(request.clone()),
                    _ => None,
                })
                .collect()
        })
    }
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn fetch_messages(&self, user_id: UserId) -> Result<Vec<RemoteMessage>, RemoteError> {
        let delay = self.with_state(|s| {
            s.calls.push(BackendCall::FetchMessages(user_id));
            s.fetch_delay
        });
        pause(delay).await;

        self.with_state(|s| {
            if s.fail_fetch {
                return Err(RemoteError::Status(500));
            }
            let limit = s.page_limit.unwrap_or(usize::MAX);
            Ok(s.messages.iter().take(limit).cloned().collect())
        })
    }

    async fn start_conversation(
        &self,
        request: &StartConversationRequest,
    ) -> Result<ConversationId, RemoteError> {
        let delay = self.with_state(|s| {
            s.calls.push(BackendCall::StartConversation(request.clone()));
            s.start_delay
        });
        pause(delay).await;

        self.with_state(|s| {
            if s.fail_start {
                return Err(RemoteError::Rejected("Failed to start conversation".to_string()));
            }
            s.next_conversation += 1;
            Ok(ConversationId(s.next_conversation.to_string()))
        })
    }

    async fn save_message(&self, request: &SaveMessageRequest) -> Result<(), RemoteError> {
        let delay = self.with_state(|s| {
            s.calls.push(BackendCall::SaveMessage(request.clone()));
            s.save_delay
        });
        pause(delay).await;

        self.with_state(|s| {
            if s.fail_save {
                return Err(RemoteError::Status(500));
            }
            s.next_message += 1;
            s.messages.push(RemoteMessage {
                id: WireId::Number(s.next_message),
                message: request.message.clone(),
                sender_id: WireId::Number(request.sender_id),
                sent_at: Some(request.sent_at.clone()),
                conversation_id: Some(WireId::Text(request.conversation_id.0.clone())),
            });
            Ok(())
        })
    }

    async fn list_admins(&self) -> Result<Vec<RemoteAdmin>, RemoteError> {
        self.with_state(|s| {
            s.calls.push(BackendCall::ListAdmins);
            if s.fail_fetch {
                return Err(RemoteError::Status(500));
            }
            Ok(s.admins.clone())
        })
    }
}

/// Shorthand for a numeric-id message record.
pub fn remote_message(id: i64, sender_id: i64, body: &str, sent_at: &str) -> RemoteMessage {
    RemoteMessage {
        id: WireId::Number(id),
        message: body.to_string(),
        sender_id: WireId::Number(sender_id),
        sent_at: Some(sent_at.to_string()),
        conversation_id: None,
    }
}
