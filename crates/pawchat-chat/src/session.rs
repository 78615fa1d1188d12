//! Chat session controller.
//!
//! Owns the live timeline, the current mode, and the input draft. Assisted
//! sends are answered locally by the intent matcher; human-relayed sends go
//! through the conversation manager and message sync. While human-relayed, a
//! poller merges remote updates into the timeline.
//!
//! All state sits behind one mutex that is never held across an `.await`.
//! Async results are applied against the state current at resolution time,
//! never against the snapshot the call started from.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pawchat_assist::{IntentMatcher, ASSISTED_GREETING};
use pawchat_core::config::ChatConfig;
use pawchat_core::types::{
    ChatMode, ConversationId, Counterpart, DeliveryState, Message, MessageId, SenderRole, UserId,
};
use tokio::sync::broadcast;

use crate::conversation::ConversationManager;
use crate::error::ChatError;
use crate::poller::Poller;
use crate::remote::ChatBackend;
use crate::sync::{merge_remote, sort_timeline, MessageSync, Timeline};

const EVENT_CAPACITY: usize = 64;

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ConversationCreationFailed,
    SendFailed { message_id: MessageId },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ConversationCreationFailed => {
                f.write_str("Failed to start conversation. Please try again.")
            }
            Notice::SendFailed { .. } => f.write_str("Failed to send message. Please try again."),
        }
    }
}

/// Broadcast to subscribers whenever the session changes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    TimelineUpdated(Timeline),
    ModeChanged(ChatMode),
    Notice(Notice),
}

struct SessionState {
    mode: ChatMode,
    timeline: Timeline,
    draft: String,
}

struct SessionInner {
    user_id: UserId,
    config: ChatConfig,
    backend: Arc<dyn ChatBackend>,
    matcher: IntentMatcher,
    sync: MessageSync,
    conversations: ConversationManager,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Install `next` if it differs from what the state holds.
    fn publish(&self, state: &mut SessionState, next: Timeline) {
        if Arc::ptr_eq(&state.timeline, &next) {
            return;
        }
        state.timeline = next;
        self.emit(SessionEvent::TimelineUpdated(Arc::clone(&state.timeline)));
    }

    fn append(&self, messages: Vec<Message>) {
        let mut state = self.lock();
        let mut next = state.timeline.as_ref().clone();
        next.extend(messages);
        sort_timeline(&mut next);
        self.publish(&mut state, Arc::new(next));
    }

    fn replace_message(&self, replacement: Message) {
        let mut state = self.lock();
        let Some(index) = state.timeline.iter().position(|m| m.id == replacement.id) else {
            // Already reconciled with the server copy by a refresh.
            return;
        };
        let mut next = state.timeline.as_ref().clone();
        next[index] = replacement;
        self.publish(&mut state, Arc::new(next));
    }

    /// Merge fetched messages into whatever the timeline is now.
    fn merge_fetched(&self, fetched: Vec<Message>) -> bool {
        let mut state = self.lock();
        let next = merge_remote(&state.timeline, fetched);
        let changed = !Arc::ptr_eq(&state.timeline, &next);
        self.publish(&mut state, next);
        changed
    }

    async fn load_history(&self) {
        match self.sync.fetch_all(self.user_id).await {
            Ok(messages) => {
                self.merge_fetched(messages);
            }
            Err(e) => tracing::warn!(user_id = %self.user_id, error = %e, "Initial history load failed"),
        }
    }

    async fn refresh(&self) -> Result<bool, ChatError> {
        let snapshot = {
            let state = self.lock();
            if state.mode != ChatMode::HumanRelayed {
                return Ok(false);
            }
            Arc::clone(&state.timeline)
        };

        let refreshed = self.sync.refresh(self.user_id, &snapshot).await?;
        if Arc::ptr_eq(&refreshed, &snapshot) {
            return Ok(false);
        }

        let mut state = self.lock();
        if state.mode != ChatMode::HumanRelayed {
            tracing::debug!("Discarding refresh that resolved after leaving human-relayed mode");
            return Ok(false);
        }
        let next = if Arc::ptr_eq(&state.timeline, &snapshot) {
            refreshed
        } else {
            let fetched = refreshed
                .iter()
                .filter(|m| m.is_persisted() && !m.is_optimistic())
                .cloned()
                .collect();
            merge_remote(&state.timeline, fetched)
        };
        let changed = !Arc::ptr_eq(&state.timeline, &next);
        self.publish(&mut state, next);
        Ok(changed)
    }

    async fn poll_tick(&self) {
        tracing::debug!(user_id = %self.user_id, "Polling for new messages");
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Refresh failed; keeping last known timeline");
        }
    }

    /// Apply the timeline side effects of entering `mode`.
    fn enter_mode(&self, state: &mut SessionState, mode: ChatMode) {
        state.mode = mode;
        let next = match mode {
            ChatMode::Assisted => {
                if state.timeline.iter().any(Message::is_assisted) {
                    return;
                }
                let mut next = state.timeline.as_ref().clone();
                next.push(Message::assisted(SenderRole::Counterpart, ASSISTED_GREETING));
                next
            }
            ChatMode::HumanRelayed => {
                if !state.timeline.iter().any(Message::is_assisted) {
                    return;
                }
                state
                    .timeline
                    .iter()
                    .filter(|m| m.is_persisted())
                    .cloned()
                    .collect()
            }
        };
        self.publish(state, Arc::new(next));
    }
}

/// A live chat session for one user.
///
/// Methods that may start the poller must run inside a tokio runtime.
pub struct ChatSession {
    inner: Arc<SessionInner>,
    poller: Mutex<Poller>,
}

impl ChatSession {
    /// Load the history and start polling if the session begins human-relayed.
    pub async fn start(
        user_id: UserId,
        config: ChatConfig,
        backend: Arc<dyn ChatBackend>,
        matcher: IntentMatcher,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(SessionInner {
            user_id,
            sync: MessageSync::new(Arc::clone(&backend)),
            conversations: ConversationManager::new(Arc::clone(&backend), config.counterpart_id),
            backend,
            matcher,
            state: Mutex::new(SessionState {
                mode: ChatMode::HumanRelayed,
                timeline: Arc::new(Vec::new()),
                draft: String::new(),
            }),
            events,
            config,
        });

        let initial_mode = inner.config.initial_mode;
        {
            let mut state = inner.lock();
            inner.enter_mode(&mut state, initial_mode);
        }
        inner.load_history().await;

        let session = Self {
            inner,
            poller: Mutex::new(Poller::new()),
        };
        if initial_mode == ChatMode::HumanRelayed {
            session.start_polling();
        }
        tracing::info!(user_id = %user_id, mode = %initial_mode, "Chat session started");
        session
    }

    pub fn mode(&self) -> ChatMode {
        self.inner.lock().mode
    }

    /// The current timeline snapshot.
    pub fn timeline(&self) -> Timeline {
        Arc::clone(&self.inner.lock().timeline)
    }

    pub fn input(&self) -> String {
        self.inner.lock().draft.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.inner.lock().draft = text.into();
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.inner.conversations.current().map(|c| c.id.clone())
    }

    pub fn is_polling(&self) -> bool {
        self.lock_poller().is_running()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Switch to the other mode and return it.
    pub fn toggle_mode(&self) -> ChatMode {
        let next = self.mode().toggled();
        self.set_mode(next);
        next
    }

    /// Switch modes. Setting the current mode does nothing.
    pub fn set_mode(&self, mode: ChatMode) {
        {
            let mut state = self.inner.lock();
            if state.mode == mode {
                return;
            }
            self.inner.enter_mode(&mut state, mode);
        }

        match mode {
            ChatMode::HumanRelayed => self.start_polling(),
            ChatMode::Assisted => self.lock_poller().stop(),
        }
        tracing::info!(mode = %mode, "Chat mode changed");
        self.inner.emit(SessionEvent::ModeChanged(mode));
    }

    /// Send the current draft.
    ///
    /// Returns the messages appended to the timeline. In human-relayed mode a
    /// save failure returns `SendFailed` after the optimistic message has
    /// already been shown; that message stays, marked `Failed`.
    pub async fn send(&self) -> Result<Vec<Message>, ChatError> {
        let (mode, text) = {
            let mut state = self.inner.lock();
            let draft = state.draft.clone();
            self.validate(&draft)?;
            state.draft.clear();
            (state.mode, draft)
        };

        match mode {
            ChatMode::Assisted => Ok(self.send_assisted(text)),
            ChatMode::HumanRelayed => self.send_persisted(text).await,
        }
    }

    /// Set the draft to `text` and send it.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<Vec<Message>, ChatError> {
        self.set_input(text);
        self.send().await
    }

    /// Refresh immediately; returns whether the timeline changed.
    ///
    /// Does nothing outside human-relayed mode.
    pub async fn refresh_now(&self) -> Result<bool, ChatError> {
        self.inner.refresh().await
    }

    /// The admin roster.
    pub async fn counterparts(&self) -> Result<Vec<Counterpart>, ChatError> {
        let admins = self
            .inner
            .backend
            .list_admins()
            .await
            .map_err(|e| ChatError::SyncUnavailable(e.to_string()))?;
        Ok(admins.iter().filter_map(|a| a.to_counterpart()).collect())
    }

    /// Stop background work. The session stays readable.
    pub fn shutdown(&self) {
        self.lock_poller().stop();
        tracing::info!(user_id = %self.inner.user_id, "Chat session shut down");
    }

    // -- Private helpers --

    fn validate(&self, draft: &str) -> Result<(), ChatError> {
        if draft.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let max = self.inner.config.max_message_chars;
        if draft.chars().count() > max {
            return Err(ChatError::MessageTooLong(max));
        }
        Ok(())
    }

    fn send_assisted(&self, text: String) -> Vec<Message> {
        let reply = self.inner.matcher.reply(&text);
        let exchange = vec![
            Message::assisted(SenderRole::User, text),
            Message::assisted(SenderRole::Counterpart, reply),
        ];
        self.inner.append(exchange.clone());
        exchange
    }

    async fn send_persisted(&self, text: String) -> Result<Vec<Message>, ChatError> {
        let inner = &self.inner;
        let conversation_id = match inner.conversations.ensure_conversation(inner.user_id).await {
            Ok(id) => id,
            Err(e) => {
                {
                    let mut state = inner.lock();
                    if state.draft.is_empty() {
                        state.draft = text;
                    }
                }
                inner.emit(SessionEvent::Notice(Notice::ConversationCreationFailed));
                return Err(e);
            }
        };

        let body = text.trim();
        let optimistic = inner.sync.prepare_persisted(conversation_id, body);
        inner.append(vec![optimistic.clone()]);

        let counterpart = inner.conversations.counterpart_id();
        match inner.sync.deliver(inner.user_id, counterpart, &optimistic).await {
            Ok(()) => {
                let sent = optimistic.with_delivery(DeliveryState::Sent);
                inner.replace_message(sent.clone());
                Ok(vec![sent])
            }
            Err(e) => {
                inner.replace_message(optimistic.with_delivery(DeliveryState::Failed));
                inner.emit(SessionEvent::Notice(Notice::SendFailed {
                    message_id: optimistic.id.clone(),
                }));
                Err(e)
            }
        }
    }

    fn start_polling(&self) {
        let inner = Arc::clone(&self.inner);
        let period = Duration::from_secs(self.inner.config.poll_interval_secs.max(1));
        self.lock_poller().start(period, move || {
            let inner = Arc::clone(&inner);
            async move { inner.poll_tick().await }
        });
    }

    fn lock_poller(&self) -> MutexGuard<'_, Poller> {
        self.poller.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.lock_poller().stop();
    }
}
