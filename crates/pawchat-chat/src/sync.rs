//! Remote message synchronization.
//!
//! Fetches the remote history, maps it into timeline messages, and merges
//! incremental refreshes by identifier. A merge never drops a message that is
//! already present and never admits a second copy of an id.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use pawchat_core::types::{
    ConversationId, DeliveryState, Message, MessageId, Provenance, SenderRole, UserId,
};

use crate::error::ChatError;
use crate::remote::{ChatBackend, RemoteMessage, SaveMessageRequest};

/// A shared, immutable snapshot of the timeline.
///
/// Operations that find nothing new hand back the same `Arc`, so callers can
/// detect "no change" with `Arc::ptr_eq`.
pub type Timeline = Arc<Vec<Message>>;

/// Fetches, normalizes, and merges remote messages.
pub struct MessageSync {
    backend: Arc<dyn ChatBackend>,
}

impl MessageSync {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// The full remote history for `user_id`, oldest first.
    pub async fn fetch_all(&self, user_id: UserId) -> Result<Vec<Message>, ChatError> {
        let records = self
            .backend
            .fetch_messages(user_id)
            .await
            .map_err(|e| ChatError::SyncUnavailable(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut messages: Vec<Message> = records
            .iter()
            .map(|record| to_message(record, user_id))
            .filter(|msg| seen.insert(msg.id.clone()))
            .collect();
        sort_timeline(&mut messages);

        tracing::debug!(user_id = %user_id, count = messages.len(), "Fetched message history");
        Ok(messages)
    }

    /// Fetch again and merge anything not yet in `current`.
    ///
    /// Returns `current` itself when the fetch holds no new identifiers.
    pub async fn refresh(&self, user_id: UserId, current: &Timeline) -> Result<Timeline, ChatError> {
        let fetched = self.fetch_all(user_id).await?;
        Ok(merge_remote(current, fetched))
    }

    /// Build the optimistic local copy of a message about to be persisted.
    pub fn prepare_persisted(&self, conversation_id: ConversationId, text: &str) -> Message {
        Message::optimistic(text, conversation_id, Utc::now())
    }

    /// Persist a message previously built by [`prepare_persisted`](Self::prepare_persisted).
    pub async fn deliver(
        &self,
        user_id: UserId,
        counterpart_id: UserId,
        message: &Message,
    ) -> Result<(), ChatError> {
        let Some(conversation_id) = message.conversation_id.clone() else {
            return Err(ChatError::SendFailed("message has no conversation".to_string()));
        };
        let stamp = message
            .timestamp
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let request = SaveMessageRequest {
            sender_id: user_id.0,
            receiver_id: counterpart_id.0,
            message: message.body.clone(),
            conversation_id,
            is_automated: 0,
            sent_at: stamp.clone(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };

        self.backend.save_message(&request).await.map_err(|e| {
            tracing::warn!(message_id = %message.id, error = %e, "Saving message failed");
            ChatError::SendFailed(e.to_string())
        })
    }

    /// Build and persist a message in one step.
    ///
    /// On success the returned copy is marked [`DeliveryState::Sent`].
    pub async fn send_persisted(
        &self,
        user_id: UserId,
        counterpart_id: UserId,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<Message, ChatError> {
        let message = self.prepare_persisted(conversation_id, text);
        self.deliver(user_id, counterpart_id, &message).await?;
        Ok(message.with_delivery(DeliveryState::Sent))
    }
}

/// Merge fetched persisted messages into `current`.
///
/// Messages whose id is already present are ignored. A fetched message the
/// user authored takes the place of a matching optimistic copy (same body and
/// conversation) instead of appearing next to it. Returns `current` unchanged
/// when nothing new arrived.
pub fn merge_remote(current: &Timeline, fetched: Vec<Message>) -> Timeline {
    let present: HashSet<&MessageId> = current
        .iter()
        .filter(|m| m.is_persisted())
        .map(|m| &m.id)
        .collect();

    let mut admitted = HashSet::new();
    let fresh: Vec<Message> = fetched
        .into_iter()
        .filter(|m| !present.contains(&m.id) && admitted.insert(m.id.clone()))
        .collect();

    if fresh.is_empty() {
        return Arc::clone(current);
    }

    let mut merged = current.as_ref().clone();
    let mut reconciled = 0usize;
    for msg in fresh {
        match find_optimistic_copy(&merged, &msg) {
            Some(index) => {
                merged[index] = msg;
                reconciled += 1;
            }
            None => merged.push(msg),
        }
    }
    sort_timeline(&mut merged);

    tracing::debug!(
        total = merged.len(),
        reconciled,
        "Merged new remote messages"
    );
    Arc::new(merged)
}

/// The optimistic entry a server record stands for.
///
/// `Failed` copies are never candidates: the server did not take them, so they
/// stay visible as failed. Among the rest, the copy whose timestamp matches the
/// echoed `sent_at` (millisecond precision) wins, then the oldest.
fn find_optimistic_copy(timeline: &[Message], remote: &Message) -> Option<usize> {
    if remote.sender != SenderRole::User || remote.is_optimistic() {
        return None;
    }
    let candidates: Vec<usize> = timeline
        .iter()
        .enumerate()
        .filter(|(_, m)| {
            matches!(m.delivery, Some(DeliveryState::Pending | DeliveryState::Sent))
                && m.sender == SenderRole::User
                && m.body == remote.body
                && m.conversation_id == remote.conversation_id
        })
        .map(|(index, _)| index)
        .collect();

    let echoed = remote.timestamp.map(|t| t.timestamp_millis());
    candidates
        .iter()
        .copied()
        .find(|&i| echoed.is_some() && timeline[i].timestamp.map(|t| t.timestamp_millis()) == echoed)
        .or_else(|| candidates.first().copied())
}

/// Stable sort: timestamped messages ascending, then untimestamped ones in
/// their existing order.
pub fn sort_timeline(messages: &mut [Message]) {
    messages.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Map a remote record, deriving the sender role from `user_id`.
pub fn to_message(record: &RemoteMessage, user_id: UserId) -> Message {
    let sender = if record.sender_id.as_i64() == Some(user_id.0) {
        SenderRole::User
    } else {
        SenderRole::Counterpart
    };
    Message {
        id: MessageId(record.id.to_string()),
        body: record.message.clone(),
        sender,
        provenance: Provenance::Persisted,
        timestamp: record.sent_at.as_deref().and_then(parse_timestamp),
        conversation_id: record
            .conversation_id
            .as_ref()
            .map(|c| ConversationId(c.to_string())),
        delivery: None,
    }
}

/// Parse RFC 3339 or `YYYY-MM-DD HH:MM:SS` (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::WireId;
    use crate::testing::{remote_message, ScriptedBackend};

    const USER: UserId = UserId(5);
    const ADMIN: UserId = UserId(1);

    fn sync_with(backend: &Arc<ScriptedBackend>) -> MessageSync {
        MessageSync::new(Arc::clone(backend) as Arc<dyn ChatBackend>)
    }

    fn ids(timeline: &[Message]) -> Vec<&str> {
        timeline.iter().map(|m| m.id.as_str()).collect()
    }

    // ---- Timestamp parsing ----

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2024-03-01 10:00:00").unwrap();
        let b = parse_timestamp("2024-03-01T10:00:00Z").unwrap();
        let c = parse_timestamp("2024-03-01T10:00:00.000Z").unwrap();
        let d = parse_timestamp("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
    }

    #[test]
    fn test_parse_timestamp_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    // ---- Mapping ----

    #[test]
    fn test_sender_role_from_user_id() {
        let mine = remote_message(1, 5, "mine", "2024-03-01 10:00:00");
        let theirs = remote_message(2, 1, "theirs", "2024-03-01 10:00:01");
        assert_eq!(to_message(&mine, USER).sender, SenderRole::User);
        assert_eq!(to_message(&theirs, USER).sender, SenderRole::Counterpart);
    }

    #[test]
    fn test_textual_sender_id_compares_numerically() {
        let mut record = remote_message(1, 0, "mine", "2024-03-01 10:00:00");
        record.sender_id = WireId::Text(" 5".to_string());
        assert_eq!(to_message(&record, USER).sender, SenderRole::User);
    }

    #[test]
    fn test_mapping_marks_persisted() {
        let msg = to_message(&remote_message(9, 1, "x", "2024-03-01 10:00:00"), USER);
        assert_eq!(msg.provenance, Provenance::Persisted);
        assert_eq!(msg.id, MessageId::from("9"));
        assert!(msg.delivery.is_none());
        assert!(msg.timestamp.is_some());
    }

    // ---- Ordering ----

    #[test]
    fn test_sort_arrival_t2_t1_t3() {
        let mut messages = vec![
            to_message(&remote_message(2, 1, "t2", "2024-03-01 10:00:02"), USER),
            to_message(&remote_message(1, 1, "t1", "2024-03-01 10:00:01"), USER),
            to_message(&remote_message(3, 1, "t3", "2024-03-01 10:00:03"), USER),
        ];
        sort_timeline(&mut messages);
        assert_eq!(ids(&messages), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_sort_ties_keep_arrival_order() {
        let mut messages = vec![
            to_message(&remote_message(7, 1, "a", "2024-03-01 10:00:00"), USER),
            to_message(&remote_message(3, 1, "b", "2024-03-01 10:00:00"), USER),
        ];
        sort_timeline(&mut messages);
        assert_eq!(ids(&messages), vec!["7", "3"]);
    }

    #[test]
    fn test_sort_untimestamped_after_timestamped() {
        let greeting = Message::assisted(SenderRole::Counterpart, "greeting");
        let mut messages = vec![
            greeting.clone(),
            to_message(&remote_message(1, 1, "t1", "2024-03-01 10:00:01"), USER),
        ];
        sort_timeline(&mut messages);
        assert_eq!(messages[0].id, MessageId::from("1"));
        assert_eq!(messages[1].id, greeting.id);
    }

    // ---- fetch_all ----

    #[tokio::test]
    async fn test_fetch_all_sorted() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_remote(remote_message(2, 1, "second", "2024-03-01 10:00:02"));
        backend.push_remote(remote_message(1, 5, "first", "2024-03-01 10:00:01"));
        let messages = sync_with(&backend).fetch_all(USER).await.unwrap();
        assert_eq!(ids(&messages), vec!["1", "2"]);
        assert_eq!(messages[0].sender, SenderRole::User);
    }

    #[tokio::test]
    async fn test_fetch_all_drops_duplicate_ids() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_remote(remote_message(1, 1, "a", "2024-03-01 10:00:01"));
        backend.push_remote(remote_message(1, 1, "a", "2024-03-01 10:00:01"));
        let messages = sync_with(&backend).fetch_all(USER).await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_failure_is_sync_unavailable() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_fail_fetch(true);
        let err = sync_with(&backend).fetch_all(USER).await.unwrap_err();
        assert!(matches!(err, ChatError::SyncUnavailable(_)));
    }

    // ---- refresh / merge ----

    #[tokio::test]
    async fn test_refresh_without_new_ids_returns_same_arc() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_remote(remote_message(1, 1, "a", "2024-03-01 10:00:01"));
        let sync = sync_with(&backend);
        let current: Timeline = Arc::new(sync.fetch_all(USER).await.unwrap());

        let refreshed = sync.refresh(USER, &current).await.unwrap();
        assert!(Arc::ptr_eq(&current, &refreshed));
    }

    #[tokio::test]
    async fn test_refresh_merges_and_sorts() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_remote(remote_message(2, 1, "b", "2024-03-01 10:00:02"));
        let sync = sync_with(&backend);
        let current: Timeline = Arc::new(sync.fetch_all(USER).await.unwrap());

        backend.push_remote(remote_message(3, 1, "c", "2024-03-01 10:00:03"));
        backend.push_remote(remote_message(1, 1, "a", "2024-03-01 10:00:01"));
        let refreshed = sync.refresh(USER, &current).await.unwrap();
        assert!(!Arc::ptr_eq(&current, &refreshed));
        assert_eq!(ids(&refreshed), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_refresh_partial_page_keeps_existing() {
        let backend = Arc::new(ScriptedBackend::new());
        for i in 1..=4 {
            backend.push_remote(remote_message(i, 1, "m", &format!("2024-03-01 10:00:0{}", i)));
        }
        let sync = sync_with(&backend);
        let current: Timeline = Arc::new(sync.fetch_all(USER).await.unwrap());
        assert_eq!(current.len(), 4);

        backend.set_page_limit(Some(1));
        let refreshed = sync.refresh(USER, &current).await.unwrap();
        assert!(Arc::ptr_eq(&current, &refreshed));
        assert_eq!(refreshed.len(), 4);
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_fail_fetch(true);
        let current: Timeline = Arc::new(Vec::new());
        let result = sync_with(&backend).refresh(USER, &current).await;
        assert!(matches!(result, Err(ChatError::SyncUnavailable(_))));
    }

    #[test]
    fn test_merge_never_duplicates_or_shrinks() {
        let mut current: Timeline = Arc::new(Vec::new());
        let batches = [vec![3, 1], vec![1, 2], vec![], vec![4, 4, 2], vec![1]];
        let mut previous_len = 0;
        for batch in batches {
            let fetched = batch
                .iter()
                .map(|&i| {
                    to_message(
                        &remote_message(i, 1, "m", &format!("2024-03-01 10:00:0{}", i)),
                        USER,
                    )
                })
                .collect();
            current = merge_remote(&current, fetched);
            let unique: HashSet<_> = current.iter().map(|m| m.id.clone()).collect();
            assert_eq!(unique.len(), current.len());
            assert!(current.len() >= previous_len);
            previous_len = current.len();
        }
        assert_eq!(ids(&current), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_merge_reconciles_optimistic_copy() {
        let conversation = ConversationId::from("3");
        let optimistic = Message::optimistic("hello", conversation.clone(), Utc::now());
        let current: Timeline = Arc::new(vec![optimistic.clone()]);

        let mut record = remote_message(40, 5, "hello", "2024-03-01 10:00:00");
        record.conversation_id = Some(WireId::Number(3));
        let merged = merge_remote(&current, vec![to_message(&record, USER)]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, MessageId::from("40"));
        assert!(merged[0].delivery.is_none());
    }

    #[test]
    fn test_merge_never_reconciles_failed_copy() {
        let conversation = ConversationId::from("3");
        let failed = Message::optimistic("hi", conversation.clone(), Utc::now())
            .with_delivery(DeliveryState::Failed);
        let sent = Message::optimistic("hi", conversation, Utc::now())
            .with_delivery(DeliveryState::Sent);
        let current: Timeline = Arc::new(vec![failed.clone(), sent.clone()]);

        let mut record = remote_message(40, 5, "hi", "2024-03-01 10:00:00");
        record.conversation_id = Some(WireId::Number(3));
        let merged = merge_remote(&current, vec![to_message(&record, USER)]);

        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|m| m.id == failed.id && m.delivery == Some(DeliveryState::Failed)));
        assert!(merged.iter().all(|m| m.id != sent.id));
        assert!(merged.iter().any(|m| m.id == MessageId::from("40")));
    }

    #[test]
    fn test_merge_prefers_copy_with_echoed_timestamp() {
        let conversation = ConversationId::from("3");
        let first_at = parse_timestamp("2024-03-01T10:00:00.000Z").unwrap();
        let second_at = parse_timestamp("2024-03-01T10:00:05.250Z").unwrap();
        let first = Message::optimistic("again", conversation.clone(), first_at)
            .with_delivery(DeliveryState::Sent);
        let second = Message::optimistic("again", conversation, second_at)
            .with_delivery(DeliveryState::Sent);
        let current: Timeline = Arc::new(vec![first.clone(), second.clone()]);

        let mut record = remote_message(41, 5, "again", "2024-03-01T10:00:05.250Z");
        record.conversation_id = Some(WireId::Number(3));
        let merged = merge_remote(&current, vec![to_message(&record, USER)]);

        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|m| m.id == first.id));
        assert!(merged.iter().all(|m| m.id != second.id));
    }

    #[test]
    fn test_merge_does_not_reconcile_counterpart_message() {
        let conversation = ConversationId::from("3");
        let optimistic = Message::optimistic("hello", conversation, Utc::now());
        let current: Timeline = Arc::new(vec![optimistic]);

        let mut record = remote_message(41, 1, "hello", "2024-03-01 10:00:00");
        record.conversation_id = Some(WireId::Number(3));
        let merged = merge_remote(&current, vec![to_message(&record, USER)]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_ignores_assisted_ids_for_presence() {
        let assisted = Message::assisted(SenderRole::Counterpart, "bot");
        let current: Timeline = Arc::new(vec![assisted.clone()]);
        let mut persisted = to_message(&remote_message(1, 1, "x", "2024-03-01 10:00:00"), USER);
        persisted.id = assisted.id.clone();
        let merged = merge_remote(&current, vec![persisted]);
        assert_eq!(merged.len(), 2);
    }

    // ---- send_persisted ----

    #[tokio::test]
    async fn test_send_persisted_request_shape() {
        let backend = Arc::new(ScriptedBackend::new());
        let sync = sync_with(&backend);
        let msg = sync
            .send_persisted(USER, ADMIN, ConversationId::from("3"), "hello")
            .await
            .unwrap();
        assert_eq!(msg.delivery, Some(DeliveryState::Sent));
        assert_eq!(msg.sender, SenderRole::User);
        assert!(msg.timestamp.is_some());

        let saved = backend.save_requests();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].sender_id, 5);
        assert_eq!(saved[0].receiver_id, 1);
        assert_eq!(saved[0].conversation_id, ConversationId::from("3"));
        assert_eq!(saved[0].is_automated, 0);
        assert_eq!(saved[0].sent_at, saved[0].created_at);
        assert!(parse_timestamp(&saved[0].sent_at).is_some());
    }

    #[tokio::test]
    async fn test_send_persisted_failure() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_fail_save(true);
        let err = sync_with(&backend)
            .send_persisted(USER, ADMIN, ConversationId::from("3"), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::SendFailed(_)));
    }

    #[tokio::test]
    async fn test_deliver_requires_conversation() {
        let backend = Arc::new(ScriptedBackend::new());
        let msg = Message::assisted(SenderRole::User, "no thread");
        let err = sync_with(&backend).deliver(USER, ADMIN, &msg).await.unwrap_err();
        assert!(matches!(err, ChatError::SendFailed(_)));
        assert!(backend.save_requests().is_empty());
    }
}
