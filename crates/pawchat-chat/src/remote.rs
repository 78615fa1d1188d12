//! Client side of the remote conversation store.
//!
//! `ChatBackend` is the seam every chat component talks through.
//! `HttpChatBackend` implements it over HTTP/JSON with reqwest. Envelope
//! checks (`success` flag, payload shape) live in the `parse_*` functions so
//! every backend reports failures the same way.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use pawchat_core::config::RemoteConfig;
use pawchat_core::types::{ConversationId, Counterpart, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

// =============================================================================
// Wire types
// =============================================================================

/// An identifier that the server may encode as a JSON number or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    /// Numeric value, parsing textual ids when they hold an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            WireId::Number(n) => Some(*n),
            WireId::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireId::Number(n) => write!(f, "{}", n),
            WireId::Text(s) => f.write_str(s),
        }
    }
}

/// A message record as returned by the messages endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub id: WireId,
    pub message: String,
    pub sender_id: WireId,
    #[serde(default)]
    pub sent_at: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<WireId>,
}

/// An admin roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAdmin {
    pub id: WireId,
    #[serde(default, alias = "username")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl RemoteAdmin {
    /// Convert to the domain type; `None` when the id is not numeric.
    pub fn to_counterpart(&self) -> Option<Counterpart> {
        Some(Counterpart {
            id: UserId(self.id.as_i64()?),
            name: self.name.clone(),
            email: self.email.clone(),
        })
    }
}

/// Body of the start-conversation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartConversationRequest {
    pub user_id: i64,
    pub admin_id: i64,
}

/// Body of the save-message call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMessageRequest {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub message: String,
    pub conversation_id: ConversationId,
    /// Always 0: assisted exchanges are never persisted.
    pub is_automated: u8,
    pub sent_at: String,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// Envelope parsing
// =============================================================================

fn check_success(body: &Value) -> Result<(), RemoteError> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(()),
        Some(false) => Err(RemoteError::Rejected(
            body.get("message")
                .and_then(Value::as_str)
                .unwrap_or("server returned error")
                .to_string(),
        )),
        None => Err(RemoteError::Malformed("missing success flag".to_string())),
    }
}

/// Validate a messages response and decode its records.
pub fn parse_messages(body: Value) -> Result<Vec<RemoteMessage>, RemoteError> {
    check_success(&body)?;
    let Some(list) = body.get("messages") else {
        return Err(RemoteError::Malformed("messages missing".to_string()));
    };
    if !list.is_array() {
        return Err(RemoteError::Malformed("messages is not an array".to_string()));
    }
    serde_json::from_value(list.clone()).map_err(|e| RemoteError::Malformed(e.to_string()))
}

/// Validate a start-conversation response and extract the new id.
pub fn parse_conversation(body: Value) -> Result<ConversationId, RemoteError> {
    check_success(&body)?;
    match body.get("conversation_id") {
        Some(Value::Number(n)) => Ok(ConversationId(n.to_string())),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(ConversationId(s.trim().to_string())),
        _ => Err(RemoteError::Malformed(
            "conversation_id missing or invalid".to_string(),
        )),
    }
}

/// Validate an acknowledgement-only response.
pub fn parse_ack(body: Value) -> Result<(), RemoteError> {
    check_success(&body)
}

/// Validate an admin roster response.
pub fn parse_admins(body: Value) -> Result<Vec<RemoteAdmin>, RemoteError> {
    check_success(&body)?;
    match body.get("admins") {
        Some(list @ Value::Array(_)) => serde_json::from_value(list.clone())
            .map_err(|e| RemoteError::Malformed(e.to_string())),
        _ => Err(RemoteError::Malformed("admins is not an array".to_string())),
    }
}

// =============================================================================
// Backend trait
// =============================================================================

/// Operations the chat engine needs from the remote conversation store.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// The full message history visible to `user_id`.
    async fn fetch_messages(&self, user_id: UserId) -> Result<Vec<RemoteMessage>, RemoteError>;

    /// Open a conversation between a user and an admin.
    async fn start_conversation(
        &self,
        request: &StartConversationRequest,
    ) -> Result<ConversationId, RemoteError>;

    /// Persist one message.
    async fn save_message(&self, request: &SaveMessageRequest) -> Result<(), RemoteError>;

    /// The admin roster.
    async fn list_admins(&self) -> Result<Vec<RemoteAdmin>, RemoteError>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// `ChatBackend` over the clinic's HTTP/JSON API.
pub struct HttpChatBackend {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpChatBackend {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, RemoteError> {
        let url = self.config.endpoint(path);
        tracing::debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        read_json(response).await
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value, RemoteError> {
        let url = self.config.endpoint(path);
        tracing::debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Status(status.as_u16()));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| RemoteError::Malformed(e.to_string()))
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn fetch_messages(&self, user_id: UserId) -> Result<Vec<RemoteMessage>, RemoteError> {
        let body = self
            .get_json(&self.config.messages_path, &[("user_id", user_id.to_string())])
            .await?;
        parse_messages(body)
    }

    async fn start_conversation(
        &self,
        request: &StartConversationRequest,
    ) -> Result<ConversationId, RemoteError> {
        let body = self
            .post_json(&self.config.start_conversation_path, request)
            .await?;
        parse_conversation(body)
    }

    async fn save_message(&self, request: &SaveMessageRequest) -> Result<(), RemoteError> {
        let body = self.post_json(&self.config.save_message_path, request).await?;
        parse_ack(body)
    }

    async fn list_admins(&self) -> Result<Vec<RemoteAdmin>, RemoteError> {
        let body = self.get_json(&self.config.admins_path, &[]).await?;
        parse_admins(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_id_accepts_number_and_string() {
        let n: WireId = serde_json::from_value(json!(12)).unwrap();
        let s: WireId = serde_json::from_value(json!("12")).unwrap();
        assert_eq!(n.as_i64(), Some(12));
        assert_eq!(s.as_i64(), Some(12));
        assert_eq!(n.to_string(), "12");
        assert_eq!(s.to_string(), "12");
    }

    #[test]
    fn test_wire_id_non_numeric_text() {
        let id = WireId::Text("abc".to_string());
        assert_eq!(id.as_i64(), None);
    }

    #[test]
    fn test_parse_messages_ok() {
        let body = json!({
            "success": true,
            "messages": [
                {"id": 1, "message": "hi", "sender_id": "5", "sent_at": "2024-03-01 10:00:00", "conversation_id": 3},
                {"id": "2", "message": "hello", "sender_id": 1, "sent_at": null, "conversation_id": null}
            ]
        });
        let messages = parse_messages(body).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender_id.as_i64(), Some(5));
        assert_eq!(messages[1].sent_at, None);
    }

    #[test]
    fn test_parse_messages_empty_list() {
        let messages = parse_messages(json!({"success": true, "messages": []})).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_parse_messages_rejected_carries_server_message() {
        let err = parse_messages(json!({"success": false, "message": "user not found"}))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(ref m) if m == "user not found"));
    }

    #[test]
    fn test_parse_messages_not_an_array() {
        let err = parse_messages(json!({"success": true, "messages": {"id": 1}})).unwrap_err();
        assert!(matches!(err, RemoteError::Malformed(_)));
    }

    #[test]
    fn test_parse_messages_missing_list() {
        let err = parse_messages(json!({"success": true})).unwrap_err();
        assert!(matches!(err, RemoteError::Malformed(_)));
    }

    #[test]
    fn test_parse_messages_bad_record() {
        let body = json!({"success": true, "messages": [{"message": "no id"}]});
        assert!(matches!(parse_messages(body), Err(RemoteError::Malformed(_))));
    }

    #[test]
    fn test_missing_success_flag_is_malformed() {
        assert!(matches!(parse_ack(json!({})), Err(RemoteError::Malformed(_))));
    }

    #[test]
    fn test_parse_conversation_number_or_string() {
        assert_eq!(
            parse_conversation(json!({"success": true, "conversation_id": 44})).unwrap(),
            ConversationId::from("44")
        );
        assert_eq!(
            parse_conversation(json!({"success": true, "conversation_id": "c-9"})).unwrap(),
            ConversationId::from("c-9")
        );
    }

    #[test]
    fn test_parse_conversation_missing_id() {
        let err = parse_conversation(json!({"success": true})).unwrap_err();
        assert!(matches!(err, RemoteError::Malformed(_)));
        let err = parse_conversation(json!({"success": true, "conversation_id": ""})).unwrap_err();
        assert!(matches!(err, RemoteError::Malformed(_)));
    }

    #[test]
    fn test_parse_conversation_rejected() {
        let err = parse_conversation(json!({"success": false})).unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
    }

    #[test]
    fn test_parse_admins() {
        let admins = parse_admins(json!({
            "success": true,
            "admins": [{"id": "1", "username": "Dr. Santos", "email": "santos@clinic.example", "role": "admin"}]
        }))
        .unwrap();
        let counterpart = admins[0].to_counterpart().unwrap();
        assert_eq!(counterpart.id, UserId(1));
        assert_eq!(counterpart.name.as_deref(), Some("Dr. Santos"));
    }

    #[test]
    fn test_save_request_wire_shape() {
        let request = SaveMessageRequest {
            sender_id: 5,
            receiver_id: 1,
            message: "hello".to_string(),
            conversation_id: ConversationId::from("3"),
            is_automated: 0,
            sent_at: "2024-03-01T10:00:00.000Z".to_string(),
            created_at: "2024-03-01T10:00:00.000Z".to_string(),
            updated_at: "2024-03-01T10:00:00.000Z".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["sender_id"], 5);
        assert_eq!(value["receiver_id"], 1);
        assert_eq!(value["conversation_id"], "3");
        assert_eq!(value["is_automated"], 0);
    }

    #[test]
    fn test_http_backend_builds() {
        assert!(HttpChatBackend::new(RemoteConfig::default()).is_ok());
    }
}
