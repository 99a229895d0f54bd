//! Boundary adapters for the chat endpoints.
//!
//! The server has gone through several wire formats for the same concepts
//! (participant pair, message sender and body, response envelopes). All of
//! that is absorbed here; the rest of the app only ever sees the canonical
//! shapes from `state`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError};
use crate::state::{ChatSummary, Message, PLACEHOLDER_NAME};

const NO_MESSAGES: &str = "Нет сообщений";

#[derive(Debug, Clone, Deserialize)]
pub struct RawParticipant {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Nested last-message object from the oldest directory format.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLastMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

/// Directory entry as the server sends it. The optional fields cover the
/// historical shapes for the participant pair plus the listing and
/// last-message denormalizations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawChat {
    pub id: i64,
    #[serde(default)]
    pub user1_id: Option<i64>,
    #[serde(default)]
    pub user2_id: Option<i64>,
    #[serde(default)]
    pub user1_name: Option<String>,
    #[serde(default)]
    pub user2_name: Option<String>,
    #[serde(default)]
    pub buyer_id: Option<i64>,
    #[serde(default)]
    pub seller_id: Option<i64>,
    #[serde(default)]
    pub other_user_id: Option<i64>,
    #[serde(default)]
    pub other_user_name: Option<String>,
    #[serde(default)]
    pub users: Option<Vec<RawParticipant>>,
    #[serde(default, alias = "listingId")]
    pub listing_id: Option<i64>,
    #[serde(default, alias = "listingTitle")]
    pub listing_title: Option<String>,
    #[serde(default, alias = "listingImage")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, alias = "last_message_time")]
    pub last_message_at: Option<String>,
    #[serde(default, rename = "lastMessage")]
    pub last_message_obj: Option<RawLastMessage>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

/// Message as the server sends it; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, alias = "senderId", alias = "user_id")]
    pub sender_id: Option<i64>,
    #[serde(default, alias = "text", alias = "message")]
    pub content: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

impl RawMessage {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_time(&self.created_at)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatsEnvelope {
    Wrapped { chats: Vec<RawChat> },
    Keyed { data: Vec<RawChat> },
    Bare(Vec<RawChat>),
}

impl ChatsEnvelope {
    fn into_chats(self) -> Vec<RawChat> {
        match self {
            ChatsEnvelope::Wrapped { chats } => chats,
            ChatsEnvelope::Keyed { data } => data,
            ChatsEnvelope::Bare(chats) => chats,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessagesEnvelope {
    Wrapped { messages: Vec<RawMessage> },
    Keyed { data: Vec<RawMessage> },
    Bare(Vec<RawMessage>),
}

impl MessagesEnvelope {
    fn into_messages(self) -> Vec<RawMessage> {
        match self {
            MessagesEnvelope::Wrapped { messages } => messages,
            MessagesEnvelope::Keyed { data } => data,
            MessagesEnvelope::Bare(messages) => messages,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SendReply {
    Wrapped { message: RawMessage },
    Bare(RawMessage),
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    content: &'a str,
}

/// Chat directory fetch; summaries come back in server order.
pub async fn fetch_chats(api: &ApiClient, me: i64) -> Result<Vec<ChatSummary>, ApiError> {
    let envelope: ChatsEnvelope = api.get_json("/api/chats").await?;
    Ok(envelope
        .into_chats()
        .iter()
        .map(|chat| summarize(chat, me))
        .collect())
}

/// Ordered message history for one conversation.
pub async fn fetch_messages(api: &ApiClient, chat_id: i64) -> Result<Vec<Message>, ApiError> {
    let envelope: MessagesEnvelope = api.get_json(&format!("/api/chats/{chat_id}")).await?;
    let now = Utc::now();
    Ok(envelope
        .into_messages()
        .iter()
        .map(|raw| normalize_message(raw, chat_id, now))
        .collect())
}

/// Submits a message. The reply may omit fields which the caller defaults
/// from its provisional entry.
pub async fn send_message(
    api: &ApiClient,
    chat_id: i64,
    content: &str,
) -> Result<RawMessage, ApiError> {
    let reply: SendReply = api
        .post_json(
            &format!("/api/chats/{chat_id}/messages"),
            &SendMessageBody { content },
        )
        .await?;
    Ok(match reply {
        SendReply::Wrapped { message } => message,
        SendReply::Bare(message) => message,
    })
}

pub fn summarize(chat: &RawChat, me: i64) -> ChatSummary {
    let (other_user_id, other_user_name) = resolve_other_participant(chat, me);
    let (last_message, last_message_at) = last_message_summary(chat);
    ChatSummary {
        id: chat.id,
        other_user_id,
        other_user_name,
        listing_id: chat.listing_id,
        listing_title: chat.listing_title.clone().unwrap_or_default(),
        listing_image: chat.image_url.clone(),
        last_message,
        last_message_at,
    }
}

/// Resolves the participant that is not `me`. Total: falls back to id 0 and
/// the placeholder name when the entry names no usable participant.
pub fn resolve_other_participant(chat: &RawChat, me: i64) -> (i64, String) {
    if let (Some(user1), Some(user2)) = (chat.user1_id, chat.user2_id) {
        let (id, name) = if user1 == me {
            (user2, chat.user2_name.clone())
        } else {
            (user1, chat.user1_name.clone())
        };
        return (id, name.unwrap_or_else(placeholder));
    }
    if let Some(id) = chat.other_user_id {
        return (id, chat.other_user_name.clone().unwrap_or_else(placeholder));
    }
    if let (Some(buyer), Some(seller)) = (chat.buyer_id, chat.seller_id) {
        let id = if buyer == me { seller } else { buyer };
        return (id, placeholder());
    }
    if let Some(users) = &chat.users {
        if let Some(other) = users.iter().find(|user| user.id != me) {
            return (other.id, other.name.clone().unwrap_or_else(placeholder));
        }
    }
    (0, placeholder())
}

/// Sidebar snippet. Advisory only: an open conversation renders from its
/// loaded message list, never from this field.
pub fn last_message_summary(chat: &RawChat) -> (String, Option<DateTime<Utc>>) {
    if let Some(text) = &chat.last_message {
        let time = parse_time(&chat.last_message_at).or_else(|| parse_time(&chat.created_at));
        return (text.clone(), time);
    }
    if let Some(last) = &chat.last_message_obj {
        let text = last.text.clone().unwrap_or_else(|| NO_MESSAGES.to_owned());
        let time = parse_time(&last.created_at).or_else(|| parse_time(&chat.created_at));
        return (text, time);
    }
    (NO_MESSAGES.to_owned(), parse_time(&chat.created_at))
}

/// Canonical form for a fetched message. The owning chat id is always the
/// requested one, whatever the server echoed back.
pub fn normalize_message(raw: &RawMessage, chat_id: i64, now: DateTime<Utc>) -> Message {
    Message {
        id: raw.id.unwrap_or(0),
        chat_id,
        sender_id: raw.sender_id.unwrap_or(0),
        text: raw.content.clone().unwrap_or_default(),
        created_at: raw.timestamp().unwrap_or(now),
    }
}

fn parse_time(raw: &Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref()
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|time| time.with_timezone(&Utc))
}

fn placeholder() -> String {
    PLACEHOLDER_NAME.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn other_participant_resolves_from_the_explicit_pair() {
        let chat: RawChat = serde_json::from_str(
            r#"{"id":1,"user1_id":7,"user2_id":42,"user1_name":"Анна","user2_name":"Борис"}"#,
        )
        .expect("pair shape");
        assert_eq!(resolve_other_participant(&chat, 7), (42, "Борис".to_owned()));
        assert_eq!(resolve_other_participant(&chat, 42), (7, "Анна".to_owned()));
    }

    #[test]
    fn other_participant_resolves_from_the_other_id_field() {
        let chat: RawChat =
            serde_json::from_str(r#"{"id":1,"other_user_id":42,"other_user_name":"Борис"}"#)
                .expect("other-id shape");
        assert_eq!(resolve_other_participant(&chat, 7), (42, "Борис".to_owned()));
    }

    #[test]
    fn other_participant_resolves_from_the_buyer_seller_pair() {
        let chat: RawChat = serde_json::from_str(r#"{"id":1,"buyer_id":7,"seller_id":42}"#)
            .expect("buyer/seller shape");
        let (id, name) = resolve_other_participant(&chat, 7);
        assert_eq!(id, 42);
        assert_eq!(name, PLACEHOLDER_NAME);
    }

    #[test]
    fn other_participant_resolves_from_the_participants_collection() {
        let chat: RawChat = serde_json::from_str(
            r#"{"id":1,"users":[{"id":7,"name":"Анна"},{"id":42,"name":"Борис"}]}"#,
        )
        .expect("participants shape");
        assert_eq!(resolve_other_participant(&chat, 7), (42, "Борис".to_owned()));
    }

    #[test]
    fn resolution_never_fails() {
        let chat: RawChat = serde_json::from_str(r#"{"id":1}"#).expect("bare chat");
        assert_eq!(resolve_other_participant(&chat, 7), (0, PLACEHOLDER_NAME.to_owned()));
    }

    #[test]
    fn directory_envelope_tolerates_all_three_shapes() {
        let wrapped: ChatsEnvelope =
            serde_json::from_str(r#"{"chats":[{"id":1}],"total_count":1}"#).expect("wrapped");
        let keyed: ChatsEnvelope = serde_json::from_str(r#"{"data":[{"id":2}]}"#).expect("keyed");
        let bare: ChatsEnvelope = serde_json::from_str(r#"[{"id":3}]"#).expect("bare");
        assert_eq!(wrapped.into_chats()[0].id, 1);
        assert_eq!(keyed.into_chats()[0].id, 2);
        assert_eq!(bare.into_chats()[0].id, 3);
    }

    #[test]
    fn message_fields_tolerate_historical_names() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap();
        let old: RawMessage =
            serde_json::from_str(r#"{"id":1,"user_id":7,"text":"привет"}"#).expect("old shape");
        let new: RawMessage = serde_json::from_str(
            r#"{"id":2,"sender_id":7,"content":"привет","created_at":"2024-01-01T10:00:00Z"}"#,
        )
        .expect("new shape");

        let old = normalize_message(&old, 5, now);
        assert_eq!((old.sender_id, old.text.as_str()), (7, "привет"));
        // No timestamp on the wire: client "now" stands in.
        assert_eq!(old.created_at, now);

        let new = normalize_message(&new, 5, now);
        assert_eq!(new.sender_id, 7);
        assert_eq!(new.created_at, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn normalization_pins_the_requested_chat_id() {
        let raw: RawMessage = serde_json::from_str(r#"{"id":9,"sender_id":7,"content":"hi"}"#)
            .expect("message");
        let message = normalize_message(&raw, 5, Utc::now());
        assert_eq!(message.chat_id, 5);
    }

    #[test]
    fn last_message_summary_prefers_the_flat_fields() {
        let chat: RawChat = serde_json::from_str(
            r#"{"id":1,"last_message":"Ок, договорились","last_message_at":"2024-01-02T09:00:00Z"}"#,
        )
        .expect("flat shape");
        let (text, time) = last_message_summary(&chat);
        assert_eq!(text, "Ок, договорились");
        assert_eq!(time, Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()));
    }

    #[test]
    fn last_message_summary_reads_the_legacy_object() {
        let chat: RawChat = serde_json::from_str(
            r#"{"id":1,"lastMessage":{"text":"Привет","createdAt":"2024-01-02T09:00:00Z"}}"#,
        )
        .expect("legacy shape");
        let (text, time) = last_message_summary(&chat);
        assert_eq!(text, "Привет");
        assert!(time.is_some());
    }

    #[test]
    fn last_message_summary_defaults_when_nothing_was_sent() {
        let chat: RawChat =
            serde_json::from_str(r#"{"id":1,"created_at":"2024-01-01T00:00:00Z"}"#).expect("chat");
        let (text, time) = last_message_summary(&chat);
        assert_eq!(text, NO_MESSAGES);
        assert!(time.is_some());
    }

    #[test]
    fn send_reply_unwraps_both_envelope_shapes() {
        let wrapped: SendReply =
            serde_json::from_str(r#"{"success":true,"message":{"id":10,"content":"hi"}}"#)
                .expect("wrapped reply");
        let bare: SendReply =
            serde_json::from_str(r#"{"id":11,"created_at":"2024-01-01T10:00:00Z"}"#)
                .expect("bare reply");
        match wrapped {
            SendReply::Wrapped { message } => assert_eq!(message.id, Some(10)),
            SendReply::Bare(_) => panic!("expected the wrapped shape"),
        }
        match bare {
            SendReply::Bare(message) => assert_eq!(message.id, Some(11)),
            SendReply::Wrapped { .. } => panic!("expected the bare shape"),
        }
    }
}
