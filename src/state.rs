use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name used whenever a participant cannot be resolved.
pub const PLACEHOLDER_NAME: &str = "Пользователь";

/// Profile shape returned by `GET /users/{id}` and `GET /api/profile`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// One entry of the chat directory after boundary normalization.
///
/// The last-message fields are the server's denormalized snippet. They are
/// rendered in the sidebar only; an open conversation always renders from
/// its loaded message list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatSummary {
    pub id: i64,
    pub other_user_id: i64,
    pub other_user_name: String,
    pub listing_id: Option<i64>,
    pub listing_title: String,
    pub listing_image: Option<String>,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Canonical message shape. Negative ids mark provisional entries, which
/// exist only until their send settles.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_provisional(&self) -> bool {
        self.id < 0
    }
}
