mod manager;
mod repository;

pub use manager::*;
pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DirectMessage as saved on database.
///
/// Created unread, flipped to read only by a recipient-side
/// mark-as-read, and deleted per side: each party hides its own copy and
/// the row is removed once both have.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DirectMessage {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub subject: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub is_read: bool,
    #[serde(skip)]
    pub deleted_by_sender: bool,
    #[serde(skip)]
    pub deleted_by_recipient: bool,
}

/// One entry of `get_recent_conversations`: the latest exchange with one
/// partner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationHead {
    pub partner_id: i64,
    pub partner_username: String,
    pub last_message_at: DateTime<Utc>,
}
