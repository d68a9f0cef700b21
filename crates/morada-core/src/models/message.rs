use chrono::{DateTime, Utc};

use crate::gateway::Row;

use super::{bool_field, epoch, str_field, time_field};

#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Parse a gateway row. `id`, `conversation_id` and `sender_id` are
    /// required; everything else degrades per-field.
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Message {
            id: str_field(row, "id")?,
            conversation_id: str_field(row, "conversation_id")?,
            sender_id: str_field(row, "sender_id")?,
            content: str_field(row, "content").unwrap_or_default(),
            is_read: bool_field(row, "is_read").unwrap_or(false),
            created_at: time_field(row, "created_at").unwrap_or_else(epoch),
        })
    }
}
