use chrono::{DateTime, Utc};

use crate::constants::PROFILE_PLACEHOLDER;
use crate::gateway::Row;

use super::{epoch, str_field, time_field, u32_field};

/// Two-party message thread, as projected for one viewer.
///
/// Exactly one of `sender_id`/`receiver_id` is the current principal; the
/// other participant is always computed, never stored. `user_name` and
/// `user_avatar` are the other participant's resolved profile data and start
/// at the placeholder until merged.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub last_message: String,
    /// Unread counter scoped to the viewer, resolved server-side.
    pub unread_count: u32,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
    pub user_avatar: Option<String>,
}

impl ConversationSummary {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(ConversationSummary {
            id: str_field(row, "id")?,
            sender_id: str_field(row, "sender_id")?,
            receiver_id: str_field(row, "receiver_id")?,
            last_message: str_field(row, "last_message").unwrap_or_default(),
            unread_count: u32_field(row, "unread_count").unwrap_or(0),
            updated_at: time_field(row, "updated_at").unwrap_or_else(epoch),
            user_name: PROFILE_PLACEHOLDER.to_string(),
            user_avatar: None,
        })
    }

    /// The participant that is not `principal_id`.
    pub fn other_participant(&self, principal_id: &str) -> &str {
        if self.sender_id == principal_id {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::row;
    use serde_json::json;

    fn conversation() -> ConversationSummary {
        ConversationSummary::from_row(&row(json!({
            "id": "c1",
            "sender_id": "u1",
            "receiver_id": "u2",
            "last_message": "Olá",
            "unread_count": 3,
            "updated_at": "2026-01-05T12:00:00+00:00",
        })))
        .unwrap()
    }

    #[test]
    fn test_other_participant_is_computed() {
        let c = conversation();
        assert_eq!(c.other_participant("u1"), "u2");
        assert_eq!(c.other_participant("u2"), "u1");
    }

    #[test]
    fn test_unresolved_name_defaults_to_placeholder() {
        let c = conversation();
        assert_eq!(c.user_name, PROFILE_PLACEHOLDER);
        assert!(c.user_avatar.is_none());
    }

    #[test]
    fn test_participants_are_required() {
        assert!(ConversationSummary::from_row(&row(json!({"id": "c1", "sender_id": "u1"}))).is_none());
    }
}
