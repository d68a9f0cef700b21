mod conversation;
mod listing;
mod message;
mod profile;
mod saved_search;

pub use conversation::ConversationSummary;
pub use listing::Listing;
pub use message::Message;
pub use profile::{Principal, Profile};
pub use saved_search::SavedSearch;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::gateway::Row;

pub(crate) fn str_field(row: &Row, key: &str) -> Option<String> {
    row.get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

pub(crate) fn u32_field(row: &Row, key: &str) -> Option<u32> {
    row.get(key).and_then(Value::as_u64).map(|n| n as u32)
}

pub(crate) fn f64_field(row: &Row, key: &str) -> Option<f64> {
    row.get(key).and_then(Value::as_f64)
}

pub(crate) fn bool_field(row: &Row, key: &str) -> Option<bool> {
    row.get(key).and_then(Value::as_bool)
}

/// RFC 3339 timestamp column. Unparseable values are treated as absent;
/// callers fall back to the Unix epoch rather than dropping the row.
pub(crate) fn time_field(row: &Row, key: &str) -> Option<DateTime<Utc>> {
    row.get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

pub(crate) fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::row;
    use serde_json::json;

    #[test]
    fn test_time_field_parses_rfc3339() {
        let r = row(json!({"created_at": "2026-03-01T10:30:00+00:00"}));
        let t = time_field(&r, "created_at").unwrap();
        assert_eq!(t.to_rfc3339(), "2026-03-01T10:30:00+00:00");
    }

    #[test]
    fn test_time_field_rejects_garbage() {
        let r = row(json!({"created_at": "yesterday"}));
        assert!(time_field(&r, "created_at").is_none());
    }
}
