//! Remote data gateway contract.
//!
//! The data layer talks to one external collaborator: a query/mutation/
//! subscription API over named tables. Everything here is the consumed
//! contract; [`memory::MemoryGateway`] is the in-process implementation used
//! by tests.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::GatewayError;
use crate::events::{ChangeEvent, EventMask};

pub mod memory;

pub use memory::MemoryGateway;

/// A raw table row as delivered by the gateway.
pub type Row = serde_json::Map<String, Value>;

/// Convert a JSON object literal into a [`Row`]. Non-object values yield an
/// empty row.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[derive(Debug, Clone)]
enum Clause {
    Eq(String, Value),
    In(String, Vec<Value>),
    /// column_a = value_a OR column_b = value_b
    Either(String, Value, String, Value),
}

/// Conjunction of column predicates applied to reads, writes and
/// subscriptions. An empty filter matches every row.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(column.to_string(), value.into()));
        self
    }

    pub fn is_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.clauses.push(Clause::In(column.to_string(), values));
        self
    }

    /// Matches rows where either column equals its value. Used for two-party
    /// rows where the principal may appear on either side.
    pub fn either(
        mut self,
        column_a: &str,
        value_a: impl Into<Value>,
        column_b: &str,
        value_b: impl Into<Value>,
    ) -> Self {
        self.clauses.push(Clause::Either(
            column_a.to_string(),
            value_a.into(),
            column_b.to_string(),
            value_b.into(),
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(column, value) => row.get(column) == Some(value),
            Clause::In(column, values) => row
                .get(column)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            Clause::Either(column_a, value_a, column_b, value_b) => {
                row.get(column_a) == Some(value_a) || row.get(column_b) == Some(value_b)
            }
        })
    }
}

/// Result ordering for a select.
#[derive(Debug, Clone)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

/// Live change-notification channel for one watched table.
///
/// Dropping the subscription closes the channel; the gateway prunes the dead
/// sender on its next delivery attempt. This is the only cancellation
/// primitive the data layer has.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl Subscription {
    pub fn from_channel(rx: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    /// Next change notification, or `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Explicit unsubscribe. Equivalent to dropping the subscription.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// The remote table API this layer is built on. All operations are async and
/// may fail with a transport or policy error; callers treat every failure as
/// non-fatal.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn select(
        &self,
        table: &str,
        filter: Filter,
        order: Option<Order>,
        limit: Option<usize>,
    ) -> Result<Vec<Row>, GatewayError>;

    /// Insert one row. The gateway assigns missing `id`/`created_at` columns
    /// and returns the stored row.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, GatewayError>;

    async fn update(&self, table: &str, patch: Row, filter: Filter) -> Result<(), GatewayError>;

    async fn delete(&self, table: &str, filter: Filter) -> Result<(), GatewayError>;

    /// Open a change-notification channel scoped to one table, restricted to
    /// `mask` kinds and (optionally) rows matching `filter`.
    async fn subscribe(
        &self,
        table: &str,
        mask: EventMask,
        filter: Option<Filter>,
    ) -> Result<Subscription, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_eq_and_in() {
        let r = row(json!({"user_id": "u1", "listing_id": "l1"}));

        assert!(Filter::new().eq("user_id", "u1").matches(&r));
        assert!(!Filter::new().eq("user_id", "u2").matches(&r));
        assert!(Filter::new()
            .eq("user_id", "u1")
            .eq("listing_id", "l1")
            .matches(&r));
        assert!(!Filter::new()
            .eq("user_id", "u1")
            .eq("listing_id", "l2")
            .matches(&r));

        let members = Filter::new().is_in("user_id", vec![json!("u1"), json!("u3")]);
        assert!(members.matches(&r));
        assert!(!Filter::new()
            .is_in("user_id", vec![json!("u2")])
            .matches(&r));
    }

    #[test]
    fn test_filter_either_matches_both_sides() {
        let sent = row(json!({"sender_id": "me", "receiver_id": "other"}));
        let received = row(json!({"sender_id": "other", "receiver_id": "me"}));
        let unrelated = row(json!({"sender_id": "a", "receiver_id": "b"}));

        let mine = Filter::new().either("sender_id", "me", "receiver_id", "me");
        assert!(mine.matches(&sent));
        assert!(mine.matches(&received));
        assert!(!mine.matches(&unrelated));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&row(json!({"anything": 1}))));
        assert!(Filter::new().matches(&Row::new()));
    }
}
