//! In-memory gateway used by tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::events::{ChangeEvent, EventKind, EventMask};

use super::{Filter, Gateway, Order, Row, Subscription};

struct Subscriber {
    table: String,
    mask: EventMask,
    filter: Option<Filter>,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Row>>,
    subscribers: Vec<Subscriber>,
    fail_next: Option<GatewayError>,
    hold_next_write: Option<Arc<Notify>>,
    writes: usize,
}

/// Gateway backed by plain in-process tables with change fan-out.
///
/// Mirrors the remote contract closely enough for the stores to be exercised
/// without a network: inserts get server-assigned `id`/`created_at` columns,
/// and every settled write is pushed to matching subscribers. Failure and
/// hold hooks let tests script the next operation's outcome.
#[derive(Default)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a table without emitting change notifications.
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut inner = self.inner.lock();
        inner.tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Make the next operation (read or write) fail with `err`.
    pub fn fail_next(&self, err: GatewayError) {
        self.inner.lock().fail_next = Some(err);
    }

    /// Park the next write until the returned handle is notified.
    pub fn hold_next_write(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.lock().hold_next_write = Some(gate.clone());
        gate
    }

    /// Number of write operations issued so far, settled or not.
    pub fn writes(&self) -> usize {
        self.inner.lock().writes
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.inner
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn take_failure(&self) -> Option<GatewayError> {
        self.inner.lock().fail_next.take()
    }

    async fn write_gate(&self) {
        let gate = self.inner.lock().hold_next_write.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn note_write(&self) {
        self.inner.lock().writes += 1;
    }

    fn publish(inner: &mut Inner, event: ChangeEvent) {
        inner.subscribers.retain(|s| !s.tx.is_closed());
        for sub in &inner.subscribers {
            if sub.table != event.table || !sub.mask.contains(event.kind) {
                continue;
            }
            if let Some(filter) = &sub.filter {
                let matches = event
                    .row
                    .as_ref()
                    .map(|row| filter.matches(row))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
            }
            let _ = sub.tx.send(event.clone());
        }
    }
}

fn cmp_column(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select(
        &self,
        table: &str,
        filter: Filter,
        order: Option<Order>,
        limit: Option<usize>,
    ) -> Result<Vec<Row>, GatewayError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let inner = self.inner.lock();
        let mut rows: Vec<Row> = inner
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default();
        drop(inner);

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let ord = cmp_column(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, GatewayError> {
        self.note_write();
        self.write_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let mut row = row;
        if !row.contains_key("id") {
            row.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
        }
        if !row.contains_key("created_at") {
            row.insert("created_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let mut inner = self.inner.lock();
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Self::publish(
            &mut inner,
            ChangeEvent {
                kind: EventKind::Insert,
                table: table.to_string(),
                row: Some(row.clone()),
            },
        );
        Ok(row)
    }

    async fn update(&self, table: &str, patch: Row, filter: Filter) -> Result<(), GatewayError> {
        self.note_write();
        self.write_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let mut inner = self.inner.lock();
        let mut touched = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                touched.push(row.clone());
            }
        }
        for row in touched {
            Self::publish(
                &mut inner,
                ChangeEvent {
                    kind: EventKind::Update,
                    table: table.to_string(),
                    row: Some(row),
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filter: Filter) -> Result<(), GatewayError> {
        self.note_write();
        self.write_gate().await;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let mut inner = self.inner.lock();
        let mut removed = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            rows.retain(|row| {
                if filter.matches(row) {
                    removed.push(row.clone());
                    false
                } else {
                    true
                }
            });
        }
        for row in removed {
            Self::publish(
                &mut inner,
                ChangeEvent {
                    kind: EventKind::Delete,
                    table: table.to_string(),
                    row: Some(row),
                },
            );
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        table: &str,
        mask: EventMask,
        filter: Option<Filter>,
    ) -> Result<Subscription, GatewayError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(Subscriber {
            table: table.to_string(),
            mask,
            filter,
            tx,
        });
        Ok(Subscription::from_channel(rx))
    }
}
