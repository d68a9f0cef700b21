use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::constants::TABLE_MESSAGES;
use crate::error::CoreError;
use crate::events::EventMask;
use crate::gateway::{Filter, Gateway, Order, Row};
use crate::models::{Message, Principal};
use crate::notice::{Notice, NoticeSender};

#[derive(Default)]
struct ChatState {
    messages: Vec<Message>,
    loading: bool,
}

struct ChatInner {
    gateway: Arc<dyn Gateway>,
    principal: Option<Principal>,
    notices: NoticeSender,
    conversation_id: String,
    state: RwLock<ChatState>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ChatInner {
    /// Append a message from a change-notification payload. The channel is
    /// assumed ordered; a late event with an earlier timestamp is still
    /// placed so the sequence stays non-decreasing by creation time.
    fn push_message(&self, message: Message) {
        let mut state = self.state.write();
        let at = state
            .messages
            .iter()
            .rposition(|m| m.created_at <= message.created_at)
            .map(|i| i + 1)
            .unwrap_or(0);
        if at == state.messages.len() {
            state.messages.push(message);
        } else {
            state.messages.insert(at, message);
        }
    }
}

impl Drop for ChatInner {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
    }
}

/// Message sequence of one conversation.
///
/// The baseline comes from `load_history`; afterwards inserts scoped to this
/// conversation are appended straight from the event payload, with no
/// refetch. Sending never appends locally either: the sent copy arrives
/// through the same subscription.
#[derive(Clone)]
pub struct ChatStore {
    inner: Arc<ChatInner>,
}

impl ChatStore {
    pub(crate) fn new(
        gateway: Arc<dyn Gateway>,
        principal: Option<Principal>,
        notices: NoticeSender,
        conversation_id: &str,
    ) -> Self {
        Self {
            inner: Arc::new(ChatInner {
                gateway,
                principal,
                notices,
                conversation_id: conversation_id.to_string(),
                state: RwLock::new(ChatState::default()),
                watcher: Mutex::new(None),
            }),
        }
    }

    /// Authoritative baseline: all messages of the conversation, oldest
    /// first. Errors degrade to an empty history.
    #[instrument(skip(self), fields(conversation = %self.inner.conversation_id))]
    pub async fn load_history(&self) {
        self.inner.state.write().loading = true;
        let filter = Filter::new().eq("conversation_id", self.inner.conversation_id.as_str());
        match self
            .inner
            .gateway
            .select(TABLE_MESSAGES, filter, Some(Order::asc("created_at")), None)
            .await
        {
            Ok(rows) => {
                let messages: Vec<Message> = rows.iter().filter_map(Message::from_row).collect();
                debug!("loaded {} messages", messages.len());
                let mut state = self.inner.state.write();
                state.messages = messages;
                state.loading = false;
            }
            Err(err) => {
                warn!("failed to load message history: {}", err);
                let mut state = self.inner.state.write();
                state.messages.clear();
                state.loading = false;
            }
        }
    }

    /// Subscribe to inserts for this conversation and append each new
    /// message from the event payload. No-op while a watcher is live.
    pub async fn watch(&self) {
        if self.inner.watcher.lock().is_some() {
            return;
        }

        let filter = Filter::new().eq("conversation_id", self.inner.conversation_id.as_str());
        let mut subscription = match self
            .inner
            .gateway
            .subscribe(TABLE_MESSAGES, EventMask::INSERT, Some(filter))
            .await
        {
            Ok(sub) => sub,
            Err(err) => {
                warn!("message subscription failed: {}", err);
                return;
            }
        };

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Some(inner) = weak.upgrade() else { break };
                if let Some(message) = event.row.as_ref().and_then(|row| Message::from_row(row)) {
                    inner.push_message(message);
                }
            }
        });

        let mut watcher = self.inner.watcher.lock();
        if watcher.is_some() {
            handle.abort();
        } else {
            *watcher = Some(handle);
        }
    }

    /// Tear down the subscription; also runs when the last handle drops.
    pub fn close(&self) {
        if let Some(handle) = self.inner.watcher.lock().take() {
            handle.abort();
        }
    }

    /// Insert a new message as the principal. Returns whether the write
    /// settled; rejected input and missing authentication never reach the
    /// gateway. The local copy arrives via the subscription, not here.
    pub async fn send(&self, content: &str) -> bool {
        match self.try_send(content).await {
            Ok(()) => true,
            Err(err) => {
                if matches!(err, CoreError::Gateway(_)) {
                    warn!("failed to send message: {}", err);
                }
                self.inner
                    .notices
                    .push(Notice::from_error(&err, "Não foi possível enviar a mensagem"));
                false
            }
        }
    }

    async fn try_send(&self, content: &str) -> Result<(), CoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::Validation("Escreva uma mensagem".to_string()));
        }
        let principal = self
            .inner
            .principal
            .as_ref()
            .ok_or(CoreError::AuthRequired)?;

        let mut row = Row::new();
        row.insert(
            "conversation_id".to_string(),
            json!(self.inner.conversation_id),
        );
        row.insert("sender_id".to_string(), json!(principal.id));
        row.insert("content".to_string(), json!(content));
        row.insert("is_read".to_string(), json!(false));

        self.inner.gateway.insert(TABLE_MESSAGES, row).await?;
        Ok(())
    }

    /// Snapshot of the message sequence, ascending by creation time.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.read().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.read().loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::{row, MemoryGateway};
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn seeded_gateway() -> Arc<MemoryGateway> {
        let gw = Arc::new(MemoryGateway::new());
        gw.seed(
            TABLE_MESSAGES,
            vec![
                row(json!({
                    "id": "m2",
                    "conversation_id": "c1",
                    "sender_id": "u2",
                    "content": "Sim, está",
                    "created_at": "2026-02-01T10:05:00+00:00",
                })),
                row(json!({
                    "id": "m1",
                    "conversation_id": "c1",
                    "sender_id": "u1",
                    "content": "Olá",
                    "created_at": "2026-02-01T10:00:00+00:00",
                })),
                row(json!({
                    "id": "x1",
                    "conversation_id": "c2",
                    "sender_id": "u3",
                    "content": "outra conversa",
                    "created_at": "2026-02-01T10:01:00+00:00",
                })),
            ],
        );
        gw
    }

    fn store(
        gateway: Arc<MemoryGateway>,
        principal: Option<Principal>,
    ) -> (ChatStore, UnboundedReceiver<Notice>) {
        let (notices, rx) = NoticeSender::channel();
        (ChatStore::new(gateway, principal, notices, "c1"), rx)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn ids(store: &ChatStore) -> Vec<String> {
        store.messages().into_iter().map(|m| m.id).collect()
    }

    #[tokio::test]
    async fn test_history_is_ascending_and_scoped() {
        let (store, _rx) = store(seeded_gateway(), Some(Principal::new("u1")));
        store.load_history().await;
        assert_eq!(ids(&store), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_insert_notification_appends_in_order() {
        let gw = seeded_gateway();
        let (store, _rx) = store(gw.clone(), Some(Principal::new("u1")));
        store.load_history().await;
        store.watch().await;

        gw.insert(
            TABLE_MESSAGES,
            row(json!({
                "id": "m3",
                "conversation_id": "c1",
                "sender_id": "u2",
                "content": "Quer visitar?",
                "created_at": "2026-02-01T10:10:00+00:00",
            })),
        )
        .await
        .unwrap();
        settle().await;

        assert_eq!(ids(&store), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_other_conversations_are_ignored() {
        let gw = seeded_gateway();
        let (store, _rx) = store(gw.clone(), Some(Principal::new("u1")));
        store.load_history().await;
        store.watch().await;

        gw.insert(
            TABLE_MESSAGES,
            row(json!({
                "id": "x2",
                "conversation_id": "c2",
                "sender_id": "u3",
                "content": "não é para aqui",
                "created_at": "2026-02-01T11:00:00+00:00",
            })),
        )
        .await
        .unwrap();
        settle().await;

        assert_eq!(ids(&store), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_send_appends_only_via_subscription() {
        let gw = seeded_gateway();
        let (store, _rx) = store(gw.clone(), Some(Principal::new("u1")));
        store.load_history().await;
        store.watch().await;

        assert!(store.send("Podemos falar?").await);
        settle().await;

        let messages = store.messages();
        assert_eq!(messages.len(), 3, "exactly one copy, from the event payload");
        assert_eq!(messages[2].content, "Podemos falar?");
        assert_eq!(messages[2].sender_id, "u1");
        assert!(!messages[2].is_read);
    }

    #[tokio::test]
    async fn test_whitespace_send_is_rejected_without_insert() {
        let gw = Arc::new(MemoryGateway::new());
        let (store, mut rx) = store(gw.clone(), Some(Principal::new("u1")));

        assert!(!store.send("   ").await);

        assert_eq!(gw.writes(), 0);
        assert!(matches!(rx.try_recv(), Ok(Notice::Validation(_))));
    }

    #[tokio::test]
    async fn test_unauthenticated_send_is_rejected() {
        let gw = Arc::new(MemoryGateway::new());
        let (store, mut rx) = store(gw.clone(), None);

        assert!(!store.send("olá").await);

        assert_eq!(gw.writes(), 0);
        assert!(matches!(rx.try_recv(), Ok(Notice::AuthRequired)));
    }

    #[tokio::test]
    async fn test_failed_send_reports_and_keeps_state() {
        let gw = seeded_gateway();
        let (store, mut rx) = store(gw.clone(), Some(Principal::new("u1")));
        store.load_history().await;

        gw.fail_next(GatewayError::Transport("offline".into()));
        assert!(!store.send("olá").await);

        assert_eq!(store.messages().len(), 2);
        assert!(matches!(rx.try_recv(), Ok(Notice::Transient(_))));
    }

    #[tokio::test]
    async fn test_close_stops_appends() {
        let gw = seeded_gateway();
        let (store, _rx) = store(gw.clone(), Some(Principal::new("u1")));
        store.load_history().await;
        store.watch().await;
        store.close();

        gw.insert(
            TABLE_MESSAGES,
            row(json!({
                "id": "m9",
                "conversation_id": "c1",
                "sender_id": "u2",
                "content": "tarde demais",
                "created_at": "2026-02-02T10:00:00+00:00",
            })),
        )
        .await
        .unwrap();
        settle().await;

        assert_eq!(ids(&store), vec!["m1", "m2"]);
    }
}
