use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::config::CoreConfig;
use crate::constants::{TABLE_CONVERSATIONS, TABLE_PROFILES};
use crate::events::EventMask;
use crate::gateway::{Filter, Gateway, Order};
use crate::models::{ConversationSummary, Principal, Profile};

#[derive(Default)]
struct ConversationState {
    conversations: Vec<ConversationSummary>,
    loading: bool,
}

struct ConversationsInner {
    gateway: Arc<dyn Gateway>,
    principal: Option<Principal>,
    config: CoreConfig,
    state: RwLock<ConversationState>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ConversationsInner {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
    }
}

/// Ordered projection of the principal's conversations, kept consistent with
/// the gateway by full reload on every change notification.
///
/// No diffing: the conversation list is small and the authoritative refetch
/// keeps the unread counters and last-message fields trivially correct.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<ConversationsInner>,
}

impl ConversationStore {
    pub(crate) fn new(
        gateway: Arc<dyn Gateway>,
        principal: Option<Principal>,
        config: CoreConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ConversationsInner {
                gateway,
                principal,
                config,
                state: RwLock::new(ConversationState::default()),
                watcher: Mutex::new(None),
            }),
        }
    }

    /// Authoritative refetch: conversations where the principal is either
    /// party, newest activity first, enriched with the other participant's
    /// profile via one batched lookup. Profile failures degrade to
    /// placeholder names; a failed primary read keeps the previous list.
    #[instrument(skip(self))]
    pub async fn reload(&self) {
        let Some(principal) = &self.inner.principal else {
            self.inner.state.write().conversations.clear();
            return;
        };

        self.inner.state.write().loading = true;
        let filter = Filter::new().either(
            "sender_id",
            principal.id.as_str(),
            "receiver_id",
            principal.id.as_str(),
        );
        let result = self
            .inner
            .gateway
            .select(
                TABLE_CONVERSATIONS,
                filter,
                Some(Order::desc("updated_at")),
                Some(self.inner.config.conversation_fetch_limit),
            )
            .await;

        match result {
            Ok(rows) => {
                let mut conversations: Vec<ConversationSummary> =
                    rows.iter().filter_map(ConversationSummary::from_row).collect();

                let profiles = self.fetch_other_profiles(&conversations, &principal.id).await;
                for conversation in &mut conversations {
                    let other = conversation.other_participant(&principal.id).to_string();
                    if let Some(profile) = profiles.get(&other) {
                        if let Some(name) = &profile.name {
                            conversation.user_name = name.clone();
                        }
                        conversation.user_avatar = profile.avatar_url.clone();
                    }
                }

                debug!("reloaded {} conversations", conversations.len());
                let mut state = self.inner.state.write();
                state.conversations = conversations;
                state.loading = false;
            }
            Err(err) => {
                warn!("failed to reload conversations: {}", err);
                self.inner.state.write().loading = false;
            }
        }
    }

    /// One batched profile select for all distinct other-party ids. Failure
    /// here never fails the reload.
    async fn fetch_other_profiles(
        &self,
        conversations: &[ConversationSummary],
        principal_id: &str,
    ) -> HashMap<String, Profile> {
        let other_ids: HashSet<String> = conversations
            .iter()
            .map(|c| c.other_participant(principal_id).to_string())
            .collect();
        if other_ids.is_empty() {
            return HashMap::new();
        }

        let values: Vec<Value> = other_ids.into_iter().map(Value::String).collect();
        match self
            .inner
            .gateway
            .select(TABLE_PROFILES, Filter::new().is_in("id", values), None, None)
            .await
        {
            Ok(rows) => rows
                .iter()
                .filter_map(Profile::from_row)
                .map(|p| (p.id.clone(), p))
                .collect(),
            Err(err) => {
                warn!("profile lookup failed, degrading to placeholders: {}", err);
                HashMap::new()
            }
        }
    }

    /// Subscribe to the conversation table and reload on any change event.
    /// A second call while a watcher is live is a no-op.
    pub async fn watch(&self) {
        if self.inner.watcher.lock().is_some() {
            return;
        }

        let mut subscription = match self
            .inner
            .gateway
            .subscribe(TABLE_CONVERSATIONS, EventMask::ALL, None)
            .await
        {
            Ok(sub) => sub,
            Err(err) => {
                warn!("conversation subscription failed: {}", err);
                return;
            }
        };

        // The task holds only a weak handle: dropping the store tears the
        // watcher down instead of keeping it alive through its own clone.
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while subscription.next().await.is_some() {
                let Some(inner) = weak.upgrade() else { break };
                ConversationStore { inner }.reload().await;
            }
        });

        let mut watcher = self.inner.watcher.lock();
        if watcher.is_some() {
            // Lost a race with a concurrent watch call; keep the first.
            handle.abort();
        } else {
            *watcher = Some(handle);
        }
    }

    /// Tear down the subscription. Events already in flight no longer update
    /// state. Also runs when the last store handle is dropped.
    pub fn close(&self) {
        if let Some(handle) = self.inner.watcher.lock().take() {
            handle.abort();
        }
    }

    /// Snapshot of the current ordered conversation list.
    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.inner.state.read().conversations.clone()
    }

    /// Total unread messages across all conversations, scoped to the viewer.
    pub fn unread_total(&self) -> u32 {
        self.inner
            .state
            .read()
            .conversations
            .iter()
            .map(|c| c.unread_count)
            .sum()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.read().loading
    }
}
