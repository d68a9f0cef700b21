use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::CoreConfig;
use crate::gateway::Gateway;
use crate::models::Principal;
use crate::notice::{Notice, NoticeSender};
use crate::store::{ChatStore, ConversationStore, FavoriteStore, ListingStore, SavedSearchStore};

/// Per-principal context over the gateway.
///
/// Created on login (or anonymously, with no principal) and dropped on
/// logout; every store constructed from it carries the same principal and
/// reports user-facing conditions to the same notice channel. Stores hold
/// their own synchronized copies; no mutable state is shared between two
/// stores or two sessions.
pub struct Session {
    gateway: Arc<dyn Gateway>,
    principal: Option<Principal>,
    config: CoreConfig,
    notices: NoticeSender,
    notice_rx: Mutex<Option<UnboundedReceiver<Notice>>>,
}

impl Session {
    pub fn new(gateway: Arc<dyn Gateway>, principal: Option<Principal>) -> Self {
        Self::with_config(gateway, principal, CoreConfig::default())
    }

    pub fn with_config(
        gateway: Arc<dyn Gateway>,
        principal: Option<Principal>,
        config: CoreConfig,
    ) -> Self {
        let (notices, notice_rx) = NoticeSender::channel();
        Self {
            gateway,
            principal,
            config,
            notices,
            notice_rx: Mutex::new(Some(notice_rx)),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Take the notice receiver. The consuming context drains it; can only
    /// be taken once.
    pub fn take_notices(&self) -> Option<UnboundedReceiver<Notice>> {
        self.notice_rx.lock().take()
    }

    pub fn favorites(&self) -> FavoriteStore {
        FavoriteStore::new(
            self.gateway.clone(),
            self.principal.clone(),
            self.notices.clone(),
        )
    }

    pub fn conversations(&self) -> ConversationStore {
        ConversationStore::new(
            self.gateway.clone(),
            self.principal.clone(),
            self.config.clone(),
        )
    }

    pub fn chat(&self, conversation_id: &str) -> ChatStore {
        ChatStore::new(
            self.gateway.clone(),
            self.principal.clone(),
            self.notices.clone(),
            conversation_id,
        )
    }

    pub fn saved_searches(&self) -> SavedSearchStore {
        SavedSearchStore::new(
            self.gateway.clone(),
            self.principal.clone(),
            self.notices.clone(),
        )
    }

    pub fn listings(&self) -> ListingStore {
        ListingStore::new(self.gateway.clone(), self.config.clone())
    }
}
