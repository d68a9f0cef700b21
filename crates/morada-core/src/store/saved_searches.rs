use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::constants::TABLE_SAVED_SEARCHES;
use crate::error::CoreError;
use crate::gateway::{Filter, Gateway, Order, Row};
use crate::models::{Principal, SavedSearch};
use crate::notice::{Notice, NoticeSender};

#[derive(Default)]
struct SavedSearchState {
    searches: Vec<SavedSearch>,
    loading: bool,
}

/// The principal's saved searches, newest first.
pub struct SavedSearchStore {
    gateway: Arc<dyn Gateway>,
    principal: Option<Principal>,
    notices: NoticeSender,
    state: RwLock<SavedSearchState>,
}

impl SavedSearchStore {
    pub(crate) fn new(
        gateway: Arc<dyn Gateway>,
        principal: Option<Principal>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            gateway,
            principal,
            notices,
            state: RwLock::new(SavedSearchState::default()),
        }
    }

    pub async fn load(&self) {
        let Some(principal) = &self.principal else {
            self.state.write().searches.clear();
            return;
        };

        self.state.write().loading = true;
        let filter = Filter::new().eq("user_id", principal.id.as_str());
        match self
            .gateway
            .select(
                TABLE_SAVED_SEARCHES,
                filter,
                Some(Order::desc("created_at")),
                None,
            )
            .await
        {
            Ok(rows) => {
                let searches: Vec<SavedSearch> =
                    rows.iter().filter_map(SavedSearch::from_row).collect();
                debug!("loaded {} saved searches", searches.len());
                let mut state = self.state.write();
                state.searches = searches;
                state.loading = false;
            }
            Err(err) => {
                warn!("failed to load saved searches: {}", err);
                let mut state = self.state.write();
                state.searches.clear();
                state.loading = false;
            }
        }
    }

    /// Persist a named search. The name is required; criteria are stored
    /// untouched. The created row (with gateway-assigned id and timestamp)
    /// is prepended locally on success.
    pub async fn create(&self, name: &str, criteria: Value) -> bool {
        match self.try_create(name, criteria).await {
            Ok(()) => true,
            Err(err) => {
                if matches!(err, CoreError::Gateway(_)) {
                    warn!("failed to create saved search: {}", err);
                }
                self.notices
                    .push(Notice::from_error(&err, "Não foi possível guardar a pesquisa"));
                false
            }
        }
    }

    async fn try_create(&self, name: &str, criteria: Value) -> Result<(), CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("Dê um nome à pesquisa".to_string()));
        }
        let principal = self.principal.as_ref().ok_or(CoreError::AuthRequired)?;

        let mut row = Row::new();
        row.insert("user_id".to_string(), json!(principal.id));
        row.insert("name".to_string(), json!(name));
        row.insert("criteria".to_string(), criteria);

        let created = self.gateway.insert(TABLE_SAVED_SEARCHES, row).await?;
        if let Some(search) = SavedSearch::from_row(&created) {
            self.state.write().searches.insert(0, search);
        }
        Ok(())
    }

    /// Remove a search, optimistically locally with exact rollback on a
    /// failed remote delete.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            let index = state.searches.iter().position(|s| s.id == id);
            index.map(|index| (index, state.searches.remove(index)))
        };

        let filter = Filter::new().eq("id", id);
        match self.gateway.delete(TABLE_SAVED_SEARCHES, filter).await {
            Ok(()) => true,
            Err(err) => {
                warn!("failed to remove saved search {}: {}", id, err);
                if let Some((index, search)) = removed {
                    let mut state = self.state.write();
                    let at = index.min(state.searches.len());
                    state.searches.insert(at, search);
                }
                self.notices
                    .push(Notice::Transient("Não foi possível remover a pesquisa".to_string()));
                false
            }
        }
    }

    pub fn searches(&self) -> Vec<SavedSearch> {
        self.state.read().searches.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::{row, MemoryGateway};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn store(
        gateway: Arc<MemoryGateway>,
        principal: Option<Principal>,
    ) -> (SavedSearchStore, UnboundedReceiver<Notice>) {
        let (notices, rx) = NoticeSender::channel();
        (SavedSearchStore::new(gateway, principal, notices), rx)
    }

    #[tokio::test]
    async fn test_create_requires_a_name() {
        let gw = Arc::new(MemoryGateway::new());
        let (store, mut rx) = store(gw.clone(), Some(Principal::new("u1")));

        assert!(!store.create("   ", json!({"city": "Lisboa"})).await);

        assert_eq!(gw.writes(), 0);
        assert!(matches!(rx.try_recv(), Ok(Notice::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_prepends_gateway_row() {
        let gw = Arc::new(MemoryGateway::new());
        let (store, _rx) = store(gw.clone(), Some(Principal::new("u1")));

        assert!(store.create("T2 Lisboa", json!({"bedrooms": 2})).await);

        let searches = store.searches();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].name, "T2 Lisboa");
        assert!(!searches[0].id.is_empty(), "id assigned by the gateway");
        assert_eq!(gw.rows(TABLE_SAVED_SEARCHES).len(), 1);
    }

    #[tokio::test]
    async fn test_remove_rolls_back_on_failure() {
        let gw = Arc::new(MemoryGateway::new());
        gw.seed(
            TABLE_SAVED_SEARCHES,
            vec![
                row(json!({"id": "s1", "user_id": "u1", "name": "Porto", "created_at": "2026-01-02T08:00:00+00:00"})),
                row(json!({"id": "s2", "user_id": "u1", "name": "Lisboa", "created_at": "2026-01-01T08:00:00+00:00"})),
            ],
        );
        let (store, mut rx) = store(gw.clone(), Some(Principal::new("u1")));
        store.load().await;

        gw.fail_next(GatewayError::Transport("offline".into()));
        assert!(!store.remove("s1").await);

        let names: Vec<String> = store.searches().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Porto", "Lisboa"], "restored at the same position");
        assert!(matches!(rx.try_recv(), Ok(Notice::Transient(_))));
    }

    #[tokio::test]
    async fn test_unauthenticated_create_is_blocked() {
        let gw = Arc::new(MemoryGateway::new());
        let (store, mut rx) = store(gw.clone(), None);

        assert!(!store.create("Faro", json!({})).await);

        assert_eq!(gw.writes(), 0);
        assert!(matches!(rx.try_recv(), Ok(Notice::AuthRequired)));
    }
}
