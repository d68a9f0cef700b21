use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tracing::{debug, warn};

use crate::constants::TABLE_FAVORITES;
use crate::gateway::{Filter, Gateway, Row};
use crate::models::{str_field, Principal};
use crate::notice::{Notice, NoticeSender};

#[derive(Default)]
struct FavoriteState {
    ids: HashSet<String>,
    loading: bool,
}

/// Per-principal favorite set with optimistic toggling.
///
/// The local set mirrors the remote `favorites` table restricted to the
/// principal. A toggle flips the membership bit immediately, then settles the
/// remote write; on failure the flip is reverted exactly. Toggles on the same
/// listing are serialized so a slow settlement can never clobber a newer one;
/// after all in-flight toggles resolve, the local set matches remote truth.
pub struct FavoriteStore {
    gateway: Arc<dyn Gateway>,
    principal: Option<Principal>,
    notices: NoticeSender,
    state: RwLock<FavoriteState>,
    toggles: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FavoriteStore {
    pub(crate) fn new(
        gateway: Arc<dyn Gateway>,
        principal: Option<Principal>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            gateway,
            principal,
            notices,
            state: RwLock::new(FavoriteState::default()),
            toggles: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the full favorite set for the principal. An empty set is the
    /// safe default: gateway errors are logged and degrade to it, and no
    /// principal means no favorites. Safe to call repeatedly.
    pub async fn load(&self) {
        let Some(principal) = &self.principal else {
            self.state.write().ids.clear();
            return;
        };

        self.state.write().loading = true;
        let filter = Filter::new().eq("user_id", principal.id.as_str());
        match self.gateway.select(TABLE_FAVORITES, filter, None, None).await {
            Ok(rows) => {
                let ids: HashSet<String> = rows
                    .iter()
                    .filter_map(|row| str_field(row, "listing_id"))
                    .collect();
                debug!("loaded {} favorites", ids.len());
                let mut state = self.state.write();
                state.ids = ids;
                state.loading = false;
            }
            Err(err) => {
                warn!("failed to load favorites, defaulting to empty: {}", err);
                let mut state = self.state.write();
                state.ids.clear();
                state.loading = false;
            }
        }
    }

    /// Synchronous membership lookup against the local set.
    pub fn is_member(&self, listing_id: &str) -> bool {
        self.state.read().ids.contains(listing_id)
    }

    /// Snapshot of the current favorite ids.
    pub fn members(&self) -> HashSet<String> {
        self.state.read().ids.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// Flip membership of `listing_id`, optimistically locally and then
    /// remotely. Returns whether the remote write settled successfully; on
    /// failure the local flip is reverted and a transient notice is pushed.
    pub async fn toggle(&self, listing_id: &str) -> bool {
        let Some(principal) = &self.principal else {
            self.notices.push(Notice::AuthRequired);
            return false;
        };

        let entity_lock = {
            let mut toggles = self.toggles.lock();
            toggles
                .entry(listing_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let _serialized = entity_lock.lock().await;

        // Optimistic flip, visible to the UI before the write settles. The
        // set is only ever mutated under the lock, so completions interleaved
        // by the event loop cannot lose updates.
        let was_member = {
            let mut state = self.state.write();
            let was = state.ids.contains(listing_id);
            if was {
                state.ids.remove(listing_id);
            } else {
                state.ids.insert(listing_id.to_string());
            }
            was
        };

        let result = if was_member {
            let filter = Filter::new()
                .eq("user_id", principal.id.as_str())
                .eq("listing_id", listing_id);
            self.gateway.delete(TABLE_FAVORITES, filter).await
        } else {
            let mut row = Row::new();
            row.insert("user_id".to_string(), json!(principal.id));
            row.insert("listing_id".to_string(), json!(listing_id));
            self.gateway.insert(TABLE_FAVORITES, row).await.map(|_| ())
        };

        match result {
            Ok(()) => true,
            Err(err) => {
                warn!("favorite toggle for {} failed, rolling back: {}", listing_id, err);
                {
                    let mut state = self.state.write();
                    if was_member {
                        state.ids.insert(listing_id.to_string());
                    } else {
                        state.ids.remove(listing_id);
                    }
                }
                self.notices
                    .push(Notice::Transient("Não foi possível atualizar os favoritos".to_string()));
                false
            }
        }
    }
}
