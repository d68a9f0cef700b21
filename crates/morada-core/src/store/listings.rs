use std::sync::Arc;

use tracing::warn;

use crate::config::CoreConfig;
use crate::constants::TABLE_LISTINGS;
use crate::gateway::{Filter, Gateway, Order};
use crate::models::Listing;

/// Read-side listing fetch. Listings have no live subscription; the UI
/// refreshes by calling `fetch` again.
pub struct ListingStore {
    gateway: Arc<dyn Gateway>,
    config: CoreConfig,
}

impl ListingStore {
    pub(crate) fn new(gateway: Arc<dyn Gateway>, config: CoreConfig) -> Self {
        Self { gateway, config }
    }

    /// Fetch listings matching `filter`, newest first, normalized into the
    /// canonical entity shape. Errors degrade to an empty page.
    pub async fn fetch(&self, filter: Filter, limit: Option<usize>) -> Vec<Listing> {
        let limit = limit.unwrap_or(self.config.listing_fetch_limit);
        match self
            .gateway
            .select(
                TABLE_LISTINGS,
                filter,
                Some(Order::desc("created_at")),
                Some(limit),
            )
            .await
        {
            Ok(rows) => rows.iter().filter_map(Listing::from_row).collect(),
            Err(err) => {
                warn!("failed to fetch listings: {}", err);
                Vec::new()
            }
        }
    }
}
