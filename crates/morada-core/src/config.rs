#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Maximum rows returned by a listing fetch
    pub listing_fetch_limit: usize,
    /// Maximum conversations loaded per reload
    pub conversation_fetch_limit: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            listing_fetch_limit: 100,
            conversation_fetch_limit: 200,
        }
    }
}
