pub mod chat;
pub mod conversations;
pub mod favorites;
pub mod listings;
pub mod saved_searches;

pub use chat::ChatStore;
pub use conversations::ConversationStore;
pub use favorites::FavoriteStore;
pub use listings::ListingStore;
pub use saved_searches::SavedSearchStore;
