//! Application-wide constants
//!
//! Centralized location for table names and default values that are
//! used across multiple modules.

// Gateway table names
pub const TABLE_LISTINGS: &str = "listings";
pub const TABLE_FAVORITES: &str = "favorites";
pub const TABLE_CONVERSATIONS: &str = "conversations";
pub const TABLE_MESSAGES: &str = "messages";
pub const TABLE_PROFILES: &str = "profiles";
pub const TABLE_SAVED_SEARCHES: &str = "saved_searches";

/// Display name used when a conversation partner's profile cannot be resolved
pub const PROFILE_PLACEHOLDER: &str = "Utilizador";

/// Candidate fields probed, in order, when resolving a display URL from a
/// joined image record. Listing rows come from different join shapes and do
/// not agree on the field name.
pub const IMAGE_FIELD_CANDIDATES: [&str; 4] = ["image_url", "url", "photo_url", "src"];

/// Separator for location labels ("Alvalade, Lisboa, Lisboa")
pub const LOCATION_SEPARATOR: &str = ", ";
