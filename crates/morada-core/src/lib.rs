pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod normalize;
pub mod notice;
pub mod session;
pub mod store;
pub mod tracing_setup;

// Re-export the surface UI collaborators consume
pub use config::CoreConfig;
pub use error::{CoreError, GatewayError};
pub use events::{ChangeEvent, EventKind, EventMask};
pub use gateway::{Filter, Gateway, Order, Row, Subscription};
pub use models::{ConversationSummary, Listing, Message, Principal, Profile, SavedSearch};
pub use notice::Notice;
pub use session::Session;
