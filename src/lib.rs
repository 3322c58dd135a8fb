// SkillMate client core: keeps the viewer's connection list in sync across
// the initial fetch, push events and local actions.
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod push;
pub mod requests;
pub mod search;
pub mod store;
pub mod sync;
pub mod toast;
pub mod utils;

// Re-export main types for convenience
pub use api::{HttpApi, SocialApi};
pub use error::SyncError;
pub use models::*;
pub use push::{LocalPushChannel, PushBridge, PushChannel, Subscription, WsPushChannel};
pub use requests::{RequestOutcome, RequestService};
pub use search::{DebouncedSearch, QueryState};
pub use store::ConnectionStore;
pub use sync::ConnectionList;
pub use toast::Toaster;
