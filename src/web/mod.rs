//! HTTP surface of the authentication core.

pub mod api;
pub mod gate;
pub mod models;

pub use api::{AppState, AppStateInner, create_router};
pub use gate::{AuthRejection, AuthSession, CurrentUser, require_auth};
