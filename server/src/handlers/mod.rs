//! Request handlers for documents, identity and notifications.

mod auth;
mod documents;
mod notify;
pub mod websocket;

pub use auth::*;
pub use documents::*;
pub use notify::*;
