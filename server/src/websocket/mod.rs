//! WebSocket support for realtime change delivery.
//!
//! Clients subscribe to collection paths and receive the full new value
//! whenever it is written. Connections opened with a player registration
//! number also receive that player's draw notifications.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
