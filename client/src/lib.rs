//! # Fairway Client
//!
//! Device-side half of fairway: keeps the six tournament collections in
//! local files, reconciles them with the Remote Store on load, pushes them
//! on save, and tracks the signed-in identity.
//!
//! ```no_run
//! use fairway_client::{ClientConfig, DeviceContext};
//!
//! # async fn run() -> Result<(), fairway_client::SyncError> {
//! let config = ClientConfig::from_env()?;
//! let context = DeviceContext::init(&config)?;
//!
//! context.auto_load_if_empty().await;
//! for outcome in context.load_all().await {
//!     println!("{}: {:?}", outcome.collection, outcome.fetch);
//! }
//!
//! context.teardown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod file_backend;
pub mod identity;
pub mod remote;
pub mod subscribe;

pub use config::{ClientConfig, ConfigError};
pub use context::{DeviceContext, LoadOutcome, RemoteFetch, RemoteStatus, SyncContext};
pub use error::{IdentityError, RemoteError, SyncError};
pub use file_backend::FileBackend;
pub use identity::{clear_local_session, IdentityClient, SESSION_TOKEN_KEY};
pub use remote::{HttpRemote, IdentityStore, RemoteStore, Session};
pub use subscribe::{subscribe_collection, subscribe_draw_notices, Subscription};
