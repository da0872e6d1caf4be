//! # Fairway Engine
//!
//! Reconciliation core for an offline-first golf tournament manager.
//!
//! A device keeps six collections (courses, players, tournaments, scores,
//! draws, admitted players) in a local key-value store and mirrors them to a
//! remote document store that other devices update concurrently. This crate
//! holds the logic that decides what survives when the two copies disagree.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine sees storage only through [`KeyValueBackend`]
//! - **Deterministic**: merged output is ordered by key, independent of input order
//! - **Never lossy by accident**: data present only locally is kept and
//!   flagged for push-back
//!
//! ## Core Concepts
//!
//! ### Shapes
//!
//! The remote copy of a collection may be a legacy sequence or a keyed
//! mapping. [`Shape`] tags the raw value and [`Canonical`] is the normalized
//! form every merge works on.
//!
//! ### Reconciliation
//!
//! [`Reconciler::reconcile`] merges a local and a remote snapshot of one
//! collection. Per-collection rules live in [`reconcile`]; score ties are
//! settled by [`TieBreak`].
//!
//! ## Quick Start
//!
//! ```rust
//! use fairway_engine::{CollectionName, LocalStore, MemoryBackend, Reconciler};
//! use serde_json::json;
//!
//! let store = LocalStore::new(MemoryBackend::new());
//! store
//!     .write(CollectionName::Scores, &json!({"R1": {"P1": {"holes": [4, 5, "", ""]}}}))
//!     .unwrap();
//!
//! let remote = json!({"R1": {"P1": {"holes": [4, 5, 3, 4]}}});
//! let result = Reconciler::default().reconcile(
//!     CollectionName::Scores,
//!     store.read(CollectionName::Scores),
//!     Some(remote.clone()),
//! );
//!
//! assert_eq!(result.merged, remote);
//! assert!(!result.needs_push_back());
//! ```

pub mod collection;
pub mod error;
pub mod identity;
pub mod notify;
pub mod reconcile;
pub mod score;
pub mod shape;
pub mod store;

// Re-export main types at crate root
pub use collection::{display_tournament_id, CollectionKind, CollectionName, CURRENT_USER_KEY};
pub use error::{Error, Result};
pub use identity::{merge_player_lookup, Principal, Role};
pub use notify::{
    plan_notifications, tournament_id_of_round, DrawChange, DrawNotice, NotificationPlan,
    TeeAssignment,
};
pub use reconcile::{ReconcileReport, Reconciled, Reconciler, TieBreak};
pub use score::ScoreEntry;
pub use shape::{normalize_records, remote_form, unkeyed_count, Canonical, Shape};
pub use store::{KeyValueBackend, LocalStore, MemoryBackend};

/// Type aliases for clarity
pub type RoundId = String;
pub type PlayerId = String;
