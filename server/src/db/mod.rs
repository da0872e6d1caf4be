//! Database module for PostgreSQL persistence.

mod documents;
mod history;
mod pool;
mod users;

pub use documents::*;
pub use history::*;
pub use pool::*;
pub use users::*;
