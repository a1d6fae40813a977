//! Database layer for sesh
//!
//! SQLite storage for the session history ring:
//! - Schema migrations
//! - Repository methods for appending, querying and pruning entries
//!
//! Projects, worktrees and sessions are never stored here.

pub mod repo;
pub mod schema;

pub use repo::Database;
