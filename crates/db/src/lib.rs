//! `db` crate: the persistence layer.
//!
//! Provides a connection pool, typed row structs, repository functions for
//! every table in the RepairBuddies schema, and the [`Store`] trait the
//! service layer talks to.  Two stores implement it: [`PgStore`] on top of
//! the repository functions, and [`MemoryStore`] for tests and demo runs.
//! No business logic lives here.

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repository;
pub mod store;

pub use error::DbError;
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use pool::DbPool;
pub use store::Store;
