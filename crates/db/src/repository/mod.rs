//! Repository functions: one function per database operation.
//!
//! Every function takes a `&DbPool` (or a connection inside a transaction
//! when it is one step of a larger write) and returns a `Result<T, DbError>`.
//! Plain SQL with no business rules.
//!
//! Queries are built with the runtime-checked `sqlx::query_as` API so the
//! crate compiles without a live database.

pub mod accounts;
pub mod locations;
pub mod messages;
pub mod products;
pub mod profiles;
pub mod repair_requests;
pub mod repair_timeslots;
pub mod sessions;
pub mod timeslots;
