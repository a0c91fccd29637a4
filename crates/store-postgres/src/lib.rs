//! Role-scoped Postgres access.
//!
//! Reads, writes, and provisioning go through distinct database roles with
//! distinct privileges. Every operation opens its own connection and closes it
//! on drop; there is no pool and no transaction shared across calls, so write
//! serialization is left to the database server and to the fact that the
//! scheduler never runs two probes at once.

mod admin;
mod insert;
mod open;
mod query;
mod schema;

pub use open::Store;

use httpmon_core::Error;

/// Generated primary key of a jobs row.
pub type JobId = i32;

pub(crate) fn db_err(e: sqlx::Error) -> Error {
    Error::Db(Box::new(e))
}
