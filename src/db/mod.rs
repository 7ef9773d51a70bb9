//! Database module for PostgreSQL connection and read-only execution
//!
//! Generated statements are only ever run through `QueryExecutor`, which
//! rejects anything that is not a SELECT before the database is touched.

pub mod connection;
pub mod executor;
pub mod scalar;

pub use connection::{init_pool, DbPool};
pub use executor::{ensure_read_only, PgExecutor, QueryExecutor};
pub use scalar::ScalarValue;
