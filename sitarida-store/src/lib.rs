//! MySQL access for the SITARIDA backend.
//!
//! Provides the connection pool, type-driven row decoding into JSON,
//! parametrized statement builders, reference lookups, and the aggregation
//! queries behind the indicator dashboards.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod bulk;
pub mod error;
pub mod finance;
pub mod indicator;
pub mod lookup;
pub mod pool;
pub mod query;
pub mod row;

pub use bulk::{update_from_year, BulkOutcome, YearScope};
pub use error::StoreError;
pub use pool::PoolConfig;
pub use query::{Criterion, Select};
pub use sqlx::mysql::MySqlPool;
