//! Domain helpers for the SITARIDA regional statistics backend.
//!
//! Everything here is pure: request value coercion, typed write sets,
//! enum columns, JSON rendering of wide numeric types, and the indicator
//! pivots used by the dashboard endpoints. Database and HTTP concerns live in
//! `sitarida-store` and `sitarida-gateway`.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod coerce;
pub mod error;
pub mod indicator;
pub mod json_safe;
pub mod model;
pub mod patch;
pub mod value;

pub use error::CoreError;
pub use json_safe::NumericMode;
pub use model::{Aksi, Kondisi, Level, LockStatus};
pub use patch::Patch;
pub use value::SqlValue;
