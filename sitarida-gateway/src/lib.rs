//! HTTP API for the SITARIDA regional statistics backend.
//!
//! Serves infrastructure, health, demography, indicator and budget figures
//! for the district dashboards out of a shared MySQL database. Handlers
//! authenticate with static API keys or a session token, validate and
//! coerce loosely typed JSON bodies, and answer with JSON whose wide numbers
//! survive clients that parse every number as a double.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod auth;
pub mod body;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
