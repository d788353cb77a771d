//! Persistence layer for the hazard server.
//!
//! SQLite-backed storage for analyzed routes and their hazard records.

pub mod db;
pub mod hazards;
pub mod routes;

pub use db::{init_database, Database};
