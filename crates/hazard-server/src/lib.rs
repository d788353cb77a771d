//! Shared library surface for the hazard server and its tests.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod loops;
pub mod persistence;
pub mod providers;
pub mod state;
