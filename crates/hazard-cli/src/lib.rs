//! Hazard CLI - command line tools for route hazard analysis.
//!
//! Binaries:
//! - inspect_route: run the offline detectors on a route file
//! - submit_route: send a route file to a running hazard server

pub mod client;
pub mod report;
pub mod route_file;

pub use client::HazardClient;
pub use report::{inspect_offline, summarize};
pub use route_file::{load_route_file, RouteFile};
