//! Shared application state.

pub mod batches;
pub mod store;

pub use batches::{BatchItem, BatchProgress, RouteSubmission};
pub use store::AppState;
