//! Background loops.

pub mod cache_prune_loop;
