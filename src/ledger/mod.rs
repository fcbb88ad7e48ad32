//! Append-only transaction log and the stores that persist it.

pub mod book;
pub mod file;
pub mod memory;
pub mod store;
