//! Random groups and expenses for benchmarks and tests.

pub mod scenario;
