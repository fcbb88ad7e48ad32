//! Pure algorithms: resolving a split into allocations and turning
//! balances into settling payments. Neither touches a store.

pub mod allocation;
pub mod settlement;
