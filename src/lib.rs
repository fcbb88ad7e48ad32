//! # splitter
//!
//! Shared-expense ledger: record who fronted money for a group and who
//! consumed what, undo mistakes, and settle up with few payments.
//!
//! All amounts are two-decimal fixed-point values, so every split and every
//! settlement conserves money to the cent.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: money, members, transactions, balances
//! - **engine**: Split allocation and settlement algorithms
//! - **ledger**: Append-only log with undo, over a pluggable store
//! - **cli**: Command surface of the `splitter` binary
//! - **simulation**: Random groups for benchmarks and tests

pub mod cli;
pub mod core;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod settings;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::balance::Balances;
    pub use crate::core::currency::CurrencyCode;
    pub use crate::core::member::{GroupName, MemberName};
    pub use crate::core::money::Money;
    pub use crate::core::transaction::{Transaction, TransactionId, TransactionKind};
    pub use crate::engine::allocation::{allocate, ShareSpec, SplitRequest};
    pub use crate::engine::settlement::{Payment, SettlementEngine, SettlementPlan};
    pub use crate::error::Error;
    pub use crate::ledger::book::Ledger;
    pub use crate::ledger::file::JsonFileStore;
    pub use crate::ledger::memory::MemoryStore;
    pub use crate::ledger::store::Store;
}
