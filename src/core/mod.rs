//! Foundational types shared by the engines and the ledger.

pub mod balance;
pub mod currency;
pub mod member;
pub mod money;
pub mod transaction;
