//! Core budgeting logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached only through the traits in [`store`].
//!
//! # Modules
//!
//! - `period` - Calendar month arithmetic
//! - `auth` - Authenticated caller identity and ownership rules
//! - `store` - Ledger and allocation store contracts
//! - `envelope` - Per-category assigned/spent/carried-over/available aggregation
//! - `reconcile` - Balance reconciliation (free to distribute)
//! - `budget` - Budget allocation management
//! - `statistics` - Balance and per-month income/expense statistics

pub mod auth;
pub mod budget;
pub mod envelope;
pub mod error;
pub mod period;
pub mod reconcile;
pub mod statistics;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{Caller, Role};
pub use error::BudgetError;
pub use period::BudgetMonth;
