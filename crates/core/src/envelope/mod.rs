//! Envelope budgeting aggregation.
//!
//! Each category behaves like a sub-account: what is assigned to it in a
//! month, minus what is spent from it, rolls into the next month.

pub mod aggregator;
pub mod ledger;
pub mod types;

#[cfg(test)]
mod tests;

pub use aggregator::EnvelopeAggregator;
pub use ledger::CategoryLedger;
pub use types::{BudgetDetail, CategoryMonthlySnapshot};
