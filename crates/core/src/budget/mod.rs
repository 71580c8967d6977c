//! Budget allocation management.

pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use crate::error::BudgetError;
pub use service::AllocationManager;
pub use types::{Allocation, CreateAllocationInput, NewAllocation, UpdateAllocationInput};
