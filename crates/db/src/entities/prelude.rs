//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::bill_instances::Entity as BillInstances;
pub use super::budget_allocations::Entity as BudgetAllocations;
pub use super::categories::Entity as Categories;
pub use super::recurring_bills::Entity as RecurringBills;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
