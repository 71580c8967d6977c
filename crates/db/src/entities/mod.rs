//! `SeaORM` entity definitions.

pub mod prelude;

pub mod accounts;
pub mod bill_instances;
pub mod budget_allocations;
pub mod categories;
pub mod recurring_bills;
pub mod sea_orm_active_enums;
pub mod transactions;
pub mod users;
