//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every query is scoped to the owning user.

pub mod account;
pub mod bill;
pub mod budget;
pub mod category;
pub mod transaction;
pub mod user;

pub use account::{
    AccountError, AccountRepository, AccountWithBalance, CreateAccountInput, UpdateAccountInput,
};
pub use bill::{
    BillError, BillPayment, BillPaymentStatus, BillRepository, CreateBillInput, MarkPaidInput,
    RecordPaymentInput, UpdateBillInput,
};
pub use budget::BudgetRepository;
pub use category::{CategoryError, CategoryRepository, UpdateCategoryInput};
pub use transaction::{
    CreateTransactionInput, SortDirection, SortField, TransactionError, TransactionQuery,
    TransactionRepository, UpdateTransactionInput,
};
pub use user::UserRepository;
