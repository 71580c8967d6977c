//! Database seeder for Tally development.
//!
//! Seeds a demo user with two accounts, a handful of categories, three
//! months of transactions and allocations, a monthly rent bill and a
//! partly paid weekly bill. Runs once: an existing demo user is left
//! untouched.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_core::budget::{AllocationManager, CreateAllocationInput};
use tally_core::{BudgetMonth, Caller};
use tally_db::entities::sea_orm_active_enums::{AccountType, BillFrequency, UserRole};
use tally_db::repositories::{
    AccountRepository, BillRepository, CategoryRepository, CreateAccountInput, CreateBillInput,
    CreateTransactionInput, MarkPaidInput, RecordPaymentInput, TransactionRepository,
};
use tally_db::{BudgetRepository, UserRepository};
use tally_shared::types::{CategoryId, UserId};
use uuid::Uuid;

const DEMO_USERNAME: &str = "demo";

/// Category name, group, monthly allocation, typical monthly spend.
const CATEGORIES: &[(&str, &str, Decimal, Decimal)] = &[
    ("Rent", "Bills", dec!(1200), dec!(1200)),
    ("Electricity", "Bills", dec!(90), dec!(84.30)),
    ("Groceries", "Everyday", dec!(450), dec!(412.75)),
    ("Eating Out", "Everyday", dec!(120), dec!(156.40)),
    ("Vacation", "Savings", dec!(200), dec!(0)),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = tally_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let users = UserRepository::new(db.clone());
    if users.find_by_username(DEMO_USERNAME).await?.is_some() {
        println!("  Demo user already exists, skipping...");
        return Ok(());
    }

    println!("Seeding demo user...");
    let user = users.create(DEMO_USERNAME, UserRole::User).await?;
    let owner = user.id;

    println!("Seeding accounts...");
    let accounts = AccountRepository::new(db.clone());
    let checking = accounts
        .create_account(
            owner,
            CreateAccountInput {
                name: "Checking".to_string(),
                account_type: AccountType::Bank,
                order_num: 0,
            },
        )
        .await?;
    accounts
        .create_account(
            owner,
            CreateAccountInput {
                name: "Wallet".to_string(),
                account_type: AccountType::Cash,
                order_num: 1,
            },
        )
        .await?;

    println!("Seeding categories...");
    let categories = CategoryRepository::new(db.clone());
    let mut seeded = Vec::with_capacity(CATEGORIES.len());
    for &(name, group, assigned, spent) in CATEGORIES {
        let category = categories
            .create_category(owner, name, Some(group.to_string()))
            .await?;
        seeded.push((category.id, name, assigned, spent));
    }

    println!("Seeding transactions and allocations...");
    let transactions = TransactionRepository::new(db.clone());
    let manager = AllocationManager::new(BudgetRepository::new(db.clone()));
    let caller = Caller::user(UserId::from_uuid(owner));
    let current = BudgetMonth::current();
    let months = [current.previous().previous(), current.previous(), current];

    for month in months {
        let payday = month.start_date();
        post(&transactions, owner, checking.id, None, dec!(3200), payday, "Salary").await?;

        for &(category_id, name, assigned, spent) in &seeded {
            manager
                .create(
                    &caller,
                    CreateAllocationInput {
                        category_id: CategoryId::from_uuid(category_id),
                        year: month.year(),
                        month: month.month_number(),
                        assigned,
                    },
                )
                .await?;

            if spent > Decimal::ZERO {
                let day = day_in(month, 10);
                post(&transactions, owner, checking.id, Some(category_id), -spent, day, name)
                    .await?;
            }
        }
    }

    println!("Seeding recurring bill...");
    let bills = BillRepository::new(db.clone());
    let rent_category = seeded.first().map(|&(id, ..)| id);
    let rent = bills
        .create_bill(
            owner,
            CreateBillInput {
                name: "Rent".to_string(),
                category_id: rent_category,
                amount: dec!(1200),
                day_due: Some(1),
                frequency: BillFrequency::Monthly,
            },
        )
        .await?;
    let instance = bills.open_instance(&caller, rent.id, current, None).await?;
    bills
        .record_payment(
            &caller,
            instance.id,
            RecordPaymentInput {
                amount: dec!(600),
                transaction_id: None,
            },
        )
        .await?;
    bills
        .open_instance(&caller, rent.id, current.next(), None)
        .await?;

    let gym = bills
        .create_bill(
            owner,
            CreateBillInput {
                name: "Gym".to_string(),
                category_id: None,
                amount: dec!(15),
                day_due: None,
                frequency: BillFrequency::Weekly,
            },
        )
        .await?;
    bills
        .mark_paid(
            &caller,
            gym.id,
            MarkPaidInput {
                account_id: checking.id,
                amount: Some(dec!(10)),
                paid_on: chrono::Utc::now().date_naive(),
            },
        )
        .await?;

    println!("Seeding complete! Demo user id: {owner}");
    Ok(())
}

/// A date inside `month`, clamped to its last day.
fn day_in(month: BudgetMonth, day: u32) -> NaiveDate {
    let start = month.start_date();
    start
        .with_day(day)
        .unwrap_or_else(|| month.end_exclusive().pred_opt().unwrap_or(start))
}

async fn post(
    transactions: &TransactionRepository,
    owner: Uuid,
    account_id: Uuid,
    category_id: Option<Uuid>,
    amount: Decimal,
    occurred_on: NaiveDate,
    description: &str,
) -> anyhow::Result<()> {
    transactions
        .create_transaction(
            owner,
            CreateTransactionInput {
                account_id,
                category_id,
                bill_instance_id: None,
                amount,
                occurred_on,
                description: description.to_string(),
                is_cleared: true,
                is_approved: true,
            },
        )
        .await?;
    Ok(())
}
