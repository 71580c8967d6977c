//! Bill schedules migration.
//!
//! Gives recurring bills a payment frequency and lets a transaction point at
//! the bill it paid, so payment status can be computed per frequency window.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(BILL_SCHEDULES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_BILL_SCHEDULES_SQL).await?;
        Ok(())
    }
}

const BILL_SCHEDULES_SQL: &str = r"
CREATE TYPE bill_frequency AS ENUM ('daily', 'weekly', 'monthly', 'quarterly');

ALTER TABLE recurring_bills
    ADD COLUMN frequency bill_frequency NOT NULL DEFAULT 'monthly';

-- Payments posted against a bill, independent of monthly instances
ALTER TABLE transactions
    ADD COLUMN recurring_bill_id UUID REFERENCES recurring_bills(id) ON DELETE SET NULL;

CREATE INDEX idx_transactions_bill_date
    ON transactions(recurring_bill_id, occurred_on)
    WHERE recurring_bill_id IS NOT NULL;
";

const DROP_BILL_SCHEDULES_SQL: &str = r"
DROP INDEX IF EXISTS idx_transactions_bill_date;
ALTER TABLE transactions DROP COLUMN IF EXISTS recurring_bill_id;
ALTER TABLE recurring_bills DROP COLUMN IF EXISTS frequency;
DROP TYPE IF EXISTS bill_frequency;
";
