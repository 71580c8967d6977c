//! `SeaORM` Entity for bill_instances table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bill_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub recurring_bill_id: Uuid,
    pub year: i32,
    pub month: i32,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount_expected: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount_paid: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recurring_bills::Entity",
        from = "Column::RecurringBillId",
        to = "super::recurring_bills::Column::Id"
    )]
    RecurringBills,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::recurring_bills::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringBills.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
