//! `SeaORM` Entity for transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub bill_instance_id: Option<Uuid>,
    pub recurring_bill_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount: Decimal,
    pub occurred_on: Date,
    pub description: String,
    pub is_cleared: bool,
    pub is_approved: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
    #[sea_orm(
        belongs_to = "super::bill_instances::Entity",
        from = "Column::BillInstanceId",
        to = "super::bill_instances::Column::Id"
    )]
    BillInstances,
    #[sea_orm(
        belongs_to = "super::recurring_bills::Entity",
        from = "Column::RecurringBillId",
        to = "super::recurring_bills::Column::Id"
    )]
    RecurringBills,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::bill_instances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillInstances.def()
    }
}

impl Related<super::recurring_bills::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringBills.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
