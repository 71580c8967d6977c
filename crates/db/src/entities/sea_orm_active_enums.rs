//! `PostgreSQL` enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of money account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Physical cash.
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Bank account.
    #[sea_orm(string_value = "bank")]
    Bank,
    /// Credit card or credit line.
    #[sea_orm(string_value = "credit")]
    Credit,
}

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular user.
    #[sea_orm(string_value = "user")]
    User,
    /// Administrator.
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// How often a recurring bill falls due.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "bill_frequency")]
#[serde(rename_all = "lowercase")]
pub enum BillFrequency {
    /// Every day.
    #[sea_orm(string_value = "daily")]
    Daily,
    /// Every ISO week, Monday to Sunday.
    #[sea_orm(string_value = "weekly")]
    Weekly,
    /// Every calendar month.
    #[default]
    #[sea_orm(string_value = "monthly")]
    Monthly,
    /// Every calendar quarter.
    #[sea_orm(string_value = "quarterly")]
    Quarterly,
}

impl BillFrequency {
    /// The half-open window `[start, end)` of this frequency containing `day`.
    #[must_use]
    pub fn window(self, day: chrono::NaiveDate) -> (chrono::NaiveDate, chrono::NaiveDate) {
        use chrono::{Datelike, Days, Months};

        match self {
            Self::Daily => (day, day + Days::new(1)),
            Self::Weekly => {
                let start = day - Days::new(u64::from(day.weekday().num_days_from_monday()));
                (start, start + Days::new(7))
            }
            Self::Monthly | Self::Quarterly => {
                let span = if self == Self::Monthly { 1 } else { 3 };
                let first_month = (day.month0() / span) * span + 1;
                let start = day
                    .with_day(1)
                    .and_then(|d| d.with_month(first_month))
                    .unwrap_or(day);
                (start, start + Months::new(span))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(BillFrequency::Daily, d(2026, 3, 31), d(2026, 3, 31), d(2026, 4, 1))]
    #[case(BillFrequency::Weekly, d(2026, 3, 18), d(2026, 3, 16), d(2026, 3, 23))]
    #[case(BillFrequency::Weekly, d(2026, 3, 22), d(2026, 3, 16), d(2026, 3, 23))]
    #[case(BillFrequency::Weekly, d(2026, 3, 16), d(2026, 3, 16), d(2026, 3, 23))]
    #[case(BillFrequency::Monthly, d(2026, 2, 14), d(2026, 2, 1), d(2026, 3, 1))]
    #[case(BillFrequency::Monthly, d(2026, 12, 31), d(2026, 12, 1), d(2027, 1, 1))]
    #[case(BillFrequency::Quarterly, d(2026, 5, 31), d(2026, 4, 1), d(2026, 7, 1))]
    #[case(BillFrequency::Quarterly, d(2026, 11, 2), d(2026, 10, 1), d(2027, 1, 1))]
    fn test_frequency_windows(
        #[case] frequency: BillFrequency,
        #[case] day: NaiveDate,
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
    ) {
        assert_eq!(frequency.window(day), (start, end));
    }
}
