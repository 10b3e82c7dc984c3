use crate::billing::{ActivePeriod, Billable, YearMonth};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    /// Always the first day of a month
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub created_at: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn start_month(&self) -> YearMonth {
        YearMonth::from_date(self.start_date)
    }

    /// `None` for a subscription that has not ended
    pub fn end_month(&self) -> Option<YearMonth> {
        self.end_date.map(YearMonth::from_date)
    }
}

impl Billable for Model {
    fn monthly_price(&self) -> u64 {
        u64::try_from(self.price).unwrap_or(0)
    }

    fn active_period(&self) -> ActivePeriod {
        ActivePeriod::new(self.start_month(), self.end_month())
    }
}
