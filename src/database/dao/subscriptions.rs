use crate::billing::{SubscriptionFilter, YearMonth};
use crate::database::entities::{SubscriptionRecord, subscriptions};
use crate::database::{DatabaseError, DatabaseResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set,
};
use uuid::Uuid;

/// Subscription list query parameters
#[derive(Debug, Default)]
pub struct SubscriptionQuery {
    pub filter: SubscriptionFilter,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Fields of a subscription about to be created
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start: YearMonth,
    pub end: Option<YearMonth>,
}

/// Partial update; `end: Some(None)` clears the end month
#[derive(Debug, Clone, Default)]
pub struct SubscriptionChanges {
    pub service_name: Option<String>,
    pub price: Option<i32>,
    pub start: Option<YearMonth>,
    pub end: Option<Option<YearMonth>>,
}

impl SubscriptionChanges {
    pub fn is_empty(&self) -> bool {
        self.service_name.is_none()
            && self.price.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }
}

/// Subscriptions DAO for database operations
#[derive(Clone)]
pub struct SubscriptionsDao {
    db: DatabaseConnection,
}

impl SubscriptionsDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Store a new subscription with a generated id
    pub async fn create(&self, subscription: &NewSubscription) -> DatabaseResult<SubscriptionRecord> {
        let active_model = subscriptions::ActiveModel {
            id: Set(Uuid::new_v4()),
            service_name: Set(subscription.service_name.clone()),
            price: Set(subscription.price),
            user_id: Set(subscription.user_id),
            start_date: Set(subscription.start.first_day()),
            end_date: Set(subscription.end.map(|m| m.first_day())),
            created_at: Set(Utc::now().date_naive()),
        };

        let record = active_model
            .insert(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(record)
    }

    /// Find subscription by ID
    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<SubscriptionRecord>> {
        let record = subscriptions::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(record)
    }

    /// Get a page of subscriptions matching the query filter
    pub async fn list(&self, query: &SubscriptionQuery) -> DatabaseResult<Vec<SubscriptionRecord>> {
        let mut select = apply_filter(subscriptions::Entity::find(), &query.filter)
            .order_by_asc(subscriptions::Column::StartDate)
            .order_by_asc(subscriptions::Column::ServiceName)
            .order_by_asc(subscriptions::Column::Id);

        if let Some(limit) = query.limit {
            select = select.limit(Some(limit));
        }
        if let Some(offset) = query.offset {
            select = select.offset(Some(offset));
        }

        let records = select
            .all(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Get every subscription matching the filter, for aggregation
    pub async fn find_matching(
        &self,
        filter: &SubscriptionFilter,
    ) -> DatabaseResult<Vec<SubscriptionRecord>> {
        let records = apply_filter(subscriptions::Entity::find(), filter)
            .all(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Apply a partial update, failing with `NotFound` for an unknown id
    pub async fn update(
        &self,
        id: Uuid,
        changes: &SubscriptionChanges,
    ) -> DatabaseResult<SubscriptionRecord> {
        let existing = self.find_by_id(id).await?.ok_or(DatabaseError::NotFound)?;
        if changes.is_empty() {
            return Ok(existing);
        }

        let mut active_model = subscriptions::ActiveModel::from(existing);
        if let Some(ref service_name) = changes.service_name {
            active_model.service_name = Set(service_name.clone());
        }
        if let Some(price) = changes.price {
            active_model.price = Set(price);
        }
        if let Some(start) = changes.start {
            active_model.start_date = Set(start.first_day());
        }
        if let Some(end) = changes.end {
            active_model.end_date = Set(end.map(|m| m.first_day()));
        }

        let record = active_model
            .update(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(record)
    }

    /// Delete subscription, returning the number of removed rows
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<u64> {
        let result = subscriptions::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

fn apply_filter(
    mut select: Select<subscriptions::Entity>,
    filter: &SubscriptionFilter,
) -> Select<subscriptions::Entity> {
    if let Some(user_id) = filter.user_id {
        select = select.filter(subscriptions::Column::UserId.eq(user_id));
    }
    if let Some(ref service_name) = filter.service_name {
        select = select.filter(subscriptions::Column::ServiceName.eq(service_name.as_str()));
    }
    select
}
