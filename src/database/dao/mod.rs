pub mod subscriptions;

pub use subscriptions::{NewSubscription, SubscriptionChanges, SubscriptionQuery, SubscriptionsDao};
