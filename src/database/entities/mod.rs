pub mod subscriptions;

pub use subscriptions::Entity as Subscriptions;

// Type aliases
pub type SubscriptionRecord = subscriptions::Model;
