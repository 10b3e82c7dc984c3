use super::{ActivePeriod, BilledSpan, BillingWindow, clamp_period};
use serde::Deserialize;
use uuid::Uuid;

/// Anything that is billed a fixed price per active month
pub trait Billable {
    /// Price per month in minor currency units
    fn monthly_price(&self) -> u64;

    fn active_period(&self) -> ActivePeriod;
}

/// Optional exact-match filters, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriptionFilter {
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
}

impl SubscriptionFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            service_name: None,
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.service_name.is_none()
    }

    /// Check an owner and service name against the filter
    pub fn matches(&self, user_id: Uuid, service_name: &str) -> bool {
        self.user_id.is_none_or(|id| id == user_id)
            && self
                .service_name
                .as_deref()
                .is_none_or(|name| name == service_name)
    }
}

/// Billed span and cost of one subscription inside a window
pub fn contribution<T: Billable + ?Sized>(
    subscription: &T,
    window: &BillingWindow,
) -> Option<(BilledSpan, u64)> {
    let span = clamp_period(window, &subscription.active_period())?;
    let cost = subscription.monthly_price() * u64::from(span.months());
    Some((span, cost))
}

/// Total cost of the accepted subscriptions over the window
///
/// Empty input, a filter that rejects everything, and subscriptions outside the
/// window all contribute zero.
pub fn total<'a, T, I, F>(subscriptions: I, window: &BillingWindow, filter: F) -> u64
where
    T: Billable + 'a,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> bool,
{
    subscriptions
        .into_iter()
        .filter(|s| filter(s))
        .filter_map(|s| contribution(s, window))
        .map(|(_, cost)| cost)
        .sum()
}
