//! Billing-period arithmetic for monthly subscriptions
//!
//! Everything in here is pure and synchronous: month parsing/formatting, clamping a
//! subscription's active period to a reporting window, inclusive month counting and
//! the cost aggregation built on top of them.

pub mod aggregator;
pub mod month;
pub mod period;

pub use aggregator::{Billable, SubscriptionFilter, contribution, total};
pub use month::{YearMonth, format_month, parse_month};
pub use period::{ActivePeriod, BilledSpan, BillingWindow, clamp_period, count_months};

use thiserror::Error;

/// Billing error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("Invalid date format, expected MM-YYYY: {0}")]
    InvalidDateFormat(String),
    #[error("Period end {end} is before period start {start}")]
    InvertedWindow { start: YearMonth, end: YearMonth },
}

pub type BillingResult<T> = Result<T, BillingError>;
