use super::{BillingError, BillingResult, YearMonth};
use serde::Serialize;

/// Reporting window for an aggregate query, `start <= end` by construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillingWindow {
    start: YearMonth,
    end: YearMonth,
}

impl BillingWindow {
    pub fn new(start: YearMonth, end: YearMonth) -> BillingResult<Self> {
        if end < start {
            return Err(BillingError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn end(&self) -> YearMonth {
        self.end
    }
}

/// Months a subscription is active; `end == None` means it is still running
///
/// No ordering is enforced between `start` and `end`. An inverted period simply
/// never overlaps any window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePeriod {
    pub start: YearMonth,
    pub end: Option<YearMonth>,
}

impl ActivePeriod {
    pub fn new(start: YearMonth, end: Option<YearMonth>) -> Self {
        Self { start, end }
    }

    pub fn open_ended(start: YearMonth) -> Self {
        Self { start, end: None }
    }
}

/// Closed range of billed months, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BilledSpan {
    start: YearMonth,
    end: YearMonth,
}

impl BilledSpan {
    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn end(&self) -> YearMonth {
        self.end
    }

    /// Number of billed months, both endpoints included
    pub fn months(&self) -> u32 {
        count_months(self.start, self.end)
    }
}

/// Intersect an active period with a reporting window
///
/// Returns `None` when they do not overlap. Never fails.
pub fn clamp_period(window: &BillingWindow, period: &ActivePeriod) -> Option<BilledSpan> {
    let effective_end = match period.end {
        Some(end) => window.end.min(end),
        None => window.end,
    };
    let overlap_start = window.start.max(period.start);
    // Kept even though effective_end already honours the window end.
    let overlap_end = window.end.min(effective_end);

    if overlap_start > overlap_end {
        return None;
    }

    Some(BilledSpan {
        start: overlap_start,
        end: overlap_end,
    })
}

/// Inclusive month count between two months
///
/// Jan..Mar is 3, a single month is 1. Returns 0 if `end` precedes `start`, which
/// `clamp_period` never produces.
pub fn count_months(start: YearMonth, end: YearMonth) -> u32 {
    let months = end.ordinal() - start.ordinal() + 1;
    u32::try_from(months).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn window(start: YearMonth, end: YearMonth) -> BillingWindow {
        BillingWindow::new(start, end).unwrap()
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        let err = BillingWindow::new(ym(2024, 5), ym(2024, 4)).unwrap_err();
        assert_eq!(
            err,
            BillingError::InvertedWindow {
                start: ym(2024, 5),
                end: ym(2024, 4)
            }
        );
        assert!(BillingWindow::new(ym(2024, 4), ym(2024, 4)).is_ok());
    }

    #[test]
    fn test_count_months_is_inclusive() {
        assert_eq!(count_months(ym(2024, 1), ym(2024, 1)), 1);
        assert_eq!(count_months(ym(2024, 1), ym(2024, 3)), 3);
        assert_eq!(count_months(ym(2024, 1), ym(2024, 12)), 12);
        assert_eq!(count_months(ym(2024, 3), ym(2025, 2)), 12);
        assert_eq!(count_months(ym(2023, 12), ym(2024, 1)), 2);
    }

    #[test]
    fn test_count_months_inverted_is_zero() {
        assert_eq!(count_months(ym(2024, 3), ym(2024, 1)), 0);
    }

    #[test]
    fn test_clamp_subscription_inside_window() {
        let w = window(ym(2024, 1), ym(2024, 12));
        let span = clamp_period(&w, &ActivePeriod::new(ym(2024, 3), Some(ym(2024, 5)))).unwrap();
        assert_eq!(span.start(), ym(2024, 3));
        assert_eq!(span.end(), ym(2024, 5));
        assert_eq!(span.months(), 3);
    }

    #[test]
    fn test_clamp_subscription_containing_window_equals_window() {
        let w = window(ym(2024, 2), ym(2024, 6));
        let span = clamp_period(&w, &ActivePeriod::new(ym(2023, 1), Some(ym(2025, 1)))).unwrap();
        assert_eq!(span.start(), w.start());
        assert_eq!(span.end(), w.end());
    }

    #[test]
    fn test_clamp_no_overlap_before_and_after() {
        let w = window(ym(2024, 4), ym(2024, 6));

        let before = ActivePeriod::new(ym(2023, 1), Some(ym(2024, 3)));
        assert_eq!(clamp_period(&w, &before), None);

        let after = ActivePeriod::new(ym(2024, 7), Some(ym(2024, 9)));
        assert_eq!(clamp_period(&w, &after), None);

        let open_after = ActivePeriod::open_ended(ym(2024, 7));
        assert_eq!(clamp_period(&w, &open_after), None);
    }

    #[test]
    fn test_clamp_touching_boundaries_overlap_one_month() {
        let w = window(ym(2024, 4), ym(2024, 6));

        let ends_on_start = ActivePeriod::new(ym(2024, 1), Some(ym(2024, 4)));
        assert_eq!(clamp_period(&w, &ends_on_start).unwrap().months(), 1);

        let starts_on_end = ActivePeriod::open_ended(ym(2024, 6));
        assert_eq!(clamp_period(&w, &starts_on_end).unwrap().months(), 1);
    }

    #[test]
    fn test_clamp_open_ended_subscription() {
        let w = window(ym(2024, 1), ym(2024, 4));

        let started_earlier = ActivePeriod::open_ended(ym(2020, 6));
        let span = clamp_period(&w, &started_earlier).unwrap();
        assert_eq!((span.start(), span.end()), (w.start(), w.end()));

        let started_inside = ActivePeriod::open_ended(ym(2024, 3));
        let span = clamp_period(&w, &started_inside).unwrap();
        assert_eq!((span.start(), span.end()), (ym(2024, 3), ym(2024, 4)));
    }

    #[test]
    fn test_clamp_inverted_subscription_never_overlaps() {
        let w = window(ym(2024, 1), ym(2024, 12));
        let inverted = ActivePeriod::new(ym(2024, 6), Some(ym(2024, 2)));
        assert_eq!(clamp_period(&w, &inverted), None);
    }
}
