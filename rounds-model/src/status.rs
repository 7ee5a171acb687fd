//! Lifecycle status derivation.
//!
//! A pure function over temporal facts; the clock is always supplied by the
//! caller so results are reproducible in tests and consistent within one
//! request.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Days before the due date during which an instance reads as due-soon
/// rather than pending, unless a caller overrides it.
pub const DEFAULT_BUFFER_DAYS: i64 = 3;

/// Where an inspection instance sits in its lifecycle.
///
/// Variant order is the sort priority used everywhere instances are listed:
/// the states demanding administrator attention come first, then due date
/// ascending within a state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum InspectionStatus {
    /// Due date has passed without completion.
    Overdue,
    /// Due within the buffer window.
    DueSoon,
    /// Due beyond the buffer window.
    Pending,
    /// A completion timestamp exists. Wins over lateness: a late-completed
    /// inspection is completed, not overdue.
    Completed,
}

/// Derive the lifecycle status of an instance from its temporal facts.
///
/// `buffer_days` is the due-soon window; pass [`DEFAULT_BUFFER_DAYS`] unless
/// the presentation context calls for something else.
pub fn derive_status(
    due_date: NaiveDate,
    completed_at: Option<DateTime<Utc>>,
    buffer_days: i64,
    now: DateTime<Utc>,
) -> InspectionStatus {
    if completed_at.is_some() {
        return InspectionStatus::Completed;
    }

    let days_until_due = (due_date - now.date_naive()).num_days();
    if days_until_due < 0 {
        InspectionStatus::Overdue
    } else if days_until_due <= buffer_days {
        InspectionStatus::DueSoon
    } else {
        InspectionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap()
    }

    fn day(offset: i64) -> NaiveDate {
        now().date_naive() + Duration::days(offset)
    }

    #[test]
    fn past_due_without_completion_is_overdue() {
        for offset in [-1, -7, -365] {
            assert_eq!(
                derive_status(day(offset), None, DEFAULT_BUFFER_DAYS, now()),
                InspectionStatus::Overdue
            );
        }
    }

    #[test]
    fn within_buffer_is_due_soon() {
        for offset in 0..=DEFAULT_BUFFER_DAYS {
            assert_eq!(
                derive_status(day(offset), None, DEFAULT_BUFFER_DAYS, now()),
                InspectionStatus::DueSoon
            );
        }
    }

    #[test]
    fn beyond_buffer_is_pending() {
        assert_eq!(
            derive_status(day(4), None, 3, now()),
            InspectionStatus::Pending
        );
        assert_eq!(
            derive_status(day(3), None, 3, now()),
            InspectionStatus::DueSoon
        );
        assert_eq!(
            derive_status(day(-1), None, 3, now()),
            InspectionStatus::Overdue
        );
    }

    #[test]
    fn completion_always_wins() {
        let completed = Some(now());
        assert_eq!(
            derive_status(day(-400), completed, DEFAULT_BUFFER_DAYS, now()),
            InspectionStatus::Completed
        );
        assert_eq!(
            derive_status(day(400), completed, DEFAULT_BUFFER_DAYS, now()),
            InspectionStatus::Completed
        );
    }

    #[test]
    fn caller_supplied_buffer_is_honored() {
        assert_eq!(
            derive_status(day(6), None, 7, now()),
            InspectionStatus::DueSoon
        );
        assert_eq!(
            derive_status(day(6), None, 3, now()),
            InspectionStatus::Pending
        );
    }

    #[test]
    fn status_priority_orders_admin_relevant_first() {
        let mut statuses = vec![
            InspectionStatus::Completed,
            InspectionStatus::Pending,
            InspectionStatus::Overdue,
            InspectionStatus::DueSoon,
        ];
        statuses.sort();
        assert_eq!(
            statuses,
            vec![
                InspectionStatus::Overdue,
                InspectionStatus::DueSoon,
                InspectionStatus::Pending,
                InspectionStatus::Completed,
            ]
        );
    }
}
