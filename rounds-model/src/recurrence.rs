//! Recurrence cadence for master templates.

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::{DepartmentId, InspectorId};

/// How often a template generates a new inspection instance.
///
/// Month arithmetic is calendar-aware and clamps to the end of shorter
/// months (Jan 31 + 1 month = Feb 29 in a leap year). New schemes
/// ("first Monday of the month") are added as variants here; every consumer
/// goes through [`Cadence::next_after`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "unit", content = "count")]
pub enum Cadence {
    Days(u32),
    Weeks(u32),
    Months(u32),
}

impl Cadence {
    /// The due date of the occurrence following one due on `date`.
    pub fn next_after(&self, date: NaiveDate) -> NaiveDate {
        match *self {
            Cadence::Days(n) => date + Duration::days(i64::from(n)),
            Cadence::Weeks(n) => date + Duration::weeks(i64::from(n)),
            Cadence::Months(n) => date
                .checked_add_months(Months::new(n))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    /// A cadence must advance time; a zero interval would make the
    /// scheduler spin on the same period forever.
    pub fn validate(&self) -> Result<()> {
        let count = match *self {
            Cadence::Days(n) | Cadence::Weeks(n) | Cadence::Months(n) => n,
        };
        if count == 0 {
            return Err(ModelError::Invalid(
                "recurrence cadence interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// One department a recurring template targets, with the inspector the
/// sweep assigns by default. `None` means the sweep creates the instance
/// unassigned and flags it for an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateAssignment {
    pub department_id: DepartmentId,
    pub default_inspector_id: Option<InspectorId>,
}

/// The full recurrence policy of a template: a cadence plus the departments
/// it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePolicy {
    pub cadence: Cadence,
    pub assignments: Vec<TemplateAssignment>,
}

impl RecurrencePolicy {
    pub fn validate(&self) -> Result<()> {
        self.cadence.validate()?;
        if self.assignments.is_empty() {
            return Err(ModelError::Invalid(
                "recurrence policy must target at least one department".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_and_week_cadences_are_fixed_intervals() {
        assert_eq!(
            Cadence::Days(10).next_after(date(2024, 1, 8)),
            date(2024, 1, 18)
        );
        assert_eq!(
            Cadence::Weeks(1).next_after(date(2024, 1, 8)),
            date(2024, 1, 15)
        );
    }

    #[test]
    fn month_cadence_clamps_to_month_end() {
        assert_eq!(
            Cadence::Months(1).next_after(date(2024, 1, 31)),
            date(2024, 2, 29)
        );
        assert_eq!(
            Cadence::Months(1).next_after(date(2023, 1, 31)),
            date(2023, 2, 28)
        );
        assert_eq!(
            Cadence::Months(3).next_after(date(2024, 3, 15)),
            date(2024, 6, 15)
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Cadence::Days(0).validate().is_err());
        assert!(Cadence::Weeks(1).validate().is_ok());
    }

    #[test]
    fn policy_needs_a_target_department() {
        let policy = RecurrencePolicy {
            cadence: Cadence::Weeks(1),
            assignments: vec![],
        };
        assert!(policy.validate().is_err());
    }
}
