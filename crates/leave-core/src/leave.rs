//! Leave-balance policy
//!
//! Pure rules shared by every store implementation: day counting,
//! application checks, and status transitions. Stores call these inside
//! their own transaction or lock so the check and the write stay together.

use chrono::NaiveDate;

use crate::{Account, LeaveError, LeaveStatus, NewLeaveRequest, Result};

/// Number of calendar days in `[start, end]`, both ends included.
///
/// Zero or negative when `end` is before `start`.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Whether two inclusive date ranges share at least one day
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Validate a leave application and build the row to insert.
///
/// `overlapping` is the store's answer to `has_overlapping_leave` for the
/// same range. Checks run in a fixed order so the first failing rule
/// decides the message.
pub fn validate_application(
    employee: &Account,
    start: NaiveDate,
    end: NaiveDate,
    overlapping: bool,
) -> Result<NewLeaveRequest> {
    if start < employee.joining_date {
        return Err(LeaveError::validation(
            "Cannot apply for leave before joining date",
        ));
    }
    if overlapping {
        return Err(LeaveError::validation("Overlapping leave request exists"));
    }

    let num_days = inclusive_days(start, end);
    if num_days <= 0 {
        return Err(LeaveError::validation("Invalid date range"));
    }
    if i64::from(employee.leave_balance) < num_days {
        return Err(LeaveError::validation(
            "Requested days exceed leave balance",
        ));
    }

    let num_days = i32::try_from(num_days)
        .map_err(|_| LeaveError::validation("Requested days exceed leave balance"))?;

    Ok(NewLeaveRequest {
        employee_id: employee.id,
        start_date: start,
        end_date: end,
        num_days,
    })
}

/// Compute the balance left after approving `num_days`
pub fn approve(status: LeaveStatus, balance: i32, num_days: i32) -> Result<i32> {
    match status {
        LeaveStatus::Applied => {}
        LeaveStatus::Approved | LeaveStatus::Rejected => {
            return Err(LeaveError::validation(
                "Only 'applied' leaves can be approved",
            ));
        }
    }
    if balance < num_days {
        return Err(LeaveError::validation(
            "Requested days exceed leave balance",
        ));
    }
    Ok(balance - num_days)
}

/// Check that a leave in `status` may be rejected
pub fn reject(status: LeaveStatus) -> Result<()> {
    match status {
        LeaveStatus::Applied => Ok(()),
        LeaveStatus::Rejected => Err(LeaveError::validation("Leave is already rejected")),
        LeaveStatus::Approved => Err(LeaveError::validation(
            "Cannot reject an already approved leave",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Utc;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(joining: NaiveDate, balance: i32) -> Account {
        Account {
            id: 7,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            department: "Engineering".to_string(),
            joining_date: joining,
            leave_balance: balance,
            password_hash: String::new(),
            role: Role::Employee,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_inclusive_days() {
        assert_eq!(inclusive_days(date(2025, 2, 1), date(2025, 2, 5)), 5);
        assert_eq!(inclusive_days(date(2025, 2, 1), date(2025, 2, 1)), 1);
        assert_eq!(inclusive_days(date(2025, 2, 10), date(2025, 2, 5)), -4);
    }

    #[test]
    fn test_valid_application() {
        let emp = employee(date(2025, 1, 1), 20);
        let leave =
            validate_application(&emp, date(2025, 2, 1), date(2025, 2, 5), false).unwrap();
        assert_eq!(leave.employee_id, 7);
        assert_eq!(leave.num_days, 5);
    }

    #[test]
    fn test_application_before_joining_date() {
        let emp = employee(date(2025, 3, 1), 20);
        let err = validate_application(&emp, date(2025, 2, 25), date(2025, 2, 28), false)
            .unwrap_err();
        assert!(err.to_string().contains("before joining date"));
    }

    #[test]
    fn test_application_with_reversed_range() {
        let emp = employee(date(2025, 1, 1), 20);
        let err = validate_application(&emp, date(2025, 2, 10), date(2025, 2, 5), false)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid date range");
    }

    #[test]
    fn test_application_overlapping() {
        let emp = employee(date(2025, 1, 1), 20);
        let err =
            validate_application(&emp, date(2025, 2, 3), date(2025, 2, 6), true).unwrap_err();
        assert!(err.to_string().contains("Overlapping"));
    }

    #[test]
    fn test_application_exceeding_balance() {
        let emp = employee(date(2025, 1, 1), 20);
        let err = validate_application(&emp, date(2025, 3, 1), date(2025, 3, 30), false)
            .unwrap_err();
        assert!(err.to_string().contains("exceed leave balance"));
    }

    #[test]
    fn test_approve_transitions() {
        assert_eq!(approve(LeaveStatus::Applied, 20, 5).unwrap(), 15);
        assert!(approve(LeaveStatus::Approved, 20, 5)
            .unwrap_err()
            .to_string()
            .contains("Only 'applied' leaves"));
        assert!(approve(LeaveStatus::Rejected, 20, 5).is_err());
        assert!(approve(LeaveStatus::Applied, 3, 5).is_err());
    }

    #[test]
    fn test_reject_transitions() {
        assert!(reject(LeaveStatus::Applied).is_ok());
        assert!(reject(LeaveStatus::Rejected)
            .unwrap_err()
            .to_string()
            .contains("already rejected"));
        assert!(reject(LeaveStatus::Approved)
            .unwrap_err()
            .to_string()
            .contains("already approved"));
    }

    proptest! {
        #[test]
        fn prop_inclusive_days_matches_span(offset in 0i64..3650, span in 0i64..365) {
            let start = date(2020, 1, 1) + chrono::Duration::days(offset);
            let end = start + chrono::Duration::days(span);
            prop_assert_eq!(inclusive_days(start, end), span + 1);
        }

        #[test]
        fn prop_overlap_is_symmetric(a in 0i64..60, la in 0i64..10, b in 0i64..60, lb in 0i64..10) {
            let base = date(2025, 1, 1);
            let (a_start, a_end) = (base + chrono::Duration::days(a), base + chrono::Duration::days(a + la));
            let (b_start, b_end) = (base + chrono::Duration::days(b), base + chrono::Duration::days(b + lb));
            prop_assert_eq!(
                ranges_overlap(a_start, a_end, b_start, b_end),
                ranges_overlap(b_start, b_end, a_start, a_end)
            );
        }
    }
}
