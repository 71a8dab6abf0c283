//! Monthly charge projection

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::config::DueDayPolicy;
use crate::types::*;

/// Resolve the due date for `due_day` within `month`.
///
/// Days that do not exist in the month (31 in April, 30 in February) are
/// resolved by `policy`. Days outside 1..=31 never exist and are rejected.
pub fn resolve_due_date(
    month: ReferenceMonth,
    due_day: u32,
    policy: DueDayPolicy,
) -> BillingResult<NaiveDate> {
    let invalid = || BillingError::InvalidCalendarDay {
        year: month.year(),
        month: month.month(),
        day: due_day,
    };

    if !(1..=31).contains(&due_day) {
        return Err(invalid());
    }

    let last_day = month.days_in_month();
    let (target, day) = if due_day <= last_day {
        (month, due_day)
    } else {
        match policy {
            DueDayPolicy::ClampToMonthEnd => (month, last_day),
            DueDayPolicy::RollToNextMonth => {
                (month.next().ok_or_else(invalid)?, due_day - last_day)
            }
        }
    };

    NaiveDate::from_ymd_opt(target.year(), target.month(), day).ok_or_else(invalid)
}

/// Synthesize the twelve candidate charges for `year`.
///
/// Every month uses the current `monthly_due_amount`; no amount history is
/// kept.
pub fn project_year(
    unit: &str,
    year: i32,
    monthly_due_amount: &BigDecimal,
    due_day: u32,
    policy: DueDayPolicy,
) -> BillingResult<Vec<ProjectedCharge>> {
    (1..=12)
        .map(|month| -> BillingResult<ProjectedCharge> {
            let reference = ReferenceMonth::new(year, month)?;
            Ok(ProjectedCharge {
                unit: unit.to_string(),
                year,
                month,
                amount: monthly_due_amount.clone(),
                due_date: resolve_due_date(reference, due_day, policy)?,
            })
        })
        .collect()
}
