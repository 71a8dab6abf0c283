//! Status classification for unpaid charges

use chrono::NaiveDate;

use crate::types::*;

/// Overdue iff the due date is strictly before `today`; otherwise pending.
pub fn status_for(due_date: NaiveDate, today: NaiveDate) -> ChargeStatus {
    if due_date < today {
        ChargeStatus::Overdue
    } else {
        ChargeStatus::Pending
    }
}

/// Classify every unmatched projection against a single `today`.
pub fn classify(projected: Vec<ProjectedCharge>, today: NaiveDate) -> Vec<Charge> {
    projected
        .into_iter()
        .map(|charge| {
            let status = status_for(charge.due_date, today);
            charge.into_charge(status)
        })
        .collect()
}
