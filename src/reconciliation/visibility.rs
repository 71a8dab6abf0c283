//! Hide dues that predate a resident's registration

use chrono::{NaiveDateTime, NaiveTime};

use crate::types::*;

/// Whether a charge may be shown to a resident registered at
/// `account_created_at`.
///
/// Paid charges are historical fact and always visible. Pending and overdue
/// charges are hidden when their due date (at midnight) is before the
/// registration instant.
pub fn is_visible(charge: &Charge, account_created_at: NaiveDateTime) -> bool {
    if !charge.status.is_outstanding() {
        return true;
    }
    charge.due_date.and_time(NaiveTime::MIN) >= account_created_at
}

/// Drop outstanding charges that predate registration. With no registration
/// timestamp, everything is kept.
pub fn filter_visible(charges: Vec<Charge>, account_created_at: Option<NaiveDateTime>) -> Vec<Charge> {
    match account_created_at {
        Some(created_at) => charges
            .into_iter()
            .filter(|charge| is_visible(charge, created_at))
            .collect(),
        None => charges,
    }
}
