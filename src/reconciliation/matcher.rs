//! Reconcile projected charges against recorded payments

use log::warn;
use std::collections::{HashMap, HashSet};

use crate::config::DueDayPolicy;
use crate::reconciliation::projector::resolve_due_date;
use crate::types::*;

/// Result of matching projections against the ledger
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchOutcome {
    /// One paid charge per settled month, in ledger order
    pub paid: Vec<Charge>,
    /// Projections with no payment for their month
    pub unmatched: Vec<ProjectedCharge>,
}

/// Replace projected months that have a payment with authoritative paid
/// charges.
///
/// Every usable payment record surfaces as a paid charge, whatever its year.
/// The ledger query is already scoped to `unit`, so a record whose unit
/// string differs (casing, stray whitespace) is kept under `unit` with a
/// warning. Records with an unparseable reference month or an unresolvable
/// due date are skipped. When the ledger holds more than one record
/// for the same month, the earliest payment wins.
pub fn match_payments(
    unit: &str,
    projected: Vec<ProjectedCharge>,
    records: &[PaymentRecord],
    due_day: u32,
    policy: DueDayPolicy,
) -> MatchOutcome {
    let mut paid: Vec<Charge> = Vec::new();
    let mut by_month: HashMap<ReferenceMonth, usize> = HashMap::new();

    for record in records {
        if record.unit != unit {
            warn!(
                "Payment {} is recorded for unit {} but was returned for unit {}",
                record.id, record.unit, unit
            );
        }

        let reference = match record.reference() {
            Ok(reference) => reference,
            Err(e) => {
                warn!("Skipping payment {}: {}", record.id, e);
                continue;
            }
        };

        let due_date = match resolve_due_date(reference, due_day, policy) {
            Ok(due_date) => due_date,
            Err(e) => {
                warn!("Skipping payment {}: {}", record.id, e);
                continue;
            }
        };

        let charge = Charge {
            unit: unit.to_string(),
            month: reference.month(),
            year: reference.year(),
            amount: record.amount.clone(),
            status: ChargeStatus::Paid,
            due_date,
            payment_date: Some(record.payment_date),
            reference_month: Some(reference),
            payment_id: Some(record.id.clone()),
        };

        match by_month.get(&reference) {
            Some(&index) => {
                warn!(
                    "Duplicate payment for unit {} in {}: {}",
                    unit, reference, record.id
                );
                if charge.payment_date < paid[index].payment_date {
                    paid[index] = charge;
                }
            }
            None => {
                by_month.insert(reference, paid.len());
                paid.push(charge);
            }
        }
    }

    let matched: HashSet<(i32, u32)> = by_month
        .keys()
        .map(|reference| (reference.year(), reference.month()))
        .collect();

    let unmatched: Vec<ProjectedCharge> = projected
        .into_iter()
        .filter(|charge| !matched.contains(&charge.key()))
        .collect();

    MatchOutcome { paid, unmatched }
}
