//! Reconciliation orchestrator that fans out the upstream reads and merges
//! their snapshots into one charge per month

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DueDayPolicy, ReconcilerConfig};
use crate::reconciliation::classifier::{classify, status_for};
use crate::reconciliation::matcher::match_payments;
use crate::reconciliation::projector::{project_year, resolve_due_date};
use crate::reconciliation::visibility::filter_visible;
use crate::settlement::SettlementRequest;
use crate::traits::*;
use crate::types::*;

/// Who and what to reconcile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    /// Managing (condominium) account
    pub account_id: String,
    pub resident_id: String,
    pub unit: String,
    /// Calendar year to project
    pub year: i32,
}

/// Upstream data captured by one fan-out, after defaults were applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSnapshot {
    pub unit: String,
    pub settings: BillingSettings,
    pub profile: Option<ResidentBillingProfile>,
    pub payments: Vec<PaymentRecord>,
    pub identity: Option<AccountIdentity>,
    /// Sources that failed or returned nothing
    pub degraded: Vec<BillingSource>,
}

/// Sums per status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeTotals {
    pub paid: BigDecimal,
    pub pending: BigDecimal,
    pub overdue: BigDecimal,
}

/// Reconciled charges for one unit, projected over one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeStatement {
    pub unit: String,
    pub year: i32,
    /// The date every status in this statement was classified against
    pub today: NaiveDate,
    /// Visible charges: outstanding ones for `year` in generation order, then
    /// paid ones from every year in the ledger
    pub charges: Vec<Charge>,
    pub settings: BillingSettings,
    pub identity: Option<AccountIdentity>,
}

impl ChargeStatement {
    /// Charges for the requested view.
    ///
    /// Outstanding charges keep generation order. Paid charges are sorted by
    /// reference month.
    pub fn view(&self, view: ChargeView) -> Vec<Charge> {
        match view {
            ChargeView::Outstanding => self
                .charges
                .iter()
                .filter(|c| c.status.is_outstanding())
                .cloned()
                .collect(),
            ChargeView::Paid => {
                let mut paid: Vec<Charge> =
                    self.charges.iter().filter(|c| c.is_paid()).cloned().collect();
                paid.sort_by_key(|c| c.reference_month);
                paid
            }
        }
    }

    /// The charge for a given month, if it is visible
    pub fn for_month(&self, year: i32, month: u32) -> Option<&Charge> {
        self.charges.iter().find(|c| c.key() == (year, month))
    }

    /// Sums per status for the statement year only.
    ///
    /// `charges` also holds paid charges from other years, which are left out
    /// here so paid and outstanding totals cover the same months.
    pub fn totals(&self) -> ChargeTotals {
        let sum = |status: ChargeStatus| -> BigDecimal {
            self.charges
                .iter()
                .filter(|c| c.year == self.year && c.status == status)
                .map(|c| &c.amount)
                .sum()
        };

        ChargeTotals {
            paid: sum(ChargeStatus::Paid),
            pending: sum(ChargeStatus::Pending),
            overdue: sum(ChargeStatus::Overdue),
        }
    }
}

/// Project, match and classify one unit's year without the visibility rule.
///
/// Without a billing profile nothing is projected and only recorded payments
/// surface.
pub fn merge_charges(
    unit: &str,
    year: i32,
    settings: &BillingSettings,
    profile: Option<&ResidentBillingProfile>,
    payments: &[PaymentRecord],
    today: NaiveDate,
    policy: DueDayPolicy,
) -> Vec<Charge> {
    let due_day = settings.due_day_of_month;

    let projected = match profile {
        Some(profile) => {
            match project_year(unit, year, &profile.monthly_due_amount, due_day, policy) {
                Ok(projected) => projected,
                Err(e) => {
                    warn!("Cannot project {} for unit {}: {}", year, unit, e);
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    let outcome = match_payments(unit, projected, payments, due_day, policy);
    debug!(
        "Unit {}: {} paid month(s), {} unpaid projection(s)",
        unit,
        outcome.paid.len(),
        outcome.unmatched.len()
    );

    let mut charges = classify(outcome.unmatched, today);
    charges.extend(outcome.paid);
    charges
}

/// Main reconciliation engine behind the "My Charges" view
pub struct ChargeReconciler<S: BillingStorage> {
    storage: S,
    config: ReconcilerConfig,
}

impl<S: BillingStorage> ChargeReconciler<S> {
    /// Create a reconciler with default configuration
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, ReconcilerConfig::default())
    }

    /// Create a reconciler with custom configuration
    pub fn with_config(storage: S, config: ReconcilerConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Issue the four upstream reads concurrently and degrade whatever
    /// failed. Never fails.
    pub async fn fetch_snapshot(&self, request: &ReconciliationRequest) -> BillingSnapshot {
        let (settings, profile, payments, identity) = futures::join!(
            self.storage.get_billing_settings(&request.account_id),
            self.storage.get_resident_billing_profile(&request.resident_id),
            self.storage
                .get_payment_records(&request.account_id, &request.unit),
            self.storage.get_account_identity(&request.account_id)
        );

        let mut degraded = Vec::new();

        let settings = recover(BillingSource::BillingSettings, settings, &mut degraded);
        let settings = self.config.resolve_settings(settings);

        let profile = recover(BillingSource::ResidentProfile, profile, &mut degraded);
        if let Some(profile) = &profile {
            if profile.unit != request.unit {
                warn!(
                    "Resident {} is registered to unit {}, reconciling unit {}",
                    request.resident_id, profile.unit, request.unit
                );
            }
        }

        let payments = match payments {
            Ok(payments) => payments,
            Err(e) => {
                warn!("Treating payment ledger as empty: {}", e);
                degraded.push(BillingSource::PaymentLedger);
                Vec::new()
            }
        };

        let identity = recover(BillingSource::AccountIdentity, identity, &mut degraded);

        BillingSnapshot {
            unit: request.unit.clone(),
            settings,
            profile,
            payments,
            identity,
            degraded,
        }
    }

    /// Merge a snapshot into the visible charges for `year`, classified
    /// against `today`.
    pub fn reconcile_snapshot(
        &self,
        snapshot: &BillingSnapshot,
        year: i32,
        today: NaiveDate,
    ) -> ChargeStatement {
        let merged = merge_charges(
            &snapshot.unit,
            year,
            &snapshot.settings,
            snapshot.profile.as_ref(),
            &snapshot.payments,
            today,
            self.config.due_day_policy,
        );
        let merged_count = merged.len();

        let created_at = snapshot.profile.as_ref().map(|p| p.account_created_at);
        let charges = filter_visible(merged, created_at);

        info!(
            "Reconciled unit {} for {}: {} charge(s), {} hidden before registration",
            snapshot.unit,
            year,
            charges.len(),
            merged_count - charges.len()
        );

        ChargeStatement {
            unit: snapshot.unit.clone(),
            year,
            today,
            charges,
            settings: snapshot.settings.clone(),
            identity: snapshot.identity.clone(),
        }
    }

    /// Fetch and reconcile in one pass
    pub async fn reconcile(
        &self,
        request: &ReconciliationRequest,
        today: NaiveDate,
    ) -> ChargeStatement {
        let snapshot = self.fetch_snapshot(request).await;
        self.reconcile_snapshot(&snapshot, request.year, today)
    }

    /// Reconcile against the local calendar date, read once for the run
    pub async fn reconcile_today(&self, request: &ReconciliationRequest) -> ChargeStatement {
        let today = chrono::Local::now().date_naive();
        self.reconcile(request, today).await
    }

    /// Reconcile and return a single view
    pub async fn charges(
        &self,
        request: &ReconciliationRequest,
        view: ChargeView,
        today: NaiveDate,
    ) -> Vec<Charge> {
        self.reconcile(request, today).await.view(view)
    }

    /// Build the settlement hand-off for `charge`.
    ///
    /// Settings and identity are read again here rather than taken from an
    /// earlier snapshot, and the charge's due date and overdue flag are
    /// recomputed from the fresh due day against `today`. Settings still fall
    /// back to defaults; a missing or unreadable identity is an error because
    /// there is no payee.
    pub async fn prepare_settlement(
        &self,
        account_id: &str,
        charge: &Charge,
        today: NaiveDate,
    ) -> BillingResult<SettlementRequest> {
        let (settings, identity) = futures::join!(
            self.storage.get_billing_settings(account_id),
            self.storage.get_account_identity(account_id)
        );

        let settings = match settings {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Settling with default billing settings: {}", e);
                None
            }
        };
        let settings = self.config.resolve_settings(settings);

        let identity = identity?.ok_or_else(|| {
            BillingError::SettlementUnavailable(format!(
                "no identity recorded for account {}",
                account_id
            ))
        })?;

        let mut current = charge.clone();
        if current.status.is_outstanding() {
            let reference = ReferenceMonth::new(charge.year, charge.month)?;
            current.due_date = resolve_due_date(
                reference,
                settings.due_day_of_month,
                self.config.due_day_policy,
            )?;
            current.status = status_for(current.due_date, today);
        }

        SettlementRequest::from_parts(account_id, &current, &settings, &identity)
    }
}

fn recover<T>(
    source: BillingSource,
    result: BillingResult<Option<T>>,
    degraded: &mut Vec<BillingSource>,
) -> Option<T> {
    match result {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            debug!("No {} recorded", source);
            degraded.push(source);
            None
        }
        Err(e) => {
            warn!("Treating {} as absent: {}", source, e);
            degraded.push(source);
            None
        }
    }
}
