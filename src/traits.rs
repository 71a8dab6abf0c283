//! Traits for storage abstraction

use async_trait::async_trait;

use crate::types::*;

/// Read-only access to the upstream sources a reconciliation run needs
///
/// This trait lets the engine work against any backend (a relational
/// database, a document store, an HTTP API, in-memory, etc.). Every method is
/// an independent point lookup, so the reconciler is free to issue them
/// concurrently. Returning `Ok(None)` or an empty vector means "nothing
/// recorded"; returning `Err` means the read itself failed.
#[async_trait]
pub trait BillingStorage: Send + Sync {
    /// Billing rules for a managing account
    async fn get_billing_settings(&self, account_id: &str)
        -> BillingResult<Option<BillingSettings>>;

    /// Monthly due amount and onboarding timestamp for a resident
    async fn get_resident_billing_profile(
        &self,
        resident_id: &str,
    ) -> BillingResult<Option<ResidentBillingProfile>>;

    /// All recorded payments for a unit, across every year
    async fn get_payment_records(
        &self,
        account_id: &str,
        unit: &str,
    ) -> BillingResult<Vec<PaymentRecord>>;

    /// Display name and payee key of the managing account
    async fn get_account_identity(&self, account_id: &str)
        -> BillingResult<Option<AccountIdentity>>;
}
