//! In-memory storage implementation for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_due_day, validate_positive_amount, validate_unit};

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying data, so a test can keep a handle while
/// the reconciler owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    settings: Arc<RwLock<HashMap<String, BillingSettings>>>,
    profiles: Arc<RwLock<HashMap<String, ResidentBillingProfile>>>,
    payments: Arc<RwLock<HashMap<(String, String), Vec<PaymentRecord>>>>,
    identities: Arc<RwLock<HashMap<String, AccountIdentity>>>,
    failing: Arc<RwLock<HashSet<BillingSource>>>,
}

fn read<T>(lock: &RwLock<T>) -> BillingResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| BillingError::Storage(format!("lock poisoned: {}", e)))
}

fn write<T>(lock: &RwLock<T>) -> BillingResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| BillingError::Storage(format!("lock poisoned: {}", e)))
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Store billing settings for an account
    pub fn set_billing_settings(
        &self,
        account_id: &str,
        settings: BillingSettings,
    ) -> BillingResult<()> {
        validate_due_day(settings.due_day_of_month)?;
        write(&self.settings)?.insert(account_id.to_string(), settings);
        Ok(())
    }

    /// Store a resident's billing profile
    pub fn set_resident_profile(
        &self,
        resident_id: &str,
        profile: ResidentBillingProfile,
    ) -> BillingResult<()> {
        validate_unit(&profile.unit)?;
        write(&self.profiles)?.insert(resident_id.to_string(), profile);
        Ok(())
    }

    /// Store the identity of a managing account
    pub fn set_account_identity(
        &self,
        account_id: &str,
        identity: AccountIdentity,
    ) -> BillingResult<()> {
        write(&self.identities)?.insert(account_id.to_string(), identity);
        Ok(())
    }

    /// Confirm a payment, as the ledger would on settlement
    pub fn record_payment(
        &self,
        account_id: &str,
        unit: &str,
        amount: BigDecimal,
        reference_month: ReferenceMonth,
        payment_date: NaiveDate,
    ) -> BillingResult<PaymentRecord> {
        validate_unit(unit)?;
        validate_positive_amount(&amount)?;

        let record = PaymentRecord::new(
            unit.to_string(),
            amount,
            reference_month.to_string(),
            payment_date,
        );
        self.insert_payment_record(account_id, record.clone())?;
        Ok(record)
    }

    /// Store a payment record as-is, without validation
    pub fn insert_payment_record(
        &self,
        account_id: &str,
        record: PaymentRecord,
    ) -> BillingResult<()> {
        write(&self.payments)?
            .entry((account_id.to_string(), record.unit.clone()))
            .or_default()
            .push(record);
        Ok(())
    }

    /// Make every subsequent read of `source` fail
    pub fn fail_source(&self, source: BillingSource) -> BillingResult<()> {
        write(&self.failing)?.insert(source);
        Ok(())
    }

    /// Undo [`MemoryStorage::fail_source`]
    pub fn restore_source(&self, source: BillingSource) -> BillingResult<()> {
        write(&self.failing)?.remove(&source);
        Ok(())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> BillingResult<()> {
        write(&self.settings)?.clear();
        write(&self.profiles)?.clear();
        write(&self.payments)?.clear();
        write(&self.identities)?.clear();
        write(&self.failing)?.clear();
        Ok(())
    }

    fn check_available(&self, source: BillingSource) -> BillingResult<()> {
        if read(&self.failing)?.contains(&source) {
            Err(BillingError::SourceUnavailable {
                source_name: source,
                reason: "read failed".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BillingStorage for MemoryStorage {
    async fn get_billing_settings(
        &self,
        account_id: &str,
    ) -> BillingResult<Option<BillingSettings>> {
        self.check_available(BillingSource::BillingSettings)?;
        Ok(read(&self.settings)?.get(account_id).cloned())
    }

    async fn get_resident_billing_profile(
        &self,
        resident_id: &str,
    ) -> BillingResult<Option<ResidentBillingProfile>> {
        self.check_available(BillingSource::ResidentProfile)?;
        Ok(read(&self.profiles)?.get(resident_id).cloned())
    }

    async fn get_payment_records(
        &self,
        account_id: &str,
        unit: &str,
    ) -> BillingResult<Vec<PaymentRecord>> {
        self.check_available(BillingSource::PaymentLedger)?;
        Ok(read(&self.payments)?
            .get(&(account_id.to_string(), unit.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_account_identity(
        &self,
        account_id: &str,
    ) -> BillingResult<Option<AccountIdentity>> {
        self.check_available(BillingSource::AccountIdentity)?;
        Ok(read(&self.identities)?.get(account_id).cloned())
    }
}
