//! Data handed to the settlement collaborator (PIX key display, QR code)
//!
//! Only raw inputs are emitted. Interest accrual from
//! `daily_interest_rate_percent` and `due_date` is left to the collaborator.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validation::validate_pix_key;

/// Everything a payer needs to settle one charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub key_type: PixKeyType,
    pub payee_key: String,
    pub amount: BigDecimal,
    pub payee_display_name: String,
    pub account_id: String,
    pub unit: String,
    pub month: u32,
    pub year: i32,
    pub is_overdue: bool,
    pub due_date: NaiveDate,
    pub daily_interest_rate_percent: BigDecimal,
}

impl SettlementRequest {
    /// Build a settlement request for an outstanding charge
    pub fn from_parts(
        account_id: &str,
        charge: &Charge,
        settings: &BillingSettings,
        identity: &AccountIdentity,
    ) -> BillingResult<Self> {
        if charge.is_paid() {
            return Err(BillingError::ChargeAlreadyPaid {
                unit: charge.unit.clone(),
                reference_month: ReferenceMonth::new(charge.year, charge.month)?,
            });
        }

        let pix_key = identity.pix_key.as_ref().ok_or_else(|| {
            BillingError::SettlementUnavailable(format!(
                "account {} has no payee key",
                account_id
            ))
        })?;
        validate_pix_key(pix_key)?;

        Ok(Self {
            key_type: pix_key.key_type,
            payee_key: pix_key.key.clone(),
            amount: charge.amount.clone(),
            payee_display_name: identity.display_name.clone(),
            account_id: account_id.to_string(),
            unit: charge.unit.clone(),
            month: charge.month,
            year: charge.year,
            is_overdue: charge.is_overdue(),
            due_date: charge.due_date,
            daily_interest_rate_percent: settings.daily_interest_rate_percent.clone(),
        })
    }
}
