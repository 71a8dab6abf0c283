//! Core types and data structures for charge reconciliation

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar month a payment settles, rendered as fixed-width `"YYYY-MM"`.
///
/// Ordering is chronological, which matches lexicographic ordering of the
/// rendered string because both components are zero-padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceMonth {
    year: i32,
    month: u32,
}

impl ReferenceMonth {
    /// Create a reference month, validating both components
    pub fn new(year: i32, month: u32) -> BillingResult<Self> {
        if !(1..=9999).contains(&year) {
            return Err(BillingError::InvalidReferenceMonth(format!(
                "year {} is outside 0001..=9999",
                year
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(BillingError::InvalidReferenceMonth(format!(
                "month {} is outside 1..=12",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Number of days in this calendar month
    pub fn days_in_month(&self) -> u32 {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.pred_opt())
            .map(|last| last.day())
            .unwrap_or(31)
    }

    /// The month after this one, or `None` past year 9999
    pub fn next(&self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1).ok()
        } else {
            Self::new(self.year, self.month + 1).ok()
        }
    }
}

impl fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ReferenceMonth {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BillingError::InvalidReferenceMonth(s.to_string());

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for ReferenceMonth {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferenceMonth> for String {
    fn from(value: ReferenceMonth) -> Self {
        value.to_string()
    }
}

/// Lifecycle state of a monthly charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    /// Not yet due
    Pending,
    /// Backed by a recorded payment
    Paid,
    /// Due date has passed without a payment
    Overdue,
}

impl ChargeStatus {
    /// Pending and overdue charges are both still owed
    pub fn is_outstanding(&self) -> bool {
        matches!(self, ChargeStatus::Pending | ChargeStatus::Overdue)
    }
}

/// A month-scoped billing obligation for a unit, either projected or paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    /// Unit identifier (e.g. "101B")
    pub unit: String,
    /// Calendar month, 1..=12
    pub month: u32,
    pub year: i32,
    /// Projected due amount, or the amount actually paid
    pub amount: BigDecimal,
    pub status: ChargeStatus,
    pub due_date: NaiveDate,
    /// Set only for paid charges
    pub payment_date: Option<NaiveDate>,
    pub reference_month: Option<ReferenceMonth>,
    /// Ledger id of the backing payment, for paid charges
    pub payment_id: Option<String>,
}

impl Charge {
    /// `(year, month)` identity of this charge
    pub fn key(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    pub fn is_paid(&self) -> bool {
        self.status == ChargeStatus::Paid
    }

    pub fn is_overdue(&self) -> bool {
        self.status == ChargeStatus::Overdue
    }
}

/// A synthesized monthly charge that has not been classified yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCharge {
    pub unit: String,
    pub year: i32,
    pub month: u32,
    pub amount: BigDecimal,
    pub due_date: NaiveDate,
}

impl ProjectedCharge {
    pub fn key(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    /// Stamp a status onto the projection
    pub fn into_charge(self, status: ChargeStatus) -> Charge {
        let reference_month = ReferenceMonth::new(self.year, self.month).ok();
        Charge {
            unit: self.unit,
            month: self.month,
            year: self.year,
            amount: self.amount,
            status,
            due_date: self.due_date,
            payment_date: None,
            reference_month,
            payment_id: None,
        }
    }
}

/// A confirmed payment as recorded by the financial ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub unit: String,
    pub amount: BigDecimal,
    /// Raw `"YYYY-MM"` key as stored by the ledger
    pub reference_month: String,
    pub payment_date: NaiveDate,
}

impl PaymentRecord {
    /// Create a payment record with a freshly generated id
    pub fn new(
        unit: String,
        amount: BigDecimal,
        reference_month: String,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            unit,
            amount,
            reference_month,
            payment_date,
        }
    }

    /// Parse the stored reference month
    pub fn reference(&self) -> BillingResult<ReferenceMonth> {
        self.reference_month.parse()
    }
}

/// Billing rules configured by the managing account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSettings {
    /// Day of month on which a charge becomes payable, 1..=31
    pub due_day_of_month: u32,
    /// Daily late interest, in percent (0.033 means 0.033% per day)
    pub daily_interest_rate_percent: BigDecimal,
}

impl BillingSettings {
    pub const DEFAULT_DUE_DAY_OF_MONTH: u32 = 10;

    /// 0.033% per day
    pub fn default_daily_interest_rate_percent() -> BigDecimal {
        BigDecimal::new(33.into(), 3)
    }
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            due_day_of_month: Self::DEFAULT_DUE_DAY_OF_MONTH,
            daily_interest_rate_percent: Self::default_daily_interest_rate_percent(),
        }
    }
}

/// Per-unit billing data captured at resident onboarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentBillingProfile {
    pub unit: String,
    pub monthly_due_amount: BigDecimal,
    /// Set once at onboarding, never mutated
    pub account_created_at: NaiveDateTime,
}

/// Kind of PIX key a payee publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Random,
}

/// Payee key used by the settlement collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixKey {
    pub key_type: PixKeyType,
    pub key: String,
}

/// Public identity of the managing (condominium) account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub display_name: String,
    pub pix_key: Option<PixKey>,
}

/// Which slice of the reconciled charges the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeView {
    /// Pending and overdue charges, in generation order
    Outstanding,
    /// Paid charges, ascending by reference month
    Paid,
}

/// Names the upstream read a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingSource {
    BillingSettings,
    ResidentProfile,
    PaymentLedger,
    AccountIdentity,
}

impl fmt::Display for BillingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BillingSource::BillingSettings => "billing settings",
            BillingSource::ResidentProfile => "resident billing profile",
            BillingSource::PaymentLedger => "payment ledger",
            BillingSource::AccountIdentity => "account identity",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while reconciling charges
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Source unavailable ({source_name}): {reason}")]
    SourceUnavailable {
        source_name: BillingSource,
        reason: String,
    },
    #[error("Day {day} does not exist in {year}-{month:02}")]
    InvalidCalendarDay { year: i32, month: u32, day: u32 },
    #[error("Invalid reference month: {0}")]
    InvalidReferenceMonth(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Charge for unit {unit} in {reference_month} is already paid")]
    ChargeAlreadyPaid {
        unit: String,
        reference_month: ReferenceMonth,
    },
    #[error("Settlement unavailable: {0}")]
    SettlementUnavailable(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for billing operations
pub type BillingResult<T> = Result<T, BillingError>;
