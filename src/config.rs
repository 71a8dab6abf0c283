//! Reconciler configuration
//!
//! Documented fallbacks for billing settings live here so the merge logic
//! never has to invent a default of its own. Every field deserializes with a
//! default, so an empty JSON object is a valid configuration.

use bigdecimal::BigDecimal;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::types::BillingSettings;

/// How a due day that does not exist in a month (31 in April) is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DueDayPolicy {
    /// Use the last day of the month (31 April -> 30 April)
    #[default]
    ClampToMonthEnd,
    /// Carry the overflow into the next month (31 April -> 1 May)
    RollToNextMonth,
}

/// Settings applied by [`crate::ChargeReconciler`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Due day used when the account has no billing settings
    #[serde(default = "default_due_day_of_month")]
    pub default_due_day_of_month: u32,

    /// Daily interest rate used when the account has no billing settings
    #[serde(default = "default_daily_interest_rate_percent")]
    pub default_daily_interest_rate_percent: BigDecimal,

    /// Short-month resolution for due days
    #[serde(default)]
    pub due_day_policy: DueDayPolicy,
}

fn default_due_day_of_month() -> u32 {
    BillingSettings::DEFAULT_DUE_DAY_OF_MONTH
}

fn default_daily_interest_rate_percent() -> BigDecimal {
    BillingSettings::default_daily_interest_rate_percent()
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            default_due_day_of_month: default_due_day_of_month(),
            default_daily_interest_rate_percent: default_daily_interest_rate_percent(),
            due_day_policy: DueDayPolicy::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Settings used when the account has none of its own
    pub fn default_settings(&self) -> BillingSettings {
        BillingSettings {
            due_day_of_month: self.default_due_day_of_month,
            daily_interest_rate_percent: self.default_daily_interest_rate_percent.clone(),
        }
    }

    /// Apply defaults to whatever the settings reader returned.
    ///
    /// A missing record yields the configured defaults. A due day outside
    /// 1..=31 is replaced by the default due day; a negative interest rate is
    /// replaced by the default rate.
    pub fn resolve_settings(&self, settings: Option<BillingSettings>) -> BillingSettings {
        let Some(mut settings) = settings else {
            return self.default_settings();
        };

        if !(1..=31).contains(&settings.due_day_of_month) {
            warn!(
                "Ignoring out-of-range due day {}; using {}",
                settings.due_day_of_month, self.default_due_day_of_month
            );
            settings.due_day_of_month = self.default_due_day_of_month;
        }

        if settings.daily_interest_rate_percent < BigDecimal::from(0) {
            warn!(
                "Ignoring negative daily interest rate {}; using {}",
                settings.daily_interest_rate_percent, self.default_daily_interest_rate_percent
            );
            settings.daily_interest_rate_percent =
                self.default_daily_interest_rate_percent.clone();
        }

        settings
    }
}
