//! Integration tests for condo-charges

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use condo_charges::{
    utils::{parse_amount, MemoryStorage},
    AccountIdentity, BillingError, BillingResult, BillingSettings, BillingSource, BillingStorage,
    ChargeReconciler, ChargeStatus, ChargeView, DueDayPolicy, PaymentRecord, PixKey, PixKeyType,
    ReconcilerConfig, ReconciliationRequest, ReferenceMonth, ResidentBillingProfile,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ACCOUNT: &str = "condo-1";
const RESIDENT: &str = "resident-101b";
const UNIT: &str = "101B";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(0, 0, 0).unwrap()
}

fn request() -> ReconciliationRequest {
    ReconciliationRequest {
        account_id: ACCOUNT.to_string(),
        resident_id: RESIDENT.to_string(),
        unit: UNIT.to_string(),
        year: 2024,
    }
}

fn month(y: i32, m: u32) -> ReferenceMonth {
    ReferenceMonth::new(y, m).unwrap()
}

/// Storage with the "101B" scenario: R$ 350,00 monthly, due on the 10th
fn seeded_storage(account_created_at: NaiveDateTime) -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage
        .set_billing_settings(
            ACCOUNT,
            BillingSettings {
                due_day_of_month: 10,
                daily_interest_rate_percent: "0.033".parse().unwrap(),
            },
        )
        .unwrap();
    storage
        .set_resident_profile(
            RESIDENT,
            ResidentBillingProfile {
                unit: UNIT.to_string(),
                monthly_due_amount: parse_amount("350,00").unwrap(),
                account_created_at,
            },
        )
        .unwrap();
    storage
        .set_account_identity(
            ACCOUNT,
            AccountIdentity {
                display_name: "Residencial Jardim das Flores".to_string(),
                pix_key: Some(PixKey {
                    key_type: PixKeyType::Cnpj,
                    key: "12.345.678/0001-95".to_string(),
                }),
            },
        )
        .unwrap();
    storage
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    storage
        .record_payment(
            ACCOUNT,
            UNIT,
            parse_amount("350,00").unwrap(),
            month(2024, 4),
            date(2024, 4, 8),
        )
        .unwrap();

    let reconciler = ChargeReconciler::new(storage);
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;

    assert_eq!(statement.charges.len(), 12);

    let april = statement.for_month(2024, 4).unwrap();
    assert_eq!(april.status, ChargeStatus::Paid);
    assert_eq!(april.amount, BigDecimal::from(350));
    assert_eq!(april.payment_date, Some(date(2024, 4, 8)));

    for m in [1, 2, 3, 5, 6] {
        let charge = statement.for_month(2024, m).unwrap();
        assert_eq!(charge.status, ChargeStatus::Overdue, "month {m}");
        assert_eq!(charge.due_date, date(2024, m, 10));
    }
    for m in 7..=12 {
        let charge = statement.for_month(2024, m).unwrap();
        assert_eq!(charge.status, ChargeStatus::Pending, "month {m}");
        assert_eq!(charge.amount, BigDecimal::from(350));
    }

    let outstanding = statement.view(ChargeView::Outstanding);
    assert_eq!(outstanding.len(), 11);
    let months: Vec<u32> = outstanding.iter().map(|c| c.month).collect();
    assert_eq!(months, vec![1, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12]);

    let paid = statement.view(ChargeView::Paid);
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].month, 4);
}

#[tokio::test]
async fn test_paid_precedence() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    storage
        .record_payment(
            ACCOUNT,
            UNIT,
            BigDecimal::from(350),
            month(2024, 3),
            date(2024, 3, 20),
        )
        .unwrap();

    let reconciler = ChargeReconciler::new(storage);
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;

    let march: Vec<_> = statement
        .charges
        .iter()
        .filter(|c| c.key() == (2024, 3))
        .collect();
    assert_eq!(march.len(), 1);
    assert_eq!(march[0].status, ChargeStatus::Paid);
    assert_eq!(march[0].payment_date, Some(date(2024, 3, 20)));
    assert!(statement
        .view(ChargeView::Outstanding)
        .iter()
        .all(|c| c.key() != (2024, 3)));
}

#[tokio::test]
async fn test_visibility_filter_hides_dues_before_registration() {
    let storage = seeded_storage(midnight(2024, 5, 1));
    storage
        .record_payment(
            ACCOUNT,
            UNIT,
            BigDecimal::from(350),
            month(2024, 4),
            date(2024, 4, 9),
        )
        .unwrap();

    let reconciler = ChargeReconciler::new(storage);
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;

    let outstanding = statement.view(ChargeView::Outstanding);
    assert!(outstanding.iter().all(|c| c.month >= 5));
    assert_eq!(outstanding.len(), 8);

    let paid = statement.view(ChargeView::Paid);
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].key(), (2024, 4));
}

#[tokio::test]
async fn test_unpaid_april_before_registration_is_hidden() {
    let storage = seeded_storage(midnight(2024, 5, 1));
    let reconciler = ChargeReconciler::new(storage);

    let outstanding = reconciler
        .charges(&request(), ChargeView::Outstanding, date(2024, 6, 15))
        .await;

    assert!(outstanding.iter().all(|c| c.key() != (2024, 4)));
    assert_eq!(outstanding.first().map(|c| c.month), Some(5));
}

#[tokio::test]
async fn test_settings_change_moves_unpaid_due_dates_only() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    storage
        .record_payment(
            ACCOUNT,
            UNIT,
            "340.00".parse().unwrap(),
            month(2024, 2),
            date(2024, 2, 7),
        )
        .unwrap();

    let reconciler = ChargeReconciler::new(storage.clone());
    let before = reconciler.reconcile(&request(), date(2024, 6, 15)).await;

    storage
        .set_billing_settings(
            ACCOUNT,
            BillingSettings {
                due_day_of_month: 20,
                daily_interest_rate_percent: "0.033".parse().unwrap(),
            },
        )
        .unwrap();
    let after = reconciler.reconcile(&request(), date(2024, 6, 15)).await;

    for charge in after.view(ChargeView::Outstanding) {
        assert_eq!(charge.due_date, date(2024, charge.month, 20));
    }

    let paid_before = before.for_month(2024, 2).unwrap();
    let paid_after = after.for_month(2024, 2).unwrap();
    assert_eq!(paid_before.payment_date, paid_after.payment_date);
    assert_eq!(paid_before.amount, paid_after.amount);
    assert_eq!(paid_after.amount, "340.00".parse::<BigDecimal>().unwrap());

    // June 20 has not passed on June 15 any more
    assert_eq!(
        before.for_month(2024, 6).map(|c| c.status),
        Some(ChargeStatus::Overdue)
    );
    assert_eq!(
        after.for_month(2024, 6).map(|c| c.status),
        Some(ChargeStatus::Pending)
    );
}

#[tokio::test]
async fn test_paid_view_sorted_by_reference_month() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    for (m, paid_on) in [
        (month(2024, 5), date(2024, 5, 9)),
        (month(2023, 12), date(2023, 12, 10)),
        (month(2024, 2), date(2024, 2, 8)),
    ] {
        storage
            .record_payment(ACCOUNT, UNIT, BigDecimal::from(350), m, paid_on)
            .unwrap();
    }

    let reconciler = ChargeReconciler::new(storage);
    let paid = reconciler
        .charges(&request(), ChargeView::Paid, date(2024, 6, 15))
        .await;

    let keys: Vec<String> = paid
        .iter()
        .map(|c| c.reference_month.unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["2023-12", "2024-02", "2024-05"]);
}

#[tokio::test]
async fn test_malformed_and_duplicate_ledger_entries() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    for (id, reference_month, paid_on) in [
        ("bad", "03/2024", date(2024, 3, 9)),
        ("first", "2024-05", date(2024, 5, 3)),
        ("second", "2024-05", date(2024, 5, 12)),
    ] {
        storage
            .insert_payment_record(
                ACCOUNT,
                PaymentRecord {
                    id: id.to_string(),
                    unit: UNIT.to_string(),
                    amount: BigDecimal::from(350),
                    reference_month: reference_month.to_string(),
                    payment_date: paid_on,
                },
            )
            .unwrap();
    }

    let reconciler = ChargeReconciler::new(storage);
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;

    assert_eq!(statement.charges.len(), 12);
    assert_eq!(
        statement.for_month(2024, 3).map(|c| c.status),
        Some(ChargeStatus::Overdue)
    );
    let may = statement.for_month(2024, 5).unwrap();
    assert_eq!(may.payment_id.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_failed_sources_degrade_instead_of_failing() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    storage
        .set_billing_settings(
            ACCOUNT,
            BillingSettings {
                due_day_of_month: 25,
                daily_interest_rate_percent: "0.1".parse().unwrap(),
            },
        )
        .unwrap();
    storage.fail_source(BillingSource::BillingSettings).unwrap();
    storage.fail_source(BillingSource::AccountIdentity).unwrap();

    let reconciler = ChargeReconciler::new(storage.clone());
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;

    assert_eq!(statement.settings, BillingSettings::default());
    assert!(statement.identity.is_none());
    assert_eq!(statement.for_month(2024, 1).unwrap().due_date, date(2024, 1, 10));

    storage.fail_source(BillingSource::ResidentProfile).unwrap();
    storage.fail_source(BillingSource::PaymentLedger).unwrap();
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;
    assert!(statement.charges.is_empty());
}

#[tokio::test]
async fn test_clamp_policy_in_short_months() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    storage
        .set_billing_settings(
            ACCOUNT,
            BillingSettings {
                due_day_of_month: 31,
                daily_interest_rate_percent: "0.033".parse().unwrap(),
            },
        )
        .unwrap();

    let clamped = ChargeReconciler::new(storage.clone())
        .reconcile(&request(), date(2024, 6, 15))
        .await;
    assert_eq!(clamped.for_month(2024, 2).unwrap().due_date, date(2024, 2, 29));
    assert_eq!(clamped.for_month(2024, 4).unwrap().due_date, date(2024, 4, 30));

    let config = ReconcilerConfig {
        due_day_policy: DueDayPolicy::RollToNextMonth,
        ..ReconcilerConfig::default()
    };
    let rolled = ChargeReconciler::with_config(storage, config)
        .reconcile(&request(), date(2024, 6, 15))
        .await;
    assert_eq!(rolled.for_month(2024, 4).unwrap().due_date, date(2024, 5, 1));
    assert_eq!(rolled.charges.len(), 12);
}

#[tokio::test]
async fn test_prepare_settlement_rereads_settings() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    let reconciler = ChargeReconciler::new(storage.clone());
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;
    let may = statement.for_month(2024, 5).unwrap().clone();

    storage
        .set_billing_settings(
            ACCOUNT,
            BillingSettings {
                due_day_of_month: 10,
                daily_interest_rate_percent: "0.05".parse().unwrap(),
            },
        )
        .unwrap();

    let settlement = reconciler
        .prepare_settlement(ACCOUNT, &may, date(2024, 6, 15))
        .await.unwrap();
    assert_eq!(settlement.key_type, PixKeyType::Cnpj);
    assert_eq!(settlement.payee_key, "12.345.678/0001-95");
    assert_eq!(settlement.payee_display_name, "Residencial Jardim das Flores");
    assert_eq!(settlement.unit, UNIT);
    assert_eq!((settlement.year, settlement.month), (2024, 5));
    assert!(settlement.is_overdue);
    assert_eq!(settlement.due_date, date(2024, 5, 10));
    assert_eq!(
        settlement.daily_interest_rate_percent,
        "0.05".parse::<BigDecimal>().unwrap()
    );
}

#[tokio::test]
async fn test_prepare_settlement_uses_current_due_day() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    let reconciler = ChargeReconciler::new(storage.clone());
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;
    let june = statement.for_month(2024, 6).unwrap().clone();
    assert_eq!(june.due_date, date(2024, 6, 10));
    assert!(june.is_overdue());

    storage
        .set_billing_settings(
            ACCOUNT,
            BillingSettings {
                due_day_of_month: 20,
                daily_interest_rate_percent: "0.05".parse().unwrap(),
            },
        )
        .unwrap();

    let settlement = reconciler
        .prepare_settlement(ACCOUNT, &june, date(2024, 6, 15))
        .await
        .unwrap();
    assert_eq!(settlement.due_date, date(2024, 6, 20));
    assert!(!settlement.is_overdue);
    assert_eq!(
        settlement.daily_interest_rate_percent,
        "0.05".parse::<BigDecimal>().unwrap()
    );
}

#[tokio::test]
async fn test_prepare_settlement_requires_identity() {
    let storage = seeded_storage(midnight(2023, 1, 1));
    let reconciler = ChargeReconciler::new(storage.clone());
    let statement = reconciler.reconcile(&request(), date(2024, 6, 15)).await;
    let july = statement.for_month(2024, 7).unwrap().clone();

    storage.fail_source(BillingSource::AccountIdentity).unwrap();
    let err = reconciler
        .prepare_settlement(ACCOUNT, &july, date(2024, 6, 15))
        .await.unwrap_err();
    assert!(matches!(err, BillingError::SourceUnavailable { .. }));

    storage.restore_source(BillingSource::AccountIdentity).unwrap();
    storage.clear().unwrap();
    let err = reconciler
        .prepare_settlement(ACCOUNT, &july, date(2024, 6, 15))
        .await.unwrap_err();
    assert!(matches!(err, BillingError::SettlementUnavailable(_)));
}

/// Storage whose reads only complete once all four are in flight
struct GatedStorage {
    inner: MemoryStorage,
    started: Arc<AtomicUsize>,
}

impl GatedStorage {
    async fn gate(&self) -> BillingResult<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        for _ in 0..1000 {
            if self.started.load(Ordering::SeqCst) >= 4 {
                return Ok(());
            }
            tokio::task::yield_now().await;
        }
        Err(BillingError::Storage("reads were not issued concurrently".to_string()))
    }
}

#[async_trait]
impl BillingStorage for GatedStorage {
    async fn get_billing_settings(
        &self,
        account_id: &str,
    ) -> BillingResult<Option<BillingSettings>> {
        self.gate().await?;
        self.inner.get_billing_settings(account_id).await
    }

    async fn get_resident_billing_profile(
        &self,
        resident_id: &str,
    ) -> BillingResult<Option<ResidentBillingProfile>> {
        self.gate().await?;
        self.inner.get_resident_billing_profile(resident_id).await
    }

    async fn get_payment_records(
        &self,
        account_id: &str,
        unit: &str,
    ) -> BillingResult<Vec<PaymentRecord>> {
        self.gate().await?;
        self.inner.get_payment_records(account_id, unit).await
    }

    async fn get_account_identity(
        &self,
        account_id: &str,
    ) -> BillingResult<Option<AccountIdentity>> {
        self.gate().await?;
        self.inner.get_account_identity(account_id).await
    }
}

#[tokio::test]
async fn test_reads_are_issued_concurrently() {
    let storage = GatedStorage {
        inner: seeded_storage(midnight(2023, 1, 1)),
        started: Arc::new(AtomicUsize::new(0)),
    };

    let reconciler = ChargeReconciler::new(storage);
    let snapshot = reconciler.fetch_snapshot(&request()).await;

    assert!(snapshot.degraded.is_empty(), "{:?}", snapshot.degraded);
    assert!(snapshot.profile.is_some());
    assert!(snapshot.identity.is_some());
}
