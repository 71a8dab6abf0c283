//! "My Charges" walkthrough for a single unit

use chrono::NaiveDate;
use condo_charges::utils::{format_amount, parse_amount, MemoryStorage};
use condo_charges::{
    AccountIdentity, BillingSettings, ChargeReconciler, ChargeStatus, ChargeView, PixKey,
    PixKeyType, ReconcilerConfig, ReconciliationRequest, ReferenceMonth, ResidentBillingProfile,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏢 Condo Charges - My Charges Example\n");

    let storage = MemoryStorage::new();

    // 1. Condominium billing rules and payee identity
    storage.set_billing_settings(
        "condo-1",
        BillingSettings {
            due_day_of_month: 10,
            daily_interest_rate_percent: "0.033".parse()?,
        },
    )?;
    storage.set_account_identity(
        "condo-1",
        AccountIdentity {
            display_name: "Residencial Jardim das Flores".to_string(),
            pix_key: Some(PixKey {
                key_type: PixKeyType::Email,
                key: "financeiro@jardimdasflores.example".to_string(),
            }),
        },
    )?;

    // 2. Resident of unit 101B, registered in February
    storage.set_resident_profile(
        "resident-101b",
        ResidentBillingProfile {
            unit: "101B".to_string(),
            monthly_due_amount: parse_amount("350,00")?,
            account_created_at: NaiveDate::from_ymd_opt(2024, 2, 1)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .ok_or("invalid registration date")?,
        },
    )?;

    // 3. One confirmed payment for April
    let april = storage.record_payment(
        "condo-1",
        "101B",
        parse_amount("350,00")?,
        ReferenceMonth::new(2024, 4)?,
        NaiveDate::from_ymd_opt(2024, 4, 8).ok_or("invalid payment date")?,
    )?;
    println!("  ✓ Recorded payment {} for {}\n", april.id, april.reference_month);

    // Configuration can come from JSON; missing fields take their defaults
    let config: ReconcilerConfig =
        serde_json::from_str(r#"{"due_day_policy": "clamp_to_month_end"}"#)?;
    let reconciler = ChargeReconciler::with_config(storage, config);

    let request = ReconciliationRequest {
        account_id: "condo-1".to_string(),
        resident_id: "resident-101b".to_string(),
        unit: "101B".to_string(),
        year: 2024,
    };
    let today = NaiveDate::from_ymd_opt(2024, 6, 15).ok_or("invalid date")?;
    let statement = reconciler.reconcile(&request, today).await;

    println!("📋 Outstanding charges as of {}:", today);
    for charge in statement.view(ChargeView::Outstanding) {
        let label = match charge.status {
            ChargeStatus::Overdue => "OVERDUE",
            _ => "pending",
        };
        println!(
            "  {:02}/{}  R$ {:>8}  due {}  {}",
            charge.month,
            charge.year,
            format_amount(&charge.amount),
            charge.due_date,
            label
        );
    }

    println!("\n✅ Paid charges:");
    for charge in statement.view(ChargeView::Paid) {
        println!(
            "  {:02}/{}  R$ {:>8}  paid {}",
            charge.month,
            charge.year,
            format_amount(&charge.amount),
            charge
                .payment_date
                .map(|d| d.to_string())
                .unwrap_or_default()
        );
    }

    let totals = statement.totals();
    println!("\n💰 Totals:");
    println!("  Paid:    R$ {}", format_amount(&totals.paid));
    println!("  Pending: R$ {}", format_amount(&totals.pending));
    println!("  Overdue: R$ {}", format_amount(&totals.overdue));

    // 4. Settlement hand-off for the oldest overdue charge
    if let Some(oldest) = statement
        .view(ChargeView::Outstanding)
        .into_iter()
        .find(|c| c.is_overdue())
    {
        let settlement = reconciler
            .prepare_settlement("condo-1", &oldest, today)
            .await?;
        println!("\n📲 Settlement hand-off:");
        println!("{}", serde_json::to_string_pretty(&settlement)?);
    }

    Ok(())
}
