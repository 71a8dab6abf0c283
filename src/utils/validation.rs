//! Validation and parsing utilities

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> BillingResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(BillingError::InvalidAmount(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a unit identifier is usable as a lookup key
pub fn validate_unit(unit: &str) -> BillingResult<()> {
    if unit.trim().is_empty() {
        return Err(BillingError::Validation(
            "Unit cannot be empty".to_string(),
        ));
    }

    if unit.len() > 20 {
        return Err(BillingError::Validation(
            "Unit cannot exceed 20 characters".to_string(),
        ));
    }

    if !unit
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '/' || c == ' ')
    {
        return Err(BillingError::Validation(
            "Unit can only contain alphanumeric characters, dashes, slashes, and spaces"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate a due day of month
pub fn validate_due_day(day: u32) -> BillingResult<()> {
    if (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(BillingError::Validation(format!(
            "Due day must be between 1 and 31, got {}",
            day
        )))
    }
}

/// Validate that a PIX key matches its declared type
pub fn validate_pix_key(pix_key: &PixKey) -> BillingResult<()> {
    let key = pix_key.key.trim();
    if key.is_empty() {
        return Err(BillingError::Validation(
            "Payee key cannot be empty".to_string(),
        ));
    }

    let digits = key.chars().filter(|c| c.is_ascii_digit()).count();
    let valid = match pix_key.key_type {
        PixKeyType::Cpf => digits == 11,
        PixKeyType::Cnpj => digits == 14,
        PixKeyType::Email => key
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.')),
        PixKeyType::Phone => key.starts_with('+') && (10..=15).contains(&digits),
        PixKeyType::Random => key.len() == 36 && uuid::Uuid::parse_str(key).is_ok(),
    };

    if valid {
        Ok(())
    } else {
        Err(BillingError::Validation(format!(
            "Payee key '{}' is not a valid {:?} key",
            key, pix_key.key_type
        )))
    }
}

/// Parse a money amount as residents and managers type it.
///
/// Accepts Brazilian notation (`"350,00"`, `"1.234,56"`, optional `R$`
/// prefix) and plain decimal notation (`"350.00"`). Without a comma, a dot is
/// read as the decimal separator, except that a single dot followed by
/// exactly three digits (`"1.234"`) is rejected: it could be a thousands
/// separator. Negative amounts are rejected.
pub fn parse_amount(input: &str) -> BillingResult<BigDecimal> {
    let invalid = || BillingError::InvalidAmount(input.to_string());

    let raw = input.trim();
    let raw = raw.strip_prefix("R$").unwrap_or(raw).trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return Err(invalid());
    }

    let normalized = match raw.split_once(',') {
        Some((integer, fraction)) => {
            if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            let groups: Vec<&str> = integer.split('.').collect();
            let grouped_ok = groups.len() == 1
                || (!groups[0].is_empty()
                    && groups[0].len() <= 3
                    && groups[1..].iter().all(|g| g.len() == 3));
            if integer.is_empty() || !grouped_ok {
                return Err(invalid());
            }
            format!("{}.{}", groups.concat(), fraction)
        }
        None => {
            if raw.starts_with('.') || raw.ends_with('.') || raw.matches('.').count() > 1 {
                return Err(invalid());
            }
            if matches!(raw.split_once('.'), Some((_, fraction)) if fraction.len() == 3) {
                return Err(invalid());
            }
            raw.to_string()
        }
    };

    BigDecimal::from_str(&normalized).map_err(|_| invalid())
}

/// Render an amount in Brazilian notation with two decimals (`"1.234,56"`)
pub fn format_amount(amount: &BigDecimal) -> String {
    let rounded = amount.round(2).with_scale(2);
    let text = rounded.abs().to_string();
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if rounded < BigDecimal::from(0) { "-" } else { "" };
    format!("{}{},{}", sign, grouped, fraction)
}
