//! Deterministic normalisation of untrusted model output.
//!
//! The model returns the amount in whatever shape it saw on the paper:
//! `"1 234,50 Ft"`, `"15000"`, `12500` as a bare JSON number, or garbage.
//! These are plain pure functions — no model state, no configuration — so
//! the whole normalisation surface is unit-testable without an API key.
//!
//! ## Failure policy
//!
//! Amount normalisation never fails outward: anything unparsable degrades
//! to `0` and the rest of the record is still recorded. A zero-amount row
//! in the ledger is obvious to the human reviewing it; a dropped row is not.

use crate::record::PaymentStatus;
use once_cell::sync::Lazy;
use regex::Regex;

/// Payment-method fragments that mean "bank transfer, payable later".
/// `"utal"` covers "átutalás"/"utalás" and their inflected forms.
const TRANSFER_KEYWORDS: &[&str] = &["utal", "transfer"];

/// Trailing currency markers stripped before numeric parsing.
static RE_CURRENCY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(ft|huf|eur|usd|€|\$)\.?$").unwrap());

/// Parse a Hungarian-formatted amount string into whole currency units.
///
/// Steps, in order:
/// 1. strip all whitespace (including the non-breaking thousands separator)
/// 2. strip one trailing currency marker ("Ft", "HUF", …)
/// 3. convert a decimal comma to a decimal point
/// 4. parse as `f64` and round half-away-from-zero
///
/// Returns `None` for anything that does not survive the parse, including
/// negative values — the record's amount is non-negative by contract.
pub fn parse_amount(raw: &str) -> Option<u64> {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let stripped = RE_CURRENCY_SUFFIX.replace(&stripped, "");
    let normalised = stripped.replace(',', ".");
    if normalised.is_empty() {
        return None;
    }
    let value: f64 = normalised.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.round() as u64)
}

/// Normalise the model's amount field (string or number) to whole currency
/// units, degrading to `0` on any failure.
pub fn normalize_amount(raw: Option<&serde_json::Value>) -> u64 {
    match raw {
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => parse_amount(s).unwrap_or(0),
        _ => 0,
    }
}

/// Derive the payment status from the payment-method text.
///
/// Case-insensitive keyword match: transfer-type methods are `Open`
/// (payable later), everything else is `Paid`.
pub fn derive_status(payment_method: &str) -> PaymentStatus {
    let lower = payment_method.to_lowercase();
    if TRANSFER_KEYWORDS.iter().any(|k| lower.contains(k)) {
        PaymentStatus::Open
    } else {
        PaymentStatus::Paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hungarian_format_with_currency() {
        assert_eq!(parse_amount("1 234,50 Ft"), Some(1235)); // half rounds up
        assert_eq!(parse_amount("12 500 Ft"), Some(12500));
        assert_eq!(parse_amount("48 260,00 HUF"), Some(48260));
    }

    #[test]
    fn plain_numbers() {
        assert_eq!(parse_amount("15000"), Some(15000));
        assert_eq!(parse_amount("1234.5"), Some(1235));
        assert_eq!(parse_amount("1234.4"), Some(1234));
        assert_eq!(parse_amount("0"), Some(0));
    }

    #[test]
    fn half_boundary_rounds_away_from_zero() {
        // The rounding rule is fixed deliberately: .5 always rounds up for
        // the non-negative amounts this pipeline produces.
        assert_eq!(parse_amount("0,5"), Some(1));
        assert_eq!(parse_amount("2,5"), Some(3));
        assert_eq!(parse_amount("1234,5"), Some(1235));
    }

    #[test]
    fn nonbreaking_space_separator() {
        assert_eq!(parse_amount("1\u{a0}234\u{a0}567 Ft"), Some(1234567));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("Ft"), None);
        assert_eq!(parse_amount("-500"), None); // negative is a parse failure
    }

    #[test]
    fn normalize_handles_all_json_shapes() {
        assert_eq!(normalize_amount(Some(&json!("12 500 Ft"))), 12500);
        assert_eq!(normalize_amount(Some(&json!(12500))), 12500);
        assert_eq!(normalize_amount(Some(&json!(1234.5))), 1235);
        assert_eq!(normalize_amount(Some(&json!(null))), 0);
        assert_eq!(normalize_amount(Some(&json!("n/a"))), 0);
        assert_eq!(normalize_amount(Some(&json!(-42))), 0);
        assert_eq!(normalize_amount(None), 0);
    }

    #[test]
    fn transfer_methods_are_open() {
        assert_eq!(derive_status("Átutalás"), PaymentStatus::Open);
        assert_eq!(derive_status("ÁTUTALÁS"), PaymentStatus::Open);
        assert_eq!(derive_status("banki átutalás 8 napon belül"), PaymentStatus::Open);
        assert_eq!(derive_status("wire transfer"), PaymentStatus::Open);
    }

    #[test]
    fn other_methods_are_paid() {
        assert_eq!(derive_status("Készpénz"), PaymentStatus::Paid);
        assert_eq!(derive_status("cash"), PaymentStatus::Paid);
        assert_eq!(derive_status("bankkártya"), PaymentStatus::Paid);
        assert_eq!(derive_status(""), PaymentStatus::Paid);
    }
}
