//! Record types: the untrusted wire struct and the finalized ledger row.
//!
//! [`ExtractedFields`] mirrors exactly what the model is asked to return.
//! The Hungarian field names are the wire contract carried over from the
//! production prompt — renaming them would silently break extraction, so
//! they stay Hungarian even though the rest of the crate is English.
//! Every field is optional and untrusted; nothing here reaches the ledger
//! without passing through [`crate::pipeline::extract::finalize_record`].
//!
//! [`InvoiceRecord`] is the finalized row. Its serde renames reproduce the
//! column headers of the original export spreadsheet so the bookkeeper's
//! downstream tooling keeps working.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw structured result requested from the vision model.
///
/// Deserialized from the model's JSON object. Missing fields default per
/// the rules in [`crate::pipeline::extract`]; extra fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedFields {
    /// Counterparty (invoice issuer / seller). Untrusted until validated.
    pub partner: Option<String>,
    /// Issue date, source format passthrough.
    pub datum: Option<String>,
    /// Due date.
    pub hatarido: Option<String>,
    /// Document number.
    pub bizonylatszam: Option<String>,
    /// Bank account number.
    pub bankszamla: Option<String>,
    /// Amount — the model returns this as a string ("12 500 Ft") or a bare
    /// number depending on its mood, so accept any JSON value.
    pub osszeg: Option<serde_json::Value>,
    /// Payment method.
    pub fizetesi_mod: Option<String>,
}

/// Derived payment state.
///
/// A coarse heuristic over the payment-method text, not an authoritative
/// payment state machine: transfer invoices are payable later ("open"),
/// everything else (cash, card) was settled at purchase ("paid").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Open,
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Open => write!(f, "open"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

/// A finalized invoice row, ready for the ledger and the CSV export.
///
/// Invariant: `counterparty` never equals, contains, or aliases a
/// self-party name — validation replaces such values with
/// [`crate::party::REVIEW_SENTINEL`] before this struct is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Which of our companies the invoice was recorded for (the buyer).
    #[serde(rename = "Saját Cég")]
    pub self_party: String,
    /// The invoice issuer, or the review sentinel.
    #[serde(rename = "Partner")]
    pub counterparty: String,
    /// Issue date as printed on the invoice; no date parsing is performed.
    #[serde(rename = "Dátum")]
    pub issue_date: String,
    #[serde(rename = "Határidő")]
    pub due_date: String,
    #[serde(rename = "Bizonylatszám")]
    pub document_no: String,
    #[serde(rename = "Bankszámla")]
    pub bank_account: String,
    /// Whole currency units; 0 when the amount could not be parsed.
    #[serde(rename = "Összeg")]
    pub amount: u64,
    #[serde(rename = "Fizetési mód")]
    pub payment_method: String,
    #[serde(rename = "Státusz")]
    pub status: PaymentStatus,
}
