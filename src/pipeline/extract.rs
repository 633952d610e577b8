//! Extraction: drive the vision-model call and finalize the record.
//!
//! This module is intentionally thin on prompt engineering — the
//! instruction text lives in [`crate::prompts`] — and intentionally thick
//! on distrust: everything the model returns is re-checked or defaulted
//! before it becomes an [`InvoiceRecord`].
//!
//! The core design insight of the whole pipeline lives in
//! [`finalize_record`]: never let an unverified model claim about party
//! identity flow into the ledger unchecked. The counterparty re-check is a
//! deterministic safety net layered on top of a probabilistic output.

use crate::config::{DueDateFallback, ExtractionConfig};
use crate::error::DocumentError;
use crate::normalize::{derive_status, normalize_amount};
use crate::party::Party;
use crate::pipeline::prepare::PreparedImage;
use crate::provider::VisionModel;
use crate::record::{ExtractedFields, InvoiceRecord};
use std::time::Duration;
use tracing::{debug, warn};

/// Submit one prepared image to the model and parse the structured result.
///
/// The call is bounded by `timeout_secs` regardless of the provider's own
/// HTTP timeout, so an injected provider cannot hang the batch. A timeout
/// is a per-document error, equivalent in effect to any other API failure.
pub async fn extract_fields(
    provider: &dyn VisionModel,
    prompt: &str,
    image: &PreparedImage,
    timeout_secs: u64,
) -> Result<ExtractedFields, DocumentError> {
    let raw = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        provider.extract_json(prompt, image),
    )
    .await
    .map_err(|_| DocumentError::Timeout { secs: timeout_secs })??;

    debug!("Parsing {} bytes of model output", raw.len());
    serde_json::from_str(raw.trim()).map_err(|e| DocumentError::MalformedResponse {
        detail: e.to_string(),
    })
}

/// Turn untrusted extracted fields into a finalized [`InvoiceRecord`].
///
/// Applies, in order:
/// 1. counterparty validation — a name aliasing any self-party is replaced
///    with the review sentinel, never accepted as a seller
/// 2. per-field defaults ("-" placeholders, "Átutalás", due-date fallback)
/// 3. amount normalisation (degrades to 0, never fails)
/// 4. status derivation from the payment-method text
pub fn finalize_record(
    fields: ExtractedFields,
    self_party: &Party,
    config: &ExtractionConfig,
) -> InvoiceRecord {
    let raw_partner = fields
        .partner
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| "Ismeretlen".to_string());
    let counterparty = config.parties.validate_counterparty(&raw_partner);
    if counterparty != raw_partner {
        warn!(
            "Counterparty '{}' matched a self-party alias — flagged for review",
            raw_partner
        );
    }

    let issue_date = fields.datum.unwrap_or_default();
    let due_date = fields
        .hatarido
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| match config.due_date_fallback {
            DueDateFallback::IssueDate => issue_date.clone(),
            DueDateFallback::Empty => String::new(),
        });

    let payment_method = fields
        .fizetesi_mod
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Átutalás".to_string());
    let status = derive_status(&payment_method);
    let amount = normalize_amount(fields.osszeg.as_ref());

    InvoiceRecord {
        self_party: self_party.name.clone(),
        counterparty,
        issue_date,
        due_date,
        document_no: placeholder_if_empty(fields.bizonylatszam),
        bank_account: placeholder_if_empty(fields.bankszamla),
        amount,
        payment_method,
        status,
    }
}

fn placeholder_if_empty(value: Option<String>) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::party::REVIEW_SENTINEL;
    use crate::record::PaymentStatus;

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    fn party(cfg: &ExtractionConfig) -> Party {
        cfg.parties.find("Tornyos Pékség Kft.").unwrap().clone()
    }

    fn fields(json: &str) -> ExtractedFields {
        serde_json::from_str(json).expect("test fields must deserialize")
    }

    #[test]
    fn complete_invoice_finalizes_cleanly() {
        let cfg = config();
        let rec = finalize_record(
            fields(
                r#"{"partner":"Malom Zrt.","datum":"2024.03.11","hatarido":"2024.03.19",
                   "bizonylatszam":"SZ-118","bankszamla":"11711041-1","osszeg":"48 260 Ft",
                   "fizetesi_mod":"Átutalás"}"#,
            ),
            &party(&cfg),
            &cfg,
        );
        assert_eq!(rec.self_party, "Tornyos Pékség Kft.");
        assert_eq!(rec.counterparty, "Malom Zrt.");
        assert_eq!(rec.amount, 48260);
        assert_eq!(rec.status, PaymentStatus::Open);
    }

    #[test]
    fn self_party_counterparty_becomes_sentinel() {
        let cfg = config();
        let rec = finalize_record(
            fields(r#"{"partner":"Tornyos Pékség Kft.","datum":"2024.01.05","osszeg":5000}"#),
            &party(&cfg),
            &cfg,
        );
        assert_eq!(rec.counterparty, REVIEW_SENTINEL);
        // The rest of the record is still populated.
        assert_eq!(rec.amount, 5000);
        assert_eq!(rec.issue_date, "2024.01.05");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let cfg = config();
        let rec = finalize_record(fields("{}"), &party(&cfg), &cfg);
        assert_eq!(rec.counterparty, "Ismeretlen");
        assert_eq!(rec.issue_date, "");
        assert_eq!(rec.due_date, "");
        assert_eq!(rec.document_no, "-");
        assert_eq!(rec.bank_account, "-");
        assert_eq!(rec.amount, 0);
        assert_eq!(rec.payment_method, "Átutalás");
        assert_eq!(rec.status, PaymentStatus::Open, "default method is a transfer");
    }

    #[test]
    fn due_date_falls_back_to_issue_date_by_default() {
        let cfg = config();
        let rec = finalize_record(
            fields(r#"{"partner":"Malom Zrt.","datum":"2024.03.11"}"#),
            &party(&cfg),
            &cfg,
        );
        assert_eq!(rec.due_date, "2024.03.11");
    }

    #[test]
    fn due_date_fallback_empty_leaves_it_blank() {
        let cfg = ExtractionConfig::builder()
            .due_date_fallback(DueDateFallback::Empty)
            .build()
            .unwrap();
        let rec = finalize_record(
            fields(r#"{"partner":"Malom Zrt.","datum":"2024.03.11"}"#),
            &party(&cfg),
            &cfg,
        );
        assert_eq!(rec.due_date, "");
    }

    #[test]
    fn unparsable_amount_degrades_to_zero_not_failure() {
        let cfg = config();
        let rec = finalize_record(
            fields(r#"{"partner":"Malom Zrt.","datum":"2024.03.11","osszeg":"n/a",
                       "fizetesi_mod":"készpénz"}"#),
            &party(&cfg),
            &cfg,
        );
        assert_eq!(rec.amount, 0);
        assert_eq!(rec.counterparty, "Malom Zrt.");
        assert_eq!(rec.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn malformed_response_is_a_document_error() {
        struct Garbage;
        #[async_trait::async_trait]
        impl VisionModel for Garbage {
            async fn extract_json(
                &self,
                _prompt: &str,
                _image: &PreparedImage,
            ) -> Result<String, DocumentError> {
                Ok("I'm sorry, I can't read this invoice.".to_string())
            }
            fn name(&self) -> &str {
                "garbage"
            }
        }

        let image = PreparedImage {
            base64: String::new(),
            mime: "image/png",
        };
        let err = extract_fields(&Garbage, "prompt", &image, 5)
            .await
            .expect_err("non-JSON must fail");
        assert!(matches!(err, DocumentError::MalformedResponse { .. }));
    }

    // start_paused: the timer auto-advances, so the 1s timeout fires
    // instantly instead of stalling the test suite.
    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        struct Sleeper;
        #[async_trait::async_trait]
        impl VisionModel for Sleeper {
            async fn extract_json(
                &self,
                _prompt: &str,
                _image: &PreparedImage,
            ) -> Result<String, DocumentError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("{}".to_string())
            }
            fn name(&self) -> &str {
                "sleeper"
            }
        }

        let image = PreparedImage {
            base64: String::new(),
            mime: "image/png",
        };
        let err = extract_fields(&Sleeper, "prompt", &image, 1)
            .await
            .expect_err("must time out");
        assert!(matches!(err, DocumentError::Timeout { secs: 1 }));
    }
}
