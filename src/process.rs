//! Batch processing entry points.
//!
//! Documents are processed **sequentially**, one blocking model call each.
//! Each document's processing is independent: a failure is captured in its
//! [`DocumentResult`] and the loop moves on. The batch is best-effort per
//! item, never all-or-nothing — the only shared-state mutation (the ledger
//! append) happens outside this module, once per successful record, in
//! processing order.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, PipelineError};
use crate::pipeline::{extract, prepare};
use crate::pipeline::prepare::InvoiceDocument;
use crate::prompts;
use crate::provider::{resolve_provider, VisionModel};
use crate::record::InvoiceRecord;
use std::time::Instant;
use tracing::{info, warn};

/// Per-document outcome: a finalized record or the error that stopped this
/// one document, paired with the file name for display.
#[derive(Debug)]
pub struct DocumentResult {
    pub name: String,
    pub outcome: Result<InvoiceRecord, DocumentError>,
    pub duration_ms: u64,
}

impl DocumentResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Extract one validated record from one document.
///
/// Prepare → prompt → model call → parse → finalize. Any failure is scoped
/// to this document.
pub async fn extract_record(
    doc: &InvoiceDocument,
    self_party_name: &str,
    provider: &dyn VisionModel,
    config: &ExtractionConfig,
) -> Result<InvoiceRecord, DocumentError> {
    let self_party = config
        .parties
        .find(self_party_name)
        .cloned()
        // The batch entry point validates the name up front; reaching this
        // with an unknown name means the caller bypassed process_batch.
        .ok_or_else(|| DocumentError::Extraction {
            detail: format!("unknown company '{self_party_name}'"),
        })?;

    let image = prepare::prepare(doc, config).await?;
    let prompt = prompts::extraction_prompt(&self_party, &config.parties);
    let fields = extract::extract_fields(provider, &prompt, &image, config.api_timeout_secs).await?;
    Ok(extract::finalize_record(fields, &self_party, config))
}

/// Process a batch of documents for one self-party.
///
/// Returns one [`DocumentResult`] per input document, in input order.
/// Only setup failures (unknown company, no provider) are fatal; every
/// per-document failure is isolated in its result.
pub async fn process_batch(
    documents: &[InvoiceDocument],
    self_party_name: &str,
    config: &ExtractionConfig,
) -> Result<Vec<DocumentResult>, PipelineError> {
    if config.parties.find(self_party_name).is_none() {
        return Err(PipelineError::UnknownParty {
            name: self_party_name.to_string(),
            known: config.parties.known_names(),
        });
    }

    let provider = resolve_provider(config)?;
    info!(
        "Processing {} documents for '{}' via {}",
        documents.len(),
        self_party_name,
        provider.name()
    );

    let mut results = Vec::with_capacity(documents.len());
    for doc in documents {
        let start = Instant::now();
        let outcome = extract_record(doc, self_party_name, provider.as_ref(), config).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(record) => info!(
                "'{}': {} — {} ({}ms)",
                doc.name, record.counterparty, record.amount, duration_ms
            ),
            Err(e) => warn!("'{}': {} ({}ms)", doc.name, e, duration_ms),
        }

        results.push(DocumentResult {
            name: doc.name.clone(),
            outcome,
            duration_ms,
        });
    }

    let ok = results.iter().filter(|r| r.is_ok()).count();
    info!("Batch complete: {}/{} documents extracted", ok, results.len());
    Ok(results)
}
