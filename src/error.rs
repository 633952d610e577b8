//! Error types for the szamlamester library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal**: the batch cannot run at all (invalid
//!   configuration, no vision provider available, export file cannot be
//!   written). Returned as `Err(PipelineError)` from the top-level entry
//!   points.
//!
//! * [`DocumentError`] — **Non-fatal**: a single invoice failed (unreadable
//!   upload, API failure, garbage response) but all other documents in the
//!   batch are fine. Stored inside [`crate::process::DocumentResult`] so
//!   callers can surface the failure per-file without losing the rest of
//!   the batch.
//!
//! Amount normalisation failure is deliberately absent from both enums: it
//! degrades to a zero amount inside the record and is never propagated.
//! A bookkeeper reviewing the ledger catches zero-amount rows; a hard error
//! would throw away the six fields that did extract correctly.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the szamlamester library.
///
/// Per-document failures use [`DocumentError`] and are stored in
/// [`crate::process::DocumentResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No vision provider could be constructed (missing API key etc.).
    #[error("Vision provider is not configured.\n{hint}")]
    ProviderNotConfigured { hint: String },

    /// The self-party named by the caller is not in the party registry.
    #[error("Unknown company '{name}'. Known companies: {known}")]
    UnknownParty { name: String, known: String },

    /// Could not create or write the export file.
    #[error("Failed to write export file '{}': {detail}", path.display())]
    ExportFailed { path: PathBuf, detail: String },

    /// Could not read the export file back.
    #[error("Failed to read export file '{}': {detail}", path.display())]
    ImportFailed { path: PathBuf, detail: String },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error scoped to a single invoice document.
///
/// The batch continues past any of these; the caller decides whether to
/// log, display, or collect them for a post-run report.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The uploaded file could not be decoded as an image or PDF.
    #[error("'{name}': cannot decode document: {detail}")]
    Decode { name: String, detail: String },

    /// The vision API call failed (network, HTTP error, refusal).
    #[error("Vision API call failed: {detail}")]
    Extraction { detail: String },

    /// The vision API call exceeded the configured timeout.
    #[error("Vision API call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The model response was not valid JSON.
    #[error("Model response is not valid JSON: {detail}")]
    MalformedResponse { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_display_names_the_file() {
        let e = DocumentError::Decode {
            name: "szamla_03.pdf".into(),
            detail: "not a PDF".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("szamla_03.pdf"), "got: {msg}");
        assert!(msg.contains("not a PDF"));
    }

    #[test]
    fn timeout_display() {
        let e = DocumentError::Timeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn unknown_party_lists_known_names() {
        let e = PipelineError::UnknownParty {
            name: "Acme".into(),
            known: "Tornyos Pékség Kft., DJ & K BT.".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Acme"));
        assert!(msg.contains("Tornyos Pékség Kft."));
    }
}
