//! # szamlamester
//!
//! Extract structured invoice fields from images and PDFs using a
//! vision-capable language model.
//!
//! ## Why a vision model?
//!
//! Hungarian supplier invoices arrive as phone photos and single-page
//! PDFs with wildly different layouts. Template-based OCR breaks on every
//! new supplier; a VLM reads the page the way a bookkeeper would and
//! returns the seven fields that matter. The model is probabilistic, so
//! every claim it makes is re-checked or defaulted deterministically
//! before it reaches the ledger.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document (image / PDF)
//!  │
//!  ├─ 1. Prepare   image passthrough, or first PDF page → 300 DPI JPEG
//!  ├─ 2. Prompt    name the seven fields + the self-party deny list
//!  ├─ 3. VLM       one call, strict-JSON response, bounded timeout
//!  ├─ 4. Validate  counterparty must not alias any of our own companies
//!  ├─ 5. Normalise amount → integer, payment method → open/paid status
//!  └─ 6. Record    appended to the session ledger, exported as CSV
//! ```
//!
//! Documents are processed sequentially and independently: one bad file
//! surfaces one error and the rest of the batch completes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use szamlamester::{process_batch, ExtractionConfig, InvoiceDocument, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider picked up from OPENAI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let docs = vec![InvoiceDocument::from_path("szamla_01.pdf")?];
//!
//!     let mut ledger = Ledger::new();
//!     for result in process_batch(&docs, "Tornyos Pékség Kft.", &config).await? {
//!         match result.outcome {
//!             Ok(record) => ledger.append(record),
//!             Err(e) => eprintln!("{}: {}", result.name, e),
//!         }
//!     }
//!     szamlamester::export_csv(ledger.records(), "szamlak.csv")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `szamlamester` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod ledger;
pub mod normalize;
pub mod party;
pub mod pipeline;
pub mod process;
pub mod prompts;
pub mod provider;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DueDateFallback, ExtractionConfig, ExtractionConfigBuilder};
pub use error::{DocumentError, PipelineError};
pub use export::{export_csv, import_csv, read_csv, write_csv};
pub use ledger::Ledger;
pub use party::{Party, PartyRegistry, REVIEW_SENTINEL};
pub use pipeline::prepare::{DocumentKind, InvoiceDocument, PreparedImage};
pub use process::{extract_record, process_batch, DocumentResult};
pub use provider::{OpenAiVision, VisionModel};
pub use record::{ExtractedFields, InvoiceRecord, PaymentStatus};
