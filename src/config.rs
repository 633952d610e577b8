//! Configuration types for invoice extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share a config across a batch, log it, and diff two
//! runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::PipelineError;
use crate::party::PartyRegistry;
use crate::provider::VisionModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What to write into the due-date column when the model omits it.
///
/// The observed production behaviour was inconsistent between variants of
/// the tool, so this is a configuration choice rather than a fixed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DueDateFallback {
    /// Copy the issue date — cash-like invoices are due on issue. (default)
    #[default]
    IssueDate,
    /// Leave the field empty for the bookkeeper to fill in.
    Empty,
}

/// Configuration for invoice extraction.
///
/// Built via [`ExtractionConfig::builder()`] or
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use szamlamester::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .model("gpt-4o")
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI for the first PDF page. Range: 72–600. Default: 300.
    ///
    /// Invoices carry small print (bank account numbers, document numbers)
    /// that a vision model misreads below roughly 200 DPI. 300 matches the
    /// production deployment; lower it only for very large page sizes.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2400.
    ///
    /// A safety cap independent of DPI: a 300-DPI render of an A3 sheet
    /// would produce a 3500 × 5000 px image and blow past API upload
    /// limits. The cap bounds either dimension, scaling the other
    /// proportionally.
    pub max_rendered_pixels: u32,

    /// JPEG quality for rendered PDF pages (1–100). Default: 85.
    ///
    /// Invoices are high-contrast black-on-white; 85 keeps digits legible
    /// while staying well under request-size limits. Uploaded raster images
    /// are passed through unchanged and are not re-encoded.
    pub jpeg_quality: u8,

    /// Vision model identifier. Default: "gpt-4o".
    pub model: String,

    /// Pre-constructed vision provider. Takes precedence over environment
    /// auto-detection; the way tests inject a mock.
    pub provider: Option<Arc<dyn VisionModel>>,

    /// Sampling temperature. Default: 0.0.
    ///
    /// Extraction is transcription, not generation — any creativity is an
    /// error source. Zero makes the model as deterministic as the API allows.
    pub temperature: f32,

    /// Maximum tokens the model may generate per invoice. Default: 1024.
    ///
    /// The seven-field JSON object fits in well under 300 tokens; 1024
    /// leaves room for long bank-account and free-text payment fields.
    pub max_tokens: usize,

    /// Per-model-call timeout in seconds. Default: 60.
    ///
    /// There is no retry: a timeout surfaces as a per-document error and
    /// the batch moves on. The operator re-uploads the one failed file.
    pub api_timeout_secs: u64,

    /// Due-date column policy when the model omits the field.
    pub due_date_fallback: DueDateFallback,

    /// The operator's own companies, used both in the prompt's deny list
    /// and in the post-extraction counterparty validation.
    pub parties: PartyRegistry,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 2400,
            jpeg_quality: 85,
            model: "gpt-4o".to_string(),
            provider: None,
            temperature: 0.0,
            max_tokens: 1024,
            api_timeout_secs: 60,
            due_date_fallback: DueDateFallback::default(),
            parties: PartyRegistry::default(),
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn VisionModel>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("due_date_fallback", &self.due_date_fallback)
            .field("parties", &self.parties)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn VisionModel>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn due_date_fallback(mut self, policy: DueDateFallback) -> Self {
        self.config.due_date_fallback = policy;
        self
    }

    pub fn parties(mut self, registry: PartyRegistry) -> Self {
        self.config.parties = registry;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PipelineError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(PipelineError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.model.is_empty() {
            return Err(PipelineError::InvalidConfig("Model id must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.parties.parties().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Party registry must contain at least one company".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production() {
        let c = ExtractionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.due_date_fallback, DueDateFallback::IssueDate);
        assert_eq!(c.parties.parties().len(), 2);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = ExtractionConfig::builder()
            .dpi(10_000)
            .jpeg_quality(0)
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 600);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn build_rejects_empty_model() {
        let err = ExtractionConfig::builder().model("").build();
        assert!(matches!(err, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn build_rejects_empty_registry() {
        let err = ExtractionConfig::builder()
            .parties(PartyRegistry::new(vec![]))
            .build();
        assert!(matches!(err, Err(PipelineError::InvalidConfig(_))));
    }
}
