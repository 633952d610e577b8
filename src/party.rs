//! Self-party identities and the alias deny-check.
//!
//! Vision models are unreliable at telling the buyer from the seller on
//! visually similar invoice layouts: the buyer's name is usually printed in
//! a box of the same size right next to the issuer's. The prompt instructs
//! the model to never emit the buyer, but a prompt is a mitigation, not a
//! guarantee. [`PartyRegistry::matches_self_party`] is the deterministic
//! safety net layered on top: whatever the model claims, a counterparty
//! that matches any alias of any of our own companies is replaced with
//! [`REVIEW_SENTINEL`] before it can reach the ledger.
//!
//! The check lives here as a plain pure function, not inline in prompt
//! construction, so it can be unit-tested against the full alias list.

use serde::{Deserialize, Serialize};

/// Marker value written to the counterparty field when the extracted name
/// matched one of our own companies and must be checked by a human.
pub const REVIEW_SENTINEL: &str = "ELLENŐRIZNI: AI hiba";

/// One of the operator's own legal entities — always the buyer on a
/// processed invoice, never a valid counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Canonical display name, e.g. "Tornyos Pékség Kft.".
    pub name: String,
    /// Known spellings and abbreviations, including accent-stripped and
    /// truncated forms that show up on real invoices.
    pub aliases: Vec<String>,
}

impl Party {
    pub fn new(name: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The configured set of self-party identities.
///
/// The alias check runs over *all* parties, not just the one selected for
/// the current batch: an invoice recorded for company A can still carry
/// company B's name in the buyer box when the model grabs the wrong side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistry {
    parties: Vec<Party>,
}

impl Default for PartyRegistry {
    /// The two companies this tool was built for. Aliases cover the legal
    /// name, the accent-less spelling, and the bare brand fragment, all of
    /// which appear on real supplier invoices.
    fn default() -> Self {
        Self {
            parties: vec![
                Party::new(
                    "Tornyos Pékség Kft.",
                    &["Tornyos Pékség Kft.", "Tornyos Pekseg", "Tornyos"],
                ),
                Party::new(
                    "DJ & K BT.",
                    &["DJ & K BT.", "DJ és K Bt", "DJ & K", "DJ és K"],
                ),
            ],
        }
    }
}

impl PartyRegistry {
    pub fn new(parties: Vec<Party>) -> Self {
        Self { parties }
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    /// Look up a party by its canonical name (exact match).
    pub fn find(&self, name: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.name == name)
    }

    /// Comma-separated canonical names, for error messages and CLI help.
    pub fn known_names(&self) -> String {
        self.parties
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Every alias of every party, for the prompt's deny list.
    pub fn all_aliases(&self) -> impl Iterator<Item = &str> {
        self.parties
            .iter()
            .flat_map(|p| p.aliases.iter().map(|a| a.as_str()))
    }

    /// True when `candidate` case-insensitively contains any alias of any
    /// configured party — i.e. the model returned one of our own companies
    /// as the counterparty.
    pub fn matches_self_party(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        self.all_aliases()
            .any(|alias| candidate.contains(&alias.to_lowercase()))
    }

    /// Validate an extracted counterparty: pass it through unchanged, or
    /// replace it with [`REVIEW_SENTINEL`] when it aliases a self-party.
    pub fn validate_counterparty(&self, candidate: &str) -> String {
        if self.matches_self_party(candidate) {
            REVIEW_SENTINEL.to_string()
        } else {
            candidate.to_string()
        }
    }
}
