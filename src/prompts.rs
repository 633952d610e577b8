//! Prompt construction for vision-model invoice extraction.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the instruction text is the most
//!    important correctness lever in the system; changing it should require
//!    editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the built prompt directly
//!    without calling a real model, so regressions (a dropped field name,
//!    a missing deny alias) are caught cheaply.
//!
//! The prompt is Hungarian because the invoices are Hungarian and the
//! production deployment settled on this wording after the model repeatedly
//! wrote the buyer into the partner field. The JSON field names listed at
//! the end are the wire contract of [`crate::record::ExtractedFields`].

use crate::party::{Party, PartyRegistry};

/// The seven fields the model must return, in the order they are named in
/// the prompt. Must stay in sync with [`crate::record::ExtractedFields`].
pub const RESPONSE_FIELDS: [&str; 7] = [
    "partner",
    "datum",
    "hatarido",
    "bizonylatszam",
    "bankszamla",
    "osszeg",
    "fizetesi_mod",
];

/// Build the extraction instruction for one invoice.
///
/// Names the required output fields, states which company is the buyer on
/// this invoice, and lists every self-party alias as forbidden in the
/// partner field. The deny list covers *all* registered parties, not just
/// the selected one — the model cannot be trusted to know which of our
/// companies it is looking at.
pub fn extraction_prompt(self_party: &Party, registry: &PartyRegistry) -> String {
    let deny_list = registry.all_aliases().collect::<Vec<_>>().join(", ");
    format!(
        "Elemezd a számlát.\n\
         A 'partner' mezőbe CSAK a számla KIÁLLÍTÓJÁT (eladó) írd!\n\
         TILOS a partnerhez a vevőt írni.\n\
         A vevő neve ezen a számlán ez: {buyer}. Ezt SOHA ne írd a partner mezőbe!\n\
         Tiltott nevek a partner mezőben: {deny_list}.\n\
         Válaszolj egyetlen JSON objektummal, pontosan ezekkel a mezőkkel: \
         {fields}.",
        buyer = self_party.name,
        deny_list = deny_list,
        fields = RESPONSE_FIELDS.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_response_field() {
        let reg = PartyRegistry::default();
        let party = reg.find("Tornyos Pékség Kft.").unwrap();
        let prompt = extraction_prompt(party, &reg);
        for field in RESPONSE_FIELDS {
            assert!(prompt.contains(field), "prompt missing field '{field}'");
        }
    }

    #[test]
    fn prompt_names_the_buyer_and_all_deny_aliases() {
        let reg = PartyRegistry::default();
        let party = reg.find("DJ & K BT.").unwrap();
        let prompt = extraction_prompt(party, &reg);
        assert!(prompt.contains("DJ & K BT."));
        // Aliases of the *other* company must be in the deny list too.
        assert!(prompt.contains("Tornyos Pekseg"));
        assert!(prompt.contains("DJ és K"));
    }

    #[test]
    fn prompt_forbids_the_buyer_in_partner_field() {
        let reg = PartyRegistry::default();
        let party = reg.find("Tornyos Pékség Kft.").unwrap();
        let prompt = extraction_prompt(party, &reg);
        assert!(prompt.contains("TILOS"));
        assert!(prompt.contains("SOHA"));
    }
}
