//! The session ledger: an explicit, ordered collection of finalized records.
//!
//! Owned by the application shell and passed where needed — never ambient
//! state. Insertion order is processing order; the only mutations are
//! `append` and `remove` (delete-by-position, the "delete the bad row"
//! operation from the original tool).

use crate::record::InvoiceRecord;

/// Ordered collection of [`InvoiceRecord`] values for the current session.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<InvoiceRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; ledger order is processing order.
    pub fn append(&mut self, record: InvoiceRecord) {
        self.records.push(record);
    }

    /// Remove the record at `index`, shifting later rows up.
    /// Returns `None` when the index is out of range.
    pub fn remove(&mut self, index: usize) -> Option<InvoiceRecord> {
        if index < self.records.len() {
            Some(self.records.remove(index))
        } else {
            None
        }
    }

    pub fn records(&self) -> &[InvoiceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
