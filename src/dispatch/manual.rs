use std::io;
use std::path::PathBuf;

use crate::dispatch::{MergeRecord, Selection};
use crate::error::{InvoiceError, Result};
use crate::mail::{MailSession, OutgoingMessage};

/// Subject of manually sent invoices.
pub const INVOICE_SUBJECT: &str = "Invoice";

/// Body of manually sent invoices.
pub const INVOICE_BODY: &str = "Please find the invoice attached.";

/// Merge results awaiting manual dispatch, in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    rows: Vec<MergeRecord>,
}

impl ResultTable {
    /// Create a table holding `rows`.
    pub fn new(rows: Vec<MergeRecord>) -> Self {
        Self { rows }
    }

    /// All rows.
    pub fn rows(&self) -> &[MergeRecord] {
        &self.rows
    }

    /// The row numbered `row` (1-based).
    pub fn get(&self, row: usize) -> Option<&MergeRecord> {
        row.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build the outgoing message for one row.
    pub fn outgoing_for(record: &MergeRecord, to: &str) -> OutgoingMessage {
        OutgoingMessage {
            to: to.to_string(),
            subject: INVOICE_SUBJECT.to_string(),
            body: INVOICE_BODY.to_string(),
            attachments: vec![record.path.clone()],
        }
    }

    /// Send each selected row as its own message to `to`.
    ///
    /// Rows are sent in table order. Sending stops at the first failure;
    /// rows sent before it stay sent.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::InvalidConfig`] for a blank recipient,
    /// [`InvoiceError::InvalidSelection`] for rows past the end, or the
    /// session's send error.
    pub fn send_selected<S: MailSession>(
        &self,
        session: &mut S,
        selection: &Selection,
        to: &str,
    ) -> Result<usize> {
        let to = to.trim();
        if to.is_empty() {
            return Err(InvoiceError::invalid_config("Forward-to address is not set"));
        }

        let indexes = selection.indexes(self.rows.len())?;
        for &i in &indexes {
            let record = &self.rows[i];
            session.send(&Self::outgoing_for(record, to))?;
            tracing::info!(path = %record.path.display(), to, "Sent invoice");
        }

        Ok(indexes.len())
    }

    /// Delete the merged files of the selected rows, then the rows.
    ///
    /// A file that is already gone is logged and its row is still removed.
    /// Returns the paths of the removed rows.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::InvalidSelection`] for rows past the end. If a
    /// file cannot be removed, the I/O error is returned. Rows after it are
    /// already gone; that row and the rows before it are kept.
    pub fn delete_selected(&mut self, selection: &Selection) -> Result<Vec<PathBuf>> {
        let indexes = selection.indexes(self.rows.len())?;
        let mut removed = Vec::with_capacity(indexes.len());

        // Highest first so earlier indexes stay valid.
        for &i in indexes.iter().rev() {
            let path = &self.rows[i].path;
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!(path = %path.display(), "Merged file was already deleted");
                }
                Err(err) => return Err(err.into()),
            }
            removed.push(self.rows.remove(i).path);
        }

        removed.reverse();
        Ok(removed)
    }
}

impl From<Vec<MergeRecord>> for ResultTable {
    fn from(rows: Vec<MergeRecord>) -> Self {
        Self::new(rows)
    }
}
