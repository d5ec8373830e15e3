//! Producing a merged invoice PDF from one attachment.
//!
//! For each PDF attachment the engine saves the file into the save folder,
//! picks a fresh `merged_<stem>_<n>.pdf` name, and writes the attachment's
//! pages followed by the QR PDF's pages to it.

mod merger;
pub mod naming;

use std::path::PathBuf;

pub use merger::{MergeStatistics, PdfMerger};

use crate::config::Settings;
use crate::error::Result;
use crate::mail::{Attachment, MailSession, Message};

/// Merges invoice attachments with the configured QR PDF.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    qr_pdf: PathBuf,
    save_folder: PathBuf,
}

impl MergeEngine {
    /// Create an engine writing into `save_folder`.
    pub fn new(qr_pdf: impl Into<PathBuf>, save_folder: impl Into<PathBuf>) -> Self {
        Self {
            qr_pdf: qr_pdf.into(),
            save_folder: save_folder.into(),
        }
    }

    /// Create an engine from the user's settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.qr_pdf, &settings.save_folder)
    }

    /// Save `attachment`, merge it with the QR PDF and return the merged path.
    ///
    /// The saved attachment is overwritten if a file of that name exists.
    /// The merged file never overwrites an earlier one.
    ///
    /// # Errors
    ///
    /// Returns the session's save error, a PDF load error for either source,
    /// or a write error for the output. Nothing is written to the merged path
    /// unless both sources loaded.
    pub fn merge<S: MailSession>(
        &self,
        session: &mut S,
        message: &Message,
        attachment: &Attachment,
    ) -> Result<PathBuf> {
        let filename = naming::sanitize_filename(&attachment.filename);
        let saved = self.save_folder.join(&filename);

        session.save_attachment(message, attachment, &saved)?;
        tracing::debug!(path = %saved.display(), "Saved attachment");

        let output = naming::next_merged_path(&self.save_folder, &filename)?;

        let mut merger = PdfMerger::new();
        merger.append(&saved)?.append(&self.qr_pdf)?;
        let stats = merger.write_and_close(&output)?;

        tracing::info!(
            output = %output.display(),
            sources = stats.files_merged,
            pages = stats.total_pages,
            "Merged invoice"
        );
        Ok(output)
    }
}
