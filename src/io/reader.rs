use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{InvoiceError, Result};

/// Loads PDF documents for merging.
pub struct PdfReader;

impl PdfReader {
    /// Load the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::FailedToLoadPdf`] if the file is missing or not a
    /// readable PDF, and [`InvoiceError::EncryptedPdf`] if it needs a user
    /// password. Files with only an owner password are decrypted on load and
    /// come back without their `/Encrypt` entry.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Document> {
        let path = path.as_ref();
        Self::check_path_exists(path)?;

        let mut doc = Document::load(path)
            .map_err(|err| InvoiceError::failed_to_load_pdf(path, err.to_string()))?;

        if doc.is_encrypted() {
            if doc.encryption_state.is_none() {
                return Err(InvoiceError::EncryptedPdf {
                    path: path.to_path_buf(),
                });
            }
            Self::strip_encryption(&mut doc);
            tracing::debug!(path = %path.display(), "Decrypted PDF with empty user password");
        }

        tracing::debug!(path = %path.display(), pages = doc.get_pages().len(), "Loaded PDF");
        Ok(doc)
    }

    fn strip_encryption(doc: &mut Document) {
        if let Some(Object::Reference(id)) = doc.trailer.remove(b"Encrypt") {
            doc.objects.remove(&id);
        }
        doc.encryption_state = None;
    }

    fn check_path_exists(path: &Path) -> Result<()> {
        if !path.try_exists()? {
            return Err(InvoiceError::failed_to_load_pdf(path, "file not found"));
        }
        if path.is_dir() {
            return Err(InvoiceError::failed_to_load_pdf(path, "path is a directory"));
        }
        Ok(())
    }
}
