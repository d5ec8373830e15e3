use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use lopdf::Document;

use crate::error::{InvoiceError, Result};

/// Serializes PDF documents to disk.
pub struct PdfWriter;

impl PdfWriter {
    /// Write `doc` to `path`, replacing any existing file.
    ///
    /// The file is flushed and synced before returning, so a successful
    /// return means the merged file is durable.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::FailedToCreateOutput`] if the file cannot be
    /// created and [`InvoiceError::FailedToWrite`] if serialization or the
    /// final sync fails.
    pub fn write<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| InvoiceError::FailedToCreateOutput {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let file = File::create(path).map_err(|source| InvoiceError::FailedToCreateOutput {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        let write_failed = |source: io::Error| InvoiceError::FailedToWrite {
            path: path.to_path_buf(),
            source,
        };

        doc.save_to(&mut writer).map_err(|e| write_failed(io::Error::other(e)))?;
        writer.flush().map_err(write_failed)?;
        writer.get_ref().sync_all().map_err(write_failed)?;

        tracing::debug!(path = %path.display(), "Wrote PDF");
        Ok(())
    }
}
