//! Opening files with the platform's registered handler.

use std::path::Path;

use crate::error::{InvoiceError, Result};

/// Opens a file for the user to look at.
pub trait FileOpener {
    /// Open `path` and report whether the handler accepted it.
    fn open(&self, path: &Path) -> Result<()>;
}

/// Opens files with the desktop's default application.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl FileOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(InvoiceError::OpenFailed {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }

        opener::open(path).map_err(|e| InvoiceError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "Opened file");
        Ok(())
    }
}
