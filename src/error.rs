//! Error types for invoicecat.
//!
//! Every failure the pipeline can hit is a variant of [`InvoiceError`].
//! Errors fall into a few families:
//!
//! - **Connection**: the mail client could not be reached
//! - **Folder**: the default folder or the configured subfolder is missing
//! - **I/O**: saving an attachment or writing a merged PDF failed
//! - **Merge**: a source PDF could not be concatenated
//! - **Config**: the settings record is unusable or a field failed to parse
//! - **Send**: the outgoing mail transport rejected a message

use std::io;
use std::path::PathBuf;

/// Result type alias for invoicecat operations.
pub type Result<T> = std::result::Result<T, InvoiceError>;

/// Main error type for invoicecat operations.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    /// The mail session could not be reached.
    #[error("Could not connect to the mail client: {reason}")]
    Connection {
        /// Why the connection failed.
        reason: String,
    },

    /// The default folder for the given identifier could not be resolved.
    #[error("Default folder {id} is not available: {reason}")]
    Folder {
        /// Numeric default-folder identifier.
        id: i64,
        /// Details from the mail session.
        reason: String,
    },

    /// No immediate child folder matched the configured name.
    #[error("Subfolder '{name}' not found in '{parent}'")]
    SubfolderNotFound {
        /// Name that was searched for.
        name: String,
        /// Folder whose children were scanned.
        parent: String,
    },

    /// Writing an attachment to disk failed.
    #[error("Failed to save attachment '{filename}' to {}\n  Reason: {source}", path.display())]
    AttachmentSave {
        /// Attachment filename as reported by the mail session.
        filename: String,
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A source PDF could not be loaded.
    #[error("Failed to load PDF: {}\n  Reason: {reason}", path.display())]
    FailedToLoadPdf {
        /// Path to the PDF file.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// A source PDF is encrypted.
    #[error(
        "PDF is encrypted and cannot be merged: {}\n  Hint: Decrypt the PDF first using 'qpdf --decrypt' or similar tools",
        path.display()
    )]
    EncryptedPdf {
        /// Path to the encrypted PDF.
        path: PathBuf,
    },

    /// Page concatenation failed.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The merged output file could not be created.
    #[error("Failed to create output file: {}\n  Reason: {source}", path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing or flushing the merged output failed.
    #[error("Failed to write to output file: {}\n  Reason: {source}", path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The mail transport did not accept an outgoing message.
    #[error("Failed to send message to {recipient}: {reason}")]
    Send {
        /// Intended recipient.
        recipient: String,
        /// Transport error.
        reason: String,
    },

    /// A mail protocol operation failed after the session was established.
    #[error("Mail session error: {reason}")]
    Protocol {
        /// Details from the mail session.
        reason: String,
    },

    /// Invalid configuration or user input.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what is wrong.
        message: String,
    },

    /// A row selection typed by the user could not be parsed.
    #[error("Invalid selection '{input}': {reason}")]
    InvalidSelection {
        /// Text as entered.
        input: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The settings file exists but could not be read or parsed.
    #[error("Failed to read settings file: {}\n  Reason: {reason}", path.display())]
    ConfigFile {
        /// Path to the settings file.
        path: PathBuf,
        /// Parse or read error.
        reason: String,
    },

    /// The platform handler refused to open a file.
    #[error("Failed to open {}: {reason}", path.display())]
    OpenFailed {
        /// File that was to be opened.
        path: PathBuf,
        /// Error from the platform handler.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<lopdf::Error> for InvoiceError {
    fn from(err: lopdf::Error) -> Self {
        Self::merge_failed(err.to_string())
    }
}

impl InvoiceError {
    /// Create a Connection error.
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    /// Create a Protocol error.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create a Send error.
    pub fn send(recipient: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Send {
            recipient: recipient.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error only affects the attachment being processed.
    ///
    /// The pipeline records these and moves on to the next attachment; any
    /// other error aborts the whole run.
    pub fn is_attachment_level(&self) -> bool {
        matches!(
            self,
            Self::AttachmentSave { .. }
                | Self::FailedToLoadPdf { .. }
                | Self::EncryptedPdf { .. }
                | Self::MergeFailed { .. }
                | Self::FailedToCreateOutput { .. }
                | Self::FailedToWrite { .. }
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig { .. }
            | Self::ConfigFile { .. }
            | Self::InvalidSelection { .. } => 1,
            Self::Connection { .. } => 2,
            Self::Folder { .. } | Self::SubfolderNotFound { .. } => 3,
            Self::FailedToLoadPdf { .. } | Self::EncryptedPdf { .. } | Self::MergeFailed { .. } => 4,
            Self::AttachmentSave { .. }
            | Self::FailedToCreateOutput { .. }
            | Self::FailedToWrite { .. }
            | Self::Io(_) => 5,
            Self::Send { .. } | Self::Protocol { .. } => 6,
            Self::OpenFailed { .. } => 7,
        }
    }
}
