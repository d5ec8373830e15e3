//! What happens to merged invoices after a scan.
//!
//! In [`DispatchMode::Manual`] the merge results are collected into a
//! [`ResultTable`] and the user later picks rows to send. In
//! [`DispatchMode::Forward`] each original message is forwarded right away
//! with its merged files attached.

pub mod forward;
pub mod manual;
pub mod selection;

use std::fmt;
use std::path::PathBuf;

pub use forward::forward_merged;
pub use manual::{INVOICE_BODY, INVOICE_SUBJECT, ResultTable};
pub use selection::Selection;

/// How merged invoices are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DispatchMode {
    /// Collect results for manual, per-row sending.
    #[default]
    Manual,
    /// Forward each original message as soon as its attachments are merged.
    Forward,
}

impl DispatchMode {
    /// Whether a forward-to address must be configured before the run.
    pub fn requires_recipient(&self) -> bool {
        matches!(self, Self::Forward)
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Forward => f.write_str("forward"),
        }
    }
}

/// One merged invoice: who sent it and where the merged file was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    /// Sender address of the original message.
    pub sender: String,
    /// Path of the merged PDF.
    pub path: PathBuf,
}

impl MergeRecord {
    /// Create a record.
    pub fn new(sender: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            sender: sender.into(),
            path: path.into(),
        }
    }

    /// File name of the merged PDF, for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
