//! The invoice processing run.
//!
//! A run checks the settings, connects to the mail client, resolves the
//! invoice folder, and then handles each eligible message in turn:
//!
//! 1. every PDF attachment is merged with the QR PDF
//! 2. the merged files are dispatched according to [`DispatchMode`]
//! 3. the message is marked read if nothing failed for it
//!
//! A message with a failed attachment or a failed forward stays unread, so
//! the next run picks it up again. Errors outside a single message (lost
//! session, missing folder) abort the run.

use std::path::PathBuf;

use crate::config::Settings;
use crate::dispatch::{DispatchMode, MergeRecord, ResultTable, forward_merged};
use crate::error::{InvoiceError, Result};
use crate::mail::{self, Connector, LaunchPolicy, MailSession, Message};
use crate::merge::MergeEngine;
use crate::scan;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The folder held no eligible messages.
    NothingToDo,
    /// At least one eligible message was handled.
    Completed,
}

/// A problem confined to one message or attachment.
#[derive(Debug)]
pub struct Failure {
    /// Sender of the affected message.
    pub sender: String,
    /// Subject of the affected message.
    pub subject: String,
    /// Attachment filename, or `None` when the forward failed.
    pub attachment: Option<String>,
    /// What went wrong.
    pub error: InvoiceError,
}

/// Summary of a run.
#[derive(Debug)]
pub struct ProcessReport {
    /// Dispatch variant used.
    pub mode: DispatchMode,
    /// Number of eligible messages found.
    pub eligible: usize,
    /// Every merged file, in processing order.
    pub records: Vec<MergeRecord>,
    /// Messages forwarded (forward mode only).
    pub forwarded: usize,
    /// Messages marked read.
    pub marked_read: usize,
    /// Attachment and forward failures.
    pub failures: Vec<Failure>,
}

impl ProcessReport {
    fn new(mode: DispatchMode) -> Self {
        Self {
            mode,
            eligible: 0,
            records: Vec::new(),
            forwarded: 0,
            marked_read: 0,
            failures: Vec::new(),
        }
    }

    /// Whether there was anything to process.
    pub fn outcome(&self) -> RunOutcome {
        if self.eligible == 0 {
            RunOutcome::NothingToDo
        } else {
            RunOutcome::Completed
        }
    }

    /// Number of merged files written.
    pub fn merged(&self) -> usize {
        self.records.len()
    }

    /// Results table for manual dispatch.
    pub fn into_table(self) -> ResultTable {
        ResultTable::new(self.records)
    }
}

/// Run the whole pipeline against the client reached through `connector`.
///
/// The settings are checked before any connection attempt.
///
/// # Errors
///
/// Returns a configuration, connection, folder or session error. Failures of
/// single attachments or forwards are collected in the report instead.
pub fn process_invoices<C: Connector>(
    connector: &C,
    settings: &Settings,
    mode: DispatchMode,
    policy: LaunchPolicy,
) -> Result<ProcessReport> {
    settings.prepare_for_run(mode.requires_recipient())?;

    let mut session = mail::connect(connector, policy)?;
    process_session(&mut session, settings, mode)
}

/// Run the pipeline on an established session.
///
/// # Errors
///
/// See [`process_invoices`].
pub fn process_session<S: MailSession>(
    session: &mut S,
    settings: &Settings,
    mode: DispatchMode,
) -> Result<ProcessReport> {
    let inbox = mail::resolve_inbox(session, settings.inbox_id)?;
    let folder = mail::find_subfolder(session, &inbox, &settings.subfolder_name)?;
    tracing::info!(folder = %folder, mode = %mode, "Processing invoices");

    let engine = MergeEngine::from_settings(settings);
    let mut report = ProcessReport::new(mode);

    for message in scan::scan(session, &folder)? {
        report.eligible += 1;
        process_message(session, &engine, settings, &message, &mut report)?;
    }

    if report.outcome() == RunOutcome::NothingToDo {
        tracing::info!(folder = %folder, "No unread invoices");
    }

    Ok(report)
}

fn process_message<S: MailSession>(
    session: &mut S,
    engine: &MergeEngine,
    settings: &Settings,
    message: &Message,
    report: &mut ProcessReport,
) -> Result<()> {
    tracing::debug!(id = %message.id, subject = %message.subject, "Processing message");

    let mut merged: Vec<PathBuf> = Vec::new();
    let mut complete = true;

    for attachment in message.pdf_attachments() {
        match engine.merge(session, message, attachment) {
            Ok(path) => merged.push(path),
            Err(error) if error.is_attachment_level() => {
                tracing::warn!(
                    id = %message.id,
                    attachment = %attachment.filename,
                    error = %error,
                    "Skipping attachment"
                );
                complete = false;
                report.failures.push(Failure {
                    sender: message.sender.clone(),
                    subject: message.subject.clone(),
                    attachment: Some(attachment.filename.clone()),
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    report.records.extend(
        merged
            .iter()
            .map(|path| MergeRecord::new(message.sender.clone(), path.clone())),
    );

    if report.mode == DispatchMode::Forward && complete && !merged.is_empty() {
        match forward_merged(session, message, &settings.forward_to, &merged) {
            Ok(()) => report.forwarded += 1,
            Err(error) => {
                tracing::warn!(id = %message.id, error = %error, "Forward failed");
                complete = false;
                report.failures.push(Failure {
                    sender: message.sender.clone(),
                    subject: message.subject.clone(),
                    attachment: None,
                    error,
                });
            }
        }
    }

    if complete {
        session.mark_read(message)?;
        report.marked_read += 1;
    } else {
        tracing::info!(id = %message.id, "Leaving message unread for the next run");
    }

    Ok(())
}
