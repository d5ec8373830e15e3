//! Selecting the invoice messages of a folder.

use crate::error::Result;
use crate::mail::{Folder, MailSession, Message, MessageClass};

/// Keyword that marks a message as an invoice, matched case-insensitively.
pub const INVOICE_KEYWORD: &str = "invoice";

/// Whether `message` should be processed.
///
/// Checks run in order: unread flag, mail-item class, then the keyword in
/// the subject or body.
pub fn is_eligible(message: &Message) -> bool {
    message.unread
        && message.class == MessageClass::Mail
        && (message.subject.to_lowercase().contains(INVOICE_KEYWORD)
            || message.body.to_lowercase().contains(INVOICE_KEYWORD))
}

/// Eligible messages of `folder`, in the session's order.
///
/// The returned iterator owns a snapshot taken at call time; marking
/// messages read while iterating does not affect it.
///
/// # Errors
///
/// Returns the session's error if the folder cannot be enumerated.
pub fn scan<S: MailSession>(
    session: &mut S,
    folder: &Folder,
) -> Result<impl Iterator<Item = Message> + use<S>> {
    let messages = session.unread_messages(folder)?;
    tracing::debug!(folder = %folder, unread = messages.len(), "Scanning folder");

    Ok(messages.into_iter().filter(is_eligible))
}
