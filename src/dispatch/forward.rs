use std::path::PathBuf;

use crate::error::{InvoiceError, Result};
use crate::mail::{MailSession, Message};

/// Forward `message` to `to` with the merged files attached, in one mail.
///
/// # Errors
///
/// Returns [`InvoiceError::InvalidConfig`] if `to` is blank, otherwise the
/// session's send error.
pub fn forward_merged<S: MailSession>(
    session: &mut S,
    message: &Message,
    to: &str,
    merged: &[PathBuf],
) -> Result<()> {
    let to = to.trim();
    if to.is_empty() {
        return Err(InvoiceError::invalid_config("Forward-to address is not set"));
    }

    session.forward(message, to, merged)?;
    tracing::info!(
        id = %message.id,
        to,
        attachments = merged.len(),
        "Forwarded invoice"
    );
    Ok(())
}
