//! Reaching the mail client and locating the invoice folder.

use std::time::Duration;

use crate::config::MailSettings;
use crate::error::{InvoiceError, Result};
use crate::mail::{Connector, Folder, MailSession};

/// What to do when the first connection attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchPolicy {
    /// Retry once after asking the platform to start the client.
    pub retry: bool,
    /// How long to wait between the launch and the retry.
    pub wait: Duration,
}

impl LaunchPolicy {
    /// Launch the client but report the original failure.
    pub fn no_retry() -> Self {
        Self {
            retry: false,
            wait: Duration::ZERO,
        }
    }

    /// Launch the client, wait, and try exactly once more.
    pub fn retry_once(wait: Duration) -> Self {
        Self { retry: true, wait }
    }
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self::retry_once(Duration::from_secs(5))
    }
}

impl From<&MailSettings> for LaunchPolicy {
    fn from(mail: &MailSettings) -> Self {
        if mail.retry_after_launch {
            Self::retry_once(Duration::from_secs(mail.launch_wait_secs))
        } else {
            Self::no_retry()
        }
    }
}

/// Connect to the mail client, launching it if it is not reachable.
///
/// # Errors
///
/// Returns [`InvoiceError::Connection`] if the client cannot be reached,
/// either because the policy forbids a retry or because the retry failed too.
pub fn connect<C: Connector>(connector: &C, policy: LaunchPolicy) -> Result<C::Session> {
    let first_err = match connector.connect() {
        Ok(session) => {
            tracing::debug!("Mail client is already running");
            return Ok(session);
        }
        Err(err) => err,
    };

    tracing::warn!(error = %first_err, "Mail client is not reachable, launching it");
    if let Err(err) = connector.launch_client() {
        tracing::warn!(error = %err, "Launch request failed");
    }

    if !policy.retry {
        return Err(as_connection_error(first_err));
    }

    if !policy.wait.is_zero() {
        std::thread::sleep(policy.wait);
    }

    match connector.connect() {
        Ok(session) => {
            tracing::info!("Connected after launching the mail client");
            Ok(session)
        }
        Err(err) => Err(as_connection_error(err)),
    }
}

fn as_connection_error(err: InvoiceError) -> InvoiceError {
    match err {
        InvoiceError::Connection { .. } => err,
        other => InvoiceError::connection(other.to_string()),
    }
}

/// Resolve the default folder identified by `folder_id`.
///
/// # Errors
///
/// Returns [`InvoiceError::Folder`] if the session has no such folder.
pub fn resolve_inbox<S: MailSession>(session: &mut S, folder_id: i64) -> Result<Folder> {
    session.default_folder(folder_id).map_err(|err| match err {
        InvoiceError::Folder { .. } => err,
        other => InvoiceError::Folder {
            id: folder_id,
            reason: other.to_string(),
        },
    })
}

/// Find the immediate child of `folder` named `name`, ignoring case.
///
/// The first match in the session's order wins. Grandchildren are not
/// searched.
///
/// # Errors
///
/// Returns [`InvoiceError::SubfolderNotFound`] if no child matches.
pub fn find_subfolder<S: MailSession>(session: &mut S, folder: &Folder, name: &str) -> Result<Folder> {
    let wanted = name.to_lowercase();

    session
        .child_folders(folder)?
        .into_iter()
        .find(|child| child.name.to_lowercase() == wanted)
        .ok_or_else(|| InvoiceError::SubfolderNotFound {
            name: name.to_string(),
            parent: folder.name.clone(),
        })
}
