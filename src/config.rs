//! Configuration store for invoicecat.
//!
//! Settings are persisted as a flat JSON record whose keys match the legacy
//! settings file (`SAVE_FOLDER`, `QR_PDF`, `FORWARD_TO`, `INBOX_ID`,
//! `SUBFOLDER_NAME`), plus a nested `MAIL` section for the connection.
//!
//! The file is located at:
//! 1. the path given with `--config`
//! 2. `$INVOICECAT_CONFIG`
//! 3. `~/.config/invoicecat/config.json` (Linux)
//!    `%APPDATA%\invoicecat\config.json` (Windows)
//!
//! Loading overlays whatever is persisted onto the defaults. Keys this
//! version does not know about are carried along and written back on save.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{InvoiceError, Result};

/// Directory name under the platform config dir.
pub const APP_NAME: &str = "invoicecat";

/// Settings file name.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "INVOICECAT_CONFIG";

/// Environment variable supplying the mail password.
pub const PASSWORD_ENV: &str = "INVOICECAT_PASSWORD";

/// Conventional default-folder identifier for the inbox.
pub const DEFAULT_INBOX_ID: i64 = 6;

/// Subfolder scanned when none is configured.
pub const DEFAULT_SUBFOLDER: &str = "Invoices";

/// Persisted invoice-processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    /// Folder that receives raw attachments and merged PDFs.
    pub save_folder: PathBuf,
    /// The fixed QR-code PDF appended to every invoice.
    pub qr_pdf: PathBuf,
    /// Recipient of forwarded invoices.
    pub forward_to: String,
    /// Default-folder identifier understood by the mail client.
    pub inbox_id: i64,
    /// Name of the child folder holding invoices.
    pub subfolder_name: String,
    /// Connection settings for the mail binding.
    pub mail: MailSettings,
    /// Keys written by other versions; preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_folder: PathBuf::new(),
            qr_pdf: PathBuf::new(),
            forward_to: String::new(),
            inbox_id: DEFAULT_INBOX_ID,
            subfolder_name: DEFAULT_SUBFOLDER.to_string(),
            mail: MailSettings::default(),
            extra: BTreeMap::new(),
        }
    }
}

/// Transport security for outgoing mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS (usually port 465).
    #[default]
    Tls,
    /// Plain connection upgraded with STARTTLS (usually port 587).
    Starttls,
    /// No encryption. Only for local relays.
    None,
}

/// Connection settings for the IMAP/SMTP mail binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MailSettings {
    /// IMAP server host name.
    pub imap_host: String,
    /// IMAP server port (TLS).
    pub imap_port: u16,
    /// SMTP server host name.
    pub smtp_host: String,
    /// SMTP server port.
    pub smtp_port: u16,
    /// SMTP transport security.
    pub smtp_security: SmtpSecurity,
    /// Login name for both servers.
    pub username: String,
    /// Password for both servers; `INVOICECAT_PASSWORD` takes precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Sender address; defaults to the username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Command that starts the local mail client or bridge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_command: Option<String>,
    /// Retry the connection once after launching the client.
    pub retry_after_launch: bool,
    /// Seconds to wait after launching before the retry.
    pub launch_wait_secs: u64,
    /// Keys written by other versions; preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            imap_host: String::new(),
            imap_port: 993,
            smtp_host: String::new(),
            smtp_port: 465,
            smtp_security: SmtpSecurity::Tls,
            username: String::new(),
            password: None,
            from: None,
            launch_command: None,
            retry_after_launch: true,
            launch_wait_secs: 5,
            extra: BTreeMap::new(),
        }
    }
}

impl MailSettings {
    /// Password from the environment, falling back to the settings file.
    pub fn resolve_password(&self) -> Option<String> {
        std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.password.clone())
    }

    /// Address used in the `From` header of outgoing mail.
    pub fn sender_address(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

/// A partial set of field changes, as entered by the user.
///
/// The folder id stays textual until [`Settings::apply`] so that a
/// non-numeric entry is reported instead of being coerced.
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)]
pub struct SettingsUpdate {
    pub save_folder: Option<PathBuf>,
    pub qr_pdf: Option<PathBuf>,
    pub forward_to: Option<String>,
    /// Raw text; parsed by [`parse_folder_id`].
    pub inbox_id: Option<String>,
    pub subfolder_name: Option<String>,
    pub imap_host: Option<String>,
    pub imap_port: Option<u16>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_security: Option<SmtpSecurity>,
    pub username: Option<String>,
    /// Empty string clears the override.
    pub from: Option<String>,
    /// Empty string clears the command.
    pub launch_command: Option<String>,
}

impl SettingsUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.save_folder.is_none()
            && self.qr_pdf.is_none()
            && self.forward_to.is_none()
            && self.inbox_id.is_none()
            && self.subfolder_name.is_none()
            && self.imap_host.is_none()
            && self.imap_port.is_none()
            && self.smtp_host.is_none()
            && self.smtp_port.is_none()
            && self.smtp_security.is_none()
            && self.username.is_none()
            && self.from.is_none()
            && self.launch_command.is_none()
    }
}

/// Parse a default-folder identifier entered by the user.
///
/// # Errors
///
/// Returns [`InvoiceError::InvalidConfig`] when the text is not an integer.
pub fn parse_folder_id(text: &str) -> Result<i64> {
    text.trim().parse::<i64>().map_err(|_| {
        InvoiceError::invalid_config(format!(
            "Inbox folder id must be an integer, got '{}'",
            text.trim()
        ))
    })
}

impl Settings {
    /// Overlay user-entered changes onto these settings.
    ///
    /// Nothing is modified if the folder id fails to parse.
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<()> {
        let inbox_id = update.inbox_id.as_deref().map(parse_folder_id).transpose()?;

        if let Some(id) = inbox_id {
            self.inbox_id = id;
        }
        if let Some(folder) = update.save_folder {
            self.save_folder = folder;
        }
        if let Some(qr) = update.qr_pdf {
            self.qr_pdf = qr;
        }
        if let Some(to) = update.forward_to {
            self.forward_to = to;
        }
        if let Some(name) = update.subfolder_name {
            self.subfolder_name = name;
        }

        let mail = &mut self.mail;
        if let Some(host) = update.imap_host {
            mail.imap_host = host;
        }
        if let Some(port) = update.imap_port {
            mail.imap_port = port;
        }
        if let Some(host) = update.smtp_host {
            mail.smtp_host = host;
        }
        if let Some(port) = update.smtp_port {
            mail.smtp_port = port;
        }
        if let Some(security) = update.smtp_security {
            mail.smtp_security = security;
        }
        if let Some(user) = update.username {
            mail.username = user;
        }
        if let Some(from) = update.from {
            mail.from = Some(from).filter(|f| !f.is_empty());
        }
        if let Some(cmd) = update.launch_command {
            mail.launch_command = Some(cmd).filter(|c| !c.is_empty());
        }

        Ok(())
    }

    /// Check that a processing run can start, creating the save folder if needed.
    ///
    /// Runs before any mail access so that a broken setup never touches the
    /// mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::InvalidConfig`] if a required field is empty,
    /// the QR PDF does not exist, or a recipient is required but missing.
    pub fn prepare_for_run(&self, require_recipient: bool) -> Result<()> {
        if self.save_folder.as_os_str().is_empty() {
            return Err(InvoiceError::invalid_config("Save folder is not set"));
        }

        if self.qr_pdf.as_os_str().is_empty() {
            return Err(InvoiceError::invalid_config("QR PDF file is not set"));
        }

        if !self.qr_pdf.is_file() {
            return Err(InvoiceError::invalid_config(format!(
                "QR PDF file does not exist: {}",
                self.qr_pdf.display()
            )));
        }

        if require_recipient && self.forward_to.trim().is_empty() {
            return Err(InvoiceError::invalid_config(
                "Forward-to address is not set",
            ));
        }

        if !self.save_folder.is_dir() {
            std::fs::create_dir_all(&self.save_folder)?;
            tracing::info!(path = %self.save_folder.display(), "Created save folder");
        }

        Ok(())
    }
}

/// Loads and saves [`Settings`] at a fixed location.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Locate the settings file: explicit path, then environment, then the
    /// platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no location can be determined.
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV)
            && !env_path.is_empty()
        {
            return Ok(Self::new(env_path));
        }

        dirs::config_dir()
            .map(|dir| Self::new(dir.join(APP_NAME).join(CONFIG_FILE_NAME)))
            .ok_or_else(|| InvoiceError::invalid_config("Could not determine config directory"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, filling anything missing with defaults.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::ConfigFile`] if the file exists but cannot be
    /// read or is not a valid settings record.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No settings file, using defaults");
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| InvoiceError::ConfigFile {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let settings =
            serde_json::from_str::<Settings>(&contents).map_err(|e| InvoiceError::ConfigFile {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %self.path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Replace the persisted record with `settings`.
    ///
    /// The record is written to a sibling temp file, synced, then renamed
    /// over the target.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(settings)
            .map_err(|e| InvoiceError::invalid_config(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        let write_err = |source| InvoiceError::FailedToWrite {
            path: temp_path.clone(),
            source,
        };

        let mut file = std::fs::File::create(&temp_path).map_err(write_err)?;
        file.write_all(contents.as_bytes()).map_err(write_err)?;
        file.write_all(b"\n").map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        std::fs::rename(&temp_path, &self.path).map_err(|source| InvoiceError::FailedToWrite {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}
