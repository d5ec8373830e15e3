//! IMAP/SMTP binding of the mail session.
//!
//! Folders and messages come from an IMAP server over TLS; outgoing mail goes
//! through SMTP with `lettre`. Raw message bytes fetched during
//! [`MailSession::unread_messages`] are kept so attachments can be saved
//! without a second round trip.

use std::collections::HashMap;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use native_tls::{TlsConnector, TlsStream};
use utf7_imap::decode_utf7_imap;

use crate::config::{MailSettings, SmtpSecurity};
use crate::error::{InvoiceError, Result};
use crate::mail::{
    Attachment, Connector, DefaultFolder, Folder, MailSession, Message, MessageId, OutgoingMessage,
    forward_subject, mime,
};

type ImapStream = TlsStream<TcpStream>;

/// Opens [`ImapSession`]s for the configured account.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    settings: MailSettings,
}

impl ImapConnector {
    /// Create a connector for the given account settings.
    pub fn new(settings: MailSettings) -> Self {
        Self { settings }
    }
}

impl Connector for ImapConnector {
    type Session = ImapSession;

    fn connect(&self) -> Result<ImapSession> {
        let host = self.settings.imap_host.as_str();
        if host.is_empty() {
            return Err(InvoiceError::invalid_config("IMAP host is not set"));
        }

        let password = self
            .settings
            .resolve_password()
            .ok_or_else(|| InvoiceError::invalid_config("Mail password is not set"))?;

        tracing::debug!(host, port = self.settings.imap_port, "Connecting to IMAP server");
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| InvoiceError::connection(e.to_string()))?;
        let client = imap::connect((host, self.settings.imap_port), host, &tls)
            .map_err(|e| InvoiceError::connection(e.to_string()))?;

        let session = client
            .login(&self.settings.username, &password)
            .map_err(|(e, _)| InvoiceError::connection(format!("Login failed: {e}")))?;

        tracing::info!(host, user = %self.settings.username, "IMAP login successful");
        Ok(ImapSession {
            imap: session,
            settings: self.settings.clone(),
            password,
            selected: None,
            raw: HashMap::new(),
        })
    }

    fn launch_client(&self) -> Result<()> {
        let Some(command) = self.settings.launch_command.as_deref() else {
            tracing::info!("No launch command configured");
            return Ok(());
        };

        tracing::info!(command, "Launching mail client");
        shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| InvoiceError::connection(format!("Failed to run '{command}': {e}")))
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

/// A logged-in IMAP session plus the SMTP account used for sending.
pub struct ImapSession {
    imap: imap::Session<ImapStream>,
    settings: MailSettings,
    password: String,
    selected: Option<String>,
    raw: HashMap<(String, u32), Vec<u8>>,
}

impl ImapSession {
    fn select(&mut self, path: &str) -> Result<()> {
        if self.selected.as_deref() == Some(path) {
            return Ok(());
        }

        self.imap
            .select(path)
            .map_err(|e| InvoiceError::protocol(format!("SELECT {path}: {e}")))?;
        self.selected = Some(path.to_string());
        Ok(())
    }

    /// All folder names with their hierarchy delimiter.
    fn list_all(&mut self) -> Result<Vec<(String, Option<String>)>> {
        let names = self
            .imap
            .list(Some(""), Some("*"))
            .map_err(|e| InvoiceError::protocol(format!("LIST: {e}")))?;

        Ok(names
            .iter()
            .map(|n| (n.name().to_string(), n.delimiter().map(String::from)))
            .collect())
    }

    fn raw_message(&self, message: &Message) -> Result<&[u8]> {
        self.raw
            .get(&(message.folder.path.clone(), message.id.0))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                InvoiceError::protocol(format!(
                    "Message {} in {} was not fetched in this session",
                    message.id, message.folder
                ))
            })
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let host = self.settings.smtp_host.as_str();
        if host.is_empty() {
            return Err(InvoiceError::invalid_config("SMTP host is not set"));
        }

        let credentials = Credentials::new(self.settings.username.clone(), self.password.clone());
        let builder = match self.settings.smtp_security {
            SmtpSecurity::Tls => SmtpTransport::relay(host),
            SmtpSecurity::Starttls => SmtpTransport::starttls_relay(host),
            SmtpSecurity::None => Ok(SmtpTransport::builder_dangerous(host)),
        }
        .map_err(|e| InvoiceError::connection(format!("SMTP {host}: {e}")))?;

        Ok(builder
            .port(self.settings.smtp_port)
            .credentials(credentials)
            .build())
    }

    fn deliver(&self, to: &str, email: lettre::Message) -> Result<()> {
        self.transport()?
            .send(&email)
            .map_err(|e| InvoiceError::send(to, e.to_string()))?;
        tracing::info!(to, "Message sent");
        Ok(())
    }

    fn mailboxes(&self, to: &str) -> Result<(Mailbox, Mailbox)> {
        let from = self
            .settings
            .sender_address()
            .parse::<Mailbox>()
            .map_err(|e| InvoiceError::invalid_config(format!("Invalid sender address: {e}")))?;
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| InvoiceError::invalid_config(format!("Invalid recipient '{to}': {e}")))?;
        Ok((from, to))
    }
}

/// Build a mixed multipart with a text body and the given files.
fn with_attachments(body: &str, attachments: &[PathBuf]) -> Result<MultiPart> {
    let pdf = ContentType::parse("application/pdf")
        .map_err(|e| InvoiceError::protocol(e.to_string()))?;

    let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(body.to_string()));
    for path in attachments {
        let content = std::fs::read(path)
            .map_err(|e| InvoiceError::protocol(format!("Cannot attach {}: {e}", path.display())))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "invoice.pdf".to_string());
        multipart = multipart.singlepart(MailAttachment::new(filename).body(content, pdf.clone()));
    }

    Ok(multipart)
}

fn forward_body(original: &Message) -> String {
    format!(
        "\n\n---------- Forwarded message ---------\nFrom: {}\nSubject: {}\n\n{}",
        original.sender, original.subject, original.body
    )
}

fn leaf_name(path: &str, delimiter: Option<&str>) -> String {
    match delimiter {
        Some(d) if !d.is_empty() => path.rsplit(d).next().unwrap_or(path).to_string(),
        _ => path.to_string(),
    }
}

/// Leaf name decoded from modified UTF-7. The raw path stays in
/// [`Folder::path`] for SELECT and LIST.
fn display_name(path: &str, delimiter: Option<&str>) -> String {
    decode_utf7_imap(leaf_name(path, delimiter))
}

/// Quote a LIST pattern. The `imap` crate sends patterns verbatim.
fn quote_pattern(pattern: &str) -> String {
    let mut quoted = String::with_capacity(pattern.len() + 2);
    quoted.push('"');
    for c in pattern.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

impl MailSession for ImapSession {
    fn default_folder(&mut self, id: i64) -> Result<Folder> {
        let kind = DefaultFolder::from_id(id).ok_or_else(|| InvoiceError::Folder {
            id,
            reason: "unknown default-folder identifier".to_string(),
        })?;

        if kind == DefaultFolder::Inbox {
            return Ok(Folder::new("Inbox", "INBOX"));
        }

        let all = self.list_all()?;
        for candidate in kind.candidate_names() {
            if let Some((path, delimiter)) = all.iter().find(|(path, delimiter)| {
                display_name(path, delimiter.as_deref()).eq_ignore_ascii_case(candidate)
            }) {
                return Ok(Folder::new(display_name(path, delimiter.as_deref()), path.clone()));
            }
        }

        Err(InvoiceError::Folder {
            id,
            reason: format!("no folder named {:?}", kind.candidate_names()),
        })
    }

    fn child_folders(&mut self, folder: &Folder) -> Result<Vec<Folder>> {
        let delimiter = self
            .imap
            .list(Some(""), Some(&quote_pattern(&folder.path)))
            .map_err(|e| InvoiceError::protocol(format!("LIST {}: {e}", folder.path)))?
            .iter()
            .find_map(|n| n.delimiter().map(String::from));

        let Some(delimiter) = delimiter else {
            // Flat namespace: no children possible.
            return Ok(Vec::new());
        };

        let pattern = format!("{}{}%", folder.path, delimiter);
        let names = self
            .imap
            .list(Some(""), Some(&quote_pattern(&pattern)))
            .map_err(|e| InvoiceError::protocol(format!("LIST {pattern}: {e}")))?;

        Ok(names
            .iter()
            .map(|n| Folder::new(display_name(n.name(), Some(delimiter.as_str())), n.name()))
            .collect())
    }

    fn unread_messages(&mut self, folder: &Folder) -> Result<Vec<Message>> {
        self.select(&folder.path)?;

        let mut uids: Vec<u32> = self
            .imap
            .uid_search("UNSEEN")
            .map_err(|e| InvoiceError::protocol(format!("SEARCH UNSEEN: {e}")))?
            .into_iter()
            .collect();
        uids.sort_unstable();

        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let set = uids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        // BODY.PEEK keeps the \Seen flag untouched until we decide.
        let fetches = self
            .imap
            .uid_fetch(&set, "(UID BODY.PEEK[])")
            .map_err(|e| InvoiceError::protocol(format!("FETCH: {e}")))?;

        let mut messages = Vec::with_capacity(fetches.len());
        for fetch in fetches.iter() {
            let (Some(uid), Some(body)) = (fetch.uid, fetch.body()) else {
                continue;
            };
            let message = mime::parse_message(MessageId(uid), folder, body, true);
            self.raw.insert((folder.path.clone(), uid), body.to_vec());
            messages.push(message);
        }

        tracing::debug!(folder = %folder, count = messages.len(), "Fetched unread messages");
        Ok(messages)
    }

    fn save_attachment(
        &mut self,
        message: &Message,
        attachment: &Attachment,
        dest: &Path,
    ) -> Result<()> {
        let save_failed = |source: std::io::Error| InvoiceError::AttachmentSave {
            filename: attachment.filename.clone(),
            path: dest.to_path_buf(),
            source,
        };

        let content = mime::attachment_content(self.raw_message(message)?, attachment.index)
            .map_err(|e| save_failed(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))?;
        std::fs::write(dest, content).map_err(save_failed)
    }

    fn mark_read(&mut self, message: &Message) -> Result<()> {
        self.select(&message.folder.path)?;
        self.imap
            .uid_store(message.id.to_string(), "+FLAGS (\\Seen)")
            .map_err(|e| InvoiceError::protocol(format!("STORE {}: {e}", message.id)))?;
        Ok(())
    }

    fn send(&mut self, message: &OutgoingMessage) -> Result<()> {
        let (from, to) = self.mailboxes(&message.to)?;
        let email = lettre::Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .multipart(with_attachments(&message.body, &message.attachments)?)
            .map_err(|e| InvoiceError::send(&message.to, e.to_string()))?;

        self.deliver(&message.to, email)
    }

    fn forward(&mut self, original: &Message, to: &str, attachments: &[PathBuf]) -> Result<()> {
        let (from, recipient) = self.mailboxes(to)?;
        let mut builder = lettre::Message::builder()
            .from(from)
            .to(recipient)
            .subject(forward_subject(&original.subject));

        if let Some(id) = &original.message_id {
            builder = builder.references(format!("<{id}>"));
        }

        let email = builder
            .multipart(with_attachments(&forward_body(original), attachments)?)
            .map_err(|e| InvoiceError::send(to, e.to_string()))?;

        self.deliver(to, email)
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if let Err(e) = self.imap.logout() {
            tracing::debug!(error = %e, "IMAP logout failed");
        }
    }
}
