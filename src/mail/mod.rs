//! Mail session abstraction.
//!
//! The pipeline talks to the mail client only through [`Connector`] and
//! [`MailSession`]. [`imap::ImapConnector`] binds them to an IMAP/SMTP
//! account; tests bind them to an in-memory mailbox.

pub mod gateway;
pub mod imap;
pub mod mime;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub use gateway::{LaunchPolicy, connect, find_subfolder, resolve_inbox};

/// A mail folder as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Display name (last path segment).
    pub name: String,
    /// Full, session-specific path used to address the folder.
    pub path: String,
}

impl Folder {
    /// Create a folder from its display name and full path.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Well-known default folders, addressed by the mail client's numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultFolder {
    /// Id 3.
    DeletedItems,
    /// Id 4.
    Outbox,
    /// Id 5.
    SentMail,
    /// Id 6.
    Inbox,
    /// Id 16.
    Drafts,
    /// Id 23.
    Junk,
}

impl DefaultFolder {
    /// Map a numeric default-folder id to a folder kind.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            3 => Some(Self::DeletedItems),
            4 => Some(Self::Outbox),
            5 => Some(Self::SentMail),
            6 => Some(Self::Inbox),
            16 => Some(Self::Drafts),
            23 => Some(Self::Junk),
            _ => None,
        }
    }

    /// Folder names commonly used for this kind, most specific first.
    pub fn candidate_names(&self) -> &'static [&'static str] {
        match self {
            Self::DeletedItems => &["Deleted Items", "Trash", "Deleted Messages"],
            Self::Outbox => &["Outbox"],
            Self::SentMail => &["Sent Items", "Sent", "Sent Mail", "Sent Messages"],
            Self::Inbox => &["INBOX"],
            Self::Drafts => &["Drafts"],
            Self::Junk => &["Junk", "Junk E-mail", "Spam"],
        }
    }
}

/// Kind of item stored in a folder.
///
/// Only [`MessageClass::Mail`] items are candidates for invoice processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    /// An ordinary mail item.
    Mail,
    /// A calendar invitation or response.
    Meeting,
    /// A delivery or read report.
    Report,
}

/// Opaque message identifier, unique within its folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An attachment entry. Its bytes are only reachable through
/// [`MailSession::save_attachment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Position among the message's attachments.
    pub index: usize,
    /// Filename as sent.
    pub filename: String,
}

impl Attachment {
    /// Whether the filename ends in `.pdf`, ignoring case.
    pub fn is_pdf(&self) -> bool {
        self.filename.to_lowercase().ends_with(".pdf")
    }
}

/// A message in a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Identifier within `folder`.
    pub id: MessageId,
    /// Folder holding the message.
    pub folder: Folder,
    /// `Message-ID` header without angle brackets, if present.
    pub message_id: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Sender address.
    pub sender: String,
    /// Whether the message has not been read yet.
    pub unread: bool,
    /// Item class.
    pub class: MessageClass,
    /// Attachment entries in message order.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Attachments whose filename ends in `.pdf`.
    pub fn pdf_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_pdf())
    }
}

/// A new message composed by the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Files attached in order.
    pub attachments: Vec<PathBuf>,
}

/// A live connection to the mail client.
pub trait MailSession {
    /// Resolve a default folder by its numeric id.
    fn default_folder(&mut self, id: i64) -> Result<Folder>;

    /// List the immediate children of `folder`, in the client's order.
    fn child_folders(&mut self, folder: &Folder) -> Result<Vec<Folder>>;

    /// Fetch the unread messages of `folder`.
    fn unread_messages(&mut self, folder: &Folder) -> Result<Vec<Message>>;

    /// Write the content of `attachment` to `dest`, replacing any existing file.
    fn save_attachment(&mut self, message: &Message, attachment: &Attachment, dest: &Path)
    -> Result<()>;

    /// Set the read flag on `message`.
    fn mark_read(&mut self, message: &Message) -> Result<()>;

    /// Compose and send a new message.
    fn send(&mut self, message: &OutgoingMessage) -> Result<()>;

    /// Forward `original` to `to` with the given files attached.
    fn forward(&mut self, original: &Message, to: &str, attachments: &[PathBuf]) -> Result<()>;
}

/// Opens sessions to a mail client.
pub trait Connector {
    /// Session type produced by this connector.
    type Session: MailSession;

    /// Attempt to reach a running mail client.
    fn connect(&self) -> Result<Self::Session>;

    /// Ask the platform to start the mail client.
    fn launch_client(&self) -> Result<()>;
}

/// Subject prefix used on forwarded messages.
pub const FORWARD_PREFIX: &str = "FW: ";

/// Subject for a forward of `subject`, without stacking prefixes.
pub fn forward_subject(subject: &str) -> String {
    let lower = subject.trim_start().to_lowercase();
    if lower.starts_with("fw:") || lower.starts_with("fwd:") {
        subject.to_string()
    } else {
        format!("{FORWARD_PREFIX}{subject}")
    }
}
