//! MIME decoding of fetched messages.

use mail_parser::{MessageParser, MimeHeaders};

use crate::error::{InvoiceError, Result};
use crate::mail::{Attachment, Folder, Message, MessageClass, MessageId};

/// Decode a raw RFC 5322 message into a [`Message`].
///
/// Messages that `mail-parser` rejects are returned with empty fields so that
/// the scanner simply skips them.
pub fn parse_message(id: MessageId, folder: &Folder, raw: &[u8], unread: bool) -> Message {
    let Some(parsed) = MessageParser::default().parse(raw) else {
        tracing::warn!(id = %id, folder = %folder, "Could not parse message");
        return Message {
            id,
            folder: folder.clone(),
            message_id: None,
            subject: String::new(),
            body: String::new(),
            sender: String::new(),
            unread,
            class: MessageClass::Mail,
            attachments: Vec::new(),
        };
    };

    let subject = parsed.subject().unwrap_or_default().to_string();

    // mail-parser converts HTML-only bodies to text here.
    let body = parsed
        .body_text(0)
        .map(|s| s.into_owned())
        .unwrap_or_default();

    let sender = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|addr| addr.address.as_deref())
        .unwrap_or_default()
        .to_string();

    let class = match parsed.content_type() {
        Some(ct) => classify(ct.ctype(), ct.subtype()),
        None => MessageClass::Mail,
    };

    let attachments = parsed
        .attachments()
        .enumerate()
        .map(|(index, part)| Attachment {
            index,
            filename: part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{index}")),
        })
        .collect();

    Message {
        id,
        folder: folder.clone(),
        message_id: parsed.message_id().map(String::from),
        subject,
        body,
        sender,
        unread,
        class,
        attachments,
    }
}

/// Decode the content of the attachment at `index`.
///
/// # Errors
///
/// Returns [`InvoiceError::Protocol`] if the message cannot be parsed or has
/// no attachment at that position.
pub fn attachment_content(raw: &[u8], index: usize) -> Result<Vec<u8>> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| InvoiceError::protocol("Failed to parse message for attachment extraction"))?;

    parsed
        .attachments()
        .nth(index)
        .map(|part| part.contents().to_vec())
        .ok_or_else(|| InvoiceError::protocol(format!("Attachment {index} not found in message")))
}

fn classify(ctype: &str, subtype: Option<&str>) -> MessageClass {
    let subtype = subtype.unwrap_or_default();
    if ctype.eq_ignore_ascii_case("text") && subtype.eq_ignore_ascii_case("calendar") {
        MessageClass::Meeting
    } else if ctype.eq_ignore_ascii_case("multipart") && subtype.eq_ignore_ascii_case("report") {
        MessageClass::Report
    } else {
        MessageClass::Mail
    }
}
