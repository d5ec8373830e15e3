//! Shared fixtures: an in-memory mail client and generated PDFs.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use lopdf::{Document, Object, Stream, dictionary};
use tempfile::TempDir;

use invoicecat::config::Settings;
use invoicecat::mail::{
    Attachment, Connector, Folder, MailSession, Message, MessageClass, MessageId, OutgoingMessage,
};
use invoicecat::{InvoiceError, Result};

/// A forward as recorded by [`FakeSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct Forwarded {
    pub original: MessageId,
    pub to: String,
    pub attachments: Vec<PathBuf>,
}

/// Everything the fake mail client knows.
#[derive(Debug, Default)]
pub struct MailState {
    /// Children of the inbox.
    pub folders: Vec<Folder>,
    /// Messages with the content of each attachment.
    pub messages: Vec<(Message, Vec<Vec<u8>>)>,
    pub sent: Vec<OutgoingMessage>,
    pub forwards: Vec<Forwarded>,
    pub folder_lookups: usize,
    pub fail_transport: bool,
}

impl MailState {
    pub fn message(&self, id: MessageId) -> &Message {
        &self
            .messages
            .iter()
            .find(|(m, _)| m.id == id)
            .expect("unknown message")
            .0
    }

    pub fn is_unread(&self, id: MessageId) -> bool {
        self.message(id).unread
    }
}

pub struct FakeSession {
    state: Rc<RefCell<MailState>>,
}

impl MailSession for FakeSession {
    fn default_folder(&mut self, id: i64) -> Result<Folder> {
        self.state.borrow_mut().folder_lookups += 1;
        match id {
            6 => Ok(Folder::new("Inbox", "INBOX")),
            _ => Err(InvoiceError::protocol(format!("no default folder {id}"))),
        }
    }

    fn child_folders(&mut self, _folder: &Folder) -> Result<Vec<Folder>> {
        Ok(self.state.borrow().folders.clone())
    }

    fn unread_messages(&mut self, folder: &Folder) -> Result<Vec<Message>> {
        Ok(self
            .state
            .borrow()
            .messages
            .iter()
            .map(|(m, _)| m)
            .filter(|m| m.folder.path == folder.path && m.unread)
            .cloned()
            .collect())
    }

    fn save_attachment(
        &mut self,
        message: &Message,
        attachment: &Attachment,
        dest: &Path,
    ) -> Result<()> {
        let state = self.state.borrow();
        let (_, contents) = state
            .messages
            .iter()
            .find(|(m, _)| m.id == message.id)
            .ok_or_else(|| InvoiceError::protocol("unknown message"))?;

        std::fs::write(dest, &contents[attachment.index]).map_err(|source| {
            InvoiceError::AttachmentSave {
                filename: attachment.filename.clone(),
                path: dest.to_path_buf(),
                source,
            }
        })
    }

    fn mark_read(&mut self, message: &Message) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some((m, _)) = state.messages.iter_mut().find(|(m, _)| m.id == message.id) {
            m.unread = false;
        }
        Ok(())
    }

    fn send(&mut self, message: &OutgoingMessage) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_transport {
            return Err(InvoiceError::send(&message.to, "transport down"));
        }
        state.sent.push(message.clone());
        Ok(())
    }

    fn forward(&mut self, original: &Message, to: &str, attachments: &[PathBuf]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_transport {
            return Err(InvoiceError::send(to, "transport down"));
        }
        state.forwards.push(Forwarded {
            original: original.id,
            to: to.to_string(),
            attachments: attachments.to_vec(),
        });
        Ok(())
    }
}

pub struct FakeConnector {
    pub state: Rc<RefCell<MailState>>,
    pub reachable: bool,
    pub connects: Cell<usize>,
    pub launches: Cell<usize>,
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    fn connect(&self) -> Result<FakeSession> {
        self.connects.set(self.connects.get() + 1);
        if self.reachable {
            Ok(FakeSession {
                state: Rc::clone(&self.state),
            })
        } else {
            Err(InvoiceError::connection("client not running"))
        }
    }

    fn launch_client(&self) -> Result<()> {
        self.launches.set(self.launches.get() + 1);
        Ok(())
    }
}

/// Width of every page in generated invoice PDFs.
pub const INVOICE_WIDTH: i64 = 595;

/// Width of the generated QR page.
pub const QR_WIDTH: i64 = 300;

/// A PDF with `pages` pages of the given width, as bytes.
pub fn pdf_bytes(pages: u32, width: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids = (0..pages)
        .map(|n| {
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                format!("% page {n}").into_bytes(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => Object::Array(vec![0.into(), 0.into(), width.into(), 842.into()]),
                "Contents" => content_id,
            });
            Object::Reference(page_id)
        })
        .collect::<Vec<_>>();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Page widths of the PDF at `path`, in page order.
pub fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let page = doc.get_dictionary(id).unwrap();
            page.get(b"MediaBox").unwrap().as_array().unwrap()[2]
                .as_i64()
                .unwrap()
        })
        .collect()
}

/// A scratch mailbox, save folder and QR PDF.
pub struct Fixture {
    pub dir: TempDir,
    pub settings: Settings,
    pub state: Rc<RefCell<MailState>>,
    next_id: u32,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let save_folder = dir.path().join("out");
        let qr_pdf = dir.path().join("qr.pdf");
        std::fs::create_dir_all(&save_folder).unwrap();
        std::fs::write(&qr_pdf, pdf_bytes(1, QR_WIDTH)).unwrap();

        let settings = Settings {
            save_folder,
            qr_pdf,
            forward_to: "accounts@example.com".to_string(),
            ..Settings::default()
        };

        let state = MailState {
            folders: vec![
                Folder::new("Receipts", "INBOX/Receipts"),
                Folder::new("Invoices", "INBOX/Invoices"),
            ],
            ..MailState::default()
        };

        Self {
            dir,
            settings,
            state: Rc::new(RefCell::new(state)),
            next_id: 1,
        }
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            state: Rc::clone(&self.state),
            reachable: true,
            connects: Cell::new(0),
            launches: Cell::new(0),
        }
    }

    pub fn unreachable_connector(&self) -> FakeConnector {
        FakeConnector {
            reachable: false,
            ..self.connector()
        }
    }

    pub fn invoice_folder(&self) -> Folder {
        Folder::new("Invoices", "INBOX/Invoices")
    }

    /// Add a message to the invoice folder.
    pub fn add_message(
        &mut self,
        subject: &str,
        body: &str,
        unread: bool,
        class: MessageClass,
        attachments: &[(&str, Vec<u8>)],
    ) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;

        let message = Message {
            id,
            folder: self.invoice_folder(),
            message_id: Some(format!("{}@vendor.example", id)),
            subject: subject.to_string(),
            body: body.to_string(),
            sender: "billing@vendor.example".to_string(),
            unread,
            class,
            attachments: attachments
                .iter()
                .enumerate()
                .map(|(index, (name, _))| Attachment {
                    index,
                    filename: name.to_string(),
                })
                .collect(),
        };
        let contents = attachments.iter().map(|(_, bytes)| bytes.clone()).collect();

        self.state.borrow_mut().messages.push((message, contents));
        id
    }

    /// Add the standard unread "Invoice #123" message with `bill.pdf`.
    pub fn add_invoice(&mut self) -> MessageId {
        self.add_message(
            "Invoice #123",
            "Please pay by Friday.",
            true,
            MessageClass::Mail,
            &[("bill.pdf", pdf_bytes(2, INVOICE_WIDTH))],
        )
    }

    pub fn save_folder(&self) -> &Path {
        &self.settings.save_folder
    }

    /// Sorted file names in the save folder.
    pub fn saved_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.save_folder())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
