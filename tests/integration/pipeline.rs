//! End-to-end runs against the in-memory mail client.

use std::time::Duration;

use invoicecat::InvoiceError;
use invoicecat::dispatch::{DispatchMode, MergeRecord};
use invoicecat::mail::{LaunchPolicy, MessageClass};
use invoicecat::pipeline::{RunOutcome, process_invoices};

use crate::common::{Fixture, INVOICE_WIDTH, QR_WIDTH, page_widths, pdf_bytes};

fn policy() -> LaunchPolicy {
    LaunchPolicy::retry_once(Duration::ZERO)
}

#[test]
fn test_invoice_is_merged_and_marked_read() {
    let mut fx = Fixture::new();
    let id = fx.add_invoice();

    let report =
        process_invoices(&fx.connector(), &fx.settings, DispatchMode::Manual, policy()).unwrap();

    let merged = fx.save_folder().join("merged_bill_1.pdf");
    assert_eq!(report.outcome(), RunOutcome::Completed);
    assert_eq!(report.eligible, 1);
    assert_eq!(report.marked_read, 1);
    assert!(report.failures.is_empty());
    assert_eq!(
        report.records,
        vec![MergeRecord::new("billing@vendor.example", merged.clone())]
    );

    assert_eq!(
        page_widths(&merged),
        vec![INVOICE_WIDTH, INVOICE_WIDTH, QR_WIDTH]
    );
    assert!(!fx.state.borrow().is_unread(id));
    assert!(fx.state.borrow().sent.is_empty());
}

#[test]
fn test_second_run_never_overwrites() {
    let mut fx = Fixture::new();
    let id = fx.add_invoice();
    let connector = fx.connector();

    process_invoices(&connector, &fx.settings, DispatchMode::Manual, policy()).unwrap();
    let first = fx.save_folder().join("merged_bill_1.pdf");
    let first_bytes = std::fs::read(&first).unwrap();

    // Same message arrives unread again.
    fx.state
        .borrow_mut()
        .messages
        .iter_mut()
        .for_each(|(m, _)| m.unread = true);

    let report = process_invoices(&connector, &fx.settings, DispatchMode::Manual, policy()).unwrap();

    let second = fx.save_folder().join("merged_bill_2.pdf");
    assert_eq!(report.records[0].path, second);
    assert_eq!(std::fs::read(&first).unwrap(), first_bytes);
    assert!(second.exists());
    assert!(!fx.state.borrow().is_unread(id));
    assert_eq!(
        fx.saved_files(),
        vec!["bill.pdf", "merged_bill_1.pdf", "merged_bill_2.pdf"]
    );
}

#[test]
fn test_subfolder_match_ignores_case() {
    let mut fx = Fixture::new();
    fx.state.borrow_mut().folders = vec![invoicecat::mail::Folder::new(
        "INVOICES",
        "INBOX/Invoices",
    )];
    fx.add_invoice();

    let report =
        process_invoices(&fx.connector(), &fx.settings, DispatchMode::Manual, policy()).unwrap();
    assert_eq!(report.merged(), 1);
}

#[test]
fn test_missing_subfolder_is_an_error() {
    let mut fx = Fixture::new();
    fx.settings.subfolder_name = "Bills".to_string();
    fx.add_invoice();

    let err = process_invoices(&fx.connector(), &fx.settings, DispatchMode::Manual, policy())
        .unwrap_err();
    assert!(matches!(err, InvoiceError::SubfolderNotFound { .. }));
    assert!(fx.saved_files().is_empty());
}

#[test]
fn test_unknown_inbox_id_is_a_folder_error() {
    let fx = Fixture::new();
    let mut settings = fx.settings.clone();
    settings.inbox_id = 42;

    let err =
        process_invoices(&fx.connector(), &settings, DispatchMode::Manual, policy()).unwrap_err();
    assert!(matches!(err, InvoiceError::Folder { id: 42, .. }));
}

#[test]
fn test_no_unread_messages_is_nothing_to_do() {
    let mut fx = Fixture::new();
    let id = fx.add_message(
        "Invoice #99",
        "",
        false,
        MessageClass::Mail,
        &[("old.pdf", pdf_bytes(1, INVOICE_WIDTH))],
    );

    let report =
        process_invoices(&fx.connector(), &fx.settings, DispatchMode::Manual, policy()).unwrap();

    assert_eq!(report.outcome(), RunOutcome::NothingToDo);
    assert_eq!(report.marked_read, 0);
    assert!(fx.saved_files().is_empty());
    assert!(!fx.state.borrow().is_unread(id));
}

#[test]
fn test_unreachable_client_touches_nothing() {
    let mut fx = Fixture::new();
    let id = fx.add_invoice();
    let connector = fx.unreachable_connector();

    let err = process_invoices(&connector, &fx.settings, DispatchMode::Manual, policy()).unwrap_err();

    assert!(matches!(err, InvoiceError::Connection { .. }));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(connector.launches.get(), 1);
    assert_eq!(connector.connects.get(), 2);
    assert_eq!(fx.state.borrow().folder_lookups, 0);
    assert!(fx.saved_files().is_empty());
    assert!(fx.state.borrow().is_unread(id));
}

#[test]
fn test_only_unread_invoice_mail_is_processed() {
    let mut fx = Fixture::new();
    let pdf = || pdf_bytes(1, INVOICE_WIDTH);
    let read = fx.add_message("Invoice", "", false, MessageClass::Mail, &[("a.pdf", pdf())]);
    let other = fx.add_message("Lunch?", "see you", true, MessageClass::Mail, &[("b.pdf", pdf())]);
    let meeting = fx.add_message("Invoice review", "", true, MessageClass::Meeting, &[("c.pdf", pdf())]);
    let in_body = fx.add_message("Hello", "your INVOICE is attached", true, MessageClass::Mail, &[("d.pdf", pdf())]);

    let report =
        process_invoices(&fx.connector(), &fx.settings, DispatchMode::Manual, policy()).unwrap();

    assert_eq!(report.eligible, 1);
    assert_eq!(fx.saved_files(), vec!["d.pdf", "merged_d_1.pdf"]);

    let state = fx.state.borrow();
    assert!(!state.is_unread(read));
    assert!(state.is_unread(other));
    assert!(state.is_unread(meeting));
    assert!(!state.is_unread(in_body));
}

#[test]
fn test_non_pdf_attachments_are_ignored() {
    let mut fx = Fixture::new();
    let id = fx.add_message(
        "Invoice attached",
        "",
        true,
        MessageClass::Mail,
        &[("notes.txt", b"hello".to_vec()), ("logo.png", vec![0x89, 0x50])],
    );

    let report =
        process_invoices(&fx.connector(), &fx.settings, DispatchMode::Manual, policy()).unwrap();

    assert_eq!(report.eligible, 1);
    assert_eq!(report.merged(), 0);
    assert!(fx.saved_files().is_empty());
    assert!(!fx.state.borrow().is_unread(id));
}

#[test]
fn test_broken_attachment_leaves_message_unread() {
    let mut fx = Fixture::new();
    let id = fx.add_message(
        "Invoice",
        "",
        true,
        MessageClass::Mail,
        &[
            ("broken.pdf", b"not a pdf".to_vec()),
            ("good.pdf", pdf_bytes(1, INVOICE_WIDTH)),
        ],
    );
    let ok = fx.add_invoice();

    let report =
        process_invoices(&fx.connector(), &fx.settings, DispatchMode::Manual, policy()).unwrap();

    assert_eq!(report.eligible, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].attachment.as_deref(), Some("broken.pdf"));
    assert!(matches!(
        report.failures[0].error,
        InvoiceError::FailedToLoadPdf { .. }
    ));
    assert_eq!(report.merged(), 2);
    assert!(!fx.save_folder().join("merged_broken_1.pdf").exists());
    assert!(fx.save_folder().join("merged_good_1.pdf").exists());

    let state = fx.state.borrow();
    assert!(state.is_unread(id));
    assert!(!state.is_unread(ok));
}

#[test]
fn test_hostile_filename_stays_in_save_folder() {
    let mut fx = Fixture::new();
    fx.add_message(
        "Invoice",
        "",
        true,
        MessageClass::Mail,
        &[("../../escape.pdf", pdf_bytes(1, INVOICE_WIDTH))],
    );

    process_invoices(&fx.connector(), &fx.settings, DispatchMode::Manual, policy()).unwrap();

    assert_eq!(fx.saved_files(), vec!["escape.pdf", "merged_escape_1.pdf"]);
    assert!(!fx.dir.path().join("escape.pdf").exists());
}

#[test]
fn test_forward_mode_sends_one_forward_per_message() {
    let mut fx = Fixture::new();
    let id = fx.add_message(
        "Invoice #7",
        "",
        true,
        MessageClass::Mail,
        &[
            ("jan.pdf", pdf_bytes(1, INVOICE_WIDTH)),
            ("feb.pdf", pdf_bytes(1, INVOICE_WIDTH)),
        ],
    );

    let report =
        process_invoices(&fx.connector(), &fx.settings, DispatchMode::Forward, policy()).unwrap();

    assert_eq!(report.forwarded, 1);
    let state = fx.state.borrow();
    assert_eq!(state.forwards.len(), 1);
    assert_eq!(state.forwards[0].original, id);
    assert_eq!(state.forwards[0].to, "accounts@example.com");
    assert_eq!(
        state.forwards[0].attachments,
        vec![
            fx.save_folder().join("merged_jan_1.pdf"),
            fx.save_folder().join("merged_feb_1.pdf"),
        ]
    );
    assert!(!state.is_unread(id));
}

#[test]
fn test_failed_forward_leaves_message_unread() {
    let mut fx = Fixture::new();
    let id = fx.add_invoice();
    fx.state.borrow_mut().fail_transport = true;

    let report =
        process_invoices(&fx.connector(), &fx.settings, DispatchMode::Forward, policy()).unwrap();

    assert_eq!(report.forwarded, 0);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].attachment.is_none());
    assert!(matches!(report.failures[0].error, InvoiceError::Send { .. }));
    assert!(fx.state.borrow().is_unread(id));
}

#[test]
fn test_forward_mode_requires_recipient_before_connecting() {
    let mut fx = Fixture::new();
    fx.settings.forward_to = String::new();
    fx.add_invoice();
    let connector = fx.connector();

    let err = process_invoices(&connector, &fx.settings, DispatchMode::Forward, policy()).unwrap_err();

    assert!(matches!(err, InvoiceError::InvalidConfig { .. }));
    assert_eq!(connector.connects.get(), 0);
}

#[test]
fn test_missing_qr_pdf_fails_before_connecting() {
    let mut fx = Fixture::new();
    fx.settings.qr_pdf = fx.dir.path().join("missing.pdf");
    let connector = fx.connector();

    let err = process_invoices(&connector, &fx.settings, DispatchMode::Manual, policy()).unwrap_err();

    assert_eq!(err.exit_code(), 1);
    assert_eq!(connector.connects.get(), 0);
}
