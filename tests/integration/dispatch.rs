//! Manual dispatch: sending selected rows of the results table.

use std::path::PathBuf;

use invoicecat::InvoiceError;
use invoicecat::dispatch::{INVOICE_BODY, INVOICE_SUBJECT, MergeRecord, ResultTable, Selection};
use invoicecat::mail::Connector;

use crate::common::Fixture;

fn table() -> ResultTable {
    ResultTable::new(vec![
        MergeRecord::new("a@vendor.example", "/out/merged_a_1.pdf"),
        MergeRecord::new("b@vendor.example", "/out/merged_b_1.pdf"),
        MergeRecord::new("c@vendor.example", "/out/merged_c_1.pdf"),
    ])
}

#[test]
fn test_each_selected_row_is_its_own_message() {
    let fx = Fixture::new();
    let mut session = fx.connector().connect().unwrap();

    let sent = table()
        .send_selected(&mut session, &Selection::parse("1,3").unwrap(), "accounts@example.com")
        .unwrap();

    assert_eq!(sent, 2);
    let state = fx.state.borrow();
    assert_eq!(state.sent.len(), 2);
    for (msg, expected) in state.sent.iter().zip(["merged_a_1.pdf", "merged_c_1.pdf"]) {
        assert_eq!(msg.to, "accounts@example.com");
        assert_eq!(msg.subject, INVOICE_SUBJECT);
        assert_eq!(msg.body, INVOICE_BODY);
        assert_eq!(msg.attachments, vec![PathBuf::from("/out").join(expected)]);
    }
    assert!(state.forwards.is_empty());
}

#[test]
fn test_send_requires_recipient() {
    let fx = Fixture::new();
    let mut session = fx.connector().connect().unwrap();

    let err = table()
        .send_selected(&mut session, &Selection::All, "  ")
        .unwrap_err();

    assert!(matches!(err, InvoiceError::InvalidConfig { .. }));
    assert!(fx.state.borrow().sent.is_empty());
}

#[test]
fn test_send_rejects_rows_past_end() {
    let fx = Fixture::new();
    let mut session = fx.connector().connect().unwrap();

    let err = table()
        .send_selected(&mut session, &Selection::parse("2-4").unwrap(), "x@example.com")
        .unwrap_err();

    assert!(matches!(err, InvoiceError::InvalidSelection { .. }));
    assert!(fx.state.borrow().sent.is_empty());
}

#[test]
fn test_send_stops_at_transport_failure() {
    let fx = Fixture::new();
    fx.state.borrow_mut().fail_transport = true;
    let mut session = fx.connector().connect().unwrap();

    let err = table()
        .send_selected(&mut session, &Selection::All, "x@example.com")
        .unwrap_err();

    assert!(matches!(err, InvoiceError::Send { .. }));
    assert_eq!(err.exit_code(), 6);
}
